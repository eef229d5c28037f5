use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use atlassian_connector_api::retry::{retry_idempotent, RetryConfig};
use atlassian_connector_api::{ApiFamily, Payload, Product, RequestBody, Session};
use clap::Args;
use reqwest::Method;

#[derive(Args, Debug, Clone)]
pub struct ResourceArgs {
    /// Resource path below the API prefix, e.g. `issue/ABC-1`
    pub resource: String,
    /// API family: rest, legacy, agile or wiki (defaults by product)
    #[arg(long)]
    pub api: Option<ApiFamily>,
}

#[derive(Args, Debug, Clone)]
pub struct WriteArgs {
    #[command(flatten)]
    pub target: ResourceArgs,
    /// JSON body, or `@path` to read it from a file
    #[arg(long)]
    pub data: String,
}

#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    #[command(flatten)]
    pub write: WriteArgs,
    /// Print the response body
    #[arg(long)]
    pub with_response: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    #[command(flatten)]
    pub target: ResourceArgs,
    /// File to attach
    pub file: PathBuf,
}

impl ResourceArgs {
    fn family(&self, product: Product) -> ApiFamily {
        self.api.unwrap_or_else(|| product.default_family())
    }
}

pub async fn get(session: &Session, product: Product, args: ResourceArgs) -> Result<()> {
    let family = args.family(product);
    let payload =
        send_retrying(session, Method::GET, family, &args.resource, RequestBody::Empty).await?;
    print_payload(&payload)
}

pub async fn put(session: &Session, product: Product, args: WriteArgs) -> Result<()> {
    let family = args.target.family(product);
    let body = json_body(&args.data)?;
    send_retrying(session, Method::PUT, family, &args.target.resource, body).await?;
    Ok(())
}

/// POST is never retried.
pub async fn post(session: &Session, product: Product, args: DataArgs) -> Result<()> {
    let target = &args.write.target;
    let body = json_body(&args.write.data)?;
    let payload = session
        .request(Method::POST, target.family(product), &target.resource, body)
        .await
        .with_context(|| format!("POST {} failed", target.resource))?;

    if args.with_response {
        print_payload(&payload)?;
    }
    Ok(())
}

pub async fn upload(session: &Session, product: Product, args: UploadArgs) -> Result<()> {
    let payload = session
        .request(
            Method::POST,
            args.target.family(product),
            &args.target.resource,
            RequestBody::File(args.file.clone()),
        )
        .await
        .with_context(|| format!("Uploading {} failed", args.file.display()))?;
    print_payload(&payload)
}

pub async fn delete(session: &Session, product: Product, args: ResourceArgs) -> Result<()> {
    let family = args.family(product);
    send_retrying(session, Method::DELETE, family, &args.resource, RequestBody::Empty).await?;
    Ok(())
}

/// GET, PUT and DELETE retry transport failures with backoff.
async fn send_retrying(
    session: &Session,
    method: Method,
    family: ApiFamily,
    resource: &str,
    body: RequestBody,
) -> Result<Payload> {
    let config = RetryConfig::default();

    retry_idempotent(&config, &method, || {
        session.request(method.clone(), family, resource, body.clone())
    })
    .await
    .with_context(|| format!("{method} {resource} failed"))
}

/// Accept an inline JSON document or `@path`.
fn json_body(data: &str) -> Result<RequestBody> {
    let raw = match data.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Unable to read request body from {path}"))?,
        None => data.to_string(),
    };

    let value: serde_json::Value =
        serde_json::from_str(&raw).context("Request body is not valid JSON")?;
    Ok(RequestBody::Json(serde_json::to_vec(&value)?))
}

fn print_payload(payload: &Payload) -> Result<()> {
    if payload.is_empty() {
        return Ok(());
    }

    match serde_json::from_slice::<serde_json::Value>(payload.bytes()) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{}", String::from_utf8_lossy(payload.bytes())),
    }
    Ok(())
}
