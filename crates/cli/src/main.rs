mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use atlassian_connector_api::oauth::read_private_key;
use atlassian_connector_api::{
    AccessToken, CredentialContext, OAuthCredentials, Product, Session, Timeouts,
};
use atlassian_connector_auth::TokenStore;
use atlassian_connector_config::{AuthMethod, Config, ProductKind, Profile};
use clap::{Parser, Subcommand};
use commands::auth::{self, AuthCommand};
use commands::resource::{self, DataArgs, ResourceArgs, UploadArgs, WriteArgs};
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted for Basic-auth passwords before prompting.
pub const PASSWORD_ENV: &str = "ATLASSIAN_CONNECTOR_PASSWORD";

#[derive(Parser, Debug)]
#[command(
    name = "atlassian-connector",
    version,
    about = "Signed access to Jira and Confluence REST APIs",
    long_about = None
)]
struct Cli {
    /// Profile to use from config file
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Path to config file (defaults to ~/.atlassian-connector/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: ConnectorCommand,
}

#[derive(Subcommand, Debug, Clone)]
enum ConnectorCommand {
    /// Authentication commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// GET a resource and print the JSON reply
    Get(ResourceArgs),
    /// PUT a JSON body to a resource
    Put(WriteArgs),
    /// POST a JSON body to a resource
    Post(DataArgs),
    /// Upload a file as a multipart attachment
    Upload(UploadArgs),
    /// DELETE a resource
    Delete(ResourceArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let config_path = cli.config.clone();
    let config = Config::load(config_path.as_ref())?;
    let store = TokenStore::open_default()?;
    let active = resolve_active_profile(&config, cli.profile.as_deref())?;

    match cli.command {
        ConnectorCommand::Auth(command) => auth::handle(command, &active, &store).await?,
        ConnectorCommand::Get(args) => {
            let session = build_session(&active, &store)?;
            resource::get(&session, active.product(), args).await?
        }
        ConnectorCommand::Put(args) => {
            let session = build_session(&active, &store)?;
            resource::put(&session, active.product(), args).await?
        }
        ConnectorCommand::Post(args) => {
            let session = build_session(&active, &store)?;
            resource::post(&session, active.product(), args).await?
        }
        ConnectorCommand::Upload(args) => {
            let session = build_session(&active, &store)?;
            resource::upload(&session, active.product(), args).await?
        }
        ConnectorCommand::Delete(args) => {
            let session = build_session(&active, &store)?;
            resource::delete(&session, active.product(), args).await?
        }
    }

    Ok(())
}

fn init_tracing(debug: bool) -> Result<()> {
    let default = if debug {
        "info,atlassian_connector=debug,atlassian_connector_api=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logger: {err}"))
}

/// The profile a command runs against, by name.
pub struct ActiveProfile {
    pub name: String,
    pub profile: Profile,
}

impl ActiveProfile {
    pub fn product(&self) -> Product {
        match self.profile.product {
            ProductKind::Jira => Product::Jira,
            ProductKind::Confluence => Product::Confluence,
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            request: self.profile.timeouts.request(),
            upload: self.profile.timeouts.upload(),
        }
    }
}

fn resolve_active_profile(config: &Config, requested: Option<&str>) -> Result<ActiveProfile> {
    let (name, profile) = config.resolve_profile(requested).ok_or_else(|| match requested {
        Some(name) => anyhow!("Profile '{name}' is not configured."),
        None => anyhow!(
            "No profile configured. Add one to {}.",
            Config::default_path().display()
        ),
    })?;

    Ok(ActiveProfile {
        name: name.to_string(),
        profile: profile.clone(),
    })
}

/// Build a session for the active profile. OAuth profiles pick up the stored
/// access token when there is one; Basic profiles read the password from the
/// environment or a prompt.
pub fn build_session(active: &ActiveProfile, store: &TokenStore) -> Result<Arc<Session>> {
    let context = credential_context(active, store, true)?;
    Ok(Arc::new(Session::with_timeouts(context, active.timeouts())?))
}

pub fn credential_context(
    active: &ActiveProfile,
    store: &TokenStore,
    with_stored_token: bool,
) -> Result<CredentialContext> {
    let profile = &active.profile;
    let base_url = profile
        .base_url()
        .with_context(|| format!("Profile '{}' is incomplete", active.name))?;

    match profile.auth {
        AuthMethod::OAuth => {
            let key_path = profile.private_key_path()?;
            let key = read_private_key(&key_path)
                .with_context(|| format!("Unable to load signing key {}", key_path.display()))?;

            let mut credentials = OAuthCredentials::new(profile.consumer_key()?, key);
            if let Some(secret) = &profile.consumer_secret {
                credentials = credentials.with_consumer_secret(secret.clone());
            }
            if with_stored_token {
                if let Some(stored) = store.load(&active.name)? {
                    credentials = credentials
                        .with_access_token(AccessToken::new(stored.token, stored.token_secret));
                }
            }
            Ok(CredentialContext::oauth(base_url, credentials)?)
        }
        AuthMethod::Basic => {
            let username = profile.username()?;
            let password = read_password(username)?;
            Ok(CredentialContext::basic(base_url, username, password)?)
        }
    }
}

fn read_password(username: &str) -> Result<String> {
    if let Some(password) = std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|p| !p.is_empty())
    {
        return Ok(password);
    }

    let password = rpassword::prompt_password(format!("Password for {username}: "))
        .context("Failed to read password from prompt")?;
    if password.is_empty() {
        return Err(anyhow!("Password cannot be empty"));
    }
    Ok(password)
}
