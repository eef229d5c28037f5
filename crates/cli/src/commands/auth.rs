use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use atlassian_connector_api::{HandshakeState, OAuthHandshake, Product, Session};
use atlassian_connector_auth::{StoredToken, TokenStore};
use atlassian_connector_config::AuthMethod;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::{build_session, credential_context, ActiveProfile};

#[derive(Subcommand, Debug, Clone)]
pub enum AuthCommand {
    /// Run the OAuth handshake and remember the access token
    Login(LoginArgs),
    /// Forget the stored access token
    Logout,
    /// Show the active profile and whether a token is stored
    Status,
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Verifier shown by the server after approval (prompted for when omitted)
    #[arg(long)]
    pub verifier: Option<String>,
    /// Start a new handshake even if a token is already stored
    #[arg(long)]
    pub force: bool,
}

pub async fn handle(command: AuthCommand, active: &ActiveProfile, store: &TokenStore) -> Result<()> {
    match command {
        AuthCommand::Login(args) => login(args, active, store).await,
        AuthCommand::Logout => logout(active, store),
        AuthCommand::Status => status(active, store),
    }
}

async fn login(args: LoginArgs, active: &ActiveProfile, store: &TokenStore) -> Result<()> {
    if active.profile.auth == AuthMethod::Basic {
        return verify_basic(active, store).await;
    }

    let context = credential_context(active, store, !args.force)?;
    let session = Arc::new(Session::with_timeouts(context, active.timeouts())?);
    let mut handshake =
        OAuthHandshake::new(session, active.product().oauth_endpoints()).await;

    if handshake.state() == HandshakeState::AccessTokenObtained {
        println!(
            "Profile '{}' already has an access token. Use --force to replace it.",
            active.name
        );
        return Ok(());
    }

    let request_token = handshake
        .request_token()
        .await
        .context("Failed to obtain a request token")?;
    let url = handshake.authorization_url(&request_token).await?;

    println!("Open this URL in a browser and approve access:\n\n  {url}\n");

    let verifier = match args.verifier {
        Some(verifier) => verifier,
        None => prompt("Verification code: ")?,
    };
    if verifier.is_empty() {
        return Err(anyhow!("Verification code cannot be empty"));
    }

    let access_token = handshake
        .exchange(&request_token, &verifier)
        .await
        .context("Failed to exchange the request token")?;

    store
        .save(
            &active.name,
            &StoredToken::new(access_token.token, access_token.token_secret),
        )
        .context("Failed to store access token")?;

    tracing::info!(profile = %active.name, "Access token stored");
    println!("Logged in. Access token stored for profile '{}'.", active.name);
    Ok(())
}

/// Basic profiles have no handshake; check the password against the server.
async fn verify_basic(active: &ActiveProfile, store: &TokenStore) -> Result<()> {
    let session = build_session(active, store)?;
    let product = active.product();
    let resource = match product {
        Product::Jira => "myself",
        Product::Confluence => "user/current",
    };

    let user: serde_json::Value = session
        .get(product.default_family(), resource)
        .await
        .context("Credential check failed")?;

    let name = user
        .get("displayName")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown user");
    println!("Authenticated as {name}. Passwords are not stored.");
    Ok(())
}

fn logout(active: &ActiveProfile, store: &TokenStore) -> Result<()> {
    let removed = store
        .delete(&active.name)
        .context("Failed to delete stored token")?;

    if removed {
        tracing::info!(profile = %active.name, "Access token removed");
        println!("Access token removed for profile '{}'.", active.name);
    } else {
        println!("No access token stored for profile '{}'.", active.name);
    }
    Ok(())
}

fn status(active: &ActiveProfile, store: &TokenStore) -> Result<()> {
    #[derive(Serialize)]
    struct Status<'a> {
        profile: &'a str,
        base_url: Option<&'a str>,
        product: String,
        auth: &'static str,
        has_token: bool,
    }

    let status = Status {
        profile: &active.name,
        base_url: active.profile.base_url.as_deref(),
        product: active.profile.product.to_string(),
        auth: match active.profile.auth {
            AuthMethod::OAuth => "oauth",
            AuthMethod::Basic => "basic",
        },
        has_token: store.load(&active.name)?.is_some(),
    };

    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}
