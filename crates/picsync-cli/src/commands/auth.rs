//! Auth commands - Login, Logout, and Status for Google Drive
//!
//! Tokens live in the system keyring under the OAuth client id, which is
//! where the daemon and `picsync sync` look them up.
//!
//! 1. `login`  - Runs the OAuth2 PKCE flow and stores the tokens.
//! 2. `logout` - Removes the stored tokens.
//! 3. `status` - Reports whether usable tokens are present.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use picsync_core::ports::Tokens;
use picsync_drive::auth::{ClientCredentials, GoogleAuthAdapter, KeyringTokenStorage, OAuth2Config};
use tracing::info;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Authenticate with Google Drive via OAuth2
    Login,
    /// Remove stored credentials
    Logout,
    /// Check authentication status
    Status,
}

/// Health of the tokens stored for a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Valid,
    Expired,
    NotFound,
}

impl TokenStatus {
    pub fn of(tokens: Option<&Tokens>) -> Self {
        match tokens {
            Some(tokens) if tokens.is_expired() && tokens.refresh_token.is_none() => {
                TokenStatus::Expired
            }
            Some(_) => TokenStatus::Valid,
            None => TokenStatus::NotFound,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TokenStatus::Valid => "Valid",
            TokenStatus::Expired => "Expired",
            TokenStatus::NotFound => "Not found",
        }
    }
}

impl AuthCommand {
    pub async fn execute(&self, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);
        let config = super::load_config(config_path)?;
        let credentials = ClientCredentials::resolve(&config.auth)
            .context("No OAuth client configured. Set auth.client_id or auth.client_secret_file")?;

        match self {
            AuthCommand::Login => {
                Self::execute_login(&credentials, config.auth.callback_port, &*fmt, format).await
            }
            AuthCommand::Logout => Self::execute_logout(&credentials, &*fmt),
            AuthCommand::Status => Self::execute_status(&credentials, &*fmt, format),
        }
    }

    async fn execute_login(
        credentials: &ClientCredentials,
        callback_port: u16,
        fmt: &dyn OutputFormatter,
        format: OutputFormat,
    ) -> Result<()> {
        info!(client_id = %credentials.client_id, "Starting OAuth2 login");

        fmt.info("Opening browser for Google login...");
        let adapter = GoogleAuthAdapter::new(OAuth2Config::from_credentials(credentials, callback_port));
        let tokens = adapter.login().await.context("OAuth2 login failed")?;

        KeyringTokenStorage::store(&credentials.client_id, &tokens)
            .context("Failed to store tokens in keyring")?;

        if format.is_json() {
            fmt.print_json(&serde_json::json!({
                "success": true,
                "client_id": credentials.client_id,
                "expires_at": tokens.expires_at.to_rfc3339(),
                "offline_access": tokens.refresh_token.is_some(),
            }));
        } else {
            fmt.success("Logged in to Google Drive");
            if tokens.refresh_token.is_none() {
                fmt.warn("No refresh token was granted; you will need to log in again when the access token expires");
            }
        }
        Ok(())
    }

    fn execute_logout(credentials: &ClientCredentials, fmt: &dyn OutputFormatter) -> Result<()> {
        KeyringTokenStorage::clear(&credentials.client_id)
            .context("Failed to clear tokens from keyring")?;
        info!(client_id = %credentials.client_id, "Tokens removed");
        fmt.success("Logged out. Stored tokens were removed");
        Ok(())
    }

    fn execute_status(
        credentials: &ClientCredentials,
        fmt: &dyn OutputFormatter,
        format: OutputFormat,
    ) -> Result<()> {
        let tokens = KeyringTokenStorage::load(&credentials.client_id)
            .context("Failed to read keyring")?;
        let status = TokenStatus::of(tokens.as_ref());
        let expires_at = tokens.as_ref().map(|t| t.expires_at);

        if format.is_json() {
            fmt.print_json(&serde_json::json!({
                "authenticated": status == TokenStatus::Valid,
                "client_id": credentials.client_id,
                "token_status": status.label(),
                "expires_at": expires_at.map(|t| t.to_rfc3339()),
            }));
            return Ok(());
        }

        match status {
            TokenStatus::Valid => fmt.success("Authenticated with Google Drive"),
            TokenStatus::Expired | TokenStatus::NotFound => {
                fmt.warn("Not authenticated. Run 'picsync auth login'");
            }
        }
        fmt.info(&format!("Client ID:     {}", credentials.client_id));
        fmt.info(&format!("Token status:  {}", status.label()));
        if let Some(expires_at) = expires_at {
            fmt.info(&format!(
                "Access token:  expires {}",
                expires_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        Ok(())
    }
}
