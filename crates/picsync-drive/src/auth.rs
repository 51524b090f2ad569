//! OAuth2 PKCE authentication flow for the Google Drive API
//!
//! Implements the installed-application Authorization Code flow with PKCE
//! (RFC 7636) against Google's identity platform, with offline access so a
//! refresh token is issued.
//!
//! ## Components
//!
//! - [`ClientCredentials`] - OAuth client id/secret from config or `client_secret.json`
//! - [`OAuth2Config`] - Configuration for the OAuth2 flow
//! - [`KeyringTokenStorage`] - Secure token storage using the system keyring
//! - [`PKCEFlow`] - OAuth2 PKCE challenge/exchange logic
//! - [`LocalCallbackServer`] - Minimal HTTP server for the OAuth redirect
//! - [`GoogleAuthAdapter`] - Orchestrates the full interactive login
//! - [`AuthSession`] - Keeps a daemon's access token fresh
//! - [`connect`] - Builds an authenticated [`DriveRemoteStore`] from stored tokens

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Duration, Utc};
use oauth2::{
    basic::{BasicClient, BasicErrorResponseType}, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken,
    RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use picsync_core::config::{expand_tilde, AuthConfig};
use picsync_core::ports::{RemoteError, Tokens};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::client::DriveClient;
use crate::provider::DriveRemoteStore;

/// Google OAuth2 authorization endpoint
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth2 token endpoint
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Path the local callback server answers on
const CALLBACK_PATH: &str = "/callback";

/// Keyring service name for storing tokens
const KEYRING_SERVICE: &str = "picsync";

/// Full Drive scope; reparenting requires write access
const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/drive"];

/// Access tokens expiring within this margin are refreshed before use
pub const REFRESH_MARGIN_MINUTES: i64 = 5;

// ============================================================================
// ClientCredentials
// ============================================================================

/// OAuth client registration used to talk to Google
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Option<String>,
}

/// `client_secret.json` as downloaded from the Google Cloud console
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretEntry>,
    web: Option<ClientSecretEntry>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretEntry {
    client_id: String,
    client_secret: Option<String>,
}

impl ClientCredentials {
    /// Resolves credentials from the `auth` config section
    ///
    /// An explicit `client_id` wins over `client_secret_file`.
    pub fn resolve(auth: &AuthConfig) -> Result<Self> {
        if let Some(client_id) = &auth.client_id {
            return Ok(Self {
                client_id: client_id.clone(),
                client_secret: auth.client_secret.clone(),
            });
        }
        if let Some(path) = &auth.client_secret_file {
            return Self::from_client_secret_file(&expand_tilde(path));
        }
        bail!("No OAuth client configured: set auth.client_id or auth.client_secret_file")
    }

    /// Reads a Google `client_secret.json` file (`installed` or `web` app)
    pub fn from_client_secret_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read client secret file {}", path.display()))?;
        Self::from_client_secret_json(&content)
            .with_context(|| format!("Invalid client secret file {}", path.display()))
    }

    fn from_client_secret_json(content: &str) -> Result<Self> {
        let file: ClientSecretFile =
            serde_json::from_str(content).context("Failed to parse client secret JSON")?;
        let entry = file
            .installed
            .or(file.web)
            .ok_or_else(|| anyhow!("Expected an \"installed\" or \"web\" client entry"))?;
        Ok(Self {
            client_id: entry.client_id,
            client_secret: entry.client_secret,
        })
    }
}

// ============================================================================
// OAuth2Config
// ============================================================================

/// Configuration for the OAuth2 PKCE authentication flow
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret (Google requires it at the token endpoint even with PKCE)
    pub client_secret: Option<String>,
    /// Redirect URI for receiving the authorization code
    pub redirect_uri: String,
    /// Port the local callback server binds to
    pub callback_port: u16,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
}

impl OAuth2Config {
    /// Creates a new OAuth2Config with the given client id and default settings
    pub fn new(client_id: impl Into<String>) -> Self {
        let port = AuthConfig::default().callback_port;
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: redirect_uri_for(port),
            callback_port: port,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Creates a config from resolved credentials and the callback port
    pub fn from_credentials(credentials: &ClientCredentials, callback_port: u16) -> Self {
        let mut config = Self::new(credentials.client_id.clone()).with_callback_port(callback_port);
        config.client_secret = credentials.client_secret.clone();
        config
    }

    /// Sets the client secret
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Creates a config with custom scopes
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Moves the callback server to `port` and updates the redirect URI to match
    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self.redirect_uri = redirect_uri_for(port);
        self
    }
}

fn redirect_uri_for(port: u16) -> String {
    format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH)
}

// ============================================================================
// KeyringTokenStorage
// ============================================================================

/// Stores and retrieves OAuth tokens from the system keyring
///
/// Tokens are serialized as JSON with the service name "picsync" and the
/// OAuth client id as the username.
pub struct KeyringTokenStorage;

impl KeyringTokenStorage {
    /// Stores tokens in the system keyring for the given client
    pub fn store(username: &str, tokens: &Tokens) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        let json = serde_json::to_string(tokens).context("Failed to serialize tokens")?;

        entry
            .set_password(&json)
            .context("Failed to store tokens in keyring")?;

        debug!(username, "Stored tokens in keyring");
        Ok(())
    }

    /// Loads tokens from the system keyring for the given client
    ///
    /// # Returns
    /// `Some(Tokens)` if found and valid, `None` if not found
    pub fn load(username: &str) -> Result<Option<Tokens>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(json) => {
                let tokens: Tokens = serde_json::from_str(&json)
                    .context("Failed to deserialize tokens from keyring")?;
                debug!(username, "Loaded tokens from keyring");
                Ok(Some(tokens))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(username, "No tokens found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    /// Removes tokens from the system keyring for the given client
    pub fn clear(username: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        match entry.delete_credential() {
            Ok(()) => {
                info!(username, "Cleared tokens from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!(username, "No tokens to clear");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

// ============================================================================
// PKCEFlow
// ============================================================================

/// OAuth2 PKCE flow implementation using the `oauth2` crate
pub struct PKCEFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    scopes: Vec<String>,
}

impl PKCEFlow {
    /// Creates a new PKCEFlow with the given configuration
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_auth_uri(AuthUrl::new(AUTH_URL.to_string()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(TOKEN_URL.to_string()).context("Invalid token URL")?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri.clone()).context("Invalid redirect URI")?,
            );

        if let Some(secret) = &config.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        Ok(Self {
            client,
            scopes: config.scopes.clone(),
        })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// Requests offline access and forces the consent screen so Google
    /// issues a refresh token on every login.
    ///
    /// # Returns
    /// A tuple of `(authorization_url, csrf_token, pkce_verifier)`.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = self.client.authorize_url(CsrfToken::new_random);

        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for OAuth tokens
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<Tokens> {
        info!("Exchanging authorization code for tokens");

        let http_client = reqwest::Client::new();
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client)
            .await
            .context("Failed to exchange authorization code")?;

        let tokens = Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result.refresh_token().map(|t| t.secret().to_string()),
            expires_at: expiry_from(token_result.expires_in()),
        };

        if tokens.refresh_token.is_none() {
            warn!("Authorization server did not issue a refresh token");
        }
        info!("Successfully obtained OAuth tokens");
        Ok(tokens)
    }

    /// Refreshes an access token using a refresh token
    ///
    /// Google usually omits the refresh token from refresh responses; the
    /// previous one is kept in that case.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens> {
        info!("Refreshing access token");

        let http_client = reqwest::Client::new();
        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&http_client)
            .await
            .map_err(|e| match &e {
                RequestTokenError::ServerResponse(response)
                    if matches!(response.error(), BasicErrorResponseType::InvalidGrant) =>
                {
                    anyhow::Error::new(RemoteError::Unauthorized(format!(
                        "refresh token was rejected ({e}); run `picsync auth login`"
                    )))
                }
                _ => anyhow::Error::new(e).context("Failed to refresh token"),
            })?;

        let tokens = Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at: expiry_from(token_result.expires_in()),
        };

        info!("Successfully refreshed access token");
        Ok(tokens)
    }
}

/// Absolute expiry from a relative lifetime (one hour when absent)
fn expiry_from(expires_in: Option<std::time::Duration>) -> chrono::DateTime<Utc> {
    expires_in
        .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
        .unwrap_or_else(|| Utc::now() + Duration::hours(1))
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// Minimal HTTP server that listens on localhost for the OAuth2 redirect callback.
///
/// Serves connections until one of them carries the authorization code (or
/// an authorization error), then responds with an HTML page and stops.
pub struct LocalCallbackServer;

/// Parameters extracted from the OAuth2 callback
#[derive(Debug, PartialEq, Eq)]
pub enum CallbackParams {
    /// The user granted access
    Code {
        /// The authorization code
        code: String,
        /// The CSRF state parameter
        state: String,
    },
    /// The authorization server reported an error (e.g. `access_denied`)
    Denied(String),
}

impl LocalCallbackServer {
    /// Starts the local callback server and waits for the OAuth redirect
    pub async fn start(port: u16) -> Result<CallbackParams> {
        use http_body_util::Full;
        use hyper::body::Bytes;
        use hyper::header::{HeaderValue, CONTENT_TYPE};
        use hyper::server::conn::http1;
        use hyper::service::service_fn;
        use hyper::{Request, Response, StatusCode};
        use hyper_util::rt::TokioIo;
        use std::sync::Arc;
        use tokio::net::TcpListener;
        use tokio::sync::{oneshot, Mutex};

        fn html_response(status: StatusCode, html: String) -> Response<Full<Bytes>> {
            let mut response = Response::new(Full::new(Bytes::from(html)));
            *response.status_mut() = status;
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
            response
        }

        let addr = format!("127.0.0.1:{}", port);
        info!(%addr, "Starting local OAuth callback server");

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind callback server to {}", addr))?;

        let (tx, mut rx) = oneshot::channel::<CallbackParams>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        loop {
            tokio::select! {
                received = &mut rx => {
                    let params = received
                        .context("Callback server channel closed without receiving parameters")?;
                    info!("Received OAuth callback");
                    return Ok(params);
                }
                accepted = listener.accept() => {
                    let (stream, _peer) = accepted
                        .context("Failed to accept connection on callback server")?;
                    let io = TokioIo::new(stream);
                    let tx = tx.clone();

                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let tx = tx.clone();
                        async move {
                            let uri = req.uri().to_string();
                            debug!(%uri, "Callback server received request");

                            let response = match parse_callback_params(&uri) {
                                Some(params) => {
                                    let page = match &params {
                                        CallbackParams::Code { .. } => {
                                            html_response(StatusCode::OK, success_html())
                                        }
                                        CallbackParams::Denied(reason) => html_response(
                                            StatusCode::BAD_REQUEST,
                                            error_html(reason),
                                        ),
                                    };
                                    if let Some(sender) = tx.lock().await.take() {
                                        let _ = sender.send(params);
                                    }
                                    page
                                }
                                None => html_response(
                                    StatusCode::NOT_FOUND,
                                    error_html("Missing authorization code in callback"),
                                ),
                            };
                            Ok::<_, hyper::Error>(response)
                        }
                    });

                    tokio::spawn(async move {
                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            warn!(error = %e, "Callback server connection error");
                        }
                    });
                }
            }
        }
    }
}

/// Parses the authorization result from a callback URI
///
/// Returns `None` for requests that are not the OAuth redirect (wrong path,
/// or neither `code` nor `error` present).
fn parse_callback_params(uri: &str) -> Option<CallbackParams> {
    let url = url::Url::parse(&format!("http://localhost{}", uri)).ok()?;
    if url.path() != CALLBACK_PATH {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            "error" => error = Some(value.to_string()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(CallbackParams::Denied(error));
    }

    Some(CallbackParams::Code {
        code: code?,
        state: state.unwrap_or_default(),
    })
}

/// Returns the HTML for a successful authentication page
fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>picsync - Authentication Successful</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authentication Successful</h1>
    <p>picsync can now access your Google Drive.</p>
    <p>You can close this window and return to the terminal.</p>
</body>
</html>"#
        .to_string()
}

/// Returns the HTML for an authentication error page
fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>picsync - Authentication Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authentication Error</h1>
    <p>{}</p>
    <p>Please close this window and run <code>picsync auth login</code> again.</p>
</body>
</html>"#,
        message
    )
}

// ============================================================================
// GoogleAuthAdapter
// ============================================================================

/// High-level adapter that orchestrates the interactive OAuth2 PKCE login
///
/// 1. Generates the PKCE authorization URL
/// 2. Opens the user's browser to the Google consent page
/// 3. Waits on the local callback server for the redirect
/// 4. Checks the CSRF state and exchanges the code for tokens
pub struct GoogleAuthAdapter {
    config: OAuth2Config,
}

impl GoogleAuthAdapter {
    pub fn new(config: OAuth2Config) -> Self {
        Self { config }
    }

    /// Performs the full interactive login
    pub async fn login(&self) -> Result<Tokens> {
        info!("Starting OAuth2 PKCE login flow");

        let flow = PKCEFlow::new(&self.config)?;
        let (auth_url, csrf_token, pkce_verifier) = flow.generate_auth_url();

        info!("Opening browser for authentication");
        if let Err(e) = webbrowser::open(&auth_url) {
            warn!(error = %e, "Failed to open browser");
            eprintln!("Open this URL in your browser to continue:\n{}", auth_url);
        }

        match LocalCallbackServer::start(self.config.callback_port).await? {
            CallbackParams::Denied(reason) => bail!("Authorization was denied: {}", reason),
            CallbackParams::Code { code, state } => {
                if state != *csrf_token.secret() {
                    bail!("OAuth callback state does not match the request");
                }
                let tokens = flow.exchange_code(code, pkce_verifier).await?;
                info!("OAuth2 PKCE login completed successfully");
                Ok(tokens)
            }
        }
    }

    /// Refreshes an access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        let flow = PKCEFlow::new(&self.config)?;
        flow.refresh_token(refresh_token).await
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }
}

// ============================================================================
// AuthSession
// ============================================================================

/// Tokens of a running process plus what is needed to renew them
pub struct AuthSession {
    adapter: GoogleAuthAdapter,
    username: String,
    tokens: Tokens,
}

impl AuthSession {
    pub fn new(adapter: GoogleAuthAdapter, username: impl Into<String>, tokens: Tokens) -> Self {
        Self {
            adapter,
            username: username.into(),
            tokens,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }

    pub fn tokens(&self) -> &Tokens {
        &self.tokens
    }

    /// Refreshes the tokens when they expire within [`REFRESH_MARGIN_MINUTES`]
    ///
    /// Refreshed tokens are written back to the keyring; a keyring failure
    /// is logged and does not fail the refresh.
    ///
    /// # Returns
    /// The new access token if a refresh happened, `None` otherwise
    pub async fn refresh_if_needed(&mut self) -> Result<Option<String>> {
        if !self
            .tokens
            .expires_within(Duration::minutes(REFRESH_MARGIN_MINUTES))
        {
            return Ok(None);
        }

        let refresh_token = self.tokens.refresh_token.clone().ok_or_else(|| {
            RemoteError::Unauthorized(
                "access token expired and no refresh token is stored; run `picsync auth login`"
                    .to_string(),
            )
        })?;

        let tokens = self.adapter.refresh(&refresh_token).await?;
        if let Err(e) = KeyringTokenStorage::store(&self.username, &tokens) {
            warn!(error = %e, "Failed to persist refreshed tokens");
        }
        self.tokens = tokens;
        Ok(Some(self.tokens.access_token.clone()))
    }
}

// ============================================================================
// connect
// ============================================================================

/// Builds an authenticated Drive store from the tokens stored by `picsync auth login`
///
/// Tokens that are expired or about to expire are refreshed first. The
/// returned store keeps refreshing them before requests for as long as it
/// lives.
pub async fn connect(auth: &AuthConfig) -> Result<DriveRemoteStore> {
    let credentials = ClientCredentials::resolve(auth)?;

    let tokens = KeyringTokenStorage::load(&credentials.client_id)?.ok_or_else(|| {
        anyhow!(
            "No stored tokens for client {}; run `picsync auth login` first",
            credentials.client_id
        )
    })?;

    let adapter = GoogleAuthAdapter::new(OAuth2Config::from_credentials(
        &credentials,
        auth.callback_port,
    ));
    let mut session = AuthSession::new(adapter, credentials.client_id.clone(), tokens);
    session.refresh_if_needed().await?;

    info!(client_id = %credentials.client_id, "Connected to Google Drive");
    let client = DriveClient::new(session.access_token());
    Ok(DriveRemoteStore::with_session(client, session))
}
