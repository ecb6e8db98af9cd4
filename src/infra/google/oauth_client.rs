//! Installed-app OAuth 2.0 for Google.
//!
//! Two capabilities live here, wired separately by main:
//!
//! - [`TokenRefresher`]: exchange a refresh token for a new access token.
//! - [`InteractiveAuthorizer`]: the first-run consent flow. Authorization code
//!   with PKCE, redirected to a loopback listener on `127.0.0.1`:
//!   1. generate a code verifier, its S256 challenge and a random state
//!   2. bind the first free port in the configured range
//!   3. open the browser on Google's consent page (the URL is logged too)
//!   4. wait for the redirect carrying `code` and `state`
//!   5. exchange the code and verifier for tokens
//!
//! The client secret file is read on first use, so a run that never needs to
//! refresh or authorize never touches it.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;

use super::client_secret::OAuthCredentials;
use crate::core::auth::{AuthError, InteractiveAuthorizer, RefreshedToken, Token, TokenRefresher};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Bytes of entropy in the PKCE verifier, before base64.
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long to wait for the browser redirect.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Pause between accept attempts while waiting for the redirect.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for reading one request from an accepted connection.
const CALLBACK_READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct GoogleOAuthClient {
    client_secret_file: PathBuf,
    /// Shared between clones so the file is read once per run.
    credentials: Arc<OnceCell<OAuthCredentials>>,
    client: Client,
    port_range: (u16, u16),
    token_url: String,
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl GoogleOAuthClient {
    pub fn new(
        client_secret_file: impl Into<PathBuf>,
        client: Client,
        port_range: (u16, u16),
    ) -> Self {
        Self {
            client_secret_file: client_secret_file.into(),
            credentials: Arc::new(OnceCell::new()),
            client,
            port_range,
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Sends token requests to another endpoint (a local stub in tests).
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    async fn credentials(&self) -> Result<&OAuthCredentials, AuthError> {
        self.credentials
            .get_or_try_init(|| OAuthCredentials::from_file(&self.client_secret_file))
            .await
    }

    async fn post_token_form(&self, params: &[(&str, &str)]) -> Result<TokenResponse, String> {
        let response = self
            .client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| format!("token request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read token response: {}", e))?;

        if !status.is_success() {
            return Err(format!("token endpoint returned {}: {}", status, body));
        }

        serde_json::from_str(&body).map_err(|e| format!("invalid token response: {}", e))
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> Result<Token, AuthError> {
        let credentials = self.credentials().await?;
        let response = self
            .post_token_form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("code", code),
                ("code_verifier", verifier),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .await
            .map_err(AuthError::Authorization)?;

        Ok(Token::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes.to_vec(),
        ))
    }

    fn bind_loopback(port_range: (u16, u16)) -> Result<(TcpListener, u16), AuthError> {
        for port in port_range.0..=port_range.1 {
            if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
                tracing::debug!("OAuth callback listener on port {}", port);
                return Ok((listener, port));
            }
        }
        Err(AuthError::Authorization(format!(
            "no free port in range {}-{} for the OAuth callback",
            port_range.0, port_range.1
        )))
    }
}

#[async_trait]
impl TokenRefresher for GoogleOAuthClient {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, AuthError> {
        let credentials = self.credentials().await?;
        let response = self
            .post_token_form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await
            .map_err(AuthError::Refresh)?;

        Ok(RefreshedToken {
            access_token: response.access_token,
            expires_in: response.expires_in,
            refresh_token: response.refresh_token,
        })
    }
}

#[async_trait]
impl InteractiveAuthorizer for GoogleOAuthClient {
    async fn authorize(&self, scopes: &[String]) -> Result<Token, AuthError> {
        let client_id = self.credentials().await?.client_id.clone();
        let pkce = PkceFlow::new();

        let (listener, port) = Self::bind_loopback(self.port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);
        let auth_url = pkce.build_auth_url(&client_id, &redirect_uri, scopes);

        tracing::info!("Opening the browser for Google authorization...");
        tracing::info!("If it does not open, visit this URL: {}", auth_url);
        if let Err(e) = open::that(&auth_url) {
            tracing::warn!("Failed to open browser: {}", e);
        }

        // The listener is blocking; keep it off the async workers.
        let (code, state) =
            tokio::task::spawn_blocking(move || wait_for_callback(listener, CALLBACK_TIMEOUT))
                .await
                .map_err(|e| AuthError::Authorization(format!("callback listener failed: {}", e)))??;

        if state != pkce.state {
            return Err(AuthError::Authorization(
                "OAuth state mismatch in callback".to_string(),
            ));
        }

        tracing::info!("Received authorization code, exchanging for tokens...");
        self.exchange_code(&code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }
}

/// Accepts connections until one carries the OAuth redirect, or the
/// deadline passes. The listener is closed when this returns.
fn wait_for_callback(
    listener: TcpListener,
    timeout: Duration,
) -> Result<(String, String), AuthError> {
    listener.set_nonblocking(true)?;
    let deadline = Instant::now() + timeout;

    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                // Accepted sockets can inherit non-blocking mode.
                stream.set_nonblocking(false)?;
                stream.set_read_timeout(Some(CALLBACK_READ_TIMEOUT))?;
                if let Some(result) = handle_callback(stream) {
                    return result;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => tracing::error!("Failed to accept OAuth callback connection: {}", e),
        }

        if Instant::now() >= deadline {
            return Err(AuthError::Authorization(
                "timed out waiting for the OAuth callback".to_string(),
            ));
        }
        thread::sleep(ACCEPT_POLL_INTERVAL);
    }
}

/// Reads one request, answers the browser, and returns the parsed callback
/// (or `None` for unrelated requests such as `/favicon.ico`).
fn handle_callback(mut stream: TcpStream) -> Option<Result<(String, String), AuthError>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    let result = parse_callback_request(&request_line)?;

    let response = if result.is_ok() {
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n\
         <html><body><h1>Authorization complete</h1>\
         <p>You can close this window and return to the terminal.</p></body></html>"
    } else {
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n\
         <html><body><h1>Authorization failed</h1>\
         <p>Check the terminal for details.</p></body></html>"
    };
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();

    Some(result)
}

/// Parses `GET /callback?code=...&state=... HTTP/1.1`.
fn parse_callback_request(request_line: &str) -> Option<Result<(String, String), AuthError>> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }

    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != "/callback" {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;

    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(AuthError::Authorization(format!(
            "authorization denied: {}",
            error
        ))));
    }

    Some(match code {
        Some(code) => Ok((code, state.unwrap_or_default())),
        None => Err(AuthError::Authorization(
            "callback did not include an authorization code".to_string(),
        )),
    })
}

/// PKCE (RFC 7636) verifier, challenge and CSRF state for one authorization.
#[derive(Debug)]
struct PkceFlow {
    verifier: String,
    challenge: String,
    state: String,
}

impl PkceFlow {
    fn new() -> Self {
        let verifier = random_urlsafe(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_urlsafe(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
             code_challenge={}&code_challenge_method=S256&state={}&\
             access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

fn random_urlsafe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(&bytes)
}
