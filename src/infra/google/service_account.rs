// =============================================================================
// SERVICE ACCOUNT AUTHENTICATION
// =============================================================================
//
// Headless alternative to the installed-app OAuth flow. A signed JWT is
// exchanged for an access token; no browser, no token file.
//
// **Setup:**
// 1. Create a service account in Google Cloud Console and download a JSON key.
// 2. Enable the Google Sheets API and the Google Drive API for the project.
// 3. Share the spreadsheet (Viewer) and the destination folder (Editor) with
//    the service account email (name@project.iam.gserviceaccount.com).
//
// **Environment Variables:**
// - `GOOGLE_SERVICE_ACCOUNT_KEY` - Path to the JSON key file
// - `GOOGLE_SERVICE_ACCOUNT_JSON` - The JSON content directly (for deployment)

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use crate::core::auth::{AccessTokenSource, AuthError};

/// Service account credentials from the JSON key file.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    /// The service account email (used as issuer in JWT).
    client_email: String,

    /// The private key in PEM format.
    private_key: String,

    /// Where to exchange the JWT for an access token.
    token_uri: String,
}

/// JWT claims for Google OAuth2.
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    /// Space-separated scopes.
    scope: String,
    aud: String,
    iat: u64,
    /// At most one hour after `iat`.
    exp: u64,
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Cached access token with expiration.
struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

pub struct ServiceAccountAuth {
    credentials: ServiceAccountCredentials,
    scopes: Vec<String>,
    client: Client,
    cached_token: RwLock<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Creates a new authenticator from a JSON key file path.
    pub async fn from_file(
        path: impl AsRef<Path>,
        scopes: Vec<String>,
        client: Client,
    ) -> Result<Self, AuthError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json(&content, scopes, client)
    }

    /// Creates a new authenticator from JSON content.
    pub fn from_json(json: &str, scopes: Vec<String>, client: Client) -> Result<Self, AuthError> {
        let credentials: ServiceAccountCredentials = serde_json::from_str(json)?;
        Ok(Self {
            credentials,
            scopes,
            client,
            cached_token: RwLock::new(None),
        })
    }

    fn claims(&self, now: u64) -> JwtClaims {
        JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: self.scopes.join(" "),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        }
    }

    /// Fetches a new access token from Google.
    async fn fetch_new_token(&self) -> Result<(String, Duration), AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AuthError::ServiceAccount(e.to_string()))?
            .as_secs();

        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| AuthError::ServiceAccount(format!("invalid private key: {}", e)))?;
        let jwt = encode(&Header::new(Algorithm::RS256), &self.claims(now), &key)
            .map_err(|e| AuthError::ServiceAccount(format!("failed to sign JWT: {}", e)))?;

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::ServiceAccount(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::ServiceAccount(format!(
                "Token exchange failed ({}): {}",
                status, text
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ServiceAccount(e.to_string()))?;

        // Renew a few minutes early.
        let lifetime = token_response.expires_in.unwrap_or(3600).saturating_sub(300);
        Ok((token_response.access_token, Duration::from_secs(lifetime)))
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String, AuthError> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > SystemTime::now() {
                    return Ok(token.token.clone());
                }
            }
        }

        let (token, lifetime) = self.fetch_new_token().await?;
        tracing::debug!("Obtained service account token for {}", self.credentials.client_email);

        *self.cached_token.write().await = Some(CachedToken {
            token: token.clone(),
            expires_at: SystemTime::now() + lifetime,
        });

        Ok(token)
    }
}
