use serde::Deserialize;
use std::path::Path;

use crate::core::auth::AuthError;

/// OAuth client id/secret for an installed (desktop) application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Layout of the client secret JSON downloaded from Google Cloud Console.
/// Older tools write the two fields at the top level instead.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AuthError::Authorization(format!(
                "could not read client secret file {:?}: {}",
                path, e
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let file: ClientSecretFile = serde_json::from_str(json)?;

        if let Some(nested) = file.installed.or(file.web) {
            return Ok(Self {
                client_id: nested.client_id,
                client_secret: nested.client_secret,
            });
        }

        match (file.client_id, file.client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(Self {
                client_id,
                client_secret,
            }),
            _ => Err(AuthError::Authorization(
                "client secret file needs an 'installed'/'web' section or top-level client_id/client_secret"
                    .to_string(),
            )),
        }
    }
}
