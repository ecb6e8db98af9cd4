use crate::core::auth::{AuthError, Token, TokenStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Token cache kept as a single JSON file, `token.json` in the working
/// directory by default.
pub struct JsonTokenStore {
    path: PathBuf,
}

impl JsonTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for JsonTokenStore {
    async fn load(&self) -> Result<Option<Token>, AuthError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No token file at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        // A corrupt cache is treated like a missing one so the caller re-authorizes.
        match serde_json::from_str(&content) {
            Ok(token) => {
                tracing::debug!("Loaded token from {:?}", self.path);
                Ok(Some(token))
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable token file {:?}: {}", self.path, e);
                Ok(None)
            }
        }
    }

    async fn save(&self, token: &Token) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Write to an owner-only temp file first, then rename over the real one.
        let content = serde_json::to_string_pretty(token)?;
        let temp_path = self.path.with_extension("json.tmp");

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&temp_path).await?;

        // `mode` only applies on creation; a stale temp file keeps its bits.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await?;
        }

        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.path).await?;

        tracing::debug!("Saved token to {:?}", self.path);
        Ok(())
    }
}
