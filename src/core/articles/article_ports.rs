// Ports the article pipeline depends on.
// The infra layer provides the real implementations (Google Sheets, an
// OpenAI-compatible chat API, Google Drive); tests provide fakes.

use async_trait::async_trait;
use thiserror::Error;

use super::article_models::{Article, PublishedDocument, SheetRow};
use crate::core::auth::AuthError;

// ============================================================================
// ERRORS
// ============================================================================

/// Reading the spreadsheet failed.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("No spreadsheet configured (set SPREADSHEET_ID)")]
    MissingSpreadsheetId,

    #[error("Could not authenticate: {0}")]
    Auth(#[from] AuthError),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Sheets API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// Drafting an article failed.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Language model request failed: {0}")]
    Provider(String),

    #[error("Language model returned no content")]
    EmptyContent,
}

/// Uploading a document failed.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Could not authenticate: {0}")]
    Auth(#[from] AuthError),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Drive API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Drive did not return an upload session location")]
    MissingUploadSession,
}

// ============================================================================
// TRAITS
// ============================================================================

/// Where the rows come from.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Returns every row of the configured range, in sheet order.
    /// An empty range is `Ok(vec![])`, not an error.
    async fn read_rows(&self) -> Result<Vec<SheetRow>, SheetError>;
}

/// Drafts one article for a topic and audience.
#[async_trait]
pub trait ArticleWriter: Send + Sync {
    async fn write_article(&self, topic: &str, audience: &str)
        -> Result<Article, GenerationError>;
}

/// Stores a finished article as a document.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Creates a new document named `name` inside `folder_id` with `content`
    /// as its initial text.
    async fn publish(
        &self,
        folder_id: &str,
        name: &str,
        content: &str,
    ) -> Result<PublishedDocument, PublishError>;
}
