// The article pipeline is the whole program in one loop:
// read rows -> for each row draft an article -> publish it as a document.
//
// Every step goes through a trait (see article_ports.rs) so the control flow
// can be tested without a network. A failure on one row is logged and the
// loop moves on; only a missing folder or an empty/failed read stops the run.

use thiserror::Error;

use super::article_models::{document_name, Row};
use super::article_ports::{ArticleWriter, DocumentSink, SheetError, SheetSource};

/// Reasons the pipeline stops before processing any row.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No destination folder configured (set DRIVE_FOLDER_ID)")]
    MissingFolder,

    #[error("Failed to read the spreadsheet: {0}")]
    Read(#[from] SheetError),

    #[error("No rows found to process")]
    NoRows,
}

/// Counters for a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub rows_read: usize,
    /// Rows with fewer than three cells.
    pub rows_skipped: usize,
    pub articles_generated: usize,
    pub documents_published: usize,
    pub generation_failures: usize,
    pub publish_failures: usize,
}

pub struct ArticlePipeline<S: SheetSource, W: ArticleWriter, D: DocumentSink> {
    source: S,
    writer: W,
    sink: D,
    folder_id: Option<String>,
}

impl<S: SheetSource, W: ArticleWriter, D: DocumentSink> ArticlePipeline<S, W, D> {
    pub fn new(source: S, writer: W, sink: D, folder_id: Option<String>) -> Self {
        Self {
            source,
            writer,
            sink,
            folder_id,
        }
    }

    /// Processes every row once, in sheet order.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let folder_id = self
            .folder_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(PipelineError::MissingFolder)?;

        let rows = self.source.read_rows().await?;
        if rows.is_empty() {
            return Err(PipelineError::NoRows);
        }

        tracing::info!("Read {} row(s) from the spreadsheet", rows.len());

        let mut report = RunReport {
            rows_read: rows.len(),
            ..Default::default()
        };

        for (index, cells) in rows.iter().enumerate() {
            // Short rows are dropped without a generator or publisher call.
            let Some(row) = Row::from_cells(cells) else {
                tracing::debug!(
                    row = index + 1,
                    cells = cells.len(),
                    "Skipping row with fewer than 3 cells"
                );
                report.rows_skipped += 1;
                continue;
            };

            tracing::info!(
                day = %row.day,
                topic = %row.topic,
                audience = %row.audience,
                "Processing article"
            );

            let article = match self.writer.write_article(&row.topic, &row.audience).await {
                Ok(article) => {
                    report.articles_generated += 1;
                    article
                }
                Err(e) => {
                    tracing::error!("Could not generate the article for '{}': {}", row.topic, e);
                    report.generation_failures += 1;
                    continue;
                }
            };

            let name = document_name(&row.day, &row.topic);
            match self.sink.publish(folder_id, &name, article.as_str()).await {
                Ok(document) => {
                    tracing::info!(
                        id = %document.id,
                        link = document.link.as_deref().unwrap_or("-"),
                        "Saved '{}' to Drive",
                        name
                    );
                    report.documents_published += 1;
                }
                Err(e) => {
                    tracing::error!("Could not save '{}' to Drive: {}", name, e);
                    report.publish_failures += 1;
                }
            }
        }

        Ok(report)
    }
}

// ============================================================================
// TESTS
// ============================================================================
