// This is the entry point of the article generator.
//
// **Architecture Overview:**
// - `core/` = Business logic (pipeline, credential handling, prompt, config)
// - `infra/` = Implementations of core traits (Google APIs, OpenAI, token files)
//
// This file's job is to:
// 1. Load configuration
// 2. Stop right away when there is no destination folder
// 3. Initialize services (dependency injection)
// 4. Run the pipeline once over the spreadsheet and report what happened

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pile of mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::sync::Arc;

use anyhow::Context;
use reqwest::Client;
use tracing_subscriber::EnvFilter;

use crate::core::ai::ArticleGenerator;
use crate::core::articles::{ArticlePipeline, PipelineError, RunReport};
use crate::core::auth::{AccessTokenSource, CredentialProvider};
use crate::core::config::{AppConfig, ServiceAccountSource};
use crate::infra::ai::OpenAiClient;
use crate::infra::auth::JsonTokenStore;
use crate::infra::google::{
    GoogleDriveClient, GoogleOAuthClient, GoogleSheetsClient, ServiceAccountAuth,
};
use crate::infra::http::build_http_client;

/// Picks the credential source: a service account when one is configured,
/// otherwise the installed-app OAuth flow backed by the token file.
async fn build_token_source(
    config: &AppConfig,
    http: &Client,
) -> anyhow::Result<Arc<dyn AccessTokenSource>> {
    let scopes = AppConfig::google_scopes();

    if let Some(source) = &config.service_account {
        let auth = match source {
            ServiceAccountSource::KeyFile(path) => {
                ServiceAccountAuth::from_file(path, scopes, http.clone())
                    .await
                    .with_context(|| format!("failed to load service account key {:?}", path))?
            }
            ServiceAccountSource::Json(json) => {
                ServiceAccountAuth::from_json(json, scopes, http.clone())
                    .context("failed to parse GOOGLE_SERVICE_ACCOUNT_JSON")?
            }
        };
        tracing::info!("Using service account credentials");
        return Ok(Arc::new(auth));
    }

    // The client secret is only read if a refresh or a consent is needed.
    let oauth = GoogleOAuthClient::new(&config.client_secret_file, http.clone(), config.oauth_ports);
    let store = JsonTokenStore::new(&config.token_file);
    tracing::debug!("Token cache at {:?}", store.path());

    let mut provider = CredentialProvider::new(store, Box::new(oauth.clone()), scopes);
    if config.interactive_auth {
        provider = provider.with_authorizer(Box::new(oauth));
    } else {
        tracing::info!("Interactive authorization disabled; a cached token is required");
    }

    Ok(Arc::new(provider))
}

/// Wires the services from `config` and runs the pipeline once.
///
/// Without a destination folder nothing is built: no credential file, key
/// file or API is touched.
async fn run(config: &AppConfig) -> anyhow::Result<RunReport> {
    if config.drive_folder_id.is_none() {
        return Err(PipelineError::MissingFolder.into());
    }

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let http = build_http_client(config.http_timeout).context("failed to build HTTP client")?;
    let tokens = build_token_source(config, &http).await?;

    let sheets = GoogleSheetsClient::new(
        http.clone(),
        Arc::clone(&tokens),
        config.spreadsheet_id.clone(),
        config.sheet_range.clone(),
    );
    let drive = GoogleDriveClient::new(http.clone(), tokens);

    let ai_client = OpenAiClient::new(
        http,
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
    );
    let generator = ArticleGenerator::new(ai_client, config.ai.clone());

    let pipeline = ArticlePipeline::new(sheets, generator, drive, config.drive_folder_id.clone());
    Ok(pipeline.run().await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting article generator...");

    let config = AppConfig::from_env().context("invalid configuration")?;

    // Everything past configuration is reported, not turned into a failing
    // exit status.
    match run(&config).await {
        Ok(report) => tracing::info!(
            rows = report.rows_read,
            skipped = report.rows_skipped,
            generated = report.articles_generated,
            published = report.documents_published,
            generation_failures = report.generation_failures,
            publish_failures = report.publish_failures,
            "Finished"
        ),
        Err(e) => match e.downcast_ref::<PipelineError>() {
            Some(PipelineError::MissingFolder | PipelineError::NoRows) => tracing::warn!("{}", e),
            _ => tracing::error!("{:#}", e),
        },
    }

    Ok(())
}
