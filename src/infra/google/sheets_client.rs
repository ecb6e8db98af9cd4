use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::core::articles::{SheetError, SheetRow, SheetSource};
use crate::core::auth::AccessTokenSource;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Reads one fixed range of one spreadsheet through the Sheets v4 API.
pub struct GoogleSheetsClient {
    client: Client,
    tokens: Arc<dyn AccessTokenSource>,
    base_url: String,
    /// Unset ids are reported on read, like any other read failure.
    spreadsheet_id: Option<String>,
    range: String,
}

/// `spreadsheets.values.get` response. `values` is omitted for an empty range.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl GoogleSheetsClient {
    pub fn new(
        client: Client,
        tokens: Arc<dyn AccessTokenSource>,
        spreadsheet_id: Option<String>,
        range: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tokens,
            base_url: SHEETS_API_BASE.to_string(),
            spreadsheet_id,
            range: range.into(),
        }
    }

    /// Points reads at another host (a local stub in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn values_url(&self, spreadsheet_id: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url,
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(&self.range)
        )
    }

    fn into_rows(range: ValueRange) -> Vec<SheetRow> {
        range
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect()
    }
}

fn cell_to_string(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsClient {
    async fn read_rows(&self) -> Result<Vec<SheetRow>, SheetError> {
        let spreadsheet_id = self
            .spreadsheet_id
            .as_deref()
            .ok_or(SheetError::MissingSpreadsheetId)?;
        let token = self.tokens.access_token().await?;

        tracing::debug!("Reading range {} of spreadsheet {}", self.range, spreadsheet_id);

        let response = self
            .client
            .get(self.values_url(spreadsheet_id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SheetError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SheetError::Api { status, body });
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| SheetError::Request(format!("invalid Sheets response: {}", e)))?;

        Ok(Self::into_rows(range))
    }
}
