// Runtime configuration, read from the environment (a `.env` file is loaded
// by main before this runs). Parsing goes through a lookup function so the
// rules can be tested without touching the process environment.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::ai::AiConfig;

pub const DEFAULT_SHEET_RANGE: &str = "A2:C";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CLIENT_SECRET_FILE: &str = "credentials.json";
pub const DEFAULT_TOKEN_FILE: &str = "token.json";
pub const DEFAULT_OAUTH_PORTS: (u16, u16) = (8080, 8090);

/// Google scopes the program needs: read the sheet, create files in Drive.
pub const GOOGLE_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets.readonly",
    "https://www.googleapis.com/auth/drive.file",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing {0} environment variable")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Where a service-account key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceAccountSource {
    KeyFile(PathBuf),
    Json(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub ai: AiConfig,
    /// Checked when the sheet is read, after the folder check.
    pub spreadsheet_id: Option<String>,
    pub sheet_range: String,
    /// Checked before anything else runs: a missing folder is a no-op run.
    pub drive_folder_id: Option<String>,
    pub client_secret_file: PathBuf,
    pub token_file: PathBuf,
    pub service_account: Option<ServiceAccountSource>,
    /// Allow the browser consent flow when no usable token is cached.
    pub interactive_auth: bool,
    pub oauth_ports: (u16, u16),
    pub http_timeout: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let openai_api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let ai = AiConfig {
            model: get("OPENAI_MODEL").unwrap_or_else(|| AiConfig::default().model),
            temperature: parse_opt(get("OPENAI_TEMPERATURE"), "OPENAI_TEMPERATURE")?,
            max_tokens: parse_opt(get("OPENAI_MAX_TOKENS"), "OPENAI_MAX_TOKENS")?,
        };

        let service_account = match (
            get("GOOGLE_SERVICE_ACCOUNT_KEY"),
            get("GOOGLE_SERVICE_ACCOUNT_JSON"),
        ) {
            (Some(path), _) => Some(ServiceAccountSource::KeyFile(PathBuf::from(path))),
            (None, Some(json)) => Some(ServiceAccountSource::Json(json)),
            (None, None) => None,
        };

        let interactive_auth = match get("GOOGLE_INTERACTIVE_AUTH") {
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                key: "GOOGLE_INTERACTIVE_AUTH",
                value,
            })?,
            None => true,
        };

        let port_start: u16 =
            parse_opt(get("OAUTH_PORT_START"), "OAUTH_PORT_START")?.unwrap_or(DEFAULT_OAUTH_PORTS.0);
        let port_end: u16 =
            parse_opt(get("OAUTH_PORT_END"), "OAUTH_PORT_END")?.unwrap_or(port_start.max(DEFAULT_OAUTH_PORTS.1));
        if port_end < port_start {
            return Err(ConfigError::Invalid {
                key: "OAUTH_PORT_END",
                value: port_end.to_string(),
            });
        }

        let http_timeout = parse_opt::<u64>(get("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS")?
            .map(Duration::from_secs);

        Ok(Self {
            openai_api_key,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            ai,
            spreadsheet_id: get("SPREADSHEET_ID"),
            sheet_range: get("SHEET_RANGE").unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
            drive_folder_id: get("DRIVE_FOLDER_ID"),
            client_secret_file: get("GOOGLE_CLIENT_SECRET_FILE")
                .unwrap_or_else(|| DEFAULT_CLIENT_SECRET_FILE.to_string())
                .into(),
            token_file: get("GOOGLE_TOKEN_FILE")
                .unwrap_or_else(|| DEFAULT_TOKEN_FILE.to_string())
                .into(),
            service_account,
            interactive_auth,
            oauth_ports: (port_start, port_end),
            http_timeout,
        })
    }

    pub fn google_scopes() -> Vec<String> {
        GOOGLE_SCOPES.iter().map(|s| s.to_string()).collect()
    }
}

fn parse_opt<T: std::str::FromStr>(
    value: Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| v.parse::<T>().map_err(|_| ConfigError::Invalid { key, value: v }))
        .transpose()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
