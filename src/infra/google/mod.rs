// =============================================================================
// GOOGLE MODULE
// =============================================================================
//
// Google Sheets (input), Google Drive (output) and the two ways of getting a
// bearer token for them:
//
// 1. **Installed-app OAuth** (default): `credentials.json` from Cloud Console,
//    a browser consent on first run, then a cached refresh token.
// 2. **Service Account**: a JSON key; fully headless.
//
// Both end up behind `AccessTokenSource`, so the Sheets and Drive clients
// don't care which one main picked.

pub mod client_secret;
pub mod drive_client;
pub mod oauth_client;
pub mod service_account;
pub mod sheets_client;

#[cfg(test)]
mod stub_server;

pub use client_secret::OAuthCredentials;
pub use drive_client::GoogleDriveClient;
pub use oauth_client::GoogleOAuthClient;
pub use service_account::ServiceAccountAuth;
pub use sheets_client::GoogleSheetsClient;
