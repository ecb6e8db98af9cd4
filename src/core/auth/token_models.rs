use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens are treated as expired this long before the provider's deadline.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An OAuth token set as persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer token sent with API requests.
    pub access_token: String,

    /// Long-lived token used to mint new access tokens without user consent.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// When the access token stops being usable. `None` means no known expiry.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Scopes the user granted.
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Token {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(expiry_from_now),
            scopes,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    /// True if every scope in `required` was granted.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Usable right now for the given scopes.
    pub fn is_valid_for(&self, required: &[String]) -> bool {
        !self.is_expired() && self.has_scopes(required)
    }

    /// Replaces the access token after a refresh. The refresh token is only
    /// replaced when the provider rotated it.
    pub fn apply_refresh(&mut self, refreshed: RefreshedToken) {
        self.access_token = refreshed.access_token;
        self.expires_at = refreshed.expires_in.map(expiry_from_now);
        if let Some(refresh_token) = refreshed.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
    }
}

/// What a refresh grant returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
}

fn expiry_from_now(secs: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS)
}
