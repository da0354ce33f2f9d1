use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TOKEN_EXPIRY_SKEW;

/// One authenticated identity and its token set.
///
/// Serialized field names match the on-disk account records, so `identity`
/// is stored as `uuid` and `display_name` as `username`. Only those two are
/// required; a record missing its tokens reads as expired.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(rename = "uuid")]
    pub identity: String,
    #[serde(rename = "username")]
    pub display_name: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Epoch milliseconds
    #[serde(default)]
    pub expires_at: i64,
    #[serde(default = "Utc::now")]
    pub authenticated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Placeholder identity used for offline launches
    pub fn offline(display_name: impl Into<String>) -> Self {
        Self {
            identity: "0".repeat(32),
            display_name: display_name.into(),
            access_token: "offline".to_string(),
            refresh_token: None,
            expires_at: i64::MAX,
            authenticated_at: Utc::now(),
            refreshed_at: None,
        }
    }

    /// Still usable at `now`, leaving [`TOKEN_EXPIRY_SKEW`] of headroom
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let skew = TOKEN_EXPIRY_SKEW.as_millis() as i64;
        now.timestamp_millis() < self.expires_at.saturating_sub(skew)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Whole minutes until the token expires, negative once it has
    pub fn minutes_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now.timestamp_millis()) / 60_000
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}
