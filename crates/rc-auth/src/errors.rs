use thiserror::Error;

use crate::pipeline::AuthStage;

/// Authentication and credential storage errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("User cancelled the authentication flow")]
    UserCancelled,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{stage} failed with HTTP {status}: {body_snippet}")]
    Http {
        stage: AuthStage,
        status: reqwest::StatusCode,
        body_snippet: String,
    },

    #[error("This Microsoft account has no Xbox account linked; create one at xbox.com")]
    NoLinkedGameAccount,

    #[error("This account belongs to someone under 18 and must be added to a family by a guardian")]
    AgeRestricted,

    #[error("Security token denied: {0}")]
    XstsDenied(XstsError),

    #[error("This account does not own Minecraft: Java Edition")]
    GameNotOwned,

    #[error("No authorization code in the pasted redirect")]
    InvalidRedirect,

    #[error("Silent refresh unavailable: {0}")]
    RefreshUnavailable(String),

    #[error("JSON serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Credential storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// True when the caller should fall back to interactive login
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::RefreshUnavailable(_))
    }
}

/// XSTS-specific error codes from the XErr field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XstsError {
    #[error("Account doesn't have an Xbox account (XErr: 2148916233)")]
    NoXboxAccount,

    #[error("Xbox Live not available in this country (XErr: 2148916235)")]
    RegionNotSupported,

    #[error("Adult verification required on Xbox page (XErr: 2148916236/2148916237)")]
    AdultVerificationRequired,

    #[error("Child account requires Family (XErr: 2148916238)")]
    ChildAccountRequiresFamily,

    #[error("Unknown XSTS error code: {0}")]
    Unknown(u64),
}

impl XstsError {
    /// Parse XErr code from XSTS response
    pub fn from_xerr(code: u64) -> Self {
        match code {
            2148916233 => Self::NoXboxAccount,
            2148916235 => Self::RegionNotSupported,
            2148916236 | 2148916237 => Self::AdultVerificationRequired,
            2148916238 => Self::ChildAccountRequiresFamily,
            code => Self::Unknown(code),
        }
    }
}

impl From<XstsError> for AuthError {
    fn from(err: XstsError) -> Self {
        match err {
            XstsError::NoXboxAccount => Self::NoLinkedGameAccount,
            XstsError::ChildAccountRequiresFamily => Self::AgeRestricted,
            other => Self::XstsDenied(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
