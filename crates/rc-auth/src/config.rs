use std::time::Duration;
use url::Url;

/// Default Microsoft / Xbox / Minecraft Services endpoints
pub mod endpoints {
    pub const MS_AUTHORIZE: &str = "https://login.live.com/oauth20_authorize.srf";
    pub const MS_TOKEN: &str = "https://login.live.com/oauth20_token.srf";
    pub const XBL_AUTHENTICATE: &str = "https://user.auth.xboxlive.com/user/authenticate";
    pub const XSTS_AUTHORIZE: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
    pub const MC_LOGIN: &str = "https://api.minecraftservices.com/authentication/login_with_xbox";
    pub const MC_PROFILE: &str = "https://api.minecraftservices.com/minecraft/profile";
}

/// Official Minecraft launcher OAuth configuration
pub mod official {
    /// Desktop client ID used by the official launcher
    pub const CLIENT_ID: &str = "00000000402b5328";
    pub const REDIRECT_URI: &str = "https://login.live.com/oauth20_desktop.srf";
    pub const SCOPE: &str = "service::user.auth.xboxlive.com::MBI_SSL";
}

/// Relying parties
pub const RP_XBOX_AUTH: &str = "http://auth.xboxlive.com";
pub const RP_MINECRAFT: &str = "rp://api.minecraftservices.com/";

/// A credential is treated as expired this long before its real expiry
pub const TOKEN_EXPIRY_SKEW: Duration = Duration::from_secs(300);

/// Endpoint table for the exchange chain.
///
/// Production code uses [`Endpoints::default`]; tests point every entry at a
/// local mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub ms_authorize: String,
    pub ms_token: String,
    pub xbl_authenticate: String,
    pub xsts_authorize: String,
    pub mc_login: String,
    pub mc_profile: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            ms_authorize: endpoints::MS_AUTHORIZE.to_string(),
            ms_token: endpoints::MS_TOKEN.to_string(),
            xbl_authenticate: endpoints::XBL_AUTHENTICATE.to_string(),
            xsts_authorize: endpoints::XSTS_AUTHORIZE.to_string(),
            mc_login: endpoints::MC_LOGIN.to_string(),
            mc_profile: endpoints::MC_PROFILE.to_string(),
        }
    }
}

impl Endpoints {
    /// Route every endpoint to `base`, keeping the upstream paths
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            ms_authorize: format!("{base}/oauth20_authorize.srf"),
            ms_token: format!("{base}/oauth20_token.srf"),
            xbl_authenticate: format!("{base}/user/authenticate"),
            xsts_authorize: format!("{base}/xsts/authorize"),
            mc_login: format!("{base}/authentication/login_with_xbox"),
            mc_profile: format!("{base}/minecraft/profile"),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(15),
            request: Duration::from_secs(30),
        }
    }
}

/// Configuration for [`AuthClient`](crate::AuthClient)
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth redirect URI
    pub redirect_uri: Url,

    /// OAuth scope requested from the identity provider
    pub scope: String,

    pub endpoints: Endpoints,

    pub http_timeouts: HttpTimeouts,

    pub user_agent: Option<String>,
}

impl AuthConfig {
    /// Config for the official desktop flow
    pub fn official_desktop() -> Self {
        Self {
            client_id: official::CLIENT_ID.to_string(),
            redirect_uri: Url::parse(official::REDIRECT_URI).expect("valid redirect URI"),
            scope: official::SCOPE.to_string(),
            endpoints: Endpoints::default(),
            http_timeouts: HttpTimeouts::default(),
            user_agent: Some(concat!("rauncher/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::official_desktop()
    }
}
