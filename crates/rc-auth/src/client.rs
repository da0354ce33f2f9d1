use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use crate::config::{AuthConfig, RP_MINECRAFT, RP_XBOX_AUTH};
use crate::errors::{AuthError, Result, XstsError};
use crate::models::*;
use crate::pipeline::AuthStage;

/// HTTP client for the individual hops of the exchange chain
#[derive(Debug, Clone)]
pub struct AuthClient {
    config: AuthConfig,
    http: Client,
}

impl AuthClient {
    /// Create a new authentication client
    pub fn new(config: AuthConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.http_timeouts.connect)
            .timeout(config.http_timeouts.request)
            .user_agent(config.user_agent.as_deref().unwrap_or("rauncher"))
            .build()?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Build the authorization URL for the user to visit
    #[instrument(skip(self))]
    pub fn build_authorize_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.config.endpoints.ms_authorize)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", &self.config.scope);

        debug!("Built authorize URL: {}", url);
        Ok(url)
    }

    /// Exchange an authorization code for identity-provider tokens
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<MsTokenResponse> {
        debug!("Exchanging authorization code for tokens");
        let response = self
            .http
            .post(&self.config.endpoints.ms_token)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", self.config.scope.as_str()),
            ])
            .send()
            .await?;

        let response = ensure_success(AuthStage::IdentityToken, response).await?;
        Ok(response.json().await?)
    }

    /// Redeem a refresh token.
    ///
    /// Any rejection is reported as [`AuthError::RefreshUnavailable`].
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_ms_token(&self, refresh_token: &str) -> Result<MsTokenResponse> {
        debug!("Refreshing identity-provider token");
        let response = self
            .http
            .post(&self.config.endpoints.ms_token)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
                ("scope", self.config.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::RefreshUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let reason = if body.contains("invalid_grant") {
                "refresh token rejected (invalid_grant)".to_string()
            } else {
                format!("HTTP {status}")
            };
            return Err(AuthError::RefreshUnavailable(reason));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::RefreshUnavailable(e.to_string()))
    }

    /// Authenticate with Xbox Live (realtime-service token)
    #[instrument(skip(self, ms_access_token))]
    pub async fn xbl_authenticate(&self, ms_access_token: &str) -> Result<XboxTokenResponse> {
        let request = XblAuthRequest {
            properties: XblAuthProperties {
                auth_method: "RPS".to_string(),
                site_name: "user.auth.xboxlive.com".to_string(),
                rps_ticket: ms_access_token.to_string(),
            },
            relying_party: RP_XBOX_AUTH.to_string(),
            token_type: "JWT".to_string(),
        };

        debug!("Authenticating with Xbox Live");
        let response = self
            .http
            .post(&self.config.endpoints.xbl_authenticate)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let response = ensure_success(AuthStage::RealtimeToken, response).await?;
        let xbl: XboxTokenResponse = response.json().await?;
        require_user_hash(&xbl)?;
        Ok(xbl)
    }

    /// Authorize with XSTS (security token)
    #[instrument(skip(self, xbl_token))]
    pub async fn xsts_authorize(&self, xbl_token: &str) -> Result<XboxTokenResponse> {
        let request = XstsAuthRequest {
            properties: XstsAuthProperties {
                sandbox_id: "RETAIL".to_string(),
                user_tokens: vec![xbl_token.to_string()],
            },
            relying_party: RP_MINECRAFT.to_string(),
            token_type: "JWT".to_string(),
        };

        debug!("Authorizing with XSTS");
        let response = self
            .http
            .post(&self.config.endpoints.xsts_authorize)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(error_response) = serde_json::from_str::<XstsErrorResponse>(&body) {
                debug!(
                    "XSTS denied with XErr {}: {:?}",
                    error_response.xerr, error_response.message
                );
                return Err(XstsError::from_xerr(error_response.xerr).into());
            }
            return Err(AuthError::Http {
                stage: AuthStage::SecurityToken,
                status,
                body_snippet: body.chars().take(200).collect(),
            });
        }

        let xsts: XboxTokenResponse = response.json().await?;
        require_user_hash(&xsts)?;
        Ok(xsts)
    }

    /// Login to Minecraft Services with the XSTS token (game-service token)
    #[instrument(skip(self, xsts_token, uhs))]
    pub async fn mc_login(&self, xsts_token: &str, uhs: &str) -> Result<McLoginResponse> {
        let request = McLoginRequest {
            identity_token: format!("XBL3.0 x={};{}", uhs, xsts_token),
        };

        debug!("Logging in to Minecraft Services");
        let response = self
            .http
            .post(&self.config.endpoints.mc_login)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let response = ensure_success(AuthStage::GameToken, response).await?;
        Ok(response.json().await?)
    }

    /// Fetch the Minecraft profile
    #[instrument(skip(self, mc_access_token))]
    pub async fn fetch_profile(&self, mc_access_token: &str) -> Result<McProfile> {
        debug!("Fetching Minecraft profile");
        let response = self
            .http
            .get(&self.config.endpoints.mc_profile)
            .bearer_auth(mc_access_token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AuthError::GameNotOwned);
        }

        let response = ensure_success(AuthStage::ProfileResolved, response).await?;
        Ok(response.json().await?)
    }
}

async fn ensure_success(stage: AuthStage, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(AuthError::Http {
        stage,
        status,
        body_snippet: body.chars().take(200).collect(),
    })
}

fn require_user_hash(reply: &XboxTokenResponse) -> Result<()> {
    reply
        .user_hash()
        .map(|_| ())
        .ok_or_else(|| AuthError::InvalidResponse("Missing XUI claims".to_string()))
}
