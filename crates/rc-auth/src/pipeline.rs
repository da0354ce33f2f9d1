use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::client::AuthClient;
use crate::code_source::{AuthCodeSource, extract_code};
use crate::credential::Credential;
use crate::errors::{AuthError, Result};
use crate::models::{McLoginResponse, McProfile, MsTokenResponse};

/// Position in the exchange chain.
///
/// Each transition is one network round trip whose output seeds the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuthStage {
    Start,
    CodeObtained,
    IdentityToken,
    RealtimeToken,
    SecurityToken,
    GameToken,
    ProfileResolved,
    Done,
}

impl AuthStage {
    pub fn next(self) -> Option<Self> {
        Some(match self {
            Self::Start => Self::CodeObtained,
            Self::CodeObtained => Self::IdentityToken,
            Self::IdentityToken => Self::RealtimeToken,
            Self::RealtimeToken => Self::SecurityToken,
            Self::SecurityToken => Self::GameToken,
            Self::GameToken => Self::ProfileResolved,
            Self::ProfileResolved => Self::Done,
            Self::Done => return None,
        })
    }

    /// Progress line for the exchange that produces this stage
    pub fn description(self) -> &'static str {
        match self {
            Self::Start => "Starting sign-in",
            Self::CodeObtained => "Received authorization code",
            Self::IdentityToken => "Getting Microsoft token",
            Self::RealtimeToken => "Getting Xbox Live token",
            Self::SecurityToken => "Getting XSTS token",
            Self::GameToken => "Getting Minecraft token",
            Self::ProfileResolved => "Getting Minecraft profile",
            Self::Done => "Signed in",
        }
    }
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::CodeObtained => "authorization code",
            Self::IdentityToken => "identity token exchange",
            Self::RealtimeToken => "realtime-service token exchange",
            Self::SecurityToken => "security token exchange",
            Self::GameToken => "game-service login",
            Self::ProfileResolved => "profile lookup",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Callback notified on every stage transition
pub type StageObserver = Arc<dyn Fn(AuthStage) + Send + Sync>;

struct StageTracker<'a> {
    stage: AuthStage,
    observer: Option<&'a StageObserver>,
}

impl<'a> StageTracker<'a> {
    fn starting_at(stage: AuthStage, observer: Option<&'a StageObserver>) -> Self {
        Self { stage, observer }
    }

    /// Announce the exchange that is about to run
    fn enter(&mut self, next: AuthStage) {
        debug_assert_eq!(
            self.stage.next(),
            Some(next),
            "stage skipped or went backwards: {:?} -> {:?}",
            self.stage,
            next
        );
        debug!("{} -> {}", self.stage, next);
        self.stage = next;
        if let Some(observer) = self.observer {
            observer(next);
        }
    }
}

/// Drives the four-hop exchange for interactive login and silent refresh.
///
/// Nothing is persisted here; a credential is only returned once every stage
/// has succeeded.
#[derive(Clone)]
pub struct AuthPipeline {
    client: AuthClient,
    observer: Option<StageObserver>,
}

impl fmt::Debug for AuthPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthPipeline")
            .field("client", &self.client)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl AuthPipeline {
    pub fn new(client: AuthClient) -> Self {
        Self {
            client,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: impl Fn(AuthStage) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    /// Interactive login: authorization URL, pasted redirect, full chain
    #[instrument(skip(self, source))]
    pub async fn login(&self, source: &dyn AuthCodeSource) -> Result<Credential> {
        let mut tracker = StageTracker::starting_at(AuthStage::Start, self.observer.as_ref());

        let authorize_url = self.client.build_authorize_url()?;
        let pasted = source.obtain_code(&authorize_url).await?;
        let code = extract_code(&pasted)?;
        tracker.enter(AuthStage::CodeObtained);

        tracker.enter(AuthStage::IdentityToken);
        let ms = self.client.exchange_code(&code).await?;

        let (game, profile) = self.exchange_chain(&ms.access_token, &mut tracker).await?;
        tracker.enter(AuthStage::Done);

        let now = Utc::now();
        let credential = build_credential(ms, game, profile, None, now);
        info!("Signed in as {}", credential.display_name);
        Ok(credential)
    }

    /// Silent refresh from the stored refresh token.
    ///
    /// Returns [`AuthError::RefreshUnavailable`] when there is no refresh
    /// token or the identity provider rejects it. `authenticated_at` keeps
    /// the time of the interactive sign-in.
    #[instrument(skip(self, credential), fields(account = %credential.display_name))]
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::RefreshUnavailable("no refresh token stored".to_string()))?;

        let mut tracker = StageTracker::starting_at(AuthStage::CodeObtained, self.observer.as_ref());
        tracker.enter(AuthStage::IdentityToken);
        let ms = self.client.refresh_ms_token(refresh_token).await?;

        let (game, profile) = self.exchange_chain(&ms.access_token, &mut tracker).await?;
        tracker.enter(AuthStage::Done);

        let refreshed = build_credential(
            ms,
            game,
            profile,
            Some(credential),
            Utc::now(),
        );
        info!("Refreshed credential for {}", refreshed.display_name);
        Ok(refreshed)
    }

    /// Realtime-service, security-token, game-service and profile hops.
    /// Identical for both entry points.
    async fn exchange_chain(
        &self,
        identity_token: &str,
        tracker: &mut StageTracker<'_>,
    ) -> Result<(McLoginResponse, McProfile)> {
        tracker.enter(AuthStage::RealtimeToken);
        let xbl = self.client.xbl_authenticate(identity_token).await?;
        let uhs = xbl
            .user_hash()
            .ok_or_else(|| AuthError::InvalidResponse("Missing XUI claims".to_string()))?
            .to_string();

        tracker.enter(AuthStage::SecurityToken);
        let xsts = self.client.xsts_authorize(&xbl.token).await?;

        tracker.enter(AuthStage::GameToken);
        let game = self.client.mc_login(&xsts.token, &uhs).await?;

        tracker.enter(AuthStage::ProfileResolved);
        let profile = self.client.fetch_profile(&game.access_token).await?;

        Ok((game, profile))
    }
}

fn build_credential(
    ms: MsTokenResponse,
    game: McLoginResponse,
    profile: McProfile,
    previous: Option<&Credential>,
    now: DateTime<Utc>,
) -> Credential {
    let expires_at = now.timestamp_millis() + (game.expires_in as i64) * 1000;
    let refresh_token = ms
        .refresh_token
        .or_else(|| previous.and_then(|p| p.refresh_token.clone()));

    Credential {
        identity: profile.id,
        display_name: profile.name,
        access_token: game.access_token,
        refresh_token,
        expires_at,
        authenticated_at: previous.map_or(now, |p| p.authenticated_at),
        refreshed_at: previous.map(|_| now),
    }
}
