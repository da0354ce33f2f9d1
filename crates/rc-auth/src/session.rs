use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::code_source::AuthCodeSource;
use crate::credential::Credential;
use crate::errors::Result;
use crate::pipeline::AuthPipeline;
use crate::store::CredentialStore;

/// Ties the exchange pipeline to a credential store
#[derive(Debug, Clone)]
pub struct SessionManager<S> {
    pipeline: AuthPipeline,
    store: S,
}

impl<S: CredentialStore> SessionManager<S> {
    pub fn new(pipeline: AuthPipeline, store: S) -> Self {
        Self { pipeline, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pipeline(&self) -> &AuthPipeline {
        &self.pipeline
    }

    /// Run an interactive login and store the result as the current account.
    ///
    /// The store is only written after the whole chain succeeded.
    #[instrument(skip(self, source))]
    pub async fn login(&self, source: &dyn AuthCodeSource) -> Result<Credential> {
        let credential = self.pipeline.login(source).await?;
        self.store.add(credential.clone(), true).await?;
        Ok(credential)
    }

    /// A usable credential for the current account, refreshing if needed.
    ///
    /// `None` means the caller has to fall back to interactive login.
    pub async fn current_valid(&self) -> Option<Credential> {
        self.current_valid_at(Utc::now()).await
    }

    #[instrument(skip(self))]
    pub async fn current_valid_at(&self, now: DateTime<Utc>) -> Option<Credential> {
        let current = self.store.current().await?;

        if current.is_valid_at(now) {
            return Some(current);
        }

        info!("Credential for {} expired, refreshing", current.display_name);
        match self.pipeline.refresh(&current).await {
            Ok(refreshed) => {
                match self.store.update(refreshed.clone()).await {
                    Ok(true) => {}
                    Ok(false) => warn!(
                        "Refresh for {} returned profile {}, which is not a stored account; not saved",
                        current.identity, refreshed.identity
                    ),
                    Err(e) => warn!("Refreshed credential could not be stored: {}", e),
                }
                Some(refreshed)
            }
            Err(e) => {
                warn!("Token refresh failed, interactive login required: {}", e);
                None
            }
        }
    }
}
