use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::errors::{AuthError, Result};

/// Every stored account plus the "current" pointer.
///
/// Accounts are keyed by identity in a sorted map, so fallbacks such as
/// reassigning the current account pick the same entry on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSet {
    #[serde(default)]
    pub accounts: BTreeMap<String, Credential>,
    #[serde(default, rename = "currentAccount")]
    pub current_identity: Option<String>,
}

/// Outcome of resolving an identity-or-name identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountMatch<'a> {
    /// Exact match on the stable identity
    Identity(&'a Credential),
    /// Case-insensitive match on the display name
    DisplayName(&'a Credential),
    NotFound,
}

impl<'a> AccountMatch<'a> {
    pub fn credential(self) -> Option<&'a Credential> {
        match self {
            Self::Identity(c) | Self::DisplayName(c) => Some(c),
            Self::NotFound => None,
        }
    }
}

impl CredentialSet {
    /// Resolve `identifier` against identities first, then display names
    pub fn resolve(&self, identifier: &str) -> AccountMatch<'_> {
        if let Some(cred) = self.accounts.get(identifier) {
            return AccountMatch::Identity(cred);
        }

        let wanted = identifier.to_lowercase();
        self.accounts
            .values()
            .find(|c| c.display_name.to_lowercase() == wanted)
            .map_or(AccountMatch::NotFound, AccountMatch::DisplayName)
    }

    pub fn current(&self) -> Option<&Credential> {
        self.current_identity
            .as_deref()
            .and_then(|id| self.accounts.get(id))
    }

    pub fn get(&self, identifier: &str) -> Option<&Credential> {
        self.resolve(identifier).credential()
    }

    /// Upsert by identity
    pub fn add(&mut self, credential: Credential, make_current: bool) {
        let identity = credential.identity.clone();
        self.accounts.insert(identity.clone(), credential);

        if make_current || self.current().is_none() {
            self.current_identity = Some(identity);
        }
    }

    pub fn remove(&mut self, identifier: &str) -> Option<Credential> {
        let identity = self.resolve(identifier).credential()?.identity.clone();
        let removed = self.accounts.remove(&identity)?;

        if self.current_identity.as_deref() == Some(identity.as_str()) {
            self.current_identity = self.accounts.keys().next().cloned();
        }

        Some(removed)
    }

    pub fn switch_to(&mut self, identifier: &str) -> Option<Credential> {
        let cred = self.resolve(identifier).credential()?.clone();
        self.current_identity = Some(cred.identity.clone());
        Some(cred)
    }

    /// Replace the tokens of an existing account; unknown identities are ignored
    pub fn update(&mut self, credential: Credential) -> bool {
        match self.accounts.get_mut(&credential.identity) {
            Some(existing) => {
                *existing = credential;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Guard held across a read-modify-write cycle.
///
/// File-backed stores keep an advisory lock open for the lifetime of the
/// guard; the lock is released when the file handle is dropped.
#[derive(Debug, Default)]
pub struct StoreLock {
    _file: Option<std::fs::File>,
}

impl StoreLock {
    pub fn unlocked() -> Self {
        Self { _file: None }
    }

    pub fn held(file: std::fs::File) -> Self {
        Self { _file: Some(file) }
    }
}

/// Persistence for a [`CredentialSet`].
///
/// Implementors provide whole-document `load`/`save`; the account operations
/// are built on top and always write the full set back in one replace.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the stored set. Missing or corrupt data yields an empty set.
    async fn load(&self) -> CredentialSet;

    /// Replace the stored set
    async fn save(&self, set: &CredentialSet) -> Result<()>;

    /// Serialize read-modify-write cycles across processes
    async fn lock(&self) -> Result<StoreLock> {
        Ok(StoreLock::unlocked())
    }

    async fn current(&self) -> Option<Credential> {
        self.load().await.current().cloned()
    }

    async fn get(&self, identifier: &str) -> Option<Credential> {
        self.load().await.get(identifier).cloned()
    }

    async fn list(&self) -> Vec<Credential> {
        self.load().await.accounts.into_values().collect()
    }

    async fn add(&self, credential: Credential, make_current: bool) -> Result<()> {
        let _lock = self.lock().await?;
        let mut set = self.load().await;
        set.add(credential, make_current);
        self.save(&set).await
    }

    async fn remove(&self, identifier: &str) -> Result<Option<Credential>> {
        let _lock = self.lock().await?;
        let mut set = self.load().await;
        let removed = set.remove(identifier);
        if removed.is_some() {
            self.save(&set).await?;
        }
        Ok(removed)
    }

    async fn switch_to(&self, identifier: &str) -> Result<Option<Credential>> {
        let _lock = self.lock().await?;
        let mut set = self.load().await;
        let target = set.switch_to(identifier);
        if target.is_some() {
            self.save(&set).await?;
        }
        Ok(target)
    }

    async fn update(&self, credential: Credential) -> Result<bool> {
        let _lock = self.lock().await?;
        let mut set = self.load().await;
        let updated = set.update(credential);
        if updated {
            self.save(&set).await?;
        }
        Ok(updated)
    }
}

/// In-memory credential store for testing and simple use cases
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    set: Arc<RwLock<CredentialSet>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_set(set: CredentialSet) -> Self {
        Self {
            set: Arc::new(RwLock::new(set)),
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> CredentialSet {
        self.set.read().map(|s| s.clone()).unwrap_or_default()
    }

    async fn save(&self, set: &CredentialSet) -> Result<()> {
        *self
            .set
            .write()
            .map_err(|_| AuthError::InvalidResponse("Lock poisoned".to_string()))? = set.clone();
        Ok(())
    }
}
