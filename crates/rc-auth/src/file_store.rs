use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::Deserialize;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::credential::Credential;
use crate::errors::{AuthError, Result};
use crate::store::{CredentialSet, CredentialStore, StoreLock};

/// File-based credential store
///
/// Keeps every account in one JSON document that is always rewritten whole.
///
/// # Directory Structure
/// ```text
/// ~/.config/rauncher/
/// ├── auth.json.backup       # Archived single-account record (after migration)
/// └── auth/
///     ├── accounts.json      # { "accounts": {...}, "currentAccount": "..." }
///     └── accounts.lock      # Advisory lock file
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    config_dir: PathBuf,
    accounts_file: PathBuf,
    lock_file: PathBuf,
}

/// On-disk shape of `accounts.json`, read before the entries are checked
#[derive(Deserialize)]
struct StoredAccounts {
    #[serde(default)]
    accounts: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "currentAccount")]
    current_account: Option<String>,
}

impl FileCredentialStore {
    /// Create a store rooted at `config_dir`
    pub async fn new(config_dir: impl AsRef<Path>) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();
        let auth_dir = config_dir.join("auth");

        fs::create_dir_all(&auth_dir).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&auth_dir, std::fs::Permissions::from_mode(0o700))?;
        }

        Ok(Self {
            accounts_file: auth_dir.join("accounts.json"),
            lock_file: auth_dir.join("accounts.lock"),
            config_dir,
        })
    }

    /// Get default config directory for the current platform
    pub fn default_config_dir() -> Result<PathBuf> {
        let project_dirs = directories::ProjectDirs::from("com", "rauncher", "rauncher")
            .ok_or_else(|| {
                AuthError::InvalidResponse("Could not determine config directory".to_string())
            })?;

        Ok(project_dirs.config_dir().to_path_buf())
    }

    pub fn accounts_file(&self) -> &Path {
        &self.accounts_file
    }

    fn legacy_file(&self) -> PathBuf {
        self.config_dir.join("auth.json")
    }

    fn legacy_backup_file(&self) -> PathBuf {
        self.config_dir.join("auth.json.backup")
    }

    /// Import the single-account `auth.json` record, if one is still around.
    ///
    /// The legacy file is renamed to `auth.json.backup` afterwards. Returns
    /// `true` when a legacy record was found and archived. An account that is
    /// already present is not overwritten.
    #[instrument(skip(self))]
    pub async fn migrate_legacy(&self) -> Result<bool> {
        let legacy_file = self.legacy_file();
        if fs::metadata(&legacy_file).await.is_err() {
            return Ok(false);
        }

        let legacy: Credential = match fs::read(&legacy_file)
            .await
            .map_err(AuthError::from)
            .and_then(|bytes| serde_json::from_slice(&bytes).map_err(AuthError::from))
        {
            Ok(cred) => cred,
            Err(e) => {
                warn!("Ignoring unreadable legacy record {}: {}", legacy_file.display(), e);
                return Ok(false);
            }
        };

        let _lock = self.lock().await?;
        let mut set = self.load().await;
        if set.accounts.contains_key(&legacy.identity) {
            debug!("Legacy account {} already migrated", legacy.display_name);
        } else {
            info!("Migrating legacy account {}", legacy.display_name);
            set.add(legacy, true);
            self.save(&set).await?;
        }

        fs::rename(&legacy_file, self.legacy_backup_file()).await?;
        Ok(true)
    }
}

#[async_trait::async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> CredentialSet {
        let content = match fs::read(&self.accounts_file).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CredentialSet::default(),
            Err(e) => {
                warn!("Failed to read {}: {}", self.accounts_file.display(), e);
                return CredentialSet::default();
            }
        };

        let stored: StoredAccounts = match serde_json::from_slice(&content) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(
                    "Credential store {} is corrupt, treating as empty: {}",
                    self.accounts_file.display(),
                    e
                );
                return CredentialSet::default();
            }
        };

        let mut set = CredentialSet {
            accounts: BTreeMap::new(),
            current_identity: stored.current_account,
        };
        for (key, mut entry) in stored.accounts {
            if let Some(fields) = entry.as_object_mut() {
                fields
                    .entry("uuid")
                    .or_insert_with(|| serde_json::Value::String(key.clone()));
            }
            match serde_json::from_value::<Credential>(entry) {
                Ok(credential) => {
                    set.accounts.insert(key, credential);
                }
                Err(e) => warn!("Skipping unreadable account entry {}: {}", key, e),
            }
        }

        // A dangling pointer is treated as unset.
        if set.current().is_none() {
            set.current_identity = None;
        }
        set
    }

    async fn save(&self, set: &CredentialSet) -> Result<()> {
        let json = serde_json::to_string_pretty(set)?;

        // Atomic write: write to temp file, then rename
        let temp_path = self.accounts_file.with_extension("tmp");
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&temp_path)?;

        // `mode` only applies on creation; a leftover temp file keeps its bits.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.accounts_file).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.accounts_file, std::fs::Permissions::from_mode(0o600))?;
        }

        debug!("Saved {} account(s)", set.len());
        Ok(())
    }

    async fn lock(&self) -> Result<StoreLock> {
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_file)?;

        let file = tokio::task::spawn_blocking(move || {
            lock_file.lock_exclusive().map(|_| lock_file)
        })
        .await
        .map_err(|e| AuthError::InvalidResponse(format!("Lock task failed: {e}")))??;

        Ok(StoreLock::held(file))
    }
}
