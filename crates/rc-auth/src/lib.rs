//! Microsoft account authentication and credential storage for rauncher
//!
//! # Authentication Flow
//!
//! Signing in is a chain of exchanges, each feeding the next:
//!
//! 1. OAuth2 authorization code (pasted back by the user)
//! 2. Microsoft token (authorization-code or refresh-token grant)
//! 3. Xbox Live token
//! 4. XSTS token
//! 5. Minecraft Services login
//! 6. Profile lookup
//!
//! [`AuthPipeline`] runs the chain and never persists anything itself.
//! [`SessionManager`] stores a credential once the chain succeeded and
//! silently refreshes it when it is within five minutes of expiry.
//!
//! # Example
//!
//! ```no_run
//! use rc_auth::{AuthClient, AuthConfig, AuthPipeline, FileCredentialStore, SessionManager, TerminalCodeSource};
//!
//! # async fn example() -> rc_auth::Result<()> {
//! let store = FileCredentialStore::new(FileCredentialStore::default_config_dir()?).await?;
//! let pipeline = AuthPipeline::new(AuthClient::new(AuthConfig::official_desktop())?);
//! let sessions = SessionManager::new(pipeline, store);
//!
//! let credential = match sessions.current_valid().await {
//!     Some(credential) => credential,
//!     None => sessions.login(&TerminalCodeSource::new(true)).await?,
//! };
//! println!("Playing as {}", credential.display_name);
//! # Ok(())
//! # }
//! ```
//!
//! # Credential Storage
//!
//! All accounts live in a single `accounts.json` document that is replaced
//! atomically on every write. A corrupt or missing document reads as an empty
//! set. Cross-process writers are serialised with an advisory file lock.

pub mod client;
pub mod code_source;
pub mod config;
pub mod credential;
pub mod errors;
pub mod file_store;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod store;

pub use client::AuthClient;
pub use code_source::{AuthCodeSource, StaticCodeSource, TerminalCodeSource, extract_code};
pub use config::{AuthConfig, Endpoints};
pub use credential::Credential;
pub use errors::{AuthError, Result, XstsError};
pub use file_store::FileCredentialStore;
pub use pipeline::{AuthPipeline, AuthStage};
pub use session::SessionManager;
pub use store::{AccountMatch, CredentialSet, CredentialStore, MemoryCredentialStore};
