use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use url::Url;

use crate::errors::{AuthError, Result};

/// Supplies the out-of-band part of an interactive login.
///
/// Given the identity provider's authorization URL, returns whatever the user
/// pasted back: either the full redirect URL or the bare code.
#[async_trait::async_trait]
pub trait AuthCodeSource: Send + Sync {
    async fn obtain_code(&self, authorize_url: &Url) -> Result<String>;
}

/// Fixed answer, for headless runs and tests
#[derive(Debug, Clone)]
pub struct StaticCodeSource {
    input: String,
}

impl StaticCodeSource {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

#[async_trait::async_trait]
impl AuthCodeSource for StaticCodeSource {
    async fn obtain_code(&self, _authorize_url: &Url) -> Result<String> {
        Ok(self.input.clone())
    }
}

/// Prints the URL, tries to open a browser and reads one line from stdin
#[derive(Debug, Clone, Default)]
pub struct TerminalCodeSource {
    pub open_browser: bool,
}

impl TerminalCodeSource {
    pub fn new(open_browser: bool) -> Self {
        Self { open_browser }
    }
}

#[async_trait::async_trait]
impl AuthCodeSource for TerminalCodeSource {
    async fn obtain_code(&self, authorize_url: &Url) -> Result<String> {
        println!("Open this URL in your browser to sign in:\n");
        println!("{authorize_url}\n");

        if self.open_browser {
            match webbrowser::open(authorize_url.as_str()) {
                Ok(()) => println!("(Browser opened automatically)"),
                Err(e) => debug!("Could not open browser: {}", e),
            }
        }

        println!("After signing in you will land on a blank page.");
        println!("Copy the whole URL from the address bar and paste it here:");

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await?;

        if read == 0 || line.trim().is_empty() {
            return Err(AuthError::UserCancelled);
        }
        Ok(line.trim().to_string())
    }
}

/// Pull the authorization code out of a pasted redirect.
///
/// Accepts the full redirect URL or the bare code. A redirect carrying
/// `error=access_denied` means the user declined.
pub fn extract_code(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AuthError::InvalidRedirect);
    }

    if !input.starts_with("http") {
        return Ok(input.to_string());
    }

    let url = match Url::parse(input) {
        Ok(url) => url,
        Err(_) => return Ok(input.to_string()),
    };

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            "error" if value == "access_denied" => return Err(AuthError::UserCancelled),
            "error" => return Err(AuthError::InvalidRedirect),
            _ => {}
        }
    }

    code.ok_or(AuthError::InvalidRedirect)
}
