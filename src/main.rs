use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use rc_auth::{
    AuthClient, AuthConfig, AuthPipeline, AuthStage, CredentialStore, FileCredentialStore,
    SessionManager, TerminalCodeSource,
};
use rc_core::{LaunchOptions, LaunchOrchestrator, SystemRunner};
use rc_instance::LauncherSettings;
use rc_instance::config::SETTINGS_FILE;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "rauncher", version, about = "Minecraft launcher for the terminal")]
struct Cli {
    /// Print debug output and the full launch command
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with a Microsoft account
    Login {
        /// Sign in again even if the current account is still valid
        #[arg(long)]
        force: bool,

        /// Do not try to open a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Remove an account (the current one by default)
    Logout {
        /// Account name or UUID
        identifier: Option<String>,
    },
    /// Make another stored account the current one
    Switch {
        /// Account name or UUID
        identifier: String,
    },
    /// Show the current account and its token state
    Status,
    /// List stored accounts
    Accounts,
    /// Launch an instance
    Launch {
        /// Instance directory (defaults to the current directory)
        #[arg(long)]
        instance: Option<PathBuf>,

        /// Play with a placeholder offline identity
        #[arg(long)]
        offline: bool,
    },
}

type Sessions = SessionManager<FileCredentialStore>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "warn,rauncher=debug,rc_auth=debug,rc_core=debug,rc_instance=debug,rc_meta=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    let config_dir = FileCredentialStore::default_config_dir()?;
    let store = FileCredentialStore::new(&config_dir)
        .await
        .context("Could not open the account store")?;
    if store.migrate_legacy().await? {
        println!("Imported account from the previous auth.json");
    }

    let pipeline = AuthPipeline::new(AuthClient::new(AuthConfig::official_desktop())?)
        .with_observer(|stage| {
            if !matches!(stage, AuthStage::Start | AuthStage::Done) {
                println!("{}...", stage.description());
            }
        });
    let sessions = SessionManager::new(pipeline, store);

    match cli.command {
        Command::Login { force, no_browser } => login(&sessions, force, !no_browser).await?,
        Command::Logout { identifier } => logout(&sessions, identifier).await?,
        Command::Switch { identifier } => {
            match sessions.store().switch_to(&identifier).await? {
                Some(credential) => println!("Switched to {}", credential.display_name),
                None => bail!("No account matches '{identifier}'"),
            }
        }
        Command::Status => status(&sessions).await,
        Command::Accounts => accounts(&sessions).await,
        Command::Launch { instance, offline } => {
            let instance_dir = match instance {
                Some(path) => path,
                None => std::env::current_dir()?,
            };
            let settings = LauncherSettings::load(&config_dir.join(SETTINGS_FILE)).await;
            return launch(&sessions, settings, instance_dir, offline, cli.verbose).await;
        }
    }
    Ok(0)
}

async fn login(sessions: &Sessions, force: bool, open_browser: bool) -> Result<()> {
    if !force && let Some(current) = sessions.current_valid().await {
        println!(
            "Already logged in as {} (use --force to sign in again)",
            current.display_name
        );
        return Ok(());
    }

    let credential = sessions.login(&TerminalCodeSource::new(open_browser)).await?;
    println!("Logged in as {}", credential.display_name);
    Ok(())
}

async fn logout(sessions: &Sessions, identifier: Option<String>) -> Result<()> {
    let store = sessions.store();
    let identifier = match identifier {
        Some(identifier) => identifier,
        None => match store.current().await {
            Some(current) => current.identity,
            None => bail!("Not logged in"),
        },
    };

    match store.remove(&identifier).await? {
        Some(removed) => println!("Logged out {}", removed.display_name),
        None => bail!("No account matches '{identifier}'"),
    }

    if let Some(current) = store.current().await {
        println!("Current account is now {}", current.display_name);
    }
    Ok(())
}

async fn status(sessions: &Sessions) {
    let Some(current) = sessions.store().current().await else {
        println!("Not logged in. Run `rauncher login` to sign in.");
        return;
    };

    let now = Utc::now();
    println!("Account:       {}", current.display_name);
    println!("UUID:          {}", current.identity);
    println!(
        "Authenticated: {}",
        current.authenticated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    if let Some(refreshed_at) = current.refreshed_at {
        println!(
            "Refreshed:     {}",
            refreshed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }

    if current.is_valid_at(now) {
        println!("Token:         valid for {} more minutes", current.minutes_remaining(now));
    } else if current.can_refresh() {
        println!("Token:         expired, will refresh on next launch");
    } else {
        println!("Token:         expired, run `rauncher login`");
    }
}

async fn accounts(sessions: &Sessions) {
    let set = sessions.store().load().await;
    if set.is_empty() {
        println!("No accounts stored.");
        return;
    }

    for credential in set.accounts.values() {
        let marker = if set.current_identity.as_deref() == Some(credential.identity.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker} {} ({})", credential.display_name, credential.identity);
    }
}

async fn launch(
    sessions: &Sessions,
    settings: LauncherSettings,
    instance_dir: PathBuf,
    offline: bool,
    verbose: bool,
) -> Result<i32> {
    let orchestrator = LaunchOrchestrator::new(settings, SystemRunner);
    let prepared = orchestrator
        .prepare(&instance_dir, sessions, LaunchOptions { offline })
        .await?;

    println!(
        "Launching {} as {}",
        prepared.record.name, prepared.credential.display_name
    );
    if prepared.missing_libraries > 0 {
        println!(
            "Warning: {} libraries are missing; the game may not start",
            prepared.missing_libraries
        );
    }
    println!("Java: {}", prepared.command.program.display());
    if verbose {
        println!("{}", prepared.command_line());
    }

    let exit_code = orchestrator.run(&instance_dir, &prepared).await?;
    debug!("Game exited with {:?}", exit_code);
    match exit_code {
        Some(0) => println!("Minecraft closed normally."),
        Some(code) => println!("Minecraft exited with code {code}"),
        None => println!("Minecraft was terminated"),
    }
    Ok(exit_code.unwrap_or(1))
}
