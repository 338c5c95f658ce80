//! Warden CLI - governed browser-automation sessions
//!
//! Usage:
//!   warden run <plan.json>        Execute a session plan
//!   warden approve <approval-id>  Approve a paused action (--deny to refuse)
//!   warden resume <session-id>    Resume a paused session after approval
//!   warden recover                Reconcile orphaned sessions after a crash
//!   warden init-config            Write a default warden.toml
//!
//! Session state, approvals and screenshots live under the state directory
//! (default `.warden/`), so a plan can pause in one invocation and resume
//! in the next.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use warden_audit::FsBlobStore;
use warden_browser::{BrowserConfig, CdpLauncher};
use warden_core::{ApprovalDecision, EngineConfig, SessionConfig};
use warden_engine::{JsonFileStateStore, SessionEngine};

#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about = "Governed browser-automation sessions")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// State directory for sessions, approvals and screenshots
    #[arg(long, default_value = ".warden")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a session plan from a JSON file
    Run {
        /// Path to a session plan (SessionConfig JSON)
        plan: PathBuf,

        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,
    },

    /// Record a decision on a pending approval request
    Approve {
        /// Approval request id
        approval_id: String,

        /// Deny instead of approve
        #[arg(long)]
        deny: bool,
    },

    /// Resume a paused session after its approval was decided
    Resume {
        /// Session id
        session_id: String,

        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,
    },

    /// Fail orphaned running sessions left behind by a crash
    Recover,

    /// Write a default warden.toml to the current directory
    InitConfig,
}

fn build_engine(state_dir: &Path, headed: bool) -> Result<(SessionEngine, Arc<JsonFileStateStore>)> {
    let config = EngineConfig::load_or_default(Path::new("."))
        .context("failed to load warden.toml")?;

    let store = Arc::new(JsonFileStateStore::new(state_dir.join("state")));
    let blobs = Arc::new(FsBlobStore::new(state_dir.join("artifacts")));
    let launcher = Arc::new(CdpLauncher::new(BrowserConfig {
        headless: !headed,
        ..BrowserConfig::default()
    }));

    let engine = SessionEngine::new(config, launcher, store.clone(), store.clone(), blobs);
    Ok((engine, store))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to initialize logging")?;

    match cli.command {
        Commands::Run { plan, headed } => {
            let content = std::fs::read_to_string(&plan)
                .with_context(|| format!("failed to read plan {}", plan.display()))?;
            let request: SessionConfig =
                serde_json::from_str(&content).context("invalid session plan")?;

            let (engine, _store) = build_engine(&cli.state_dir, headed)?;

            // A previous process may have died mid-session
            let recovered = engine.recover_orphaned().await?;
            if !recovered.is_empty() {
                info!(count = recovered.len(), "reconciled orphaned sessions");
            }

            let result = engine.execute_session(request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Approve { approval_id, deny } => {
            let (_engine, store) = build_engine(&cli.state_dir, false)?;
            let decision = if deny {
                ApprovalDecision::Denied
            } else {
                ApprovalDecision::Approved
            };
            store.resolve_approval(&approval_id, decision).await?;
            println!("approval {} marked {}", approval_id, decision);
        }

        Commands::Resume { session_id, headed } => {
            let (engine, _store) = build_engine(&cli.state_dir, headed)?;

            let recovered = engine.recover_orphaned().await?;
            if !recovered.is_empty() {
                info!(count = recovered.len(), "reconciled orphaned sessions");
            }

            let result = engine.resume_session(&session_id).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Recover => {
            let (engine, _store) = build_engine(&cli.state_dir, false)?;
            let recovered = engine.recover_orphaned().await?;
            if recovered.is_empty() {
                println!("no orphaned sessions");
            } else {
                for id in recovered {
                    println!("failed orphaned session {}", id);
                }
            }
        }

        Commands::InitConfig => {
            EngineConfig::write_default(Path::new("."))?;
            println!("wrote warden.toml");
        }
    }

    Ok(())
}
