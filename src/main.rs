//! agentflow - workflow orchestration for tool-using agents
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;

use clap::Parser;

use agentflow::cli::{init_logging, DemoWorkflow, Repl};
use agentflow::core::config::StorageBackend;
use agentflow::{Config, RunStatus};

/// agentflow - run demo agent workflows
#[derive(Parser, Debug)]
#[command(name = "agentflow")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Workflow to run
    #[arg(long, short = 'w', value_enum, default_value_t = DemoWorkflow::Pipeline)]
    workflow: DemoWorkflow,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,

    /// Session id to create or resume
    #[arg(long, short = 's')]
    session: Option<String>,

    /// User id
    #[arg(long, short = 'u')]
    user: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Store sessions as JSON files in this directory
    #[arg(long)]
    storage: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref user) = args.user {
        config.session.user_id = user.clone();
    }

    if args.debug {
        config.logging.debug = true;
    }

    if let Some(ref dir) = args.storage {
        config.storage.backend = StorageBackend::File;
        config.storage.dir = dir.clone();
    }

    init_logging(&config.logging);

    let mut repl = Repl::new(config, args.workflow, args.session.as_deref(), args.json).await?;

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        let status = repl.send(&prompt).await?;
        if let RunStatus::Failed { kind, message } = status {
            anyhow::bail!("run failed ({}): {}", kind, message);
        }
        return Ok(());
    }

    // Interactive REPL mode
    repl.run().await?;

    Ok(())
}
