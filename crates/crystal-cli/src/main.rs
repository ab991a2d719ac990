//! Command-line shell for the Crystal scripting language.
//!
//! # Usage
//!
//! ```bash
//! # Start the interactive shell
//! crystal
//!
//! # Run a script
//! crystal backup.cry
//!
//! # Run without confirmations or [SUCCESS] lines
//! crystal --yes --quiet cleanup.cry
//!
//! # Send diagnostics to a file
//! RUST_LOG=debug crystal --log-file crystal.log backup.cry
//! ```

mod console;
mod fs;
mod interrupt;
mod loader;
mod net;
mod repl;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use crystal_core::config::CrystalConfig;
use crystal_core::{Collaborators, EvalOptions, Evaluator};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::console::StdConsole;
use crate::fs::LocalFileSystem;
use crate::interrupt::Interrupts;
use crate::loader::FileScriptLoader;
use crate::net::SystemNetwork;

/// Exit status when the script file itself cannot be read.
const EXIT_UNREADABLE: u8 = 4;

/// Run Crystal scripts, or start an interactive shell.
#[derive(Parser)]
#[command(name = "crystal")]
#[command(about = "Run Crystal scripts, or start an interactive shell when no script is given")]
#[command(version)]
struct Cli {
    /// Script file to run (.cry)
    script: Option<PathBuf>,

    /// Do not ask before deleting or overwriting
    #[arg(short, long)]
    yes: bool,

    /// Do not print a line after each completed file or network action
    #[arg(short, long)]
    quiet: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "CRYSTAL_LOG_FILE")]
    log_file: Option<PathBuf>,
}

fn init_tracing(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or("crystal.log".as_ref());
            let file_appender = tracing_appender::rolling::never(dir, name);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file_appender)
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref());

    let config = CrystalConfig::load();
    let mut options = EvalOptions::from(&config);
    if cli.yes {
        options.confirm_destructive = false;
    }
    if cli.quiet {
        options.report_actions = false;
    }

    let io = Collaborators {
        console: Arc::new(StdConsole::new()),
        fs: Arc::new(LocalFileSystem::new()),
        network: Arc::new(SystemNetwork::from_config(&config)),
        loader: Arc::new(FileScriptLoader),
    };
    let interrupts = Interrupts::install();

    match cli.script {
        Some(path) => run_script(&path, io, options, interrupts).await,
        None => repl::run(io, options, interrupts).await,
    }
}

async fn run_script(path: &Path, io: Collaborators, options: EvalOptions, interrupts: Interrupts) -> ExitCode {
    if path.extension().and_then(|e| e.to_str()) != Some("cry") {
        eprintln!("Warning: '{}' is not a .cry file", path.display());
    }

    let script = match io.loader.load(path).await {
        Ok(script) => script,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_UNREADABLE);
        }
    };

    let mut evaluator = Evaluator::new(io)
        .with_options(options)
        .with_cancellation(interrupts.fresh());
    match evaluator.run_script(&script).await {
        Ok(()) => {
            info!(path = %script.path.display(), "script finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}
