//! Interactive shell: read a line, run it, keep the environment.

use std::process::ExitCode;
use std::sync::Arc;

use crystal_core::collab::Console;
use crystal_core::error::ConsoleError;
use crystal_core::{Collaborators, EvalOptions, Evaluator, ScriptError};
use tracing::debug;

use crate::interrupt::Interrupts;

const PROMPT: &str = "crystal> ";
const CONTINUATION_PROMPT: &str = "   ...> ";

/// A block opened on one line and not yet closed; keep reading.
fn needs_more_input(err: &ScriptError) -> bool {
    match err {
        ScriptError::Parse(e) => e.unterminated,
        _ => false,
    }
}

pub async fn run(io: Collaborators, options: EvalOptions, interrupts: Interrupts) -> ExitCode {
    let console: Arc<dyn Console> = io.console.clone();
    let base_dir = std::env::current_dir().unwrap_or_default();
    let mut evaluator = Evaluator::new(io).with_options(options).with_base_dir(base_dir);

    if banner(console.as_ref()).await.is_err() {
        return ExitCode::FAILURE;
    }

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { PROMPT } else { CONTINUATION_PROMPT };
        let line = match console.read_line(prompt).await {
            Ok(line) => line,
            Err(ConsoleError::Closed) => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        };

        if buffer.is_empty() {
            match line.trim() {
                "" => continue,
                "exit" => break,
                _ => {}
            }
        }
        buffer.push_str(&line);
        buffer.push('\n');

        let program = match crystal_core::parse(&buffer) {
            Ok(program) => program,
            Err(e) if needs_more_input(&e) => continue,
            Err(e) => {
                buffer.clear();
                report(console.as_ref(), &e).await;
                continue;
            }
        };
        buffer.clear();

        evaluator.set_cancellation(interrupts.fresh());
        if let Err(e) = evaluator.run(&program).await {
            debug!(error = ?e, "line failed");
            report(console.as_ref(), &e).await;
        }
    }

    ExitCode::SUCCESS
}

async fn banner(console: &dyn Console) -> Result<(), ConsoleError> {
    console
        .write_line(&format!("Crystal Shell v{}", env!("CARGO_PKG_VERSION")))
        .await?;
    console.write_line("Type 'exit' to quit").await?;
    console.write_line("Run a script: crystal script.cry").await?;
    console.write_line("").await
}

async fn report(console: &dyn Console, err: &ScriptError) {
    if console.write_line(&format!("Error: {}", err)).await.is_err() {
        eprintln!("Error: {}", err);
    }
}
