use async_trait::async_trait;
use crystal_core::collab::Console;
use crystal_core::error::ConsoleError;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Console over the process's stdin and stdout.
pub struct StdConsole {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    async fn write_raw(text: &str) -> Result<(), ConsoleError> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(text.as_bytes())
            .await
            .map_err(|e| ConsoleError::Io(e.to_string()))?;
        stdout.flush().await.map_err(|e| ConsoleError::Io(e.to_string()))
    }
}

#[async_trait]
impl Console for StdConsole {
    async fn write_line(&self, text: &str) -> Result<(), ConsoleError> {
        Self::write_raw(&format!("{}\n", text)).await
    }

    async fn read_line(&self, prompt: &str) -> Result<String, ConsoleError> {
        Self::write_raw(prompt).await?;
        let mut lines = self.lines.lock().await;
        match lines.next_line().await {
            Ok(Some(line)) => Ok(line.trim_end_matches('\r').to_string()),
            Ok(None) => Err(ConsoleError::Closed),
            Err(e) => Err(ConsoleError::Io(e.to_string())),
        }
    }
}
