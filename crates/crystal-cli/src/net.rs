//! Network collaborator: `ping` via the system binary, downloads via ureq.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use crystal_core::collab::Network;
use crystal_core::config::CrystalConfig;
use crystal_core::error::NetworkError;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::fs::expand_home;

#[derive(Debug, Clone)]
pub struct SystemNetwork {
    ping_count: u32,
    ping_timeout: Duration,
    download_timeout: Duration,
}

impl SystemNetwork {
    pub fn from_config(config: &CrystalConfig) -> Self {
        Self {
            ping_count: config.ping_count.max(1),
            ping_timeout: Duration::from_secs(config.ping_timeout_secs),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
        }
    }
}

fn count_flag() -> &'static str {
    if cfg!(windows) {
        "-n"
    } else {
        "-c"
    }
}

/// Streams `url` into a temporary file beside `destination` and renames it
/// into place once the body is complete. A failed transfer leaves any
/// existing file untouched.
fn fetch(url: &str, destination: &Path, timeout: Duration) -> Result<u64, String> {
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    let response = agent.get(url).call().map_err(|e| e.to_string())?;
    let mut reader = response.into_reader();

    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut staging = tempfile::NamedTempFile::new_in(dir).map_err(|e| e.to_string())?;
    let bytes = io::copy(&mut reader, &mut staging).map_err(|e| e.to_string())?;
    staging.persist(destination).map_err(|e| e.error.to_string())?;
    Ok(bytes)
}

#[async_trait]
impl Network for SystemNetwork {
    async fn ping(&self, host: &str) -> Result<(), NetworkError> {
        let mut command = Command::new("ping");
        command
            .arg(count_flag())
            .arg(self.ping_count.to_string())
            .arg(host)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let status = match tokio::time::timeout(self.ping_timeout, command.status()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                warn!(error = %e, "could not run ping");
                return Err(NetworkError::Unreachable(host.to_string()));
            }
            Err(_) => return Err(NetworkError::Timeout(host.to_string())),
        };

        debug!(host, code = ?status.code(), "ping finished");
        if status.success() {
            Ok(())
        } else {
            Err(NetworkError::Unreachable(host.to_string()))
        }
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<u64, NetworkError> {
        let destination = expand_home(destination);
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| NetworkError::Download {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        }

        let owned_url = url.to_string();
        let timeout = self.download_timeout;
        tokio::task::spawn_blocking(move || fetch(&owned_url, &destination, timeout))
            .await
            .map_err(|e| e.to_string())
            .and_then(|result| result)
            .map_err(|reason| NetworkError::Download {
                url: url.to_string(),
                reason,
            })
    }
}
