use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Exit status after a second Ctrl-C.
pub const INTERRUPTED: i32 = 130;

/// Ctrl-C handling: the first press cancels whatever is running, a second
/// press while that run is still cancelled ends the process.
#[derive(Clone)]
pub struct Interrupts {
    current: Arc<Mutex<CancellationToken>>,
}

impl Interrupts {
    /// Starts listening for Ctrl-C on the runtime.
    pub fn install() -> Self {
        let interrupts = Self {
            current: Arc::new(Mutex::new(CancellationToken::new())),
        };
        let listener = interrupts.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                listener.interrupt();
            }
        });
        interrupts
    }

    /// Token for the next run, replacing the previous one.
    pub fn fresh(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();
        token
    }

    fn interrupt(&self) {
        let token = self.current.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if token.is_cancelled() {
            std::process::exit(INTERRUPTED);
        }
        warn!("interrupted, cancelling");
        token.cancel();
    }
}
