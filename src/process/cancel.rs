use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{BenchError, BenchResult};

/// Shared flag that aborts the running command when tripped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Trip the token on SIGINT/SIGTERM. A second signal exits immediately.
    pub fn install_signal_handlers(&self) -> BenchResult<()> {
        #[cfg(unix)]
        {
            use signal_hook::consts::{SIGINT, SIGTERM};
            use signal_hook::flag;

            for sig in [SIGINT, SIGTERM] {
                // order matters: the conditional shutdown sees the flag set by the first signal
                flag::register_conditional_shutdown(sig, 130, Arc::clone(&self.flag))
                    .map_err(|e| BenchError::io("failed to install signal handler", e))?;
                flag::register(sig, Arc::clone(&self.flag))
                    .map_err(|e| BenchError::io("failed to install signal handler", e))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
