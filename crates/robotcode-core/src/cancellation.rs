//! Cancellation plumbing (§5, §9 "Cancellation plumbing").
//!
//! Tokens are passed explicitly on every query entry point rather than
//! relying on ambient task cancellation. Observing cancellation is
//! expressed as `Err(RobotCodeError::Cancelled)` — the "thrown Cancelled
//! marker" the spec describes, translated to Rust's `Result` idiom instead
//! of an exception.

use crate::error::RobotCodeError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Cancelled)` if this token has been cancelled; call at
    /// every node boundary in the analyzer and between library-search
    /// tasks (§5).
    pub fn check(&self) -> Result<(), RobotCodeError> {
        if self.is_cancelled() {
            Err(RobotCodeError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_succeeds_until_cancelled() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        assert!(token.check().is_err());
    }
}
