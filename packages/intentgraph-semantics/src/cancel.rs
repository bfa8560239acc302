//! Cooperative cancellation for top-level operations
//!
//! Builders check the token at per-file boundaries. A cancelled operation
//! rolls back its in-flight transaction; object-store blobs not yet renamed
//! into place are discarded by the store itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, SemanticError};

/// Clonable cancellation flag shared between a caller and an operation
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

    /// Fail with a `Cancelled` error naming the operation if the flag is set.
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(SemanticError::cancelled(operation))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_fresh_token_passes() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check("snapshot").is_ok());
    }

    #[test]
    fn test_cancelled_token_fails_check() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        let err = token.check("snapshot").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);
        assert!(err.message.contains("snapshot"));
    }
}
