//! Cooperative cancellation for long running quantization and consolidation work.

use crate::MosaicError;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A shared flag that a superseding request flips to stop stale work.
///
/// Work never stops mid-scan; it checks the token at checkpoints
/// (after the quantizer scan, after each consolidation pass, between candidate units)
/// and returns [`MosaicError::Cancelled`] once the flag is set.
/// Clones share the same flag.
///
/// # Examples
/// ```
/// # use pegmosaic::{CancelToken, MosaicError};
/// let token = CancelToken::new();
/// let worker_token = token.clone();
/// assert_eq!(worker_token.checkpoint(), Ok(()));
///
/// token.cancel();
/// assert_eq!(worker_token.checkpoint(), Err(MosaicError::Cancelled));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a new token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the flag. All clones of this token observe the cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the flag has been flipped.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Whether both tokens share the same flag.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns [`MosaicError::Cancelled`] if the flag has been flipped.
    ///
    /// # Errors
    /// See above.
    pub fn checkpoint(&self) -> Result<(), MosaicError> {
        if self.is_cancelled() {
            Err(MosaicError::Cancelled)
        } else {
            Ok(())
        }
    }
}
