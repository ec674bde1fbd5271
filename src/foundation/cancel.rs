use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::error::{LiikeError, LiikeResult};

/// Shared cooperative cancellation flag.
///
/// Clones observe the same flag. Polled at the top of every frame and around blocking seeks.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> LiikeResult<()> {
        if self.is_cancelled() {
            return Err(LiikeError::Cancelled);
        }
        Ok(())
    }
}
