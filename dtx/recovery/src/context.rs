use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{CancelReason, RecoveryError, RecoveryResult};

/// Cancellation scope of one recovery call.
///
/// Clones share the cancellation flag, so a caller can hand a clone to the operation and cancel
/// it from another thread. A deadline, once passed, cancels the context as well.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled unless [`Context::cancel`] is called.
    #[inline]
    pub fn background() -> Self {
        Self::default()
    }

    /// Derives a context sharing this one's flag that also expires at `deadline`.
    #[inline]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        };
        Self {
            cancelled: self.cancelled.clone(),
            deadline: Some(deadline),
        }
    }

    #[inline]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context is done, or `None` while it is still live.
    pub fn done(&self) -> Option<CancelReason> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Some(CancelReason::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.done().is_some()
    }

    /// Fails with [`RecoveryError::Cancelled`] once the context is done.
    #[inline]
    pub fn check(&self) -> RecoveryResult<()> {
        match self.done() {
            Some(reason) => Err(RecoveryError::Cancelled(reason)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_is_live() {
        let ctx = Context::background();
        assert!(!ctx.is_done());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn test_cancel_is_shared() {
        let ctx = Context::background();
        let child = ctx.with_timeout(Duration::from_secs(3600));
        ctx.cancel();
        assert_eq!(child.done(), Some(CancelReason::Canceled));
        assert!(child.check().unwrap_err().is_cancelled());
    }

    #[test]
    fn test_deadline() {
        let ctx = Context::background().with_deadline(Instant::now());
        assert_eq!(ctx.done(), Some(CancelReason::DeadlineExceeded));
    }

    #[test]
    fn test_deadline_only_tightens() {
        let now = Instant::now();
        let ctx = Context::background().with_deadline(now + Duration::from_secs(1));
        let child = ctx.with_deadline(now + Duration::from_secs(60));
        assert_eq!(child.deadline(), Some(now + Duration::from_secs(1)));
    }
}
