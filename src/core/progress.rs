//! Progress reporting and cooperative cancellation
//!
//! Every streaming pass receives a [`PassContext`]. The context forwards
//! progress to a [`ProgressListener`] and combines the listener's
//! continue/stop answer with a shared [`CancellationToken`]. Passes call
//! [`PassContext::checkpoint`] at record boundaries (normalization) or every
//! fixed number of elements (statistics) and abort with
//! [`StrataError::Cancelled`] when either side asks them to stop.

use crate::domain::{Result, StrataError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receiver of progress for one pass
pub trait ProgressListener: Send {
    /// Called once before the pass starts; `total` is an estimate, 0 when unknown
    fn prepare(&mut self, total: u64);

    /// Called with the running count; returning `false` stops the pass
    fn advance(&mut self, done: u64) -> bool;

    /// Called once when the pass ends, successfully or not
    fn finish(&mut self, success: bool);
}

/// Listener that ignores progress and never stops the pass
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn prepare(&mut self, _total: u64) {}

    fn advance(&mut self, _done: u64) -> bool {
        true
    }

    fn finish(&mut self, _success: bool) {}
}

/// Listener that reports through `tracing` at debug level
#[derive(Debug, Default)]
pub struct LoggingProgress {
    label: String,
    total: u64,
}

impl LoggingProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            total: 0,
        }
    }
}

impl ProgressListener for LoggingProgress {
    fn prepare(&mut self, total: u64) {
        self.total = total;
        tracing::debug!(pass = %self.label, total, "Pass prepared");
    }

    fn advance(&mut self, done: u64) -> bool {
        if self.total > 0 {
            tracing::debug!(
                pass = %self.label,
                done,
                total = self.total,
                progress_pct = (done as f64 / self.total as f64 * 100.0),
                "Pass progress"
            );
        } else {
            tracing::debug!(pass = %self.label, done, "Pass progress");
        }
        true
    }

    fn finish(&mut self, success: bool) {
        tracing::debug!(pass = %self.label, success, "Pass finished");
    }
}

/// Shared stop flag, cheap to clone and safe to trip from any thread
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
}

/// Receiver of fatal pass failures (the user-facing alert channel)
pub trait AlertSink: Send + Sync {
    fn alert(&self, context: &str, error: &StrataError);
}

/// Alert sink that logs through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn alert(&self, context: &str, error: &StrataError) {
        crate::log_error_with_context!(error, context);
    }
}

/// Per-pass progress and cancellation state
pub struct PassContext<'a> {
    listener: &'a mut dyn ProgressListener,
    token: CancellationToken,
}

impl<'a> PassContext<'a> {
    pub fn new(listener: &'a mut dyn ProgressListener, token: CancellationToken) -> Self {
        Self { listener, token }
    }

    pub fn prepare(&mut self, total: u64) {
        self.listener.prepare(total);
    }

    /// Reports `done` and fails with `Cancelled` if the pass must stop
    pub fn checkpoint(&mut self, done: u64) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(StrataError::Cancelled);
        }
        if !self.listener.advance(done) {
            self.token.cancel();
            return Err(StrataError::Cancelled);
        }
        Ok(())
    }

    pub fn finish(&mut self, success: bool) {
        self.listener.finish(success);
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StopAfter {
        limit: u64,
        prepared: Option<u64>,
        finished: Option<bool>,
    }

    impl ProgressListener for StopAfter {
        fn prepare(&mut self, total: u64) {
            self.prepared = Some(total);
        }

        fn advance(&mut self, done: u64) -> bool {
            done < self.limit
        }

        fn finish(&mut self, success: bool) {
            self.finished = Some(success);
        }
    }

    #[test]
    fn test_checkpoint_continues() {
        let mut listener = NoProgress;
        let mut ctx = PassContext::new(&mut listener, CancellationToken::new());
        assert!(ctx.checkpoint(1).is_ok());
        assert!(ctx.checkpoint(1_000_000).is_ok());
    }

    #[test]
    fn test_listener_stop_trips_token() {
        let mut listener = StopAfter {
            limit: 3,
            prepared: None,
            finished: None,
        };
        let token = CancellationToken::new();
        {
            let mut ctx = PassContext::new(&mut listener, token.clone());
            ctx.prepare(10);
            assert!(ctx.checkpoint(2).is_ok());
            assert!(matches!(ctx.checkpoint(3), Err(StrataError::Cancelled)));
            ctx.finish(false);
        }
        assert!(token.is_cancelled());
        assert_eq!(listener.prepared, Some(10));
        assert_eq!(listener.finished, Some(false));
    }

    #[test]
    fn test_token_cancel_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        let mut listener = NoProgress;
        let mut ctx = PassContext::new(&mut listener, token);
        clone.cancel();
        assert!(matches!(ctx.checkpoint(1), Err(StrataError::Cancelled)));
        assert!(ctx.token().is_cancelled());
    }
}
