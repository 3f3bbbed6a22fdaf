//! Cosmetic upload progress.
//!
//! The proxy does not report byte progress, so while an upload is in flight the page advances a
//! percentage on a timer up to a ceiling, then jumps to 100 when the request succeeds.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU8, Ordering},
};
use std::time::Duration;
use tokio_util::sync::{CancellationToken, DropGuard};

pub const TICK_INTERVAL: Duration = Duration::from_millis(300);
pub const TICK_STEP: u8 = 5;
/// The ticker never goes past this; only a settled upload reaches 100.
pub const TICK_CEILING: u8 = 95;

/// Shared, readable upload percentage.
#[derive(Debug, Clone, Default)]
pub struct Progress(Arc<AtomicU8>);

impl Progress {
    pub fn get(&self) -> u8 {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn set(&self, value: u8) {
        self.0.store(value.min(100), Ordering::SeqCst);
    }

    /// Advance by one step, stopping at the ceiling. Values at or above it are left alone.
    /// Returns the value after the update.
    fn advance(&self) -> u8 {
        match self.0.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |p| {
            (p < TICK_CEILING).then(|| (p + TICK_STEP).min(TICK_CEILING))
        }) {
            Ok(previous) => (previous + TICK_STEP).min(TICK_CEILING),
            Err(current) => current,
        }
    }
}

/// Shared in-flight indicator, readable while the operation that raised it is still running.
#[derive(Debug, Clone, Default)]
pub struct PendingFlag(Arc<AtomicBool>);

impl PendingFlag {
    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raise the flag until the returned guard is dropped.
    pub(crate) fn raise(&self) -> PendingGuard {
        self.0.store(true, Ordering::SeqCst);
        PendingGuard(self.clone())
    }
}

/// Lowers its [`PendingFlag`] on drop, including when the owning future is cancelled.
#[derive(Debug)]
pub(crate) struct PendingGuard(PendingFlag);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.0.store(false, Ordering::SeqCst);
    }
}

/// Background task driving [`Progress`] while an upload is pending.
///
/// The task stops when the ticker is dropped, so every exit path from the upload cancels it.
#[derive(Debug)]
pub struct ProgressTicker {
    _guard: DropGuard,
}

impl ProgressTicker {
    /// Must be called from within a tokio runtime.
    pub fn start(progress: Progress) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        if progress.advance() >= TICK_CEILING {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            _guard: token.drop_guard(),
        }
    }
}
