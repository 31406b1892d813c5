//! Progress notifications and cooperative cancellation.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How far a stream operation has come, in bytes of uncompressed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub max: usize,
    pub current: usize,
}

/// A callback receiving progress notifications.
pub type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

/// A shared flag used to stop a running operation early.
///
/// Clones observe the same flag. The coder checks it once per input byte when
/// encoding and once per code when decoding.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Request cancellation of every operation observing this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Throttles calls into the progress callback.
pub(crate) struct Reporter {
    callback: Option<ProgressFn>,
    increment: usize,
    counter: usize,
    last: Option<usize>,
}

impl Reporter {
    pub(crate) fn new(callback: Option<ProgressFn>, increment: usize) -> Self {
        Reporter {
            callback,
            increment: increment.max(1),
            counter: 0,
            last: None,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.counter = 0;
        self.last = None;
    }

    /// Record that `current` of `max` bytes have been processed.
    ///
    /// Fires once every `increment` updates and once when `current` reaches `max`.
    pub(crate) fn update(&mut self, max: usize, current: usize) {
        let callback = match &self.callback {
            Some(callback) => callback,
            None => return,
        };

        self.counter += 1;
        if self.counter >= self.increment || current >= max {
            if self.last != Some(current) {
                callback(Progress { max, current });
                self.last = Some(current);
            }
            self.counter = 0;
        }
    }
}
