//! Tunables shared by the encoder, the decoder and the image container.
use core::fmt;
use std::sync::Arc;

use crate::progress::{CancelToken, Progress, ProgressFn};

/// Default size of the internal read and write buffers.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Default number of processed bytes between two progress notifications.
pub const DEFAULT_PROGRESS_INCREMENT: usize = 1024;

/// Configuration of a coding operation.
///
/// ```
/// use aplimg::Configuration;
///
/// let config = Configuration::new()
///     .with_append_total(true)
///     .with_read_buffer_size(1 << 16);
/// assert!(config.append_total());
/// ```
#[derive(Clone)]
pub struct Configuration {
    read_buffer_size: usize,
    write_buffer_size: usize,
    progress_increment: usize,
    append_total: bool,
    progress: Option<ProgressFn>,
    cancel: Option<CancelToken>,
}

impl Configuration {
    pub fn new() -> Self {
        Configuration {
            read_buffer_size: DEFAULT_BUFFER_SIZE,
            write_buffer_size: DEFAULT_BUFFER_SIZE,
            progress_increment: DEFAULT_PROGRESS_INCREMENT,
            append_total: false,
            progress: None,
            cancel: None,
        }
    }

    /// Set the size of the buffer between the source and the bit reader.
    pub fn with_read_buffer_size(self, size: usize) -> Self {
        Configuration {
            read_buffer_size: size.max(1),
            ..self
        }
    }

    /// Set the size of the buffer between the bit writer and the sink.
    pub fn with_write_buffer_size(self, size: usize) -> Self {
        Configuration {
            write_buffer_size: size.max(1),
            ..self
        }
    }

    /// Set how many bytes pass between two progress notifications.
    pub fn with_progress_increment(self, increment: usize) -> Self {
        Configuration {
            progress_increment: increment.max(1),
            ..self
        }
    }

    /// Store the uncompressed length in front of the code stream.
    ///
    /// Encoder and decoder must agree on this setting, it is not recorded in the stream.
    pub fn with_append_total(self, append_total: bool) -> Self {
        Configuration {
            append_total,
            ..self
        }
    }

    /// Register a callback for progress notifications.
    ///
    /// The callback runs on the coding task and should return quickly.
    pub fn on_progress(self, callback: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        Configuration {
            progress: Some(Arc::new(callback)),
            ..self
        }
    }

    /// Observe a token for cooperative cancellation.
    pub fn with_cancel_token(self, token: CancelToken) -> Self {
        Configuration {
            cancel: Some(token),
            ..self
        }
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    pub fn write_buffer_size(&self) -> usize {
        self.write_buffer_size
    }

    pub fn progress_increment(&self) -> usize {
        self.progress_increment
    }

    pub fn append_total(&self) -> bool {
        self.append_total
    }

    pub(crate) fn progress(&self) -> Option<ProgressFn> {
        self.progress.clone()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, CancelToken::is_cancelled)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration::new()
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("read_buffer_size", &self.read_buffer_size)
            .field("write_buffer_size", &self.write_buffer_size)
            .field("progress_increment", &self.progress_increment)
            .field("append_total", &self.append_total)
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_never_zero() {
        let config = Configuration::new()
            .with_read_buffer_size(0)
            .with_write_buffer_size(0)
            .with_progress_increment(0);
        assert_eq!(config.read_buffer_size(), 1);
        assert_eq!(config.write_buffer_size(), 1);
        assert_eq!(config.progress_increment(), 1);
    }

    #[test]
    fn cancellation_follows_token() {
        let token = CancelToken::new();
        let config = Configuration::new().with_cancel_token(token.clone());
        assert!(!config.is_cancelled());
        token.cancel();
        assert!(config.is_cancelled());
        assert!(!Configuration::new().is_cancelled());
    }
}
