//! Errors of the coder and the container.
use core::fmt;
use std::io;

/// A configuration value that this implementation does not handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    /// A maximum code width other than 12 or 13 bits.
    CodeSize(u8),
    /// A data alphabet wider than a byte, or empty.
    DataBits(u8),
    /// An unknown compression kind tag in a container header.
    Compression(u8),
    /// An unknown compression level tag in a container header.
    CompressionLevel(u8),
    /// The header announces extended data, which no reader understands yet.
    ExtendedData,
    /// Pixel data larger than the header's signed 32-bit size field.
    ImageSize(usize),
}

/// The error type of all fallible operations in this crate.
#[derive(Debug)]
pub enum Error {
    /// The data is not an APLIMG container or is internally inconsistent.
    InvalidFormat(&'static str),
    /// The container was written by a newer major version.
    UnsupportedVersion { major: u8, minor: u8 },
    /// A code width, compression kind or similar setting is not supported.
    UnsupportedConfiguration(Unsupported),
    /// The source ended before the stream was complete.
    UnexpectedEndOfStream,
    /// A code or prefix chain refers to state that does not exist.
    CorruptStream(&'static str),
    /// The operation was cancelled through its `CancelToken`.
    Cancelled,
    /// The underlying source or sink failed.
    Io(io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

/// The outcome of a stream operation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzwStatus {
    /// The whole stream was processed.
    Done,
    /// Processing stopped early on request; the output is incomplete.
    Cancelled,
}

/// The result of coding a whole stream.
#[derive(Debug)]
pub struct StreamResult {
    /// The total number of bytes consumed from the reader.
    pub bytes_read: usize,
    /// The total number of bytes written into the writer.
    pub bytes_written: usize,
    pub status: Result<LzwStatus>,
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unsupported::CodeSize(size) => write!(f, "code size of {} bits", size),
            Unsupported::DataBits(bits) => write!(f, "data alphabet of {} bits", bits),
            Unsupported::Compression(tag) => write!(f, "compression kind {}", tag),
            Unsupported::CompressionLevel(tag) => write!(f, "compression level {}", tag),
            Unsupported::ExtendedData => f.write_str("extended image data"),
            Unsupported::ImageSize(size) => write!(f, "image data of {} bytes", size),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidFormat(what) => write!(f, "invalid image format: {}", what),
            Error::UnsupportedVersion { major, minor } => {
                write!(f, "unsupported image version {}.{}", major, minor)
            }
            Error::UnsupportedConfiguration(what) => write!(f, "unsupported {}", what),
            Error::UnexpectedEndOfStream => f.write_str("unexpected end of stream"),
            Error::CorruptStream(what) => write!(f, "corrupt lzw stream: {}", what),
            Error::Cancelled => f.write_str("operation cancelled"),
            Error::Io(err) => write!(f, "i/o error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::UnexpectedEndOfStream,
            _ => Error::Io(err),
        }
    }
}

impl From<Unsupported> for Error {
    fn from(what: Unsupported) -> Self {
        Error::UnsupportedConfiguration(what)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(err) => err,
            Error::UnexpectedEndOfStream => {
                io::Error::new(io::ErrorKind::UnexpectedEof, "unexpected end of stream")
            }
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}

impl StreamResult {
    /// Collapse into a plain result, treating cancellation as an error.
    pub fn into_result(self) -> Result<usize> {
        match self.status? {
            LzwStatus::Done => Ok(self.bytes_written),
            LzwStatus::Cancelled => Err(Error::Cancelled),
        }
    }
}
