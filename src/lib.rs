//! # LZW coder and the APLIMG image container
//!
//! This crate provides an `Encoder` and a `Decoder` for an adaptive LZW variant with explicit
//! code width escapes, and the APLIMG container which frames a raw pixel buffer with a header,
//! an optional palette and an LZW compressed payload. All I/O goes through the asynchronous
//! `futures::io` traits; in-memory helpers drive them on the current thread.
//!
//! Codes are written least significant bit first. Every stream starts at 9 bit codes and
//! widens up to a maximum of 12 or 13 bits. The reserved codes sit directly above the 256
//! byte values:
//!
//!  * `END_OF_STREAM      == 256`
//!  * `INCREASE_CODE_SIZE == 257`
//!  * `CLEAR_DICTIONARY   == 258`
//!
//! A compressed payload is one byte holding the maximum code width, optionally the original
//! length as a little endian `u32`, and then the code stream terminated by `END_OF_STREAM`.
//!
//! Exemplary use of the encoder:
//!
//! ```
//! use aplimg::{encode::Encoder, decode::Decoder, CompressionLevel};
//! let data = b"TOBEORNOTTOBEORTOBEORNOT";
//!
//! let compressed = Encoder::new(CompressionLevel::High).encode(&data[..]).unwrap();
//! let decompressed = Decoder::new().decode(&compressed).unwrap();
//! assert_eq!(decompressed, &data[..]);
//! ```
//!
//! And of the container:
//!
//! ```
//! use aplimg::{Compression, CompressionLevel, Image};
//! let mut image = Image::new(4, 2, 8).unwrap();
//! image.buffer_mut().copy_from_slice(b"abababab");
//!
//! let bytes = image.to_bytes(Compression::Lzw, CompressionLevel::Low).unwrap();
//! assert_eq!(Image::from_bytes(&bytes).unwrap(), image);
//! ```
#![forbid(unsafe_code)]

use crate::error::{Result, Unsupported};

/// The code width every stream and every dictionary epoch starts with.
pub const START_CODESIZE: u8 = 9;

/// The maximum code widths a stream may declare.
pub const SUPPORTED_CODESIZES: [u8; 2] = [12, 13];

/// The maximum code width used when nothing else is configured.
pub const DEFAULT_CODESIZE: u8 = 13;

/// Alias for a LZW code point
pub type Code = u16;

/// Selects the maximum code width of the LZW coder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompressionLevel {
    /// 12 bit codes.
    Low = 0,
    /// 12 bit codes.
    Medium = 1,
    /// 13 bit codes.
    High = 2,
}

impl CompressionLevel {
    /// The maximum code width of this level.
    pub fn code_size(self) -> u8 {
        match self {
            CompressionLevel::Low | CompressionLevel::Medium => 12,
            CompressionLevel::High => 13,
        }
    }

    /// Decode the tag stored in a container header.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(CompressionLevel::Low),
            1 => Some(CompressionLevel::Medium),
            2 => Some(CompressionLevel::High),
            _ => None,
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        CompressionLevel::High
    }
}

/// Reject maximum code widths other than the supported ones.
pub(crate) fn check_code_size(code_size: u8) -> Result<u8> {
    if SUPPORTED_CODESIZES.contains(&code_size) {
        Ok(code_size)
    } else {
        Err(Unsupported::CodeSize(code_size).into())
    }
}

pub mod bitstream;
pub mod codes;
pub mod config;
pub mod decode;
mod dictionary;
pub mod encode;
pub mod error;
pub mod image;
pub mod progress;

pub use crate::config::Configuration;
pub use crate::error::{Error, LzwStatus, StreamResult};
pub use crate::image::{Compression, Header, Image, Palette, Rgb};
pub use crate::progress::{CancelToken, Progress};
