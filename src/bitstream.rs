//! Buffered byte and bit I/O over asynchronous sources and sinks.
//!
//! Codes are packed least significant bit first: the first code occupies the low bits of the
//! first byte and continues into the following bytes. The only suspension points are the reads
//! and writes on the underlying source or sink, never the bit accumulation itself.
use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::DEFAULT_BUFFER_SIZE;
use crate::error::{Error, Result};

/// The widest value a single `read_bits` or `write_bits` call handles.
pub const MAX_BITS: u8 = 16;

/// Reads bytes and packed bit fields from an asynchronous source.
pub struct BitReader<R> {
    source: R,
    buffer: Box<[u8]>,
    /// Read position within the filled part of `buffer`, `None` before the first fill.
    pos: Option<usize>,
    /// Number of valid bytes in `buffer`.
    len: usize,
    /// The bit accumulator.
    bit_buffer: u32,
    /// The number of valid bits in the accumulator.
    bits: u8,
    total: usize,
}

/// Writes bytes and packed bit fields to an asynchronous sink.
pub struct BitWriter<W> {
    sink: W,
    buffer: Box<[u8]>,
    /// Number of pending bytes in `buffer`.
    pos: usize,
    /// The bit accumulator.
    bit_buffer: u32,
    /// The number of valid bits in the accumulator.
    bits: u8,
    total: usize,
}

impl<R: AsyncRead + Unpin> BitReader<R> {
    pub fn new(source: R) -> Self {
        BitReader::with_capacity(DEFAULT_BUFFER_SIZE, source)
    }

    pub fn with_capacity(capacity: usize, source: R) -> Self {
        BitReader {
            source,
            buffer: vec![0; capacity.max(1)].into_boxed_slice(),
            pos: None,
            len: 0,
            bit_buffer: 0,
            bits: 0,
            total: 0,
        }
    }

    /// Read the next byte, refilling the buffer from the source when it is drained.
    ///
    /// Fails with `UnexpectedEndOfStream` once the source is exhausted.
    pub async fn read_byte(&mut self) -> Result<u8> {
        let pos = match self.pos {
            Some(pos) if pos < self.len => pos,
            _ => {
                let read = self.source.read(&mut self.buffer[..]).await?;
                if read == 0 {
                    return Err(Error::UnexpectedEndOfStream);
                }
                self.len = read;
                0
            }
        };

        self.pos = Some(pos + 1);
        self.total += 1;
        Ok(self.buffer[pos])
    }

    /// Fill `out` completely with the next bytes of the source.
    pub async fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        for byte in out.iter_mut() {
            *byte = self.read_byte().await?;
        }
        Ok(())
    }

    /// Read a little endian `u32`.
    pub async fn read_u32_le(&mut self) -> Result<u32> {
        let mut bytes = [0; 4];
        self.read_exact(&mut bytes).await?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read the next `count` bits, least significant first.
    pub async fn read_bits(&mut self, count: u8) -> Result<u16> {
        debug_assert!((1..=MAX_BITS).contains(&count));
        while self.bits < count {
            let byte = self.read_byte().await?;
            self.bit_buffer |= u32::from(byte) << self.bits;
            self.bits += 8;
        }

        let value = self.bit_buffer & ((1 << count) - 1);
        self.bit_buffer >>= count;
        self.bits -= count;
        Ok(value as u16)
    }

    /// Drop the bits of a partially consumed byte so that reads continue byte aligned.
    pub fn align(&mut self) {
        self.bit_buffer = 0;
        self.bits = 0;
    }

    /// The number of bytes consumed so far.
    pub fn total_read(&self) -> usize {
        self.total
    }

    /// Unwrap the source. Bytes already buffered but not consumed are lost.
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<W: AsyncWrite + Unpin> BitWriter<W> {
    pub fn new(sink: W) -> Self {
        BitWriter::with_capacity(DEFAULT_BUFFER_SIZE, sink)
    }

    pub fn with_capacity(capacity: usize, sink: W) -> Self {
        BitWriter {
            sink,
            buffer: vec![0; capacity.max(1)].into_boxed_slice(),
            pos: 0,
            bit_buffer: 0,
            bits: 0,
            total: 0,
        }
    }

    /// Append one byte, handing the buffer to the sink when it is full.
    pub async fn write_byte(&mut self, byte: u8) -> Result<()> {
        if self.pos >= self.buffer.len() {
            self.flush_buffer().await?;
        }

        self.buffer[self.pos] = byte;
        self.pos += 1;
        self.total += 1;
        Ok(())
    }

    pub async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.write_byte(byte).await?;
        }
        Ok(())
    }

    /// Append the low `count` bits of `value`, least significant first.
    pub async fn write_bits(&mut self, value: u16, count: u8) -> Result<()> {
        debug_assert!((1..=MAX_BITS).contains(&count));
        let mask = (1u32 << count) - 1;
        self.bit_buffer |= (u32::from(value) & mask) << self.bits;
        self.bits += count;
        while self.bits >= 8 {
            self.write_byte(self.bit_buffer as u8).await?;
            self.bit_buffer >>= 8;
            self.bits -= 8;
        }
        Ok(())
    }

    /// Pad the trailing partial byte with zero bits and push everything to the sink.
    ///
    /// Must be called once after the last `write_bits` or up to seven bits are lost.
    pub async fn end_write_bits(&mut self) -> Result<()> {
        if self.bits > 0 {
            self.write_byte(self.bit_buffer as u8).await?;
            self.bit_buffer = 0;
            self.bits = 0;
        }
        self.flush().await
    }

    /// Push buffered bytes to the sink and flush it. Does nothing harmful when nothing is pending.
    pub async fn flush(&mut self) -> Result<()> {
        self.flush_buffer().await?;
        self.sink.flush().await?;
        Ok(())
    }

    /// The number of bytes written so far, including those still buffered.
    pub fn total_written(&self) -> usize {
        self.total
    }

    /// Unwrap the sink. Call `flush` first, buffered bytes are dropped otherwise.
    pub fn into_inner(self) -> W {
        self.sink
    }

    async fn flush_buffer(&mut self) -> Result<()> {
        if self.pos > 0 {
            self.sink.write_all(&self.buffer[..self.pos]).await?;
            self.pos = 0;
        }
        Ok(())
    }
}
