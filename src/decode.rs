//! A module for all decoding needs.
use futures::executor::block_on;
use futures::io::{AsyncRead, AsyncWrite};

use crate::bitstream::{BitReader, BitWriter};
use crate::codes::CodeTable;
use crate::config::Configuration;
use crate::dictionary::{table_size, Dictionary};
use crate::error::{Error, LzwStatus, Result, StreamResult};
use crate::progress::Reporter;
use crate::{check_code_size, Code};

/// The state for decoding data with an LZW algorithm.
///
/// The maximum code size is read from each stream, so one decoder handles streams written at
/// any supported compression level.
pub struct Decoder {
    codes: CodeTable,
    config: Configuration,
    reporter: Reporter,
    /// The string decoded from the latest code.
    scratch: Vec<u8>,
    /// The maximum code size declared by the most recent stream.
    code_size: Option<u8>,
}

/// An asynchronous decoding sink.
///
/// See [`Decoder::into_async`] on how to create this type.
///
/// [`Decoder::into_async`]: struct.Decoder.html#method.into_async
pub struct IntoAsync<'d, W> {
    decoder: &'d mut Decoder,
    writer: W,
}

impl Decoder {
    pub fn new() -> Self {
        Decoder::with_config(Configuration::default())
    }

    pub fn with_config(config: Configuration) -> Self {
        let reporter = Reporter::new(config.progress(), config.progress_increment());
        Decoder {
            codes: CodeTable::default(),
            config,
            reporter,
            scratch: Vec::new(),
            code_size: None,
        }
    }

    /// The maximum code size of the last stream this decoder started on.
    pub fn code_size(&self) -> Option<u8> {
        self.code_size
    }

    /// Decode a complete in-memory stream.
    pub fn decode(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() * 2);
        block_on(self.into_async(&mut output).decode_all(data, None)).into_result()?;
        Ok(output)
    }

    /// Decode a complete in-memory stream that must expand to exactly `length` bytes.
    pub fn decode_exact(&mut self, data: &[u8], length: usize) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(length);
        block_on(self.into_async(&mut output).decode_all(data, Some(length))).into_result()?;
        Ok(output)
    }

    /// Construct a decoder into an asynchronous writer.
    pub fn into_async<W: AsyncWrite + Unpin>(&mut self, writer: W) -> IntoAsync<'_, W> {
        IntoAsync {
            decoder: self,
            writer,
        }
    }

    /// Decode one stream from `reader` into `writer`, up to and including its end code.
    ///
    /// With `expected` set, the stream must expand to exactly that many bytes. An appended
    /// total, when configured, takes the same role and must agree with `expected`.
    pub async fn decode_stream<R, W>(
        &mut self,
        reader: &mut BitReader<R>,
        writer: &mut BitWriter<W>,
        expected: Option<usize>,
    ) -> Result<LzwStatus>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let code_size = check_code_size(reader.read_byte().await?)?;
        self.code_size = Some(code_size);

        let mut expected = expected;
        if self.config.append_total() {
            let total = reader.read_u32_le().await? as usize;
            if expected.map_or(false, |length| length != total) {
                return Err(Error::CorruptStream("stored total disagrees with expected size"));
            }
            expected = Some(total);
        }

        log::debug!(
            "lzw decode: codes up to {} bits, expecting {:?} bytes",
            code_size,
            expected
        );

        let mut dictionary = Dictionary::new(self.codes, code_size);
        self.reporter.reset();
        self.scratch.reserve(table_size(code_size));
        let limit = expected.unwrap_or(usize::MAX);
        let mut written = 0usize;
        // The previous code of this dictionary epoch.
        let mut previous: Option<Code> = None;

        loop {
            if self.config.is_cancelled() {
                log::debug!("lzw decode: cancelled after {} bytes", written);
                writer.flush().await?;
                return Ok(LzwStatus::Cancelled);
            }

            let code = reader.read_bits(dictionary.code_size()).await?;
            if code == self.codes.end_of_stream() {
                break;
            }
            if code == self.codes.increase_code_size() {
                if !dictionary.grow() {
                    return Err(Error::CorruptStream("code size grows past its maximum"));
                }
                log::trace!("lzw decode: code size grows to {} bits", dictionary.code_size());
                continue;
            }
            if code == self.codes.clear_dictionary() {
                dictionary.reset();
                previous = None;
                log::debug!("lzw decode: dictionary cleared after {} bytes", written);
                continue;
            }

            match previous {
                None => {
                    if !self.codes.is_literal(code) {
                        return Err(Error::CorruptStream("dictionary epoch starts with a string"));
                    }
                    self.scratch.clear();
                    self.scratch.push(code as u8);
                }
                Some(previous) if code == dictionary.next_code() => {
                    // The code being defined: the previous string plus its own first byte.
                    let first = dictionary.expand(previous, &mut self.scratch)?;
                    self.scratch.push(first);
                    if dictionary.push(previous, first) != Some(code) {
                        return Err(Error::CorruptStream("code beyond the dictionary capacity"));
                    }
                }
                Some(previous) => {
                    let first = dictionary.expand(code, &mut self.scratch)?;
                    // A full table is always followed by a clear code.
                    if dictionary.push(previous, first).is_none() {
                        return Err(Error::CorruptStream("string follows a full dictionary"));
                    }
                }
            }

            written += self.scratch.len();
            if written > limit {
                return Err(Error::CorruptStream("stream expands beyond the expected size"));
            }
            writer.write_bytes(&self.scratch).await?;
            // Without a known total only completion is reported.
            if let Some(max) = expected {
                self.reporter.update(max, written);
            }
            previous = Some(code);
        }

        if expected.map_or(false, |length| length != written) {
            return Err(Error::CorruptStream("stream ends before the expected size"));
        }

        self.reporter.update(written, written);
        writer.flush().await?;
        Ok(LzwStatus::Done)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new()
    }
}

impl<W: AsyncWrite + Unpin> IntoAsync<'_, W> {
    /// Decode one stream from a reader, optionally checking its expanded length.
    pub async fn decode_all<R: AsyncRead + Unpin>(
        self,
        read: R,
        expected: Option<usize>,
    ) -> StreamResult {
        let IntoAsync { decoder, writer } = self;
        let mut reader = BitReader::with_capacity(decoder.config.read_buffer_size(), read);
        let mut writer = BitWriter::with_capacity(decoder.config.write_buffer_size(), writer);

        let status = decoder.decode_stream(&mut reader, &mut writer, expected).await;

        StreamResult {
            bytes_read: reader.total_read(),
            bytes_written: writer.total_written(),
            status,
        }
    }
}

/// Read the original length stored in front of a stream written with an appended total.
///
/// Only the code size byte and the total are inspected, nothing is decoded.
pub fn original_size(data: &[u8]) -> Result<usize> {
    match data {
        [code_size, a, b, c, d, ..] => {
            check_code_size(*code_size)?;
            Ok(u32::from_le_bytes([*a, *b, *c, *d]) as usize)
        }
        _ => Err(Error::UnexpectedEndOfStream),
    }
}
