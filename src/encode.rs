//! A module for all encoding needs.
use core::convert::TryFrom;

use futures::executor::block_on;
use futures::io::{AsyncRead, AsyncWrite};

use crate::bitstream::{BitReader, BitWriter};
use crate::codes::CodeTable;
use crate::config::Configuration;
use crate::dictionary::Dictionary;
use crate::error::{Error, LzwStatus, Result, StreamResult, Unsupported};
use crate::progress::Reporter;
use crate::{check_code_size, Code, CompressionLevel};

/// The state for encoding data with an LZW algorithm.
///
/// One encoder handles one stream at a time; its dictionary is rebuilt for every stream. Use
/// separate encoders to compress independent buffers concurrently.
pub struct Encoder {
    /// The configured maximum code size.
    code_size: u8,
    codes: CodeTable,
    config: Configuration,
    /// The current encoding string table.
    dictionary: Dictionary,
    reporter: Reporter,
}

/// An asynchronous encoding sink.
///
/// See [`Encoder::into_async`] on how to create this type.
///
/// [`Encoder::into_async`]: struct.Encoder.html#method.into_async
pub struct IntoAsync<'d, W> {
    encoder: &'d mut Encoder,
    writer: W,
}

impl Encoder {
    /// Create an encoder whose maximum code size follows `level`.
    pub fn new(level: CompressionLevel) -> Self {
        Encoder::with_config(level, Configuration::default())
    }

    pub fn with_config(level: CompressionLevel, config: Configuration) -> Self {
        Encoder::build(level.code_size(), config)
    }

    /// Create an encoder with an explicit maximum code size.
    ///
    /// Fails with `UnsupportedConfiguration` unless `code_size` is 12 or 13.
    pub fn with_code_size(code_size: u8, config: Configuration) -> Result<Self> {
        let code_size = check_code_size(code_size)?;
        Ok(Encoder::build(code_size, config))
    }

    fn build(code_size: u8, config: Configuration) -> Self {
        let codes = CodeTable::default();
        let reporter = Reporter::new(config.progress(), config.progress_increment());
        Encoder {
            code_size,
            codes,
            config,
            dictionary: Dictionary::new(codes, code_size),
            reporter,
        }
    }

    /// The maximum code size written into the stream.
    pub fn code_size(&self) -> u8 {
        self.code_size
    }

    /// Encode a complete in-memory buffer.
    ///
    /// Cancellation through the configured token surfaces as `Error::Cancelled`.
    pub fn encode(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() / 2 + 16);
        block_on(self.into_async(&mut output).encode_all(data, data.len())).into_result()?;
        Ok(output)
    }

    /// Construct an encoder into an asynchronous writer.
    pub fn into_async<W: AsyncWrite + Unpin>(&mut self, writer: W) -> IntoAsync<'_, W> {
        IntoAsync {
            encoder: self,
            writer,
        }
    }

    /// Encode exactly `length` bytes from `reader` into `writer`.
    ///
    /// Writes the code size byte, the optional total and the code stream, then pads and flushes
    /// the writer. The reader may be positioned anywhere, for example after a header.
    pub async fn encode_stream<R, W>(
        &mut self,
        reader: &mut BitReader<R>,
        writer: &mut BitWriter<W>,
        length: usize,
    ) -> Result<LzwStatus>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.dictionary.reset();
        self.reporter.reset();
        log::debug!(
            "lzw encode: {} bytes with codes up to {} bits",
            length,
            self.code_size
        );

        writer.write_byte(self.code_size).await?;
        if self.config.append_total() {
            let total = u32::try_from(length)
                .map_err(|_| Error::from(Unsupported::ImageSize(length)))?;
            writer.write_bytes(&total.to_le_bytes()).await?;
        }

        if length == 0 {
            writer
                .write_bits(self.codes.end_of_stream(), self.dictionary.code_size())
                .await?;
            writer.end_write_bits().await?;
            self.reporter.update(0, 0);
            return Ok(LzwStatus::Done);
        }

        let mut code = Code::from(reader.read_byte().await?);
        let mut consumed = 1;
        self.reporter.update(length, consumed);

        while consumed < length {
            if self.config.is_cancelled() {
                log::debug!("lzw encode: cancelled after {} of {} bytes", consumed, length);
                writer.end_write_bits().await?;
                return Ok(LzwStatus::Cancelled);
            }

            let byte = reader.read_byte().await?;
            consumed += 1;
            self.reporter.update(length, consumed);

            let slot = match self.dictionary.find(code, byte) {
                Ok(extended) => {
                    code = extended;
                    continue;
                }
                Err(slot) => slot,
            };

            // On a full table the string stays unassigned and the overflow flag is raised.
            let _ = self.dictionary.insert(slot, code, byte);
            self.write_code(writer, code).await?;
            code = Code::from(byte);

            if self.dictionary.overflowed() {
                writer
                    .write_bits(self.codes.clear_dictionary(), self.dictionary.code_size())
                    .await?;
                self.dictionary.reset();
                log::debug!("lzw encode: dictionary full, cleared after {} bytes", consumed);
            }
        }

        self.write_code(writer, code).await?;
        writer
            .write_bits(self.codes.end_of_stream(), self.dictionary.code_size())
            .await?;
        writer.end_write_bits().await?;
        Ok(LzwStatus::Done)
    }

    /// Emit `code`, preceded by as many size escapes as it needs to fit.
    async fn write_code<W: AsyncWrite + Unpin>(
        &mut self,
        writer: &mut BitWriter<W>,
        code: Code,
    ) -> Result<()> {
        while self.dictionary.needs_growth(code) {
            writer
                .write_bits(self.codes.increase_code_size(), self.dictionary.code_size())
                .await?;
            self.dictionary.grow();
            log::trace!(
                "lzw encode: code size grows to {} bits",
                self.dictionary.code_size()
            );
        }

        writer.write_bits(code, self.dictionary.code_size()).await
    }
}

impl<W: AsyncWrite + Unpin> IntoAsync<'_, W> {
    /// Encode `length` bytes from a reader.
    ///
    /// The reader is consumed through an internal buffer, so it may be read past `length`.
    pub async fn encode_all<R: AsyncRead + Unpin>(self, read: R, length: usize) -> StreamResult {
        let IntoAsync { encoder, writer } = self;
        let mut reader = BitReader::with_capacity(encoder.config.read_buffer_size(), read);
        let mut writer = BitWriter::with_capacity(encoder.config.write_buffer_size(), writer);

        let status = encoder.encode_stream(&mut reader, &mut writer, length).await;

        StreamResult {
            bytes_read: reader.total_read(),
            bytes_written: writer.total_written(),
            status,
        }
    }
}
