//! The APLIMG container.
//!
//! A file is a fixed 24 byte header, the palette as packed RGB triples when the header says
//! there is one, and the pixel payload, stored verbatim or LZW compressed. All integers are
//! little endian.
//!
//! | Offset | Field              | Type     |
//! |--------|--------------------|----------|
//! | 0      | identifier         | `APLIMG` |
//! | 6      | major version      | u8       |
//! | 7      | minor version      | u8       |
//! | 8      | width              | u16      |
//! | 10     | height             | u16      |
//! | 12     | bits per pixel     | u8       |
//! | 13     | planes             | u8       |
//! | 14     | has palette        | bool     |
//! | 15     | palette size       | u16      |
//! | 17     | compression        | u8       |
//! | 18     | compression level  | u8       |
//! | 19     | data size          | i32      |
//! | 23     | has extended data  | bool     |
use core::convert::TryFrom;
use core::iter::FromIterator;

use futures::executor::block_on;
use futures::io::{AsyncRead, AsyncWrite};

use crate::bitstream::{BitReader, BitWriter};
use crate::config::Configuration;
use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::{Error, LzwStatus, Result, Unsupported};
use crate::progress::Reporter;
use crate::CompressionLevel;

/// The magic bytes at the start of every container.
pub const IDENTIFIER: [u8; 6] = *b"APLIMG";

pub const MAJOR_VERSION: u8 = 1;

pub const MINOR_VERSION: u8 = 0;

/// The size of the encoded header in bytes.
pub const HEADER_LEN: usize = 24;

/// Upper bound on the payload buffer reserved before any payload byte is read.
const PREALLOCATE_LIMIT: usize = 1 << 20;

/// How the pixel payload is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Compression {
    None = 0,
    Lzw = 1,
}

impl Compression {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Compression::None),
            1 => Some(Compression::Lzw),
            _ => None,
        }
    }
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Lzw
    }
}

/// One palette color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Rgb { red, green, blue }
    }
}

/// The colors of an indexed image, in index order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    pub fn new(colors: Vec<Rgb>) -> Self {
        Palette { colors }
    }

    /// Build a palette from packed RGB triples. A trailing partial triple is ignored.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        bytes
            .chunks_exact(3)
            .map(|rgb| Rgb::new(rgb[0], rgb[1], rgb[2]))
            .collect()
    }

    /// The colors as packed RGB triples.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.colors
            .iter()
            .flat_map(|c| [c.red, c.green, c.blue].to_vec())
            .collect()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl From<Vec<Rgb>> for Palette {
    fn from(colors: Vec<Rgb>) -> Self {
        Palette::new(colors)
    }
}

impl FromIterator<Rgb> for Palette {
    fn from_iter<I: IntoIterator<Item = Rgb>>(iter: I) -> Self {
        Palette::new(iter.into_iter().collect())
    }
}

/// The number of colors a palette may hold for a pixel depth.
///
/// Only formats of up to 8 bits per pixel are indexed.
pub fn max_palette_len(bpp: u8) -> usize {
    if bpp <= 8 {
        1 << bpp
    } else {
        0
    }
}

/// The size of the uncompressed pixel payload in bytes.
pub fn data_size(width: u16, height: u16, bpp: u8) -> usize {
    usize::from(width) * usize::from(height) * usize::from(bpp) / 8
}

/// Check the image parameters and return the payload size.
fn check_format(
    width: u16,
    height: u16,
    bpp: u8,
    planes: u8,
    palette: Option<usize>,
) -> Result<usize> {
    if bpp == 0 || bpp > 32 {
        return Err(Error::InvalidFormat("bits per pixel must be between 1 and 32"));
    }
    if planes == 0 {
        return Err(Error::InvalidFormat("an image needs at least one plane"));
    }
    if palette.map_or(false, |len| len > max_palette_len(bpp)) {
        return Err(Error::InvalidFormat("palette has more colors than the pixel format"));
    }

    let size = data_size(width, height, bpp);
    if i32::try_from(size).is_err() {
        return Err(Unsupported::ImageSize(size).into());
    }
    Ok(size)
}

/// The fixed size header of a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub major_version: u8,
    pub minor_version: u8,
    pub width: u16,
    pub height: u16,
    pub bpp: u8,
    pub planes: u8,
    pub has_palette: bool,
    pub palette_size: u16,
    pub compression: Compression,
    pub compression_level: CompressionLevel,
    /// The uncompressed payload size in bytes.
    pub data_size: i32,
    /// Reserved, always false in the current version.
    pub has_extended_data: bool,
}

impl Header {
    /// The header describing `image` stored with the given compression.
    pub fn for_image(
        image: &Image,
        compression: Compression,
        level: CompressionLevel,
    ) -> Result<Self> {
        let size = image.data_size();
        let data_size =
            i32::try_from(size).map_err(|_| Error::from(Unsupported::ImageSize(size)))?;
        let palette_size = image.palette.as_ref().map_or(0, Palette::len);
        let palette_size = u16::try_from(palette_size)
            .map_err(|_| Error::InvalidFormat("palette has more colors than the pixel format"))?;

        Ok(Header {
            major_version: MAJOR_VERSION,
            minor_version: MINOR_VERSION,
            width: image.width,
            height: image.height,
            bpp: image.bpp,
            planes: image.planes,
            has_palette: image.palette.is_some(),
            palette_size,
            compression,
            compression_level: level,
            data_size,
            has_extended_data: false,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buffer = Vec::with_capacity(HEADER_LEN);
        buffer.extend_from_slice(&IDENTIFIER);
        buffer.push(self.major_version);
        buffer.push(self.minor_version);
        buffer.extend_from_slice(&self.width.to_le_bytes());
        buffer.extend_from_slice(&self.height.to_le_bytes());
        buffer.push(self.bpp);
        buffer.push(self.planes);
        buffer.push(self.has_palette as u8);
        buffer.extend_from_slice(&self.palette_size.to_le_bytes());
        buffer.push(self.compression as u8);
        buffer.push(self.compression_level as u8);
        buffer.extend_from_slice(&self.data_size.to_le_bytes());
        buffer.push(self.has_extended_data as u8);

        let mut bytes = [0; HEADER_LEN];
        bytes.copy_from_slice(&buffer);
        bytes
    }

    /// Parse a header, checking the identifier and version before any other field.
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Self> {
        if bytes[..6] != IDENTIFIER {
            return Err(Error::InvalidFormat("missing APLIMG identifier"));
        }

        let (major_version, minor_version) = (bytes[6], bytes[7]);
        if major_version > MAJOR_VERSION {
            return Err(Error::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }

        let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let compression =
            Compression::from_u8(bytes[17]).ok_or(Unsupported::Compression(bytes[17]))?;
        let compression_level =
            CompressionLevel::from_u8(bytes[18]).ok_or(Unsupported::CompressionLevel(bytes[18]))?;

        Ok(Header {
            major_version,
            minor_version,
            width: u16_at(8),
            height: u16_at(10),
            bpp: bytes[12],
            planes: bytes[13],
            has_palette: bytes[14] != 0,
            palette_size: u16_at(15),
            compression,
            compression_level,
            data_size: i32::from_le_bytes([bytes[19], bytes[20], bytes[21], bytes[22]]),
            has_extended_data: bytes[23] != 0,
        })
    }

    /// Check the fields against each other before anything is allocated from them.
    pub fn validate(&self) -> Result<()> {
        if self.has_extended_data {
            return Err(Unsupported::ExtendedData.into());
        }
        if !self.has_palette && self.palette_size != 0 {
            return Err(Error::InvalidFormat("palette size given without a palette"));
        }

        let palette = if self.has_palette {
            Some(usize::from(self.palette_size))
        } else {
            None
        };
        let size = check_format(self.width, self.height, self.bpp, self.planes, palette)?;
        if usize::try_from(self.data_size).ok() != Some(size) {
            return Err(Error::InvalidFormat("data size does not match the image dimensions"));
        }
        Ok(())
    }

    /// The payload size in bytes; only meaningful after `validate`.
    pub fn data_len(&self) -> usize {
        usize::try_from(self.data_size).unwrap_or(0)
    }
}

/// A raw pixel buffer with its format.
///
/// The buffer holds `width * height * bpp / 8` bytes. `planes` is carried as metadata, the
/// buffer is stored in the container exactly as it is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    width: u16,
    height: u16,
    bpp: u8,
    planes: u8,
    palette: Option<Palette>,
    buffer: Vec<u8>,
}

impl Image {
    /// A zeroed single plane image without palette.
    pub fn new(width: u16, height: u16, bpp: u8) -> Result<Self> {
        let size = check_format(width, height, bpp, 1, None)?;
        Ok(Image {
            width,
            height,
            bpp,
            planes: 1,
            palette: None,
            buffer: vec![0; size],
        })
    }

    /// A single plane image over existing pixel data.
    pub fn from_buffer(width: u16, height: u16, bpp: u8, buffer: Vec<u8>) -> Result<Self> {
        let size = check_format(width, height, bpp, 1, None)?;
        if buffer.len() != size {
            return Err(Error::InvalidFormat("buffer length does not match the image dimensions"));
        }
        Ok(Image {
            width,
            height,
            bpp,
            planes: 1,
            palette: None,
            buffer,
        })
    }

    pub fn with_palette(self, palette: Palette) -> Result<Self> {
        check_format(self.width, self.height, self.bpp, self.planes, Some(palette.len()))?;
        Ok(Image {
            palette: Some(palette),
            ..self
        })
    }

    pub fn with_planes(self, planes: u8) -> Result<Self> {
        let palette = self.palette.as_ref().map(Palette::len);
        check_format(self.width, self.height, self.bpp, planes, palette)?;
        Ok(Image { planes, ..self })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn bpp(&self) -> u8 {
        self.bpp
    }

    pub fn planes(&self) -> u8 {
        self.planes
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// The payload size in bytes.
    pub fn data_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }

    /// Write the container to `sink`, returning the number of bytes written.
    pub async fn save<W: AsyncWrite + Unpin>(
        &self,
        sink: W,
        compression: Compression,
        level: CompressionLevel,
    ) -> Result<usize> {
        self.save_with(sink, compression, level, &Configuration::default())
            .await
    }

    /// Write the container to `sink` with explicit buffer, progress and cancellation settings.
    ///
    /// On error the sink holds an unusable, partial container.
    pub async fn save_with<W: AsyncWrite + Unpin>(
        &self,
        sink: W,
        compression: Compression,
        level: CompressionLevel,
        config: &Configuration,
    ) -> Result<usize> {
        let header = Header::for_image(self, compression, level)?;
        let mut writer = BitWriter::with_capacity(config.write_buffer_size(), sink);
        writer.write_bytes(&header.to_bytes()).await?;
        if let Some(palette) = &self.palette {
            writer.write_bytes(&palette.to_bytes()).await?;
        }

        match compression {
            Compression::None => {
                let mut reporter = Reporter::new(config.progress(), config.progress_increment());
                let length = self.buffer.len();
                for (index, &byte) in self.buffer.iter().enumerate() {
                    if config.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    writer.write_byte(byte).await?;
                    reporter.update(length, index + 1);
                }
                if config.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                reporter.update(length, length);
                writer.flush().await?;
            }
            Compression::Lzw => {
                let mut encoder = Encoder::with_config(level, config.clone());
                let mut reader =
                    BitReader::with_capacity(config.read_buffer_size(), &self.buffer[..]);
                let status = encoder
                    .encode_stream(&mut reader, &mut writer, self.buffer.len())
                    .await?;
                if status == LzwStatus::Cancelled {
                    return Err(Error::Cancelled);
                }
            }
        }

        log::debug!(
            "saved {}x{} image, {} bytes of pixels as {} bytes",
            self.width,
            self.height,
            self.buffer.len(),
            writer.total_written()
        );
        Ok(writer.total_written())
    }

    /// Read a container from `source`.
    pub async fn load<R: AsyncRead + Unpin>(source: R) -> Result<Self> {
        Image::load_with(source, &Configuration::default()).await
    }

    /// Read a container from `source` with explicit buffer, progress and cancellation settings.
    pub async fn load_with<R: AsyncRead + Unpin>(
        source: R,
        config: &Configuration,
    ) -> Result<Self> {
        let mut reader = BitReader::with_capacity(config.read_buffer_size(), source);
        let mut bytes = [0; HEADER_LEN];
        reader.read_exact(&mut bytes).await?;
        let header = Header::parse(&bytes)?;
        header.validate()?;
        log::debug!(
            "loading {}x{} image, {} bpp, {:?}",
            header.width,
            header.height,
            header.bpp,
            header.compression
        );

        let palette = if header.has_palette {
            let mut colors = vec![0; 3 * usize::from(header.palette_size)];
            reader.read_exact(&mut colors).await?;
            Some(Palette::from_bytes(&colors))
        } else {
            None
        };

        // The header is untrusted, grow the buffer as data actually arrives.
        let length = header.data_len();
        let capacity = length.min(PREALLOCATE_LIMIT);
        let buffer = match header.compression {
            Compression::None => {
                let mut reporter = Reporter::new(config.progress(), config.progress_increment());
                let mut buffer = Vec::with_capacity(capacity);
                for index in 0..length {
                    if config.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    buffer.push(reader.read_byte().await?);
                    reporter.update(length, index + 1);
                }
                reporter.update(length, length);
                buffer
            }
            Compression::Lzw => {
                let mut decoder = Decoder::with_config(config.clone());
                let output = Vec::with_capacity(capacity);
                let mut writer = BitWriter::with_capacity(config.write_buffer_size(), output);
                let status = decoder
                    .decode_stream(&mut reader, &mut writer, Some(length))
                    .await?;
                if status == LzwStatus::Cancelled {
                    return Err(Error::Cancelled);
                }

                let declared = header.compression_level.code_size();
                if decoder.code_size() != Some(declared) {
                    log::warn!(
                        "payload uses codes up to {:?} bits, header level implies {}",
                        decoder.code_size(),
                        declared
                    );
                }
                writer.into_inner()
            }
        };

        Ok(Image {
            width: header.width,
            height: header.height,
            bpp: header.bpp,
            planes: header.planes,
            palette,
            buffer,
        })
    }

    /// Encode the container into memory.
    pub fn to_bytes(&self, compression: Compression, level: CompressionLevel) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.buffer.len());
        block_on(self.save(&mut bytes, compression, level))?;
        Ok(bytes)
    }

    /// Decode a container from memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        block_on(Image::load(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Header {
        Header {
            major_version: 1,
            minor_version: 0,
            width: 0x0102,
            height: 3,
            bpp: 8,
            planes: 1,
            has_palette: true,
            palette_size: 2,
            compression: Compression::Lzw,
            compression_level: CompressionLevel::Medium,
            data_size: 0x0102 * 3,
            has_extended_data: false,
        }
    }

    #[test]
    fn header_layout() {
        let bytes = header().to_bytes();
        assert_eq!(
            bytes,
            [
                b'A', b'P', b'L', b'I', b'M', b'G', 1, 0, 0x02, 0x01, 3, 0, 8, 1, 1, 2, 0, 1, 1,
                0x06, 0x03, 0, 0, 0
            ]
        );
        assert_eq!(Header::parse(&bytes).unwrap(), header());
    }

    #[test]
    fn wrong_identifier() {
        let mut bytes = header().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(Header::parse(&bytes), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn newer_major_version() {
        let mut bytes = header().to_bytes();
        bytes[6] = 2;
        bytes[7] = 5;
        assert!(matches!(
            Header::parse(&bytes),
            Err(Error::UnsupportedVersion { major: 2, minor: 5 })
        ));

        // Newer minor versions stay readable.
        bytes[6] = 1;
        assert!(Header::parse(&bytes).is_ok());
    }

    #[test]
    fn unknown_tags() {
        let mut bytes = header().to_bytes();
        bytes[17] = 7;
        assert!(matches!(
            Header::parse(&bytes),
            Err(Error::UnsupportedConfiguration(Unsupported::Compression(7)))
        ));

        let mut bytes = header().to_bytes();
        bytes[18] = 3;
        assert!(matches!(
            Header::parse(&bytes),
            Err(Error::UnsupportedConfiguration(Unsupported::CompressionLevel(3)))
        ));
    }

    #[test]
    fn validate_data_size() {
        assert!(header().validate().is_ok());

        let mut bad = header();
        bad.data_size += 1;
        assert!(matches!(bad.validate(), Err(Error::InvalidFormat(_))));

        bad.data_size = -1;
        assert!(matches!(bad.validate(), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn validate_palette_and_extensions() {
        let mut bad = header();
        bad.bpp = 1;
        bad.palette_size = 3;
        bad.data_size = data_size(bad.width, bad.height, 1) as i32;
        assert!(matches!(bad.validate(), Err(Error::InvalidFormat(_))));

        let mut bad = header();
        bad.has_palette = false;
        assert!(matches!(bad.validate(), Err(Error::InvalidFormat(_))));

        let mut bad = header();
        bad.has_extended_data = true;
        assert!(matches!(
            bad.validate(),
            Err(Error::UnsupportedConfiguration(Unsupported::ExtendedData))
        ));
    }

    #[test]
    fn payload_size_rounds_down() {
        assert_eq!(data_size(3, 3, 1), 1);
        assert_eq!(data_size(640, 480, 24), 640 * 480 * 3);
        assert_eq!(data_size(0, 10, 8), 0);
    }

    #[test]
    fn oversized_images_rejected() {
        assert!(matches!(
            Image::new(u16::MAX, u16::MAX, 32),
            Err(Error::UnsupportedConfiguration(Unsupported::ImageSize(_)))
        ));
    }

    #[test]
    fn palette_bytes() {
        let palette: Palette = vec![Rgb::new(1, 2, 3), Rgb::new(4, 5, 6)].into();
        assert_eq!(palette.to_bytes(), [1, 2, 3, 4, 5, 6]);
        assert_eq!(Palette::from_bytes(&[1, 2, 3, 4, 5, 6, 7]), palette);
    }

    #[test]
    fn palette_limited_by_depth() {
        let palette: Palette = (0..3).map(|i| Rgb::new(i, i, i)).collect();
        let image = Image::new(8, 1, 1).unwrap();
        assert!(matches!(
            image.clone().with_palette(palette.clone()),
            Err(Error::InvalidFormat(_))
        ));
        assert!(Image::new(8, 1, 2).unwrap().with_palette(palette).is_ok());
        assert!(image.with_planes(0).is_err());
    }

    #[test]
    fn buffer_length_checked() {
        assert!(Image::from_buffer(2, 2, 8, vec![0; 4]).is_ok());
        assert!(matches!(
            Image::from_buffer(2, 2, 8, vec![0; 5]),
            Err(Error::InvalidFormat(_))
        ));
    }
}
