//! Packs a generated paletted image into a container, reads it back and prints what happened.

use aplimg::{Compression, CompressionLevel, Image, Palette, Rgb};

fn main() -> aplimg::error::Result<()> {
    let palette: Palette = (0..16u8).map(|i| Rgb::new(i * 16, 255 - i * 16, 128)).collect();
    let mut image = Image::new(256, 128, 4)?.with_palette(palette)?;
    for (i, byte) in image.buffer_mut().iter_mut().enumerate() {
        let (x, y) = (i % 128, i / 128);
        *byte = (((x / 8) as u8 & 0xf) << 4) | ((y / 8) as u8 & 0xf);
    }

    for &level in &[CompressionLevel::Low, CompressionLevel::High] {
        let bytes = image.to_bytes(Compression::Lzw, level)?;
        let loaded = Image::from_bytes(&bytes)?;
        assert_eq!(loaded, image);
        println!(
            "{:?}: {} bytes of pixels stored in {} bytes",
            level,
            image.data_size(),
            bytes.len()
        );
    }
    Ok(())
}
