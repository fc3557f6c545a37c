//! Image decode/encode for the compositor.
//!
//! The core operates purely on decoded [`RgbaImage`] grids; this module is
//! the only place that touches codecs. BMP, PNG and JPEG decode; BMP and PNG
//! encode.

use image::codecs::bmp::BmpEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageError, RgbaImage};
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Error type for every fallible operation in the crate.
#[derive(Debug)]
pub enum OverlayError {
    /// Filesystem failure (open, create, read, write).
    Io(std::io::Error),
    /// Input bytes are not a decodable image.
    Decode(String),
    /// Encoder rejected the output image.
    Encode(String),
    /// An operation was called before its required state was loaded.
    MissingInput(&'static str),
}

impl fmt::Display for OverlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayError::Io(e) => write!(f, "I/O error: {}", e),
            OverlayError::Decode(e) => write!(f, "decode error: {}", e),
            OverlayError::Encode(e) => write!(f, "encode error: {}", e),
            OverlayError::MissingInput(what) => write!(f, "no {} loaded", what),
        }
    }
}

impl From<std::io::Error> for OverlayError {
    fn from(e: std::io::Error) -> Self {
        OverlayError::Io(e)
    }
}

/// Output format, chosen from the destination extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveFormat {
    Png,
    Bmp,
}

impl SaveFormat {
    /// Infer the format from a path's extension. Anything that is not `.bmp`
    /// is written as PNG.
    pub fn from_path(path: &Path) -> SaveFormat {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "bmp" => SaveFormat::Bmp,
            _ => SaveFormat::Png,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Bmp => "bmp",
        }
    }
}

/// Decode any supported image file into an 8-bit RGBA grid.
pub fn load_image(path: &Path) -> Result<RgbaImage, OverlayError> {
    let img = image::open(path).map_err(|e| match e {
        ImageError::IoError(io) => OverlayError::Io(io),
        other => OverlayError::Decode(other.to_string()),
    })?;
    Ok(img.to_rgba8())
}

/// Encode `image` to `path`, with the format inferred from the extension.
pub fn save_image(image: &RgbaImage, path: &Path) -> Result<(), OverlayError> {
    encode_and_write(image, path, SaveFormat::from_path(path))
}

/// Encode and write an image to a file.
/// Standalone (no `&mut self`) so it can run from worker threads.
pub fn encode_and_write(
    image: &RgbaImage,
    path: &Path,
    format: SaveFormat,
) -> Result<(), OverlayError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder
                .encode(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    image::ColorType::Rgba8,
                )
                .map_err(encode_error)?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder
                .encode(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    image::ColorType::Rgba8,
                )
                .map_err(encode_error)?;
        }
    }

    Ok(())
}

fn encode_error(e: ImageError) -> OverlayError {
    match e {
        ImageError::IoError(io) => OverlayError::Io(io),
        other => OverlayError::Encode(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("maskoverlay-io-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(SaveFormat::from_path(Path::new("a.bmp")), SaveFormat::Bmp);
        assert_eq!(SaveFormat::from_path(Path::new("a.BMP")), SaveFormat::Bmp);
        assert_eq!(SaveFormat::from_path(Path::new("a.png")), SaveFormat::Png);
        // Unknown extensions fall back to PNG
        assert_eq!(SaveFormat::from_path(Path::new("a.xyz")), SaveFormat::Png);
        assert_eq!(SaveFormat::from_path(Path::new("a")), SaveFormat::Png);
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = load_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, OverlayError::Io(_)), "{}", err);
    }

    #[test]
    fn garbage_bytes_report_decode_error() {
        let path = scratch_file("garbage.png");
        std::fs::write(&path, b"this is not a png").unwrap();
        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, OverlayError::Decode(_)), "{}", err);
    }

    #[test]
    fn written_png_decodes_with_same_pixels() {
        let path = scratch_file("tiny.png");
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(2, 1, image::Rgba([9, 8, 7, 255]));
        save_image(&img, &path).unwrap();

        let back = load_image(&path).unwrap();
        assert_eq!(back.dimensions(), (3, 2));
        assert_eq!(back.get_pixel(2, 1), &image::Rgba([9, 8, 7, 255]));
    }
}
