use image::codecs::png::PngEncoder;
use image::{ColorType, ImageError, RgbaImage};
use rfd::FileDialog;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::canvas::PixelImage;

// ============================================================================
// ERRORS
// ============================================================================

/// PNG read/write failure. Surfaced to the UI as a message; the canvas and
/// history are guaranteed untouched when one of these comes back.
#[derive(Debug)]
pub enum ImageIoError {
    Io(std::io::Error),
    Decode(ImageError),
}

impl std::fmt::Display for ImageIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageIoError::Io(e) => write!(f, "I/O error: {}", e),
            ImageIoError::Decode(e) => write!(f, "image error: {}", e),
        }
    }
}

impl std::error::Error for ImageIoError {}

impl From<std::io::Error> for ImageIoError {
    fn from(e: std::io::Error) -> Self {
        ImageIoError::Io(e)
    }
}

impl From<ImageError> for ImageIoError {
    fn from(e: ImageError) -> Self {
        ImageIoError::Decode(e)
    }
}

// ============================================================================
// PNG LOAD / SAVE
// ============================================================================

/// Decode PNG bytes into an RGBA image.
pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage, ImageIoError> {
    Ok(image::load_from_memory(bytes)?.into_rgba8())
}

/// Read and decode a PNG file.
pub fn load_png(path: &Path) -> Result<RgbaImage, ImageIoError> {
    let bytes = std::fs::read(path)?;
    decode_png(&bytes)
}

/// Encode the canvas as an 8-bit RGBA PNG at `path`.
pub fn save_png(image: &PixelImage, path: &Path) -> Result<(), ImageIoError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let side = image.side();
    let encoder = PngEncoder::new(&mut writer);
    #[allow(deprecated)]
    encoder.encode(&image.to_rgba_bytes(), side, side, ColorType::Rgba8)?;
    Ok(())
}

// ============================================================================
// FILE DIALOGS
// ============================================================================

/// Native open/save dialogs, filtered to PNG.
pub struct FileHandler;

impl FileHandler {
    pub fn pick_open_png() -> Option<PathBuf> {
        FileDialog::new()
            .set_title("Specify a file to open")
            .add_filter("PNG Files", &["png"])
            .pick_file()
    }

    /// The OS dialog already confirms overwriting an existing file. A missing
    /// extension is corrected to `.png` so the saved file matches the format
    /// actually written.
    pub fn pick_save_png() -> Option<PathBuf> {
        let mut path = FileDialog::new()
            .set_title("Specify a file to save")
            .add_filter("PNG Files", &["png"])
            .set_file_name("untitled.png")
            .save_file()?;
        let has_png_ext = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if !has_png_ext {
            path.set_extension("png");
        }
        Some(path)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{OPAQUE_WHITE, pack_argb};

    fn temp_png_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pixeled_io_test_{}_{}.png", tag, std::process::id()))
    }

    #[test]
    fn save_then_load_preserves_pixels() {
        let mut img = PixelImage::new(8, OPAQUE_WHITE);
        img.set(1, 2, pack_argb(255, 10, 20, 30)).unwrap();
        img.set(7, 7, pack_argb(128, 200, 0, 99)).unwrap();

        let path = temp_png_path("roundtrip");
        save_png(&img, &path).unwrap();
        let loaded = load_png(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.dimensions(), (8, 8));
        assert_eq!(loaded.get_pixel(1, 2).0, [10, 20, 30, 255]);
        assert_eq!(loaded.get_pixel(7, 7).0, [200, 0, 99, 128]);
        assert_eq!(loaded.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn decode_rejects_non_png_bytes() {
        assert!(matches!(
            decode_png(b"definitely not a png"),
            Err(ImageIoError::Decode(_))
        ));
    }

    #[test]
    fn load_missing_file_is_an_io_error() {
        let path = temp_png_path("missing_never_created");
        assert!(matches!(load_png(&path), Err(ImageIoError::Io(_))));
    }

    #[test]
    fn save_into_missing_directory_fails_cleanly() {
        let img = PixelImage::new(4, OPAQUE_WHITE);
        let path = std::env::temp_dir()
            .join("pixeled_no_such_dir")
            .join("out.png");
        assert!(matches!(save_png(&img, &path), Err(ImageIoError::Io(_))));
    }
}
