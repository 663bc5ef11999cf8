//! Raster image loading and saving.
//!
//! Thin wrappers over the `image` crate that map its errors onto
//! [`IoError`] with the offending path attached. Formats are sniffed
//! from file content on load and chosen from the file extension on save.

use std::path::{Path, PathBuf};

use arfind_pipeline::{BinaryMask, BoundingBox, BoxStyle, GrayImage, RgbImage, render};
use image::{DynamicImage, ImageError, ImageReader};

/// Errors raised at the filesystem boundary.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// The input path does not name an existing regular file.
    #[error("no such file: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be decoded as an image.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        /// File being read.
        path: PathBuf,
        /// Underlying decoder error.
        source: ImageError,
    },

    /// The image could not be encoded in the requested format.
    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        /// File being written.
        path: PathBuf,
        /// Underlying encoder error.
        source: ImageError,
    },

    /// Reading or writing the file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },
}

impl IoError {
    fn reading(path: &Path, err: ImageError) -> Self {
        match err {
            ImageError::IoError(source) => Self::Io {
                path: path.to_path_buf(),
                source,
            },
            source => Self::Decode {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    fn writing(path: &Path, err: ImageError) -> Self {
        match err {
            ImageError::IoError(source) => Self::Io {
                path: path.to_path_buf(),
                source,
            },
            source => Self::Encode {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Load an image file, keeping its native pixel layout.
///
/// # Errors
///
/// Returns [`IoError::NotFound`] if `path` is not a regular file,
/// [`IoError::Decode`] if the content is not a supported image, and
/// [`IoError::Io`] if reading fails.
pub fn load(path: &Path) -> Result<DynamicImage, IoError> {
    if !path.is_file() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }

    let reader = ImageReader::open(path)
        .map_err(|source| IoError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| IoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let image = reader.decode().map_err(|e| IoError::reading(path, e))?;

    tracing::debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        "loaded image"
    );
    Ok(image)
}

/// Load an image file and convert it to 8-bit grayscale.
///
/// # Errors
///
/// Same as [`load`].
pub fn load_grayscale(path: &Path) -> Result<GrayImage, IoError> {
    load(path).map(|image| arfind_pipeline::grayscale::luminance(&image))
}

/// Save an RGB image. The format follows the file extension.
///
/// # Errors
///
/// Returns [`IoError::Encode`] if the extension is unsupported or
/// encoding fails, and [`IoError::Io`] if writing fails.
pub fn save(path: &Path, image: &RgbImage) -> Result<(), IoError> {
    image.save(path).map_err(|e| IoError::writing(path, e))?;
    tracing::debug!(path = %path.display(), "saved image");
    Ok(())
}

/// Save a binary mask as a black-and-white grayscale image.
///
/// # Errors
///
/// Same as [`save`].
pub fn save_mask(path: &Path, mask: &BinaryMask) -> Result<(), IoError> {
    mask.to_gray_image()
        .save(path)
        .map_err(|e| IoError::writing(path, e))?;
    tracing::debug!(path = %path.display(), "saved mask");
    Ok(())
}

/// Outline `boxes` on a copy of `image` and write it to `output`.
///
/// # Errors
///
/// Same as [`save`].
pub fn render_and_save(
    image: &DynamicImage,
    boxes: &[BoundingBox],
    style: &BoxStyle,
    output: &Path,
) -> Result<(), IoError> {
    let rendered = render(&image.to_rgb8(), boxes, style);
    save(output, &rendered)
}
