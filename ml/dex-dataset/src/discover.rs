//! Finding, labelling and decoding image files.

use std::fs;
use std::path::{Path, PathBuf};

use dex_types::{ImageDims, Species};
use image::DynamicImage;
use image::imageops::FilterType;
use tracing::debug;

use crate::error::{DatasetError, Result};

/// File extensions treated as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Returns `true` if the path has an accepted image extension.
#[must_use]
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Recursively collects image files under `root`.
///
/// Paths come back sorted so that the seeded shuffle applied by the
/// loader produces the same order on every platform.
///
/// # Errors
///
/// Returns [`DatasetError::RootNotFound`] if `root` is not a directory,
/// or [`DatasetError::Io`] if a directory cannot be read.
pub fn discover_images(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(DatasetError::root_not_found(root));
    }

    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            // Symlinked directories are not descended into; they can form cycles.
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if path.is_file() && is_image_file(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    debug!(root = %root.display(), count = found.len(), "discovered image files");
    Ok(found)
}

/// Derives the label from the image's parent directory name.
///
/// # Errors
///
/// Returns [`DatasetError::UnknownLabel`] if the file has no parent
/// directory or the directory name is not a known species.
pub fn label_for_path(path: &Path) -> Result<Species> {
    let dir = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .ok_or_else(|| DatasetError::unknown_label(path, "no parent directory"))?;

    Species::from_name(dir).map_err(|e| DatasetError::unknown_label(path, e.to_string()))
}

/// Opens an image file and converts it to network input.
///
/// See [`decode_image`] for the conversion.
///
/// # Errors
///
/// Returns [`DatasetError::ImageDecode`] if the file cannot be opened or
/// decoded, or [`DatasetError::InvalidDimensions`] for unusable `dims`.
pub fn load_image(path: &Path, dims: ImageDims) -> Result<Vec<f32>> {
    let img = image::open(path).map_err(|e| DatasetError::image_decode(path, e.to_string()))?;
    decode_image(&img, dims)
}

/// Resizes an image to `dims` and returns it as CHW `f32` in `[0, 1]`.
///
/// Colour images lose their alpha channel; grayscale images are expanded
/// to RGB when three channels are requested. Resizing ignores aspect
/// ratio and uses a bilinear filter.
///
/// # Errors
///
/// Returns [`DatasetError::InvalidDimensions`] if `dims` is invalid or
/// does not fit in `u32`.
pub fn decode_image(img: &DynamicImage, dims: ImageDims) -> Result<Vec<f32>> {
    if !dims.is_valid() {
        return Err(DatasetError::invalid_dimensions(dims.to_string()));
    }
    let width =
        u32::try_from(dims.width).map_err(|_| DatasetError::invalid_dimensions(dims.to_string()))?;
    let height = u32::try_from(dims.height)
        .map_err(|_| DatasetError::invalid_dimensions(dims.to_string()))?;

    let resized = img.resize_exact(width, height, FilterType::Triangle);
    let hwc = if dims.channels == 1 {
        resized.to_luma8().into_raw()
    } else {
        resized.to_rgb8().into_raw()
    };

    Ok(hwc_to_chw(&hwc, dims))
}

/// Reorders interleaved `u8` pixels into planar `f32` scaled to `[0, 1]`.
fn hwc_to_chw(hwc: &[u8], dims: ImageDims) -> Vec<f32> {
    let plane = dims.height * dims.width;
    let mut chw = vec![0.0; dims.pixel_len()];
    for (i, px) in hwc.chunks_exact(dims.channels).enumerate() {
        for (c, &v) in px.iter().enumerate() {
            chw[c * plane + i] = f32::from(v) / 255.0;
        }
    }
    chw
}
