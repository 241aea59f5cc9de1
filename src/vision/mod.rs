// Raster helpers shared by the region locator and the mark matcher

use crate::error::{Result, VerifyError};
use opencv::{
    core::{AlgorithmHint, Mat, Size, Vector},
    imgcodecs::{self, IMREAD_COLOR},
    imgproc::{self},
    prelude::*,
};
use std::path::Path;

pub mod mark;
pub mod region;

pub use mark::{MarkLocation, MarkMatch, MarkMatcher, ScaleSearch};
pub use region::{
    Region, RegionQuery, crop_white_box, detect_receipt_border, detect_white_box, locate_region,
};

/// Decode an uploaded image into a BGR `Mat`.
///
/// Empty payloads, payloads that are not a known image format and payloads
/// OpenCV cannot decode are rejected with distinct errors.
pub fn decode_image(bytes: &[u8]) -> Result<Mat> {
    if bytes.is_empty() {
        return Err(VerifyError::EmptyImage);
    }
    let format =
        image::guess_format(bytes).map_err(|e| VerifyError::UnsupportedMedia(e.to_string()))?;

    let mat = imgcodecs::imdecode(&Mat::from_slice(bytes)?, IMREAD_COLOR)
        .map_err(|e| VerifyError::UndecodableImage(e.message))?;
    if mat.empty() {
        return Err(VerifyError::UndecodableImage(format!(
            "{:?} payload could not be decoded",
            format
        )));
    }
    Ok(mat)
}

/// Load an image from disk, `None` when the file is missing or unreadable.
pub fn read_image(path: &Path) -> Result<Option<Mat>> {
    if !path.is_file() {
        return Ok(None);
    }
    let mat = imgcodecs::imread(&path.to_string_lossy(), IMREAD_COLOR)?;
    if mat.empty() {
        return Ok(None);
    }
    Ok(Some(mat))
}

/// Single-channel intensity copy of a gray, BGR or BGRA image.
pub fn to_gray(img: &Mat) -> Result<Mat> {
    let code = match img.channels() {
        1 => return Ok(img.try_clone()?),
        4 => imgproc::COLOR_BGRA2GRAY,
        _ => imgproc::COLOR_BGR2GRAY,
    };
    let mut gray = Mat::default();
    imgproc::cvt_color(img, &mut gray, code, 0, AlgorithmHint::ALGO_HINT_DEFAULT)?;
    Ok(gray)
}

/// Scale both axes by `factor`.
pub fn resize_by(img: &Mat, factor: f64, interpolation: i32) -> Result<Mat> {
    let mut resized = Mat::default();
    imgproc::resize(
        img,
        &mut resized,
        Size::default(),
        factor,
        factor,
        interpolation,
    )?;
    Ok(resized)
}

/// Shrink so neither side exceeds `max_side`; smaller images are returned as is.
pub fn limit_longest_side(img: &Mat, max_side: i32) -> Result<Mat> {
    let (rows, cols) = (img.rows(), img.cols());
    if rows <= max_side && cols <= max_side {
        return Ok(img.try_clone()?);
    }
    let factor = (max_side as f64 / rows as f64).min(max_side as f64 / cols as f64);
    resize_by(img, factor, imgproc::INTER_LINEAR)
}

pub fn encode_png(img: &Mat) -> Result<Vec<u8>> {
    let mut buffer = Vector::<u8>::new();
    imgcodecs::imencode(".png", img, &mut buffer, &Vector::new())?;
    Ok(buffer.to_vec())
}
