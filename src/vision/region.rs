// Threshold + contour based localisation of receipt regions

use super::to_gray;
use crate::consts::{BLUR_KERNEL, MIN_CROP_SIDE, MIN_REGION_AREA, WHITE_THRESHOLD};
use crate::error::Result;
use opencv::{
    core::{self, AlgorithmHint, Mat, Point, Rect, Size, Vector},
    imgproc::{self},
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// Axis-aligned box in image pixels. Width and height are always positive;
/// "nothing found" is expressed as `Option<Region>`, never as an empty box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { x, y, width, height })
    }

    pub fn from_rect(rect: Rect) -> Option<Self> {
        Self::new(rect.x, rect.y, rect.width, rect.height)
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Center rounded toward the top-left corner.
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }
}

/// Parameters of one threshold + contour pass.
#[derive(Debug, Clone, Copy)]
pub struct RegionQuery {
    pub threshold: f64,
    /// Invert the threshold to isolate dark areas instead of bright ones.
    pub invert: bool,
    pub blur_kernel: Option<i32>,
    /// Contours must have a polygon area strictly above this to qualify.
    pub min_area: Option<f64>,
}

impl RegionQuery {
    /// Bright receipt body; tiny bright speckles are ignored.
    pub fn white_box(min_area: f64) -> Self {
        Self {
            threshold: WHITE_THRESHOLD,
            invert: false,
            blur_kernel: Some(BLUR_KERNEL),
            min_area: Some(min_area),
        }
    }

    /// Darker frame around the bright receipt; the largest area wins whatever its size.
    pub fn receipt_border() -> Self {
        Self {
            threshold: WHITE_THRESHOLD,
            invert: true,
            blur_kernel: Some(BLUR_KERNEL),
            min_area: None,
        }
    }
}

/// Bounding box of the largest qualifying external contour.
///
/// Ties on area keep the first contour reported. A contour-free image yields
/// `Ok(None)`.
pub fn locate_region(img: &Mat, query: &RegionQuery) -> Result<Option<Region>> {
    if img.empty() {
        return Ok(None);
    }
    let gray = to_gray(img)?;

    let source = match query.blur_kernel {
        Some(kernel) => {
            let mut blurred = Mat::default();
            imgproc::gaussian_blur(
                &gray,
                &mut blurred,
                Size::new(kernel, kernel),
                0.0,
                0.0,
                core::BORDER_DEFAULT,
                AlgorithmHint::ALGO_HINT_DEFAULT,
            )?;
            blurred
        }
        None => gray,
    };

    let threshold_type = if query.invert {
        imgproc::THRESH_BINARY_INV
    } else {
        imgproc::THRESH_BINARY
    };
    let mut binary = Mat::default();
    imgproc::threshold(&source, &mut binary, query.threshold, 255.0, threshold_type)?;

    let mut contours = Vector::<Vector<Point>>::new();
    imgproc::find_contours(
        &binary,
        &mut contours,
        imgproc::RETR_EXTERNAL,
        imgproc::CHAIN_APPROX_SIMPLE,
        Point::new(0, 0),
    )?;

    let mut best: Option<(f64, Region)> = None;
    for contour in contours.iter() {
        let area = imgproc::contour_area(&contour, false)?;
        if query.min_area.is_some_and(|min| area <= min) {
            continue;
        }
        if best.is_some_and(|(best_area, _)| area <= best_area) {
            continue;
        }
        if let Some(region) = Region::from_rect(imgproc::bounding_rect(&contour)?) {
            best = Some((area, region));
        }
    }

    Ok(best.map(|(_, region)| region))
}

pub fn detect_white_box(img: &Mat) -> Result<Option<Region>> {
    locate_region(img, &RegionQuery::white_box(MIN_REGION_AREA))
}

pub fn detect_receipt_border(img: &Mat) -> Result<Option<Region>> {
    locate_region(img, &RegionQuery::receipt_border())
}

/// Crop to the bright receipt body before text recognition.
///
/// Uses the raw (unblurred) threshold and refuses boxes narrower or shorter
/// than 100 px, in which case `None` tells the caller to keep the full image.
pub fn crop_white_box(img: &Mat) -> Result<Option<Mat>> {
    let query = RegionQuery {
        threshold: WHITE_THRESHOLD,
        invert: false,
        blur_kernel: None,
        min_area: None,
    };
    let Some(region) = locate_region(img, &query)? else {
        return Ok(None);
    };
    if region.width < MIN_CROP_SIDE || region.height < MIN_CROP_SIDE {
        return Ok(None);
    }
    let cropped = Mat::roi(img, region.to_rect())?.try_clone()?;
    Ok(Some(cropped))
}
