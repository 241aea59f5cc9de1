// Cheap whole-image checks run before the expensive matchers

use crate::classification::{Breakdown, Classification, VerificationReport};
use crate::config::{HsvRange, PrefilterConfig};
use crate::error::Result;
use crate::utils::round2;
use crate::vision::to_gray;
use log::debug;
use opencv::{
    core::{self, AlgorithmHint, Mat, Scalar},
    imgproc::{self},
    prelude::*,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorConfidence {
    High,
    Medium,
}

/// Result of the brand color gate. A rejection is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ColorGateOutcome {
    Brand {
        turquoise_ratio: f64,
        white_ratio: f64,
        confidence: ColorConfidence,
    },
    Rejected {
        turquoise_ratio: f64,
        white_ratio: f64,
        message: String,
    },
}

impl ColorGateOutcome {
    pub fn is_brand(&self) -> bool {
        matches!(self, ColorGateOutcome::Brand { .. })
    }
}

fn to_hsv(img: &Mat) -> Result<Mat> {
    let mut bgr = Mat::default();
    let source = match img.channels() {
        4 => {
            imgproc::cvt_color(
                img,
                &mut bgr,
                imgproc::COLOR_BGRA2BGR,
                0,
                AlgorithmHint::ALGO_HINT_DEFAULT,
            )?;
            &bgr
        }
        1 => {
            imgproc::cvt_color(
                img,
                &mut bgr,
                imgproc::COLOR_GRAY2BGR,
                0,
                AlgorithmHint::ALGO_HINT_DEFAULT,
            )?;
            &bgr
        }
        _ => img,
    };

    let mut hsv = Mat::default();
    imgproc::cvt_color(
        source,
        &mut hsv,
        imgproc::COLOR_BGR2HSV,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;
    Ok(hsv)
}

fn ratio_in_range(hsv: &Mat, range: &HsvRange) -> Result<f64> {
    let total = hsv.rows() as f64 * hsv.cols() as f64;
    if total == 0.0 {
        return Ok(0.0);
    }
    let [l0, l1, l2] = range.lower;
    let [u0, u1, u2] = range.upper;
    let mut mask = Mat::default();
    core::in_range(
        hsv,
        &Scalar::new(l0, l1, l2, 0.0),
        &Scalar::new(u0, u1, u2, 0.0),
        &mut mask,
    )?;
    Ok(core::count_non_zero(&mask)? as f64 / total)
}

/// Share of turquoise and white pixels, compared against the configured minimums.
pub fn color_gate(img: &Mat, config: &PrefilterConfig) -> Result<ColorGateOutcome> {
    let hsv = to_hsv(img)?;
    let turquoise_ratio = ratio_in_range(&hsv, &config.turquoise)?;
    let white_ratio = ratio_in_range(&hsv, &config.white)?;
    debug!(
        "Color gate: turquoise {:.3}, white {:.3}",
        turquoise_ratio, white_ratio
    );

    if turquoise_ratio >= config.min_turquoise_ratio && white_ratio >= config.min_white_ratio {
        let confidence = if turquoise_ratio > config.high_confidence_ratio {
            ColorConfidence::High
        } else {
            ColorConfidence::Medium
        };
        return Ok(ColorGateOutcome::Brand {
            turquoise_ratio,
            white_ratio,
            confidence,
        });
    }

    Ok(ColorGateOutcome::Rejected {
        turquoise_ratio,
        white_ratio,
        message: format!(
            "turquoise {:.1}% (minimum {:.1}%), white {:.1}% (minimum {:.1}%)",
            turquoise_ratio * 100.0,
            config.min_turquoise_ratio * 100.0,
            white_ratio * 100.0,
            config.min_white_ratio * 100.0
        ),
    })
}

/// Variance of the Laplacian of the grayscale image.
pub fn laplacian_variance(img: &Mat) -> Result<f64> {
    let gray = to_gray(img)?;
    let mut laplacian = Mat::default();
    imgproc::laplacian(
        &gray,
        &mut laplacian,
        core::CV_64F,
        1,
        1.0,
        0.0,
        core::BORDER_DEFAULT,
    )?;

    let mut mean = Mat::default();
    let mut stddev = Mat::default();
    core::mean_std_dev(&laplacian, &mut mean, &mut stddev, &core::no_array())?;
    let sd = *stddev.at::<f64>(0)?;
    Ok(sd * sd)
}

/// Sharpness score in `[0, 100]`, classified like a similarity.
pub fn sharpness(img: &Mat, config: &PrefilterConfig) -> Result<VerificationReport> {
    let variance = laplacian_variance(img)?;
    let score = round2((variance / config.sharpness_normalizer * 100.0).min(100.0));
    let classification = Classification::from_similarity(score, &config.sharpness_bands);
    debug!("Sharpness: variance {:.2}, score {:.2}", variance, score);

    Ok(VerificationReport::new(
        score,
        classification,
        None,
        Breakdown::Sharpness {
            laplacian_variance: variance,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{CV_8UC3, Point, Rect};

    fn canvas(color: Scalar) -> Mat {
        Mat::new_rows_cols_with_default(100, 100, CV_8UC3, color).unwrap()
    }

    #[test]
    fn test_half_turquoise_half_white_is_brand() {
        let mut img = canvas(Scalar::new(255.0, 255.0, 255.0, 0.0));
        imgproc::rectangle(
            &mut img,
            Rect::new(0, 0, 100, 50),
            Scalar::new(120.0, 110.0, 20.0, 0.0),
            -1,
            imgproc::LINE_8,
            0,
        )
        .unwrap();

        let outcome = color_gate(&img, &PrefilterConfig::default()).unwrap();
        match outcome {
            ColorGateOutcome::Brand {
                turquoise_ratio,
                white_ratio,
                confidence,
            } => {
                assert!((turquoise_ratio - 0.5).abs() < 1e-9);
                assert!((white_ratio - 0.5).abs() < 1e-9);
                assert_eq!(confidence, ColorConfidence::High);
            }
            other => panic!("expected brand layout, got {:?}", other),
        }
    }

    #[test]
    fn test_white_only_is_rejected() {
        let img = canvas(Scalar::new(255.0, 255.0, 255.0, 0.0));
        let outcome = color_gate(&img, &PrefilterConfig::default()).unwrap();
        assert!(!outcome.is_brand());
    }

    #[test]
    fn test_flat_image_has_no_sharpness() {
        let img = canvas(Scalar::new(90.0, 90.0, 90.0, 0.0));
        let report = sharpness(&img, &PrefilterConfig::default()).unwrap();
        assert_eq!(report.percentage, 0.0);
        assert_eq!(report.classification, Classification::Altered);
    }

    #[test]
    fn test_hard_edges_are_sharp() {
        let mut img = canvas(Scalar::new(0.0, 0.0, 0.0, 0.0));
        for i in 0..10 {
            imgproc::line(
                &mut img,
                Point::new(i * 10, 0),
                Point::new(i * 10, 99),
                Scalar::new(255.0, 255.0, 255.0, 0.0),
                2,
                imgproc::LINE_8,
                0,
            )
            .unwrap();
        }
        let report = sharpness(&img, &PrefilterConfig::default()).unwrap();
        assert_eq!(report.percentage, 100.0);
        assert!(report.is_valid);
    }
}
