// Geometric axis: where the brand mark sits relative to the receipt's edges

use crate::classification::{Breakdown, MarkSummary, VerificationReport};
use crate::config::LogoConfig;
use crate::error::{Result, VerifyError};
use crate::utils::round2;
use crate::vision::{
    MarkMatch, MarkMatcher, Region, RegionQuery, detect_receipt_border, locate_region, read_image,
    resize_by,
};
use log::{info, warn};
use opencv::{core::Mat, imgproc};
use std::path::Path;

pub mod compare;
pub mod library;
pub mod profile;

pub use compare::{
    DirectionChange, GeometricMatchOutcome, ReferenceComparison, compare_profiles,
    compare_with_library, percentage_change,
};
pub use library::{ReferenceLibrary, ReferenceProfile};
pub use profile::{Direction, DistanceProfile, build_profile};

/// Percentage change reported when no profile could be measured at all.
pub const NO_MATCH_CHANGE: f64 = 100.0;

/// A reference mark image and the name reported when it is detected.
pub struct NamedMark {
    pub name: String,
    pub image: Mat,
}

/// What could be measured on one (already scaled) receipt image.
#[derive(Debug, Clone)]
pub enum Measurement {
    Measured {
        profile: DistanceProfile,
        mark_name: String,
        mark: MarkMatch,
        white_box: Region,
        border: Region,
    },
    MissingWhiteBox,
    MissingBorder,
    MissingMark { best_score: f64 },
}

impl Measurement {
    pub fn describe(&self) -> String {
        match self {
            Measurement::Measured { profile, mark_name, .. } => {
                format!("{} mark measured: {:?}", mark_name, profile)
            }
            Measurement::MissingWhiteBox => "white box of the receipt not detected".to_string(),
            Measurement::MissingBorder => "receipt border not detected".to_string(),
            Measurement::MissingMark { best_score } => {
                format!("no brand mark detected (best correlation {:.2})", best_score)
            }
        }
    }
}

/// Locate the white box, the border and the best-scoring mark, then build the profile.
///
/// When several marks clear `threshold`, the one with the highest correlation
/// is used; ties keep the mark configured first.
pub fn measure_receipt(
    scaled: &Mat,
    marks: &[NamedMark],
    matcher: &MarkMatcher,
    config: &LogoConfig,
    threshold: f64,
) -> Result<Measurement> {
    let Some(white_box) = locate_region(scaled, &RegionQuery::white_box(config.min_region_area))?
    else {
        return Ok(Measurement::MissingWhiteBox);
    };
    let Some(border) = detect_receipt_border(scaled)? else {
        return Ok(Measurement::MissingBorder);
    };

    let mut best: Option<(&NamedMark, MarkMatch)> = None;
    let mut best_score: f64 = 0.0;
    for mark in marks {
        let location = matcher.locate(scaled, &mark.image, threshold)?;
        best_score = best_score.max(location.best_score());
        if let Some(found) = location.found() {
            if best.is_none_or(|(_, current)| found.score > current.score) {
                best = Some((mark, *found));
            }
        }
    }

    let Some((mark, found)) = best else {
        return Ok(Measurement::MissingMark { best_score });
    };

    Ok(Measurement::Measured {
        profile: build_profile(found.region, border, white_box),
        mark_name: mark.name.clone(),
        mark: found,
        white_box,
        border,
    })
}

fn load_marks(config: &LogoConfig) -> Result<Vec<NamedMark>> {
    let mut marks = Vec::new();
    let mut missing = Vec::new();

    for source in &config.marks {
        match read_image(Path::new(&source.path))? {
            Some(image) => marks.push(NamedMark {
                name: source.name.clone(),
                image,
            }),
            None => {
                warn!("Failed to load mark image from {}", source.path);
                missing.push(format!("{}: {}", source.name, source.path));
            }
        }
    }

    if marks.is_empty() {
        return Err(VerifyError::Config(format!(
            "No mark images could be loaded. Missing: {}",
            missing.join(", ")
        )));
    }
    Ok(marks)
}

/// Verifies receipts by comparing the mark's position against reference receipts.
pub struct LogoVerifier {
    config: LogoConfig,
    marks: Vec<NamedMark>,
    matcher: MarkMatcher,
    library: ReferenceLibrary,
}

impl LogoVerifier {
    /// Load the mark images and measure every reference receipt.
    pub fn new(config: LogoConfig) -> Result<Self> {
        let marks = load_marks(&config)?;
        let matcher = MarkMatcher::new(config.search);
        let library =
            ReferenceLibrary::load(Path::new(&config.reference_dir), &marks, &matcher, &config)?;

        Ok(Self {
            config,
            marks,
            matcher,
            library,
        })
    }

    pub fn from_parts(config: LogoConfig, marks: Vec<NamedMark>, library: ReferenceLibrary) -> Self {
        Self {
            matcher: MarkMatcher::new(config.search),
            config,
            marks,
            library,
        }
    }

    pub fn library(&self) -> &ReferenceLibrary {
        &self.library
    }

    /// Scale the receipt, measure it and compare against the library.
    ///
    /// Missing regions or marks are verdicts (`Altered` plus a diagnostic);
    /// only a library with nothing comparable is an error.
    pub fn verify(&self, img: &Mat) -> Result<VerificationReport> {
        let scaled = resize_by(img, self.config.working_scale, imgproc::INTER_AREA)?;
        let measurement = measure_receipt(
            &scaled,
            &self.marks,
            &self.matcher,
            &self.config,
            self.config.submitted_threshold,
        )?;

        let (profile, mark_name, mark) = match measurement {
            Measurement::Measured {
                profile,
                mark_name,
                mark,
                ..
            } => (profile, mark_name, mark),
            other => {
                let diagnostic = other.describe();
                info!("Logo check: {}", diagnostic);
                let breakdown = Breakdown::Directions {
                    mark: None,
                    submitted: None,
                    directions: Vec::new(),
                    comparisons: Vec::new(),
                };
                return Ok(VerificationReport::no_match(NO_MATCH_CHANGE, breakdown, diagnostic));
            }
        };

        let outcome = compare_with_library(&profile, &self.library, &self.config.bands)?;
        info!(
            "Logo check: best reference '{}' with {:.2}% change -> {:?}",
            outcome.best_reference_id, outcome.percentage_change, outcome.classification
        );

        let breakdown = Breakdown::Directions {
            mark: Some(MarkSummary {
                name: mark_name,
                confidence: round2(mark.score * 100.0),
            }),
            submitted: Some(profile),
            directions: outcome.per_direction_breakdown,
            comparisons: outcome.comparisons.into_iter().take(3).collect(),
        };
        Ok(VerificationReport::new(
            outcome.percentage_change,
            outcome.classification,
            Some(outcome.best_reference_id),
            breakdown,
        ))
    }
}
