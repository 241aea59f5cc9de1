use crate::geometry::{DirectionChange, DistanceProfile, ReferenceComparison};
use crate::text::FieldMatchResult;
use crate::utils::round2;
use serde::{Deserialize, Serialize};

/// Three-tier authenticity verdict shared by every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Authentic,
    Suspicious,
    Altered,
}

impl Classification {
    /// Bands for scores where higher means closer to the reference.
    pub fn from_similarity(percentage: f64, bands: &SimilarityBands) -> Self {
        if percentage >= bands.authentic_min {
            Classification::Authentic
        } else if percentage >= bands.suspicious_min {
            Classification::Suspicious
        } else {
            Classification::Altered
        }
    }

    /// Bands for scores where lower means closer to the reference.
    pub fn from_change(percentage_change: f64, bands: &ChangeBands) -> Self {
        if percentage_change <= bands.authentic_max {
            Classification::Authentic
        } else if percentage_change <= bands.suspicious_max {
            Classification::Suspicious
        } else {
            Classification::Altered
        }
    }

    pub fn is_valid(self) -> bool {
        self == Classification::Authentic
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityBands {
    pub authentic_min: f64,
    pub suspicious_min: f64,
}

impl Default for SimilarityBands {
    fn default() -> Self {
        Self {
            authentic_min: 85.0,
            suspicious_min: 70.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeBands {
    pub authentic_max: f64,
    pub suspicious_max: f64,
}

impl Default for ChangeBands {
    fn default() -> Self {
        Self {
            authentic_max: 10.0,
            suspicious_max: 25.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkSummary {
    pub name: String,
    pub confidence: f64,
}

/// Per-check diagnostics attached to a report.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Breakdown {
    Fields {
        fields: Vec<FieldMatchResult>,
        words_detected: usize,
        fields_found: usize,
    },
    Directions {
        mark: Option<MarkSummary>,
        submitted: Option<DistanceProfile>,
        directions: Vec<DirectionChange>,
        comparisons: Vec<ReferenceComparison>,
    },
    Sharpness {
        laplacian_variance: f64,
    },
    None,
}

/// Transport-independent result handed back to callers.
///
/// `percentage` is a similarity for the text check and the sharpness check,
/// and a percentage change for the logo check; `classification` already
/// accounts for the direction of each scale.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub percentage: f64,
    pub classification: Classification,
    pub matched: Option<String>,
    pub breakdown: Breakdown,
    pub is_valid: bool,
    pub diagnostic: Option<String>,
}

impl VerificationReport {
    pub fn new(
        percentage: f64,
        classification: Classification,
        matched: Option<String>,
        breakdown: Breakdown,
    ) -> Self {
        Self {
            percentage: round2(percentage),
            classification,
            matched,
            breakdown,
            is_valid: classification.is_valid(),
            diagnostic: None,
        }
    }

    /// A legitimate "nothing to compare" outcome: lowest band plus an explanation.
    pub fn no_match(percentage: f64, breakdown: Breakdown, diagnostic: impl Into<String>) -> Self {
        Self::new(percentage, Classification::Altered, None, breakdown).with_diagnostic(diagnostic)
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }
}
