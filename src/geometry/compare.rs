// Percentage change between a submitted profile and reference profiles

use super::library::ReferenceLibrary;
use super::profile::{Direction, DistanceProfile};
use crate::classification::{ChangeBands, Classification};
use crate::error::{Result, VerifyError};
use crate::utils::round2;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionChange {
    pub direction: Direction,
    pub submitted: i32,
    pub reference: i32,
    pub difference_px: i32,
    pub change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceComparison {
    pub reference_id: String,
    pub percentage_change: f64,
    pub directions: Vec<DirectionChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometricMatchOutcome {
    pub best_reference_id: String,
    pub percentage_change: f64,
    pub per_direction_breakdown: Vec<DirectionChange>,
    pub classification: Classification,
    /// Every usable comparison, in library order.
    pub comparisons: Vec<ReferenceComparison>,
}

/// Compare two profiles direction by direction.
///
/// Directions whose reference distance is zero are left out. Returns `None`
/// when no direction could be compared at all.
pub fn compare_profiles(
    reference_id: &str,
    submitted: &DistanceProfile,
    reference: &DistanceProfile,
) -> Option<ReferenceComparison> {
    let directions: Vec<DirectionChange> = Direction::ALL
        .iter()
        .filter(|d| reference.get(**d) != 0)
        .map(|&direction| {
            let submitted = submitted.get(direction);
            let reference = reference.get(direction);
            let difference_px = submitted - reference;
            DirectionChange {
                direction,
                submitted,
                reference,
                difference_px,
                change_percent: (difference_px as f64 / reference as f64).abs() * 100.0,
            }
        })
        .collect();

    if directions.is_empty() {
        return None;
    }
    let percentage_change =
        directions.iter().map(|d| d.change_percent).sum::<f64>() / directions.len() as f64;

    Some(ReferenceComparison {
        reference_id: reference_id.to_string(),
        percentage_change,
        directions,
    })
}

/// Mean percentage change of `submitted` against `reference`, if comparable.
pub fn percentage_change(submitted: &DistanceProfile, reference: &DistanceProfile) -> Option<f64> {
    compare_profiles("", submitted, reference).map(|c| c.percentage_change)
}

/// Pick the reference with the smallest mean change and classify it.
///
/// Changes are rounded to 2 decimals before they are ranked and classified,
/// so the verdict always agrees with the reported percentage. Ties keep the
/// reference that comes first in the library. A library where no reference
/// is comparable is a hard failure rather than a verdict.
pub fn compare_with_library(
    submitted: &DistanceProfile,
    library: &ReferenceLibrary,
    bands: &ChangeBands,
) -> Result<GeometricMatchOutcome> {
    let comparisons: Vec<ReferenceComparison> = library
        .iter()
        .filter_map(|r| compare_profiles(&r.id, submitted, &r.profile))
        .collect();

    let best = comparisons
        .iter()
        .min_by(|a, b| round2(a.percentage_change).total_cmp(&round2(b.percentage_change)))
        .cloned()
        .ok_or(VerifyError::NoComparableReference)?;
    let percentage_change = round2(best.percentage_change);

    Ok(GeometricMatchOutcome {
        classification: Classification::from_change(percentage_change, bands),
        best_reference_id: best.reference_id,
        percentage_change,
        per_direction_breakdown: best.directions,
        comparisons,
    })
}
