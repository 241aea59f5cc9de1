// Multi-scale template matching of a brand mark

use super::{Region, to_gray};
use crate::consts::{MIN_MARK_SIDE, SCALE_MAX, SCALE_MIN, SCALE_STEPS};
use crate::error::Result;
use log::{debug, warn};
use opencv::{
    core::{self, Mat, Point, Size},
    imgproc::{self},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Scale range explored when looking for a mark of unknown on-screen size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleSearch {
    pub min_scale: f64,
    pub max_scale: f64,
    pub steps: usize,
    /// Resized marks smaller than this on either side are not tried.
    pub min_side: i32,
}

impl Default for ScaleSearch {
    fn default() -> Self {
        Self {
            min_scale: SCALE_MIN,
            max_scale: SCALE_MAX,
            steps: SCALE_STEPS,
            min_side: MIN_MARK_SIDE,
        }
    }
}

impl ScaleSearch {
    /// `steps` evenly spaced factors over `[min_scale, max_scale]`, largest first.
    pub fn factors(&self) -> Vec<f64> {
        let mut factors: Vec<f64> = match self.steps {
            0 => Vec::new(),
            1 => vec![self.min_scale],
            n => {
                let step = (self.max_scale - self.min_scale) / (n - 1) as f64;
                (0..n)
                    .map(|i| {
                        if i == n - 1 {
                            self.max_scale
                        } else {
                            self.min_scale + step * i as f64
                        }
                    })
                    .collect()
            }
        };
        factors.reverse();
        factors
    }
}

/// Best placement of the mark inside a target image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkMatch {
    pub region: Region,
    /// Normalized correlation coefficient at the peak.
    pub score: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkLocation {
    Found(MarkMatch),
    /// Nothing cleared the threshold; `best_score` is the closest miss.
    NotFound { best_score: f64 },
}

impl MarkLocation {
    pub fn found(&self) -> Option<&MarkMatch> {
        match self {
            MarkLocation::Found(m) => Some(m),
            MarkLocation::NotFound { .. } => None,
        }
    }

    pub fn best_score(&self) -> f64 {
        match self {
            MarkLocation::Found(m) => m.score,
            MarkLocation::NotFound { best_score } => *best_score,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkMatcher {
    search: ScaleSearch,
}

impl MarkMatcher {
    pub fn new(search: ScaleSearch) -> Self {
        Self { search }
    }

    /// Search `target` for `mark` at every configured scale.
    ///
    /// All scales are evaluated and the single highest correlation wins;
    /// a strictly higher score is needed to replace the current best, so on
    /// ties the larger scale is kept. Scales that shrink the mark below the
    /// minimum side or grow it past the target are skipped.
    pub fn locate(&self, target: &Mat, mark: &Mat, threshold: f64) -> Result<MarkLocation> {
        let now = Instant::now();
        let target_gray = to_gray(target)?;
        let mark_gray = to_gray(mark)?;

        let mut best: Option<MarkMatch> = None;
        let mut best_score = 0.0;

        for scale in self.search.factors() {
            let width = (mark_gray.cols() as f64 * scale) as i32;
            let height = (mark_gray.rows() as f64 * scale) as i32;
            if width < self.search.min_side || height < self.search.min_side {
                continue;
            }
            if width > target_gray.cols() || height > target_gray.rows() {
                continue;
            }

            let mut resized = Mat::default();
            imgproc::resize(
                &mark_gray,
                &mut resized,
                Size::new(width, height),
                0.0,
                0.0,
                imgproc::INTER_AREA,
            )?;

            let mut result = Mat::default();
            imgproc::match_template(
                &target_gray,
                &resized,
                &mut result,
                imgproc::TM_CCOEFF_NORMED,
                &Mat::default(),
            )?;

            let mut _min_val = 0.0;
            let mut max_val = 0.0;
            let mut _min_loc = Point::default();
            let mut max_loc = Point::default();
            core::min_max_loc(
                &result,
                Some(&mut _min_val),
                Some(&mut max_val),
                Some(&mut _min_loc),
                Some(&mut max_loc),
                &Mat::default(),
            )?;

            if max_val > best_score {
                if let Some(region) = Region::new(max_loc.x, max_loc.y, width, height) {
                    best_score = max_val;
                    best = Some(MarkMatch {
                        region,
                        score: max_val,
                        scale,
                    });
                }
            }
        }

        let elapsed = now.elapsed();
        if elapsed > Duration::from_millis(500) {
            warn!("Mark search took too long: {:?}", elapsed);
        }

        Ok(match best {
            Some(m) if m.score >= threshold => {
                debug!(
                    "Mark found at ({}, {}) {}x{} scale {:.3} score {:.3}",
                    m.region.x, m.region.y, m.region.width, m.region.height, m.scale, m.score
                );
                MarkLocation::Found(m)
            }
            _ => {
                debug!("Mark not found, best score {:.3}", best_score);
                MarkLocation::NotFound { best_score }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_factors() {
        let factors = ScaleSearch::default().factors();
        assert_eq!(factors.len(), 30);
        assert_eq!(factors[0], 2.0);
        assert_eq!(factors[29], 0.3);
        assert!(factors.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_degenerate_factors() {
        let none = ScaleSearch { steps: 0, ..Default::default() };
        assert!(none.factors().is_empty());
        let one = ScaleSearch { steps: 1, ..Default::default() };
        assert_eq!(one.factors(), vec![0.3]);
    }
}
