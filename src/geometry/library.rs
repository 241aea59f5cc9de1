// Reference profiles measured once on known-authentic receipts

use super::profile::DistanceProfile;
use super::{Measurement, NamedMark, measure_receipt};
use crate::config::LogoConfig;
use crate::error::{Result, VerifyError};
use crate::utils::image_files_in;
use crate::vision::{MarkMatcher, read_image, resize_by};
use log::{debug, info, warn};
use opencv::imgproc;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceProfile {
    pub id: String,
    pub profile: DistanceProfile,
}

/// Read-only set of reference profiles, built before the first comparison.
#[derive(Debug, Clone, Default)]
pub struct ReferenceLibrary {
    profiles: Vec<ReferenceProfile>,
}

impl ReferenceLibrary {
    pub fn from_profiles(profiles: Vec<ReferenceProfile>) -> Self {
        Self { profiles }
    }

    /// Measure every reference image in `dir`.
    ///
    /// Images where the white box, the border or a mark cannot be found are
    /// skipped with a warning. A directory that yields no profile at all is a
    /// configuration error.
    pub fn load(
        dir: &Path,
        marks: &[NamedMark],
        matcher: &MarkMatcher,
        config: &LogoConfig,
    ) -> Result<Self> {
        let files = image_files_in(dir)?;
        if files.is_empty() {
            return Err(VerifyError::Config(format!(
                "No reference images found in {}",
                dir.display()
            )));
        }

        let mut profiles = Vec::new();
        for path in &files {
            let id = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            let Some(image) = read_image(path)? else {
                warn!("Ignoring unreadable reference image '{}'", path.display());
                continue;
            };
            let scaled = resize_by(&image, config.working_scale, imgproc::INTER_AREA)?;

            match measure_receipt(&scaled, marks, matcher, config, config.reference_threshold)? {
                Measurement::Measured { profile, .. } => {
                    debug!("Reference '{}': {:?}", id, profile);
                    profiles.push(ReferenceProfile { id, profile });
                }
                other => warn!("Ignoring reference '{}': {}", id, other.describe()),
            }
        }

        if profiles.is_empty() {
            return Err(VerifyError::Config(format!(
                "None of the {} reference images in {} produced a usable profile",
                files.len(),
                dir.display()
            )));
        }
        info!("Loaded {} reference profiles from {}", profiles.len(), dir.display());

        Ok(Self { profiles })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
