use crate::analyzer::ReceiptAnalyzer;
use crate::classification::{Classification, VerificationReport};
use crate::error::Result;
use crate::utils::image_files_in;
use log::{error, info};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

const PROGRESS_EVERY: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<VerificationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub authentic: usize,
    pub suspicious: usize,
    pub altered: usize,
    pub failed: usize,
    pub entries: Vec<BatchEntry>,
}

impl BatchSummary {
    fn record(&mut self, file: String, result: Result<VerificationReport>) {
        self.processed += 1;
        match result {
            Ok(report) => {
                match report.classification {
                    Classification::Authentic => self.authentic += 1,
                    Classification::Suspicious => self.suspicious += 1,
                    Classification::Altered => self.altered += 1,
                }
                self.entries.push(BatchEntry {
                    file,
                    report: Some(report),
                    error: None,
                });
            }
            Err(e) => {
                error!("Failed to verify {}: {}", file, e);
                self.failed += 1;
                self.entries.push(BatchEntry {
                    file,
                    report: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }
}

/// Runs the logo check over every image of a directory
pub struct BatchProcessor<'a> {
    analyzer: &'a ReceiptAnalyzer,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(analyzer: &'a ReceiptAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Verify every image in `dir`, in file name order. A failing receipt is
    /// counted and reported but does not stop the run.
    pub fn process_dir(&self, dir: &Path) -> Result<BatchSummary> {
        let files = image_files_in(dir)?;
        info!("Batch started: {} images in {}", files.len(), dir.display());

        let now = Instant::now();
        let mut summary = BatchSummary::default();
        for path in &files {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let result = std::fs::read(path)
                .map_err(Into::into)
                .and_then(|bytes| self.analyzer.verify_logo(&bytes));
            summary.record(file, result);

            if summary.processed % PROGRESS_EVERY == 0 {
                info!(
                    "Processed {} of {} receipts ({:?} elapsed)",
                    summary.processed,
                    files.len(),
                    now.elapsed()
                );
            }
        }

        info!(
            "Batch finished in {:?}. Authentic: {}, suspicious: {}, altered: {}, failed: {}",
            now.elapsed(),
            summary.authentic,
            summary.suspicious,
            summary.altered,
            summary.failed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::Breakdown;
    use crate::error::VerifyError;

    #[test]
    fn test_summary_counts() {
        let mut summary = BatchSummary::default();
        summary.record(
            "a.png".into(),
            Ok(VerificationReport::new(
                3.0,
                Classification::Authentic,
                None,
                Breakdown::None,
            )),
        );
        summary.record(
            "b.png".into(),
            Ok(VerificationReport::no_match(100.0, Breakdown::None, "mark not found")),
        );
        summary.record("c.png".into(), Err(VerifyError::EmptyImage));

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.authentic, 1);
        assert_eq!(summary.altered, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.entries[2].error.as_deref(), Some("the uploaded file is empty"));
    }
}
