use serde::{Deserialize, Serialize};

use super::upload::UploadResult;

/// One remote file to pull into storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRequest {
    pub url: String,
    /// Overrides the name derived from the URL or content type
    #[serde(default)]
    pub filename: Option<String>,
}

impl ImportRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

impl From<&str> for ImportRequest {
    fn from(url: &str) -> Self {
        ImportRequest::new(url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    Imported { upload: UploadResult },
    Failed { reason: String },
}

/// Result record for a single URL, in the position of its request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub url: String,
    #[serde(flatten)]
    pub outcome: ImportOutcome,
}

impl ImportResult {
    pub fn imported(url: impl Into<String>, upload: UploadResult) -> Self {
        Self {
            url: url.into(),
            outcome: ImportOutcome::Imported { upload },
        }
    }

    pub fn failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            outcome: ImportOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ImportOutcome::Imported { .. })
    }

    pub fn upload(&self) -> Option<&UploadResult> {
        match &self.outcome {
            ImportOutcome::Imported { upload } => Some(upload),
            ImportOutcome::Failed { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            ImportOutcome::Imported { .. } => None,
            ImportOutcome::Failed { reason } => Some(reason),
        }
    }
}

/// Aggregate of a bulk import, results ordered like the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkImportReport {
    pub total: usize,
    pub success_count: usize,
    pub results: Vec<ImportResult>,
}

impl BulkImportReport {
    pub fn from_results(results: Vec<ImportResult>) -> Self {
        let success_count = results.iter().filter(|r| r.is_success()).count();
        Self {
            total: results.len(),
            success_count,
            results,
        }
    }
}
