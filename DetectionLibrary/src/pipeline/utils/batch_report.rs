use serde::Serialize;

/// Outcome of one batch run. Files are listed by name; failures keep the
/// rendered error message.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub listed: usize,
    pub processed: usize,
    pub annotated: Vec<String>,
    pub without_detection: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}
