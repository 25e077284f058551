use serde::Serialize;
use std::path::PathBuf;

/// A sampled still, stored on disk under a generated unique name.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Frame {
    pub filename: String,
    pub path: PathBuf,
}

impl Frame {
    pub fn new(filename: String, path: PathBuf) -> Self {
        Self { filename, path }
    }
}
