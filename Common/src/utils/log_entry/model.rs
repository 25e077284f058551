use std::path::Display;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelEntry<'a> {
    #[error("Model loaded from {0}")]
    Loaded(Display<'a>),
    #[error("Failed to load model {0}: {1}")]
    LoadError(Display<'a>, String),
    #[error("Model inference failed: {0}")]
    InferenceError(String),
    #[error("Unexpected model output shape {0:?}")]
    UnexpectedOutput(Vec<usize>),
}

impl From<ModelEntry<'_>> for String {
    #[inline(always)]
    fn from(value: ModelEntry) -> Self {
        value.to_string()
    }
}
