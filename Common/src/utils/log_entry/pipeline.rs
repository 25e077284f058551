use std::path::Display;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineEntry<'a> {
    #[error("Extracting frames from video, one every {0} frames")]
    ExtractingVideo(usize),
    #[error("Processing image frame")]
    ExtractingImage,
    #[error("Sampled {0} frames")]
    FramesSampled(usize),
    #[error("Input folder not found: {0}")]
    InputFolderNotFound(Display<'a>),
    #[error("No image files found in: {0}")]
    NoImageFiles(Display<'a>),
    #[error("Processing {0} images")]
    BatchStarted(usize),
    #[error("No detections in {0}")]
    NoDetection(String),
    #[error("Saved {0} ({1} objects)")]
    Annotated(Display<'a>, usize),
    #[error("Error processing {0}: {1}")]
    FrameFailed(String, String),
    #[error("Batch finished: {0} annotated, {1} without detections, {2} failed")]
    BatchFinished(usize, usize, usize),
}

impl From<PipelineEntry<'_>> for String {
    #[inline(always)]
    fn from(value: PipelineEntry) -> Self {
        value.to_string()
    }
}
