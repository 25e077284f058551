use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum UploadEntry {
    #[error("Received upload request, session {0}")]
    Received(Uuid),
    #[error("Stored upload as {0}")]
    Stored(String),
    #[error("Not enough disk space, {0}MB free, {1}MB required")]
    LowDiskSpace(u64, u64),
    #[error("Detection complete, {0} out of {1} frames with detections")]
    Completed(usize, usize),
    #[error("Unhandled failure during upload: {0}")]
    Unhandled(String),
}

impl From<UploadEntry> for String {
    #[inline(always)]
    fn from(value: UploadEntry) -> Self {
        value.to_string()
    }
}
