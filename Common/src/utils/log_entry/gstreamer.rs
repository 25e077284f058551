use gstreamer::glib::Error as GError;
use gstreamer::StateChangeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GStreamerEntry {
    #[error("GStreamer initialization failed: {0}")]
    InitializeError(GError),
    #[error("Failed to create GStreamer pipeline: {0}")]
    CreatePipelineError(GError),
    #[error("Failed to discover media information: {0}")]
    DiscoverError(GError),
    #[error("Failed to get GStreamer bus")]
    GetBusError,
    #[error("Failed to get GStreamer element {0}")]
    GetElementError(String),
    #[error("Failed to set pipeline status: {0}")]
    PipelineSetStateError(StateChangeError),
    #[error("GStreamer internal error: {0}")]
    InternalError(GError),
    #[error("Decoded sample carries no buffer or caps")]
    InvalidSampleError,
    #[error("Failed to map decoded buffer")]
    MapBufferError,
}

impl From<GStreamerEntry> for String {
    #[inline(always)]
    fn from(value: GStreamerEntry) -> Self {
        value.to_string()
    }
}
