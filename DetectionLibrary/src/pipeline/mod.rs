pub mod utils;
pub mod annotator;
pub mod batch_runner;
pub mod detector;
pub mod frame_sampler;
pub mod video_decoder;
pub mod workspace;
