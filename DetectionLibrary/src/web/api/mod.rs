pub mod config;
pub mod default;
pub mod log;
pub mod misc;
pub mod upload;
