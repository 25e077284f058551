use image::ImageError;
use std::path::Display;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageEntry<'a> {
    #[error("Failed to decode image {0}: {1}")]
    DecodeError(Display<'a>, ImageError),
    #[error("Failed to encode image {0}: {1}")]
    EncodeError(Display<'a>, ImageError),
    #[error("Decoded frame buffer does not match {0}x{1}")]
    FrameBufferSizeError(u32, u32),
    #[error("Unable to parse font data {0}")]
    FontParseError(Display<'a>),
    #[error("No font configured, labels will not be drawn")]
    FontNotConfigured,
}

impl From<ImageEntry<'_>> for String {
    #[inline(always)]
    fn from(value: ImageEntry) -> Self {
        value.to_string()
    }
}
