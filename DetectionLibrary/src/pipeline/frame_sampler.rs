use image::{ImageFormat, RgbImage};
use std::path::Path;
use uuid::Uuid;
use crate::pipeline::utils::frame::Frame;
use crate::pipeline::utils::media_type::MediaType;
use crate::pipeline::video_decoder::{RawFrame, VideoDecoder};
use crate::utils::config::Config;
use crate::utils::logging::*;

/// Turns an uploaded media file into JPEG stills inside a frame folder.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    default_frame_rate: usize,
    max_sampled_frames: usize,
    polling_interval: u64,
}

impl FrameSampler {
    pub fn new(config: &Config) -> Self {
        Self {
            default_frame_rate: config.default_frame_rate,
            max_sampled_frames: config.max_sampled_frames,
            polling_interval: config.polling_interval,
        }
    }

    /// Blocking. Frames already written stay on disk when a later frame fails.
    pub fn sample(&self, media_path: &Path, media_type: MediaType, output_folder: &Path) -> Result<Vec<Frame>, LogEntry> {
        let frames = match media_type {
            MediaType::Image => {
                logging_blocking!(information_entry!(PipelineEntry::ExtractingImage));
                vec![Self::sample_image(media_path, output_folder)?]
            }
            MediaType::Video => self.sample_video(media_path, output_folder)?,
        };
        logging_blocking!(information_entry!(PipelineEntry::FramesSampled(frames.len())));
        Ok(frames)
    }

    fn sample_image(image_path: &Path, output_folder: &Path) -> Result<Frame, LogEntry> {
        let image = image::open(image_path)
            .map_err(|err| error_entry!(ImageEntry::DecodeError(image_path.display(), err)))?;
        Self::save_frame(&image.to_rgb8(), output_folder)
    }

    fn sample_video(&self, video_path: &Path, output_folder: &Path) -> Result<Vec<Frame>, LogEntry> {
        let frame_rate = VideoDecoder::frame_rate(video_path)?;
        let interval = Self::sampling_interval(frame_rate, self.default_frame_rate);
        logging_blocking!(information_entry!(PipelineEntry::ExtractingVideo(interval)));
        let decoder = VideoDecoder::open(video_path, self.polling_interval)?;
        self.sample_frames(decoder, interval, output_folder)
    }

    /// Frames per sample. The source rate truncated to a whole number, or the
    /// default when the rate is unknown or not positive. Never zero.
    pub fn sampling_interval(frame_rate: Option<f64>, default_frame_rate: usize) -> usize {
        match frame_rate {
            Some(rate) if rate > 0.0 => (rate as usize).max(1),
            _ => default_frame_rate.max(1),
        }
    }

    /// Keeps every `interval`-th frame, starting with the first, until the cap is hit.
    /// Skipped frames are never converted.
    pub fn sample_frames<I, F>(&self, frames: I, interval: usize, output_folder: &Path) -> Result<Vec<Frame>, LogEntry>
    where
        I: Iterator<Item = Result<F, LogEntry>>,
        F: RawFrame,
    {
        let interval = interval.max(1);
        let mut sampled = Vec::new();
        for (index, frame) in frames.enumerate() {
            let frame = frame?;
            if index % interval != 0 {
                continue;
            }
            sampled.push(Self::save_frame(&frame.into_rgb_image()?, output_folder)?);
            if sampled.len() >= self.max_sampled_frames {
                break;
            }
        }
        Ok(sampled)
    }

    fn save_frame(image: &RgbImage, output_folder: &Path) -> Result<Frame, LogEntry> {
        let filename = format!("{}.jpg", Uuid::new_v4());
        let path = output_folder.join(&filename);
        image.save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|err| error_entry!(ImageEntry::EncodeError(path.display(), err)))?;
        Ok(Frame::new(filename, path))
    }
}
