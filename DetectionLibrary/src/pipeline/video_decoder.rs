use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_pbutils::prelude::*;
use gstreamer_pbutils::Discoverer;
use image::{DynamicImage, RgbImage, RgbaImage};
use std::path::Path;
use crate::utils::logging::*;

/// A frame whose pixels are converted only once a caller decides to keep it.
pub trait RawFrame {
    fn into_rgb_image(self) -> Result<RgbImage, LogEntry>;
}

impl RawFrame for RgbImage {
    fn into_rgb_image(self) -> Result<RgbImage, LogEntry> {
        Ok(self)
    }
}

/// One RGBA sample straight off the appsink.
pub struct DecodedFrame {
    sample: gstreamer::Sample,
}

impl RawFrame for DecodedFrame {
    fn into_rgb_image(self) -> Result<RgbImage, LogEntry> {
        VideoDecoder::sample_to_image(&self.sample)
    }
}

/// Pulls decoded frames out of a video, in presentation order.
pub struct VideoDecoder {
    pipeline: gstreamer::Element,
    sink: AppSink,
    bus: gstreamer::Bus,
    polling_interval: gstreamer::ClockTime,
    finished: bool,
}

impl VideoDecoder {
    pub fn open(video_path: &Path, polling_interval: u64) -> Result<Self, LogEntry> {
        gstreamer::init()
            .map_err(|err| error_entry!(GStreamerEntry::InitializeError(err)))?;
        let pipeline_string = format!(
            "filesrc location={:?} ! decodebin ! videoconvert ! \
            video/x-raw,format=RGBA ! appsink name=sink sync=false",
            video_path
        );
        let pipeline = gstreamer::parse::launch(&pipeline_string)
            .map_err(|err| error_entry!(GStreamerEntry::CreatePipelineError(err)))?;
        let sink = pipeline.clone()
            .downcast::<gstreamer::Bin>()
            .ok()
            .and_then(|bin| bin.by_name("sink"))
            .and_then(|element| element.downcast::<AppSink>().ok())
            .ok_or_else(|| error_entry!(GStreamerEntry::GetElementError("sink".to_string())))?;
        let bus = pipeline.bus()
            .ok_or_else(|| error_entry!(GStreamerEntry::GetBusError))?;
        pipeline.set_state(gstreamer::State::Playing)
            .map_err(|err| error_entry!(GStreamerEntry::PipelineSetStateError(err)))?;
        Ok(Self {
            pipeline,
            sink,
            bus,
            polling_interval: gstreamer::ClockTime::from_mseconds(polling_interval),
            finished: false,
        })
    }

    /// Frames per second of the first video stream, `None` when the container does not say.
    pub fn frame_rate(video_path: &Path) -> Result<Option<f64>, LogEntry> {
        gstreamer::init()
            .map_err(|err| error_entry!(GStreamerEntry::InitializeError(err)))?;
        let absolute_path = video_path.canonicalize()
            .map_err(|err| error_entry!(IOEntry::GetAbsolutePathError(video_path.display(), err)))?;
        let discoverer = Discoverer::new(gstreamer::ClockTime::from_seconds(5))
            .map_err(|err| error_entry!(GStreamerEntry::DiscoverError(err)))?;
        let info = discoverer.discover_uri(&format!("file://{}", absolute_path.to_string_lossy()))
            .map_err(|err| error_entry!(GStreamerEntry::DiscoverError(err)))?;
        let frame_rate = info.video_streams().first()
            .and_then(|stream| stream.caps())
            .and_then(|caps| caps.structure(0).map(|structure| structure.to_owned()))
            .and_then(|structure| structure.get::<gstreamer::Fraction>("framerate").ok())
            .filter(|fraction| fraction.denom() != 0)
            .map(|fraction| fraction.numer() as f64 / fraction.denom() as f64);
        Ok(frame_rate)
    }

    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, LogEntry> {
        loop {
            while let Some(message) = self.bus.pop() {
                if let gstreamer::MessageView::Error(err) = message.view() {
                    return Err(error_entry!(GStreamerEntry::InternalError(err.error())));
                }
            }
            if let Some(sample) = self.sink.try_pull_sample(self.polling_interval) {
                return Ok(Some(DecodedFrame { sample }));
            }
            if self.sink.is_eos() {
                return Ok(None);
            }
        }
    }

    fn sample_to_image(sample: &gstreamer::Sample) -> Result<RgbImage, LogEntry> {
        let buffer = sample.buffer()
            .ok_or_else(|| error_entry!(GStreamerEntry::InvalidSampleError))?;
        let structure = sample.caps()
            .and_then(|caps| caps.structure(0))
            .ok_or_else(|| error_entry!(GStreamerEntry::InvalidSampleError))?;
        let width = structure.get::<i32>("width")
            .map_err(|_| error_entry!(GStreamerEntry::InvalidSampleError))? as u32;
        let height = structure.get::<i32>("height")
            .map_err(|_| error_entry!(GStreamerEntry::InvalidSampleError))? as u32;
        let map = buffer.map_readable()
            .map_err(|_| error_entry!(GStreamerEntry::MapBufferError))?;
        let rgba = RgbaImage::from_raw(width, height, map.as_slice().to_vec())
            .ok_or_else(|| error_entry!(ImageEntry::FrameBufferSizeError(width, height)))?;
        Ok(DynamicImage::ImageRgba8(rgba).to_rgb8())
    }
}

impl Iterator for VideoDecoder {
    type Item = Result<DecodedFrame, LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(entry) => {
                self.finished = true;
                Some(Err(entry))
            }
        }
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gstreamer::State::Null);
    }
}
