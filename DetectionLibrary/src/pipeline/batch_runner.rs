use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use crate::pipeline::annotator::Annotator;
use crate::pipeline::detector::Detector;
use crate::pipeline::utils::batch_report::BatchReport;
use crate::utils::logging::*;

const FRAME_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Runs detection over a folder of frames and writes annotated copies of the
/// frames that contain at least one box. Blocking.
pub struct BatchRunner<'a> {
    detector: &'a dyn Detector,
    annotator: &'a Annotator,
    batch_limit: usize,
    session_id: Option<Uuid>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(detector: &'a dyn Detector, annotator: &'a Annotator, batch_limit: usize) -> Self {
        Self { detector, annotator, batch_limit, session_id: None }
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn run(&self, input_folder: &Path, output_folder: &Path) -> Result<BatchReport, LogEntry> {
        fs::create_dir_all(output_folder)
            .map_err(|err| error_entry!(IOEntry::CreateDirectoryError(output_folder.display(), err)))?;
        if !input_folder.is_dir() {
            self.log(warning_entry!(PipelineEntry::InputFolderNotFound(input_folder.display())));
            return Ok(BatchReport::default());
        }
        let mut frames = Self::list_frames(input_folder)?;
        let mut report = BatchReport { listed: frames.len(), ..BatchReport::default() };
        if frames.is_empty() {
            self.log(notice_entry!(PipelineEntry::NoImageFiles(input_folder.display())));
            return Ok(report);
        }
        frames.truncate(self.batch_limit);
        report.processed = frames.len();
        self.log(information_entry!(PipelineEntry::BatchStarted(frames.len())));
        for frame_path in frames {
            let filename = frame_path.file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            match self.process_frame(&frame_path, &output_folder.join(&filename)) {
                Ok(0) => {
                    self.log(information_entry!(PipelineEntry::NoDetection(filename.clone())));
                    report.without_detection.push(filename);
                }
                Ok(_) => report.annotated.push(filename),
                Err(entry) => {
                    self.log(error_entry!(PipelineEntry::FrameFailed(filename.clone(), entry.message.clone())));
                    report.failed.push((filename, entry.message));
                }
            }
        }
        self.log(information_entry!(PipelineEntry::BatchFinished(
            report.annotated.len(), report.without_detection.len(), report.failed.len()
        )));
        Ok(report)
    }

    /// Frame files sorted by name.
    fn list_frames(input_folder: &Path) -> Result<Vec<PathBuf>, LogEntry> {
        let read_dir = fs::read_dir(input_folder)
            .map_err(|err| error_entry!(IOEntry::ReadDirectoryError(input_folder.display(), err)))?;
        let mut frames: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && Self::is_frame_file(path))
            .collect();
        frames.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(frames)
    }

    fn is_frame_file(path: &Path) -> bool {
        path.extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| FRAME_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Number of boxes found. Nothing is written when it is zero.
    fn process_frame(&self, frame_path: &Path, saved_path: &Path) -> Result<usize, LogEntry> {
        let image = image::open(frame_path)
            .map_err(|err| error_entry!(ImageEntry::DecodeError(frame_path.display(), err)))?;
        let boxes = self.detector.detect(&image)?;
        if boxes.is_empty() {
            return Ok(0);
        }
        let mut canvas = image.to_rgb8();
        self.annotator.annotate(&mut canvas, &boxes);
        canvas.save(saved_path)
            .map_err(|err| error_entry!(ImageEntry::EncodeError(saved_path.display(), err)))?;
        self.log(information_entry!(PipelineEntry::Annotated(saved_path.display(), boxes.len())));
        Ok(boxes.len())
    }

    fn log(&self, entry: LogEntry) {
        match self.session_id {
            Some(session_id) => logging_blocking!(session_id, entry),
            None => logging_blocking!(entry),
        }
    }
}
