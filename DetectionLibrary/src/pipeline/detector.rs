use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;
use tract_onnx::prelude::tract_ndarray::{Array4, ArrayView2, Axis, Ix2};
use tract_onnx::prelude::*;
use crate::pipeline::utils::detection_box::DetectionBox;
use crate::utils::config::Config;
use crate::utils::logging::*;

type OnnxModel = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

const PAD_VALUE: u8 = 114;

pub trait Detector: Send + Sync {
    /// Boxes scoring at or above the confidence threshold, in source pixel coordinates.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<DetectionBox>, LogEntry>;
}

/// YOLO-style exported ONNX model: one `[1, 4 + classes, anchors]` output of
/// center/size boxes followed by per-class scores.
pub struct OnnxDetector {
    model: OnnxModel,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl OnnxDetector {
    pub fn new(model_path: &Path, input_size: u32, confidence_threshold: f32, iou_threshold: f32) -> Result<Self, LogEntry> {
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, 3, side, side]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|err| critical_entry!(ModelEntry::LoadError(model_path.display(), err.to_string())))?;
        Ok(Self { model, input_size, confidence_threshold, iou_threshold })
    }

    pub fn from_config(config: &Config) -> Result<Self, LogEntry> {
        Self::new(&config.model_path, config.model_input_size, config.confidence_threshold, config.iou_threshold)
    }

    fn image_to_tensor(image: &RgbImage) -> Tensor {
        let (width, height) = (image.width() as usize, image.height() as usize);
        Array4::from_shape_fn((1, 3, height, width), |(_, channel, y, x)| {
            image.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0
        }).into()
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<DetectionBox>, LogEntry> {
        let (letterbox, canvas) = Letterbox::fit(image, self.input_size);
        let input = Self::image_to_tensor(&canvas);
        let outputs = self.model.run(tvec!(input.into_tvalue()))
            .map_err(|err| error_entry!(ModelEntry::InferenceError(err.to_string())))?;
        let output = outputs.first()
            .ok_or_else(|| error_entry!(ModelEntry::UnexpectedOutput(Vec::new())))?
            .to_array_view::<f32>()
            .map_err(|err| error_entry!(ModelEntry::InferenceError(err.to_string())))?;
        let shape = output.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(error_entry!(ModelEntry::UnexpectedOutput(shape)));
        }
        let predictions = output.index_axis(Axis(0), 0)
            .into_dimensionality::<Ix2>()
            .map_err(|_| error_entry!(ModelEntry::UnexpectedOutput(shape.clone())))?;
        // Some exports emit anchors first.
        let predictions = if predictions.nrows() > predictions.ncols() {
            predictions.reversed_axes()
        } else {
            predictions
        };
        if predictions.nrows() < 5 {
            return Err(error_entry!(ModelEntry::UnexpectedOutput(shape)));
        }
        let candidates = decode_predictions(predictions, self.confidence_threshold);
        let boxes = non_max_suppression(candidates, self.iou_threshold)
            .into_iter()
            .filter_map(|detection| letterbox.restore(detection, image.width(), image.height()))
            .collect();
        Ok(boxes)
    }
}

/// Aspect-preserving resize onto a square canvas, centered, grey padded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    pub fn fit(image: &DynamicImage, size: u32) -> (Self, RgbImage) {
        let (width, height) = (image.width().max(1), image.height().max(1));
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let new_width = ((width as f32 * scale).round() as u32).clamp(1, size);
        let new_height = ((height as f32 * scale).round() as u32).clamp(1, size);
        let resized = imageops::resize(&image.to_rgb8(), new_width, new_height, FilterType::Triangle);
        let pad_x = (size - new_width) / 2;
        let pad_y = (size - new_height) / 2;
        let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
        imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);
        (Self { scale, pad_x: pad_x as f32, pad_y: pad_y as f32 }, canvas)
    }

    /// Maps a canvas box back onto the source image, `None` if nothing is left after clamping.
    pub fn restore(&self, detection: DetectionBox, width: u32, height: u32) -> Option<DetectionBox> {
        let (width, height) = (width as f32, height as f32);
        let x1 = ((detection.x1 - self.pad_x) / self.scale).clamp(0.0, width);
        let y1 = ((detection.y1 - self.pad_y) / self.scale).clamp(0.0, height);
        let x2 = ((detection.x2 - self.pad_x) / self.scale).clamp(0.0, width);
        let y2 = ((detection.y2 - self.pad_y) / self.scale).clamp(0.0, height);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(DetectionBox::new(x1, y1, x2, y2, detection.confidence, detection.class_id))
    }
}

/// `predictions` is `[4 + classes, anchors]`, rows `cx, cy, w, h, score...`.
pub fn decode_predictions(predictions: ArrayView2<f32>, confidence_threshold: f32) -> Vec<DetectionBox> {
    let classes = predictions.nrows().saturating_sub(4);
    predictions.columns()
        .into_iter()
        .filter_map(|column| {
            let (class_id, confidence) = (0..classes)
                .map(|class_id| (class_id, column[4 + class_id]))
                .fold((0, f32::MIN), |best, current| if current.1 > best.1 { current } else { best });
            if classes == 0 || confidence < confidence_threshold {
                return None;
            }
            let (center_x, center_y, width, height) = (column[0], column[1], column[2], column[3]);
            Some(DetectionBox::new(
                center_x - width / 2.0,
                center_y - height / 2.0,
                center_x + width / 2.0,
                center_y + height / 2.0,
                confidence,
                class_id,
            ))
        })
        .collect()
}

/// Greedy, per class, highest confidence first.
pub fn non_max_suppression(mut boxes: Vec<DetectionBox>, iou_threshold: f32) -> Vec<DetectionBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<DetectionBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        let suppressed = kept.iter()
            .any(|existing| existing.class_id == candidate.class_id && existing.iou(&candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
