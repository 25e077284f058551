use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::fs;
use std::path::Path;
use crate::pipeline::utils::detection_box::DetectionBox;
use crate::utils::config::Config;
use crate::utils::logging::*;

const LABEL_OFFSET: i32 = 10;
const SUMMARY_ORIGIN: (i32, i32) = (10, 40);

/// Draws boxes, a confidence label per box and a count label. Without a font
/// only the boxes are drawn.
#[derive(Clone)]
pub struct Annotator {
    font: Option<FontArc>,
    target_name: String,
    font_size: f32,
    summary_font_size: f32,
    border_width: u32,
    border_color: Rgb<u8>,
    label_color: Rgb<u8>,
    summary_color: Rgb<u8>,
}

impl Annotator {
    pub fn new(config: &Config, font: Option<FontArc>) -> Self {
        Self {
            font,
            target_name: config.target_name.clone(),
            font_size: config.font_size,
            summary_font_size: config.summary_font_size,
            border_width: config.border_width,
            border_color: Rgb(config.border_color),
            label_color: Rgb(config.label_color),
            summary_color: Rgb(config.summary_color),
        }
    }

    pub fn load_font(font_path: &Path) -> Result<FontArc, LogEntry> {
        let font_data = fs::read(font_path)
            .map_err(|err| error_entry!(IOEntry::ReadFileError(font_path.display(), err)))?;
        FontArc::try_from_vec(font_data)
            .map_err(|_| error_entry!(ImageEntry::FontParseError(font_path.display())))
    }

    pub fn confidence_label(&self, confidence: f32) -> String {
        format!("{}: {:.2}", self.target_name, confidence)
    }

    pub fn summary_label(count: usize) -> String {
        format!("Detected: {count}")
    }

    pub fn annotate(&self, image: &mut RgbImage, boxes: &[DetectionBox]) {
        if boxes.is_empty() {
            return;
        }
        for detection in boxes {
            let (x1, y1, x2, y2) = detection.corners();
            let base_rectangle = Rect::at(x1, y1)
                .of_size((x2 - x1).max(1) as u32, (y2 - y1).max(1) as u32);
            for i in 0..self.border_width {
                let offset_rect = Rect::at(base_rectangle.left() - i as i32, base_rectangle.top() - i as i32)
                    .of_size(base_rectangle.width() + 2 * i, base_rectangle.height() + 2 * i);
                draw_hollow_rect_mut(image, offset_rect, self.border_color);
            }
            if let Some(font) = &self.font {
                let text = self.confidence_label(detection.confidence);
                let baseline = y1 - LABEL_OFFSET;
                draw_text_mut(image, self.label_color, x1, baseline - self.font_size as i32,
                              PxScale::from(self.font_size), font, &text);
            }
        }
        if let Some(font) = &self.font {
            let (x, baseline) = SUMMARY_ORIGIN;
            draw_text_mut(image, self.summary_color, x, baseline - self.summary_font_size as i32,
                          PxScale::from(self.summary_font_size), font, &Self::summary_label(boxes.len()));
        }
    }
}
