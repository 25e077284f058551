use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new<T: Into<String>>(error: T) -> Self {
        Self { error: error.into() }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub filename: String,
    pub media_url: String,
    pub frame_urls: Vec<String>,
    pub annotated_frame_urls: Vec<String>,
    pub summary: String,
    pub failed_frame_count: usize,
}

impl UploadResult {
    pub fn summary(target_name: &str, with_detection: usize, total: usize) -> String {
        format!("{target_name}s detected in {with_detection} out of {total} frames")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_frames_with_detections() {
        assert_eq!(UploadResult::summary("Drone", 0, 5), "Drones detected in 0 out of 5 frames");
        assert_eq!(UploadResult::summary("Drone", 2, 3), "Drones detected in 2 out of 3 frames");
    }

    #[test]
    fn fields_are_camel_case() {
        let result = UploadResult {
            filename: "a.jpg".to_string(),
            media_url: "/static/uploads/a.jpg".to_string(),
            frame_urls: Vec::new(),
            annotated_frame_urls: Vec::new(),
            summary: String::new(),
            failed_frame_count: 0,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("mediaUrl").is_some());
        assert!(value.get("annotatedFrameUrls").is_some());
        assert!(value.get("failedFrameCount").is_some());
    }
}
