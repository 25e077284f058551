use std::fmt::Display;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum MediaType {
    Video,
    Image,
}

impl MediaType {
    pub const VIDEO_EXTENSIONS: [&'static str; 5] = ["mp4", "mov", "avi", "mkv", "webm"];
    pub const IMAGE_EXTENSIONS: [&'static str; 4] = ["jpg", "jpeg", "png", "webp"];

    /// Lowercased text after the last `.` of a file name. `.mp4` has the extension `mp4`.
    pub fn extension_of(filename: &str) -> Option<String> {
        filename.rsplit_once('.')
            .map(|(_, extension)| extension.to_ascii_lowercase())
    }

    pub fn from_filename(filename: &str) -> Option<(String, Self)> {
        let extension = Self::extension_of(filename)?;
        let media_type = extension.parse().ok()?;
        Some((extension, media_type))
    }
}

impl FromStr for MediaType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let extension = s.to_ascii_lowercase();
        if Self::VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Ok(MediaType::Video)
        } else if Self::IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Ok(MediaType::Image)
        } else {
            Err(())
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            MediaType::Video => "Video",
            MediaType::Image => "Image",
        })
    }
}
