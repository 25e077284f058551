use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::RwLock;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use crate::utils::logging::*;

lazy_static! {
    static ref CONFIG: RwLock<Config> = RwLock::new(Config::new());
}

const CONFIG_PATH: &str = "./detection.toml";

#[derive(Debug, Deserialize)]
struct ConfigTable {
    #[serde(rename = "Config")]
    config: Config,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub http_server_bind_port: u16, //port
    pub bind_retry_duration: u64, //seconds
    pub polling_interval: u64, //milliseconds
    pub storage_root: PathBuf, //path
    pub model_path: PathBuf, //path
    pub model_input_size: u32, //pixels
    pub confidence_threshold: f32, //0..=1
    pub iou_threshold: f32, //0..=1
    pub target_name: String,
    pub default_frame_rate: usize, //frames
    pub max_sampled_frames: usize, //frames
    pub batch_limit: usize, //frames
    pub minimum_free_space: u64, //megabytes
    pub font_path: String, //path, empty disables labels
    pub font_size: f32, //pixels
    pub summary_font_size: f32, //pixels
    pub border_width: u32, //pixels
    pub border_color: [u8; 3], //RGB
    pub label_color: [u8; 3], //RGB
    pub summary_color: [u8; 3], //RGB
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_server_bind_port: 5000,
            bind_retry_duration: 5,
            polling_interval: 100,
            storage_root: PathBuf::from("./static"),
            model_path: PathBuf::from("./models/best.onnx"),
            model_input_size: 640,
            confidence_threshold: 0.5,
            iou_threshold: 0.7,
            target_name: "Drone".to_string(),
            default_frame_rate: 30,
            max_sampled_frames: 180,
            batch_limit: 10,
            minimum_free_space: 100,
            font_path: String::new(),
            font_size: 16.0,
            summary_font_size: 32.0,
            border_width: 2,
            border_color: [0, 255, 0],
            label_color: [0, 0, 255],
            summary_color: [255, 0, 0],
        }
    }
}

impl Config {
    pub fn new() -> Self {
        //A broken configuration file is fatal, a missing one is not.
        let mut config = match fs::read_to_string(CONFIG_PATH) {
            Ok(toml_string) => match Self::parse(&toml_string) {
                Ok(config) => config,
                Err(entry) => {
                    logging_console!(entry);
                    panic!("Unable to parse configuration file");
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                logging_console!(warning_entry!(SystemEntry::ConfigNotFound));
                Config::default()
            }
            Err(err) => {
                logging_console!(emergency_entry!(IOEntry::ReadFileError(std::path::Path::new(CONFIG_PATH).display(), err)));
                panic!("Unable to read configuration file");
            }
        };
        if let Some(port) = std::env::var("PORT").ok().and_then(|port| port.parse::<u16>().ok()) {
            config.http_server_bind_port = port;
        }
        if !Self::validate(&config) {
            logging_console!(emergency_entry!(SystemEntry::InvalidConfig));
            panic!("Invalid configuration file");
        }
        config
    }

    pub fn parse(toml_string: &str) -> Result<Config, LogEntry> {
        let config_table = toml::from_str::<ConfigTable>(toml_string)
            .map_err(|err| emergency_entry!(SystemEntry::ConfigParseError(err.to_string())))?;
        Ok(config_table.config)
    }

    pub async fn now() -> Config {
        CONFIG.read().await.clone()
    }

    pub fn validate(config: &Config) -> bool {
        Config::validate_second(config.bind_retry_duration)
            && Config::validate_mini_second(config.polling_interval)
            && Config::validate_ratio(config.confidence_threshold)
            && Config::validate_ratio(config.iou_threshold)
            && Config::validate_positive(config.model_input_size as usize)
            && Config::validate_positive(config.default_frame_rate)
            && Config::validate_positive(config.max_sampled_frames)
            && Config::validate_positive(config.batch_limit)
            && Config::validate_font_size(config.font_size)
            && Config::validate_font_size(config.summary_font_size)
            && Config::validate_border_width(config.border_width)
            && !config.target_name.is_empty()
    }

    fn validate_mini_second(second: u64) -> bool {
        second > 0 && second <= 60000
    }

    fn validate_second(second: u64) -> bool {
        second <= 3600
    }

    fn validate_ratio(ratio: f32) -> bool {
        (0.0..=1.0).contains(&ratio)
    }

    fn validate_positive(value: usize) -> bool {
        value > 0
    }

    fn validate_border_width(width: u32) -> bool {
        width > 0_u32
    }

    fn validate_font_size(size: f32) -> bool {
        size > 0_f32
    }

    pub fn uploads_folder(&self) -> PathBuf {
        self.storage_root.join("uploads")
    }

    pub fn frames_folder(&self) -> PathBuf {
        self.storage_root.join("frames")
    }

    pub fn annotated_folder(&self) -> PathBuf {
        self.storage_root.join("annotated_frames")
    }
}
