pub use crate::{logging_alert, logging_blocking, logging_console, logging_critical, logging_debug, logging_emergency, logging_entry, logging_error, logging_information, logging_notice, logging_warning};
pub use Common::utils::log_entry::gstreamer::GStreamerEntry;
pub use Common::utils::log_entry::image::ImageEntry;
pub use Common::utils::log_entry::io::IOEntry;
pub use Common::utils::log_entry::model::ModelEntry;
pub use Common::utils::log_entry::pipeline::PipelineEntry;
pub use Common::utils::log_entry::system::SystemEntry;
pub use Common::utils::log_entry::upload::UploadEntry;
pub use Common::utils::logging::*;
pub use Common::{alert_entry, critical_entry, debug_entry, emergency_entry, error_entry, information_entry, notice_entry, warning_entry};

use chrono::{DateTime, Local};
use lazy_static::lazy_static;
use std::collections::HashMap;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

lazy_static! {
    static ref LOGGER: RwLock<Logger> = RwLock::new(Logger::new());
}

/// Process-wide log store. The system log holds everything; each upload
/// additionally gets its own log keyed by its session id.
pub struct Logger {
    system_log: Vec<LogEntry>,
    session_log: HashMap<Uuid, Vec<LogEntry>>,
}

impl Logger {
    fn new() -> Self {
        let mut system_log = Vec::new();
        let log_entry = LogEntry::new(LogLevel::Information, "Logger", "Online now", "");
        system_log.push(log_entry);
        Self {
            system_log,
            session_log: HashMap::new(),
        }
    }

    pub async fn instance() -> RwLockReadGuard<'static, Logger> {
        LOGGER.read().await
    }

    pub async fn instance_mut() -> RwLockWriteGuard<'static, Logger> {
        LOGGER.write().await
    }

    pub async fn add_system_log<T: Into<String>, U: Into<String>, V: Into<String>>(level: LogLevel, position: T, message: U, debug_info: V) {
        let log_entry = LogEntry::new(level, position, message, debug_info);
        Self::add_system_log_entry(log_entry).await;
    }

    pub async fn add_session_log<T: Into<String>, U: Into<String>, V: Into<String>>(session_id: Uuid, level: LogLevel, position: T, message: U, debug_info: V) {
        let log_entry = LogEntry::new(level, position, message, debug_info);
        Self::add_session_log_entry(session_id, log_entry).await;
    }

    pub async fn add_system_log_entry(log_entry: LogEntry) {
        Self::logging_console(log_entry.clone());
        Self::instance_mut().await.push_system(log_entry);
    }

    pub async fn add_session_log_entry(session_id: Uuid, log_entry: LogEntry) {
        Self::logging_console(log_entry.clone());
        Self::instance_mut().await.push_session(session_id, log_entry);
    }

    /// For code running on a blocking thread, where awaiting the lock is not possible.
    /// Must not be called from inside an async task.
    pub fn add_system_log_entry_blocking(log_entry: LogEntry) {
        Self::logging_console(log_entry.clone());
        LOGGER.blocking_write().push_system(log_entry);
    }

    pub fn add_session_log_entry_blocking(session_id: Uuid, log_entry: LogEntry) {
        Self::logging_console(log_entry.clone());
        LOGGER.blocking_write().push_session(session_id, log_entry);
    }

    fn push_system(&mut self, log_entry: LogEntry) {
        self.system_log.push(log_entry);
    }

    fn push_session(&mut self, session_id: Uuid, log_entry: LogEntry) {
        self.system_log.push(log_entry.clone());
        self.session_log.entry(session_id).or_default().push(log_entry);
    }

    /// Drops the per-session copy. The system log keeps its entries.
    pub async fn remove_session_logs(session_id: Uuid) -> Option<Vec<LogEntry>> {
        Self::instance_mut().await.session_log.remove(&session_id)
    }

    pub fn logging_console(log_entry: LogEntry) {
        println!("{}", log_entry.to_colored_string());
    }

    pub fn format_logs(logs: &[LogEntry]) -> String {
        logs.iter()
            .map(|entry| entry.to_plain_string())
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub async fn get_system_logs() -> Vec<LogEntry> {
        Self::instance().await.system_log.clone()
    }

    pub async fn get_session_logs(session_id: Uuid) -> Option<Vec<LogEntry>> {
        Self::instance().await.session_log.get(&session_id).cloned()
    }

    pub async fn get_system_logs_since(time: DateTime<Local>) -> Vec<LogEntry> {
        let logger = Self::instance().await;
        let index = logger.system_log.partition_point(|entry| entry.timestamp < time);
        logger.system_log[index..].to_vec()
    }

    pub async fn get_session_logs_since(session_id: Uuid, time: DateTime<Local>) -> Option<Vec<LogEntry>> {
        let logger = Self::instance().await;
        let logs = logger.session_log.get(&session_id)?;
        let index = logs.partition_point(|entry| entry.timestamp < time);
        Some(logs[index..].to_vec())
    }
}

#[macro_export]
macro_rules! logging_debug {
    ($message:expr) => {
        Logger::add_system_log(LogLevel::Debug, format!("{}:{}", file!(), line!()), $message, "").await
    };
    ($message:expr, $debug_info:expr) => {
        Logger::add_system_log(LogLevel::Debug, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
    ($uuid:expr, $message:expr, $debug_info:expr) => {
        Logger::add_session_log($uuid, LogLevel::Debug, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
}

#[macro_export]
macro_rules! logging_information {
    ($message:expr) => {
        Logger::add_system_log(LogLevel::Information, format!("{}:{}", file!(), line!()), $message, "").await
    };
    ($message:expr, $debug_info:expr) => {
        Logger::add_system_log(LogLevel::Information, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
    ($uuid:expr, $message:expr, $debug_info:expr) => {
        Logger::add_session_log($uuid, LogLevel::Information, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
}

#[macro_export]
macro_rules! logging_notice {
    ($message:expr) => {
        Logger::add_system_log(LogLevel::Notice, format!("{}:{}", file!(), line!()), $message, "").await
    };
    ($message:expr, $debug_info:expr) => {
        Logger::add_system_log(LogLevel::Notice, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
    ($uuid:expr, $message:expr, $debug_info:expr) => {
        Logger::add_session_log($uuid, LogLevel::Notice, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
}

#[macro_export]
macro_rules! logging_warning {
    ($message:expr) => {
        Logger::add_system_log(LogLevel::Warning, format!("{}:{}", file!(), line!()), $message, "").await
    };
    ($message:expr, $debug_info:expr) => {
        Logger::add_system_log(LogLevel::Warning, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
    ($uuid:expr, $message:expr, $debug_info:expr) => {
        Logger::add_session_log($uuid, LogLevel::Warning, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
}

#[macro_export]
macro_rules! logging_error {
    ($message:expr) => {
        Logger::add_system_log(LogLevel::Error, format!("{}:{}", file!(), line!()), $message, "").await
    };
    ($message:expr, $debug_info:expr) => {
        Logger::add_system_log(LogLevel::Error, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
    ($uuid:expr, $message:expr, $debug_info:expr) => {
        Logger::add_session_log($uuid, LogLevel::Error, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
}

#[macro_export]
macro_rules! logging_critical {
    ($message:expr) => {
        Logger::add_system_log(LogLevel::Critical, format!("{}:{}", file!(), line!()), $message, "").await
    };
    ($message:expr, $debug_info:expr) => {
        Logger::add_system_log(LogLevel::Critical, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
    ($uuid:expr, $message:expr, $debug_info:expr) => {
        Logger::add_session_log($uuid, LogLevel::Critical, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
}

#[macro_export]
macro_rules! logging_alert {
    ($message:expr) => {
        Logger::add_system_log(LogLevel::Alert, format!("{}:{}", file!(), line!()), $message, "").await
    };
    ($message:expr, $debug_info:expr) => {
        Logger::add_system_log(LogLevel::Alert, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
    ($uuid:expr, $message:expr, $debug_info:expr) => {
        Logger::add_session_log($uuid, LogLevel::Alert, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
}

#[macro_export]
macro_rules! logging_emergency {
    ($message:expr) => {
        Logger::add_system_log(LogLevel::Emergency, format!("{}:{}", file!(), line!()), $message, "").await
    };
    ($message:expr, $debug_info:expr) => {
        Logger::add_system_log(LogLevel::Emergency, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
    ($uuid:expr, $message:expr, $debug_info:expr) => {
        Logger::add_session_log($uuid, LogLevel::Emergency, format!("{}:{}", file!(), line!()), $message, $debug_info).await
    };
}

#[macro_export]
macro_rules! logging_entry {
    ($entry:expr) => {
        Logger::add_system_log_entry($entry).await
    };
    ($uuid:expr, $entry:expr) => {
        Logger::add_session_log_entry($uuid, $entry).await
    };
}

#[macro_export]
macro_rules! logging_blocking {
    ($entry:expr) => {
        Logger::add_system_log_entry_blocking($entry)
    };
    ($uuid:expr, $entry:expr) => {
        Logger::add_session_log_entry_blocking($uuid, $entry)
    };
}

#[macro_export]
macro_rules! logging_console {
    ($entry:expr) => {
        Logger::logging_console($entry)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_entries_are_kept_apart_and_mirrored_to_system_log() {
        let session_id = Uuid::new_v4();
        logging_information!(session_id, "Sampling started", "");
        logging_warning!(session_id, "No detections", "frame.jpg");
        let session_logs = Logger::get_session_logs(session_id).await.unwrap_or_default();
        assert_eq!(session_logs.len(), 2);
        assert_eq!(session_logs[1].level, LogLevel::Warning);
        let system_logs = Logger::get_system_logs().await;
        assert!(system_logs.iter().any(|entry| entry.message == "No detections"));
    }

    #[tokio::test]
    async fn removed_session_log_stays_in_system_log() {
        let session_id = Uuid::new_v4();
        logging_information!(session_id, "Frames sampled", session_id.to_string());
        let removed = Logger::remove_session_logs(session_id).await.unwrap_or_default();
        assert_eq!(removed.len(), 1);
        assert!(Logger::get_session_logs(session_id).await.is_none());
        assert!(Logger::remove_session_logs(session_id).await.is_none());
        let system_logs = Logger::get_system_logs().await;
        assert!(system_logs.iter().any(|entry| entry.debug_info == session_id.to_string()));
    }

    #[tokio::test]
    async fn unknown_session_has_no_log() {
        assert!(Logger::get_session_logs(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn logs_since_excludes_older_entries() {
        let session_id = Uuid::new_v4();
        logging_information!(session_id, "first", "");
        let cutoff = Local::now();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        logging_information!(session_id, "second", "");
        let logs = Logger::get_session_logs_since(session_id, cutoff).await.unwrap_or_default();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "second");
    }
}
