pub mod config;
pub mod disk_space;
pub mod logging;
pub mod static_files;
