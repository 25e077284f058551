pub mod batch_report;
pub mod detection_box;
pub mod frame;
pub mod media_type;
