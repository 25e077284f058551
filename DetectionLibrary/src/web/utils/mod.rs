pub mod response;
pub mod upload_error;
