pub mod gstreamer;
pub mod image;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod system;
pub mod upload;
