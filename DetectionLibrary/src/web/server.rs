use std::sync::Arc;
use actix_files::Files;
use actix_web::web;
use crate::pipeline::annotator::Annotator;
use crate::pipeline::detector::Detector;
use crate::pipeline::workspace::Workspace;
use crate::utils::config::Config;
use crate::web::api::{config, default, log, misc, upload};

/// Shared by every request. The detector is loaded once and only read afterwards.
pub struct AppState {
    pub config: Config,
    pub detector: Arc<dyn Detector>,
    pub annotator: Arc<Annotator>,
    pub workspace: Workspace,
}

impl AppState {
    pub fn new(config: Config, detector: Arc<dyn Detector>, annotator: Annotator) -> Self {
        let workspace = Workspace::new(&config);
        Self {
            config,
            detector,
            annotator: Arc::new(annotator),
            workspace,
        }
    }
}

/// Registers every route. Used by the server and by the integration tests.
pub fn configure(state: web::Data<AppState>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        let uploads_root = state.workspace.uploads_root().to_path_buf();
        let frames_root = state.workspace.frames_root().to_path_buf();
        let annotated_root = state.workspace.annotated_root().to_path_buf();
        cfg.app_data(state)
            .service(Files::new("/static/uploads", uploads_root))
            .service(Files::new("/static/frames", frames_root))
            .service(Files::new("/static/annotated_frames", annotated_root))
            .service(config::initialize())
            .service(log::initialize())
            .service(misc::initialize())
            .service(upload::initialize())
            .default_service(web::route().to(default::default_route));
    }
}
