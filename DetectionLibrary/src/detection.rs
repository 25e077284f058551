use std::sync::Arc;
use std::time::Duration;
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tokio::time::sleep;
use crate::utils::logging::*;
use crate::utils::config::Config;
use crate::pipeline::annotator::Annotator;
use crate::pipeline::detector::OnnxDetector;
use crate::pipeline::workspace::Workspace;
use crate::web::server::{self, AppState};

pub struct Detection;

impl Detection {
    pub async fn run() {
        logging_information!(SystemEntry::Initializing);
        let config = Config::now().await;
        if let Err(err) = gstreamer::init() {
            logging_emergency!(GStreamerEntry::InitializeError(err));
            std::process::exit(1);
        }
        let detector = match OnnxDetector::from_config(&config) {
            Ok(detector) => detector,
            Err(entry) => {
                logging_entry!(entry);
                std::process::exit(1);
            }
        };
        logging_information!(ModelEntry::Loaded(config.model_path.display()));
        let annotator = Annotator::new(&config, Self::load_font(&config).await);
        let state = web::Data::new(AppState::new(config, Arc::new(detector), annotator));
        if let Err(entry) = state.workspace.prepare().await {
            logging_entry!(entry);
            std::process::exit(1);
        }
        logging_information!(SystemEntry::InitializeComplete);
        let http_server = loop {
            let config = Config::now().await;
            let state = state.clone();
            let http_server = HttpServer::new(move || {
                let cors = Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header();
                App::new()
                    .wrap(cors)
                    .configure(server::configure(state.clone()))
            }).bind(("0.0.0.0", config.http_server_bind_port));
            match http_server {
                Ok(http_server) => break http_server,
                Err(err) => {
                    logging_critical!(SystemEntry::BindPortError(config.http_server_bind_port, err));
                    sleep(Duration::from_secs(config.bind_retry_duration)).await;
                    continue;
                },
            }
        };
        logging_information!(SystemEntry::WebReady);
        logging_information!(SystemEntry::Online);
        if let Err(err) = http_server.run().await {
            logging_emergency!(SystemEntry::WebPanic(err));
        }
    }

    pub async fn terminate() {
        logging_information!(SystemEntry::Terminating);
        let config = Config::now().await;
        logging_information!(SystemEntry::Cleaning);
        match Workspace::new(&config).clear().await {
            Ok(_) => logging_information!(SystemEntry::CleanComplete),
            Err(entry) => logging_entry!(entry),
        }
        logging_information!(SystemEntry::TerminateComplete);
    }

    async fn load_font(config: &Config) -> Option<ab_glyph::FontArc> {
        if config.font_path.is_empty() {
            logging_warning!(ImageEntry::FontNotConfigured);
            return None;
        }
        match Annotator::load_font(std::path::Path::new(&config.font_path)) {
            Ok(font) => Some(font),
            Err(entry) => {
                logging_entry!(warning_entry!(entry.message, ImageEntry::FontNotConfigured));
                None
            }
        }
    }
}
