use actix_web::{get, web, Responder, Scope};
use crate::web::server::AppState;

pub fn initialize() -> Scope {
    web::scope("/config")
        .service(get_config)
}

#[get("/get")]
async fn get_config(state: web::Data<AppState>) -> impl Responder {
    web::Json(state.config.clone())
}
