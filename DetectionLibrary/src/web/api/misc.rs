use actix_web::{get, web, HttpResponse, Responder, Scope};

pub fn initialize() -> Scope {
    web::scope("/ping")
        .service(ping)
}

#[get("")]
async fn ping() -> impl Responder {
    HttpResponse::Ok().body("pong")
}
