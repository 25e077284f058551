use actix_web::{HttpRequest, HttpResponse, Responder};
use mime_guess::from_path;
use crate::utils::static_files::StaticFiles;

pub async fn default_route(req: HttpRequest) -> impl Responder {
    let request_path = req.path().trim_start_matches('/');
    let request_path = if request_path.is_empty() { "index.html" } else { request_path };
    match StaticFiles::get(request_path) {
        Some(content) => {
            let mime_type = from_path(request_path).first_or_octet_stream();
            HttpResponse::Ok()
                .content_type(mime_type.as_ref())
                .body(content.data.into_owned())
        }
        None => HttpResponse::NotFound().body("404 Not Found"),
    }
}
