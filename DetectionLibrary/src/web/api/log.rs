use uuid::Uuid;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use actix_web::{get, web, Scope, Responder, HttpResponse};
use crate::utils::logging::Logger;

pub fn initialize() -> Scope {
    web::scope("/log")
        .service(system_log)
        .service(system_log_since)
        .service(session_log)
        .service(session_log_since)
}

#[get("/system_log")]
async fn system_log() -> impl Responder {
    let system_log = Logger::get_system_logs().await;
    HttpResponse::Ok().body(Logger::format_logs(&system_log))
}

#[get("/system_log/since/{since}")]
async fn system_log_since(since: web::Path<String>) -> impl Responder {
    match parse_datetime(&since.into_inner()) {
        Ok(since_time) => {
            let logs = Logger::get_system_logs_since(since_time).await;
            HttpResponse::Ok().body(Logger::format_logs(&logs))
        },
        Err(err) => HttpResponse::BadRequest().body(err),
    }
}

#[get("/{session_id}")]
async fn session_log(session_id: web::Path<Uuid>) -> impl Responder {
    match Logger::get_session_logs(session_id.into_inner()).await {
        Some(session_log) => HttpResponse::Ok().body(Logger::format_logs(&session_log)),
        None => HttpResponse::NotFound().body("Session not found."),
    }
}

#[get("/{session_id}/since/{since}")]
async fn session_log_since(argument: web::Path<(Uuid, String)>) -> impl Responder {
    let (session_id, since_str) = argument.into_inner();
    match parse_datetime(&since_str) {
        Ok(since_time) => match Logger::get_session_logs_since(session_id, since_time).await {
            Some(logs) => HttpResponse::Ok().body(Logger::format_logs(&logs)),
            None => HttpResponse::NotFound().body("Session not found."),
        },
        Err(err) => HttpResponse::BadRequest().body(err),
    }
}

/// RFC 3339, or local time as `%Y-%m-%d-%H-%M-%S`.
fn parse_datetime(datetime_str: &str) -> Result<DateTime<Local>, String> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(datetime_str) {
        return Ok(date_time.with_timezone(&Local));
    }
    NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d-%H-%M-%S")
        .map_err(|_| "Invalid datetime format.".to_string())
        .and_then(|naive_date_time| {
            Local.from_local_datetime(&naive_date_time)
                .single()
                .ok_or("Invalid local datetime.".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_datetime_formats_are_accepted() {
        assert!(parse_datetime("2024-05-01T12:30:00+00:00").is_ok());
        assert!(parse_datetime("2024-05-01-12-30-00").is_ok());
        assert!(parse_datetime("yesterday").is_err());
    }
}
