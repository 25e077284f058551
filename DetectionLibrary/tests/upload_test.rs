use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use DetectionLibrary::pipeline::annotator::Annotator;
use DetectionLibrary::pipeline::detector::Detector;
use DetectionLibrary::pipeline::utils::detection_box::DetectionBox;
use DetectionLibrary::utils::config::Config;
use DetectionLibrary::utils::disk_space::DiskSpace;
use DetectionLibrary::utils::logging::LogEntry;
use DetectionLibrary::web::server::{self, AppState};
use DetectionLibrary::web::utils::response::UploadResult;

const BOUNDARY: &str = "----DetectionTestBoundary";

struct StaticDetector(Vec<DetectionBox>);

impl Detector for StaticDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<DetectionBox>, LogEntry> {
        Ok(self.0.clone())
    }
}

struct PanickingDetector;

impl Detector for PanickingDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<DetectionBox>, LogEntry> {
        panic!("inference blew up")
    }
}

fn config(root: &Path) -> Config {
    Config {
        storage_root: root.to_path_buf(),
        minimum_free_space: 0,
        ..Config::default()
    }
}

async fn state(config: Config, detector: Arc<dyn Detector>) -> web::Data<AppState> {
    let annotator = Annotator::new(&config, None);
    let state = web::Data::new(AppState::new(config, detector, annotator));
    state.workspace.prepare().await.unwrap();
    state
}

fn no_detections() -> Arc<dyn Detector> {
    Arc::new(StaticDetector(Vec::new()))
}

fn one_detection() -> Arc<dyn Detector> {
    Arc::new(StaticDetector(vec![DetectionBox::new(5.0, 5.0, 30.0, 20.0, 0.91, 0)]))
}

fn png_bytes() -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    RgbImage::from_pixel(48, 32, Rgb([90, 120, 200]))
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
        Content-Type: application/octet-stream\r\n\r\n"
    ).into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn text_field_body(field: &str, value: &str) -> Vec<u8> {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{BOUNDARY}--\r\n"
    ).into_bytes()
}

fn multipart_request(body: Vec<u8>) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/upload")
        .insert_header((CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}")))
        .set_payload(body)
}

fn upload_request(field: &str, filename: &str, content: &[u8]) -> test::TestRequest {
    multipart_request(multipart_body(field, filename, content))
}

fn session_of(url: &str) -> String {
    url.split('/').nth(3).unwrap_or_default().to_string()
}

fn files_under(folder: &Path) -> usize {
    walk(folder).len()
}

fn walk(folder: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(folder) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(walk(&path));
            } else {
                files.push(path);
            }
        }
    }
    files
}

#[actix_web::test]
async fn unsupported_extension_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().configure(server::configure(state(config(root.path()), no_detections()).await))).await;
    let response = test::call_service(&app, upload_request("media", "notes.txt", b"hello").to_request()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"], "File type not supported");
    assert_eq!(files_under(&root.path().join("uploads")), 0);
}

#[actix_web::test]
async fn missing_media_field_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().configure(server::configure(state(config(root.path()), no_detections()).await))).await;
    let response = test::call_service(&app, upload_request("attachment", "clip.mp4", b"data").to_request()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"], "No file part");
}

#[actix_web::test]
async fn media_field_without_a_filename_is_not_a_file() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().configure(server::configure(state(config(root.path()), no_detections()).await))).await;
    let response = test::call_service(&app, multipart_request(text_field_body("media", "clip.mp4")).to_request()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"], "No file part");
}

#[actix_web::test]
async fn dotfile_name_is_accepted_by_its_extension() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().configure(server::configure(state(config(root.path()), no_detections()).await))).await;
    let response = test::call_service(&app, upload_request("media", ".png", &png_bytes()).to_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let result: UploadResult = test::read_body_json(response).await;
    assert!(result.filename.ends_with(".png"));
    assert_eq!(result.frame_urls.len(), 1);
}

#[actix_web::test]
async fn unreadable_video_is_an_extraction_failure() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().configure(server::configure(state(config(root.path()), no_detections()).await))).await;
    let response = test::call_service(&app, upload_request("media", "clip.mp4", b"not a video container").to_request()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Failed to extract frames: "));
}

#[actix_web::test]
async fn empty_filename_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().configure(server::configure(state(config(root.path()), no_detections()).await))).await;
    let response = test::call_service(&app, upload_request("media", "", b"").to_request()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"], "No selected file");
}

#[actix_web::test]
async fn image_without_detections_reports_zero() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().configure(server::configure(state(config(root.path()), no_detections()).await))).await;
    let response = test::call_service(&app, upload_request("media", "sky.PNG", &png_bytes()).to_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let result: UploadResult = test::read_body_json(response).await;
    assert_eq!(result.summary, "Drones detected in 0 out of 1 frames");
    assert!(result.annotated_frame_urls.is_empty());
    assert_eq!(result.frame_urls.len(), 1);
    assert_eq!(result.failed_frame_count, 0);
    assert!(result.filename.ends_with(".png"));
    assert_eq!(result.media_url, format!("/static/uploads/{}", result.filename));
    assert!(root.path().join("uploads").join(&result.filename).is_file());
    let frame = test::TestRequest::get().uri(&result.frame_urls[0]).to_request();
    assert_eq!(test::call_service(&app, frame).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn detections_produce_an_annotated_frame_with_the_same_name() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().configure(server::configure(state(config(root.path()), one_detection()).await))).await;
    let response = test::call_service(&app, upload_request("media", "drone.png", &png_bytes()).to_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let result: UploadResult = test::read_body_json(response).await;
    assert_eq!(result.summary, "Drones detected in 1 out of 1 frames");
    assert_eq!(result.annotated_frame_urls.len(), 1);
    let frame_name = result.frame_urls[0].rsplit('/').next().unwrap();
    let annotated_name = result.annotated_frame_urls[0].rsplit('/').next().unwrap();
    assert_eq!(frame_name, annotated_name);
    let annotated = test::TestRequest::get().uri(&result.annotated_frame_urls[0]).to_request();
    assert_eq!(test::call_service(&app, annotated).await.status(), StatusCode::OK);

    let session = session_of(&result.frame_urls[0]);
    let log = test::TestRequest::get().uri(&format!("/log/{session}")).to_request();
    let log = test::call_and_read_body(&app, log).await;
    assert!(String::from_utf8_lossy(&log).contains("Stored upload as"));
}

#[actix_web::test]
async fn corrupt_image_is_a_processing_failure() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().configure(server::configure(state(config(root.path()), one_detection()).await))).await;
    let response = test::call_service(&app, upload_request("media", "broken.jpg", b"definitely not a jpeg").to_request()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Failed to process image: "));
}

#[actix_web::test]
async fn low_disk_space_stops_before_sampling() {
    let root = tempfile::tempdir().unwrap();
    if DiskSpace::free_megabytes(root.path()).is_err() {
        // No mounted disk visible, the handler skips the check.
        return;
    }
    let config = Config { minimum_free_space: u64::MAX, ..config(root.path()) };
    let app = test::init_service(App::new().configure(server::configure(state(config, one_detection()).await))).await;
    let response = test::call_service(&app, upload_request("media", "drone.png", &png_bytes()).to_request()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"], format!("Not enough disk space (min {}MB required)", u64::MAX));
    assert_eq!(files_under(&root.path().join("frames")), 0);
    assert_eq!(files_under(&root.path().join("annotated_frames")), 0);
}

#[actix_web::test]
async fn panicking_detector_is_reported_as_a_crash() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().configure(server::configure(state(config(root.path()), Arc::new(PanickingDetector)).await))).await;
    let response = test::call_service(&app, upload_request("media", "drone.png", &png_bytes()).to_request()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"], "Server crashed during processing");
}

#[actix_web::test]
async fn earlier_sessions_are_purged_by_the_next_upload() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().configure(server::configure(state(config(root.path()), one_detection()).await))).await;
    let first: UploadResult = test::read_body_json(
        test::call_service(&app, upload_request("media", "a.png", &png_bytes()).to_request()).await
    ).await;
    let second: UploadResult = test::read_body_json(
        test::call_service(&app, upload_request("media", "b.png", &png_bytes()).to_request()).await
    ).await;
    assert!(!root.path().join("frames").join(session_of(&first.frame_urls[0])).exists());
    assert!(root.path().join("frames").join(session_of(&second.frame_urls[0])).is_dir());
    assert_eq!(files_under(&root.path().join("uploads")), 2);

    let first_log = test::TestRequest::get().uri(&format!("/log/{}", session_of(&first.frame_urls[0]))).to_request();
    assert_eq!(test::call_service(&app, first_log).await.status(), StatusCode::NOT_FOUND);
    let second_log = test::TestRequest::get().uri(&format!("/log/{}", session_of(&second.frame_urls[0]))).to_request();
    assert_eq!(test::call_service(&app, second_log).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn auxiliary_routes_respond() {
    let root = tempfile::tempdir().unwrap();
    let app = test::init_service(App::new().configure(server::configure(state(config(root.path()), no_detections()).await))).await;

    let ping = test::call_and_read_body(&app, test::TestRequest::get().uri("/ping").to_request()).await;
    assert_eq!(ping, "pong");

    let config: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/config/get").to_request()).await;
    assert_eq!(config["batch_limit"], 10);
    assert_eq!(config["max_sampled_frames"], 180);

    let index = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(index.status(), StatusCode::OK);
    assert_eq!(index.headers().get(CONTENT_TYPE).unwrap(), "text/html");

    let script = test::call_service(&app, test::TestRequest::get().uri("/js/script.js").to_request()).await;
    assert_eq!(script.status(), StatusCode::OK);

    let unknown_session = format!("/log/{}", uuid::Uuid::new_v4());
    let response = test::call_service(&app, test::TestRequest::get().uri(&unknown_session).to_request()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
