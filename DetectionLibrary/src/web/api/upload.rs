use uuid::Uuid;
use tokio::fs::File;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::task::spawn_blocking;
use actix_multipart::{Field, Multipart};
use sanitize_filename::sanitize;
use futures::{StreamExt, TryStreamExt};
use actix_web::{post, web, HttpResponse, Scope};
use crate::utils::logging::*;
use crate::utils::disk_space::DiskSpace;
use crate::web::server::AppState;
use crate::web::utils::response::UploadResult;
use crate::web::utils::upload_error::UploadError;
use crate::pipeline::workspace::{Session, Workspace};
use crate::pipeline::batch_runner::BatchRunner;
use crate::pipeline::frame_sampler::FrameSampler;
use crate::pipeline::utils::media_type::MediaType;

const MEDIA_FIELD: &str = "media";
const ANNOTATED_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

pub fn initialize() -> Scope {
    web::scope("/upload")
        .service(upload)
}

struct StoredMedia {
    filename: String,
    path: PathBuf,
    media_type: MediaType,
}

#[post("")]
async fn upload(state: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse, UploadError> {
    let media = receive_media(payload, state.workspace.uploads_root()).await?;
    let session = match state.workspace.open_session().await {
        Ok(session) => session,
        Err(entry) => return Err(internal_error(None, entry).await),
    };
    logging_entry!(session.id, information_entry!(UploadEntry::Received(session.id)));
    logging_entry!(session.id, information_entry!(UploadEntry::Stored(media.filename.clone())));
    let result = process(&state, &session, &media).await;
    state.workspace.release(&session).await;
    let upload_result = result?;
    Ok(HttpResponse::Ok().json(upload_result))
}

async fn process(state: &AppState, session: &Session, media: &StoredMedia) -> Result<UploadResult, UploadError> {
    let config = &state.config;
    let frames_root = state.workspace.frames_root().to_path_buf();
    match spawn_blocking(move || DiskSpace::free_megabytes(&frames_root)).await {
        Ok(Ok(free)) if free < config.minimum_free_space => {
            logging_entry!(session.id, error_entry!(UploadEntry::LowDiskSpace(free, config.minimum_free_space)));
            return Err(UploadError::LowDiskSpace(config.minimum_free_space));
        }
        Ok(Ok(_)) => {}
        Ok(Err(entry)) => logging_entry!(session.id, warning_entry!(entry.message, entry.debug_info)),
        Err(err) => return Err(internal_error(Some(session.id), error_entry!(SystemEntry::TaskPanickedError(err))).await),
    }

    let sampler = FrameSampler::new(config);
    let media_path = media.path.clone();
    let media_type = media.media_type;
    let frames_folder = session.frames_folder.clone();
    let frames = match spawn_blocking(move || sampler.sample(&media_path, media_type, &frames_folder)).await {
        Ok(Ok(frames)) => frames,
        Ok(Err(entry)) => {
            let cause = entry.message.clone();
            logging_entry!(session.id, entry);
            return Err(match media_type {
                MediaType::Video => UploadError::FrameExtraction(cause),
                MediaType::Image => UploadError::ImageProcessing(cause),
            });
        }
        Err(err) => return Err(internal_error(Some(session.id), error_entry!(SystemEntry::TaskPanickedError(err))).await),
    };

    let detector = state.detector.clone();
    let annotator = state.annotator.clone();
    let batch_limit = config.batch_limit;
    let session_id = session.id;
    let input_folder = session.frames_folder.clone();
    let output_folder = session.annotated_folder.clone();
    let report = match spawn_blocking(move || {
        BatchRunner::new(detector.as_ref(), annotator.as_ref(), batch_limit)
            .with_session(session_id)
            .run(&input_folder, &output_folder)
    }).await {
        Ok(Ok(report)) => report,
        Ok(Err(entry)) => {
            let cause = entry.message.clone();
            logging_entry!(session.id, entry);
            return Err(UploadError::Detection(cause));
        }
        Err(err) => return Err(internal_error(Some(session.id), error_entry!(SystemEntry::TaskPanickedError(err))).await),
    };

    let annotated = annotated_files(&session.annotated_folder).await
        .map_err(|entry| UploadError::Detection(entry.message))?;
    let frame_urls: Vec<String> = frames.iter()
        .map(|frame| format!("/static/frames/{}/{}", session.id, frame.filename))
        .collect();
    let annotated_frame_urls: Vec<String> = annotated.iter()
        .map(|filename| format!("/static/annotated_frames/{}/{}", session.id, filename))
        .collect();
    logging_entry!(session.id, information_entry!(UploadEntry::Completed(annotated_frame_urls.len(), frame_urls.len())));
    Ok(UploadResult {
        filename: media.filename.clone(),
        media_url: format!("/static/uploads/{}", media.filename),
        summary: UploadResult::summary(&config.target_name, annotated_frame_urls.len(), frame_urls.len()),
        frame_urls,
        annotated_frame_urls,
        failed_frame_count: report.failed_count(),
    })
}

async fn annotated_files(folder: &Path) -> Result<Vec<String>, LogEntry> {
    let files = Workspace::list_files(folder).await?;
    Ok(files.into_iter()
        .filter(|filename| {
            let lowercase = filename.to_ascii_lowercase();
            ANNOTATED_EXTENSIONS.iter().any(|extension| lowercase.ends_with(extension))
        })
        .collect())
}

/// Stores the `media` field as `{uuid}.{extension}`; other fields are ignored.
async fn receive_media(mut payload: Multipart, uploads_root: &Path) -> Result<StoredMedia, UploadError> {
    while let Ok(Some(mut field)) = payload.try_next().await {
        let content_disposition = match field.content_disposition() {
            Some(content_disposition) => content_disposition.clone(),
            None => continue,
        };
        if content_disposition.get_name() != Some(MEDIA_FIELD) {
            continue;
        }
        // A part without a filename parameter is a plain form value, not a file.
        let file_name = match content_disposition.get_filename() {
            Some(file_name) => sanitize(file_name),
            None => continue,
        };
        if file_name.is_empty() {
            return Err(UploadError::NoSelectedFile);
        }
        let (extension, media_type) = MediaType::from_filename(&file_name)
            .ok_or(UploadError::FileTypeNotSupported)?;
        let filename = format!("{}.{}", Uuid::new_v4(), extension);
        let path = uploads_root.join(&filename);
        if let Err(entry) = create_file(&path, &mut field).await {
            return Err(internal_error(None, entry).await);
        }
        return Ok(StoredMedia { filename, path, media_type });
    }
    Err(UploadError::NoFilePart)
}

async fn create_file(file_path: &Path, field: &mut Field) -> Result<(), LogEntry> {
    let mut file = File::create(file_path).await
        .map_err(|err| error_entry!(IOEntry::CreateFileError(file_path.display(), err)))?;
    while let Some(chunk) = field.next().await {
        let data = chunk
            .map_err(|err| error_entry!(UploadEntry::Unhandled(err.to_string())))?;
        file.write_all(&data).await
            .map_err(|err| error_entry!(IOEntry::WriteFileError(file_path.display(), err)))?;
    }
    file.flush().await
        .map_err(|err| error_entry!(IOEntry::WriteFileError(file_path.display(), err)))?;
    Ok(())
}

async fn internal_error(session_id: Option<Uuid>, entry: LogEntry) -> UploadError {
    let entry = error_entry!(UploadEntry::Unhandled(entry.message), entry.debug_info);
    match session_id {
        Some(session_id) => logging_entry!(session_id, entry),
        None => logging_entry!(entry),
    }
    UploadError::Internal
}
