use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::video::{self, Status};
use crate::error::{AppError, ErrorResponse};
use crate::extract::AppJson;
use crate::middleware::auth::AuthUser;
use crate::services::file_service::id_field;
use crate::services::videos::{self, JobProgress, NewVideo, VideoSource};
use crate::state::AppState;

use super::MessageResponse;

const RECORD_NOT_FOUND: &str = "DB record not found for this remote upload ID.";

#[derive(Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub folder_id: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveVideoMetadataRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(alias = "streamtapeFileId")]
    pub remote_file_id: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUploadRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub folder_id: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub id: Uuid,
    pub uploader: Uuid,
    pub remote_file_id: Option<String>,
    pub remote_upload_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    pub views: i32,
    pub upload_date: chrono::NaiveDateTime,
}

impl From<video::Model> for VideoResponse {
    fn from(model: video::Model) -> Self {
        Self {
            id: model.id,
            uploader: model.uploader_id,
            remote_file_id: model.remote_file_id,
            remote_upload_id: model.remote_upload_id,
            title: model.title,
            description: model.description,
            status: model.status,
            views: model.views,
            upload_date: model.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SavedVideoResponse {
    pub msg: String,
    pub video: VideoResponse,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Ask the file service for a one-off upload URL.
#[utoipa::path(
    post,
    path = "/api/videos/get-upload-url",
    request_body(content = UploadUrlRequest, description = "Target folder, defaults to the root folder"),
    responses(
        (status = 200, description = "Upstream upload-URL payload", content_type = "application/json"),
        (status = 404, description = "User root folder not found", body = ErrorResponse)
    ),
    tag = "Videos"
)]
#[instrument(skip(auth, state, payload), fields(user_id = %auth.user.id))]
pub async fn get_upload_url(
    auth: AuthUser,
    State(state): State<AppState>,
    payload: Option<AppJson<UploadUrlRequest>>,
) -> Result<Json<Value>, AppError> {
    let payload = payload.map(|AppJson(p)| p).unwrap_or_default();
    let folder = auth.folder_or_root(payload.folder_id.as_deref())?;

    Ok(Json(state.files.upload_url(folder).await?))
}

/// Record a finished local upload.
#[utoipa::path(
    post,
    path = "/api/videos/save-video-metadata",
    request_body = SaveVideoMetadataRequest,
    responses(
        (status = 201, description = "Record created", body = SavedVideoResponse),
        (status = 400, description = "Missing title or file id", body = ErrorResponse)
    ),
    tag = "Videos"
)]
#[instrument(skip(auth, state, payload), fields(user_id = %auth.user.id))]
pub async fn save_video_metadata(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SaveVideoMetadataRequest>,
) -> Result<impl IntoResponse, AppError> {
    let title = payload.title.trim();
    let remote_file_id = match non_blank(payload.remote_file_id) {
        Some(id) if !title.is_empty() => id,
        _ => return Err(AppError::BadRequest("Missing title or file ID.".into())),
    };

    let record = videos::create(
        &state.db,
        NewVideo {
            uploader_id: auth.user.id,
            title: title.to_string(),
            description: non_blank(payload.description),
            source: VideoSource::LocalUpload { remote_file_id },
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SavedVideoResponse {
            msg: "Video metadata saved successfully!".into(),
            video: record.into(),
        }),
    ))
}

/// Start ingesting a video from a URL and track it as `processing`.
#[utoipa::path(
    post,
    path = "/api/videos/remote-upload",
    request_body = RemoteUploadRequest,
    responses(
        (status = 202, description = "Ingestion started", body = SavedVideoResponse),
        (status = 400, description = "Missing URL or title", body = ErrorResponse)
    ),
    tag = "Videos"
)]
#[instrument(skip(auth, state, payload), fields(user_id = %auth.user.id))]
pub async fn remote_upload(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<RemoteUploadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let url = payload.url.trim();
    let title = payload.title.trim();
    if url.is_empty() || title.is_empty() {
        return Err(AppError::BadRequest("Missing video URL or title.".into()));
    }
    let folder = auth.folder_or_root(payload.folder_id.as_deref())?;

    let job = state.files.add_remote_upload(url, folder).await?;
    let upload_id = id_field(&job, "id")
        .ok_or_else(|| AppError::Internal("Failed to get a remote upload ID.".into()))?;

    let record = videos::create(
        &state.db,
        NewVideo {
            uploader_id: auth.user.id,
            title: title.to_string(),
            description: non_blank(payload.description),
            source: VideoSource::RemoteIngestion { upload_id },
        },
    )
    .await?;
    state.cache.invalidate_folder(Some(folder)).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(SavedVideoResponse {
            msg: "Remote upload initiated and is now being tracked!".into(),
            video: record.into(),
        }),
    ))
}

/// Poll the file service for an ingestion job and settle the local record
/// once the job reaches a terminal state.
#[utoipa::path(
    get,
    path = "/api/videos/remote-upload/status/{upload_id}",
    params(("upload_id" = String, Path, description = "Remote upload job id")),
    responses(
        (status = 200, description = "`{status, video}` once settled, `{status, details}` while pending", content_type = "application/json"),
        (status = 404, description = "Unknown job or no tracking record", body = ErrorResponse)
    ),
    tag = "Videos"
)]
#[instrument(skip(auth, state), fields(user_id = %auth.user.id))]
pub async fn remote_upload_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let report = state.files.remote_upload_status(&upload_id).await?;
    let details = match report.get(&upload_id) {
        Some(details) if !details.is_null() => details.clone(),
        _ => return Err(AppError::NotFound("Upload status not found.".into())),
    };
    let upstream_status = details
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match JobProgress::from_upstream(&upstream_status) {
        JobProgress::Finished => {
            let Some(file_id) = id_field(&details, "linkid") else {
                tracing::error!(upload_id = %upload_id, "finished upload reported no linkid");
                return Err(AppError::Internal(format!(
                    "remote upload {} finished without a file id",
                    upload_id
                )));
            };
            let record = videos::update_by_upload_id(
                &state.db,
                &upload_id,
                Status::Completed,
                Some(file_id),
            )
            .await?
            .ok_or_else(|| {
                tracing::error!(upload_id = %upload_id, "finished upload has no tracking record");
                AppError::NotFound(RECORD_NOT_FOUND.into())
            })?;

            Ok(Json(json!({
                "status": Status::Completed,
                "video": VideoResponse::from(record),
            })))
        }
        JobProgress::Failed => {
            let record = videos::update_by_upload_id(&state.db, &upload_id, Status::Failed, None)
                .await?
                .ok_or_else(|| AppError::NotFound(RECORD_NOT_FOUND.into()))?;

            tracing::warn!(upload_id = %upload_id, "remote upload failed upstream");
            Ok(Json(json!({
                "status": Status::Failed,
                "video": VideoResponse::from(record),
                "details": details,
            })))
        }
        JobProgress::Pending => Ok(Json(json!({
            "status": upstream_status,
            "details": details,
        }))),
    }
}

/// Cancel an ingestion job and forget its record.
#[utoipa::path(
    delete,
    path = "/api/videos/remote-upload/remove/{upload_id}",
    params(("upload_id" = String, Path, description = "Remote upload job id")),
    responses(
        (status = 200, description = "Job removed", body = MessageResponse)
    ),
    tag = "Videos"
)]
#[instrument(skip(auth, state), fields(user_id = %auth.user.id))]
pub async fn remote_upload_remove(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.files.remove_remote_upload(&upload_id).await?;
    videos::delete_by_upload_id(&state.db, &upload_id).await?;

    Ok(MessageResponse::new("Remote upload successfully removed."))
}

/// The caller's videos, newest first.
#[utoipa::path(
    get,
    path = "/api/videos/my-videos",
    responses(
        (status = 200, description = "Video records", body = [VideoResponse]),
        (status = 401, description = "No live session", body = ErrorResponse)
    ),
    tag = "Videos"
)]
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn my_videos(auth: AuthUser, State(state): State<AppState>) -> Result<Json<Vec<VideoResponse>>, AppError> {
    let records = videos::find_by_owner(&state.db, auth.user.id).await?;
    Ok(Json(records.into_iter().map(VideoResponse::from).collect()))
}
