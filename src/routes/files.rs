//! File-manager proxy. Listings and thumbnails are served through the
//! response cache; every mutation clears the listings it touched.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::error::{AppError, ErrorResponse};
use crate::extract::AppJson;
use crate::middleware::auth::AuthUser;
use crate::services::cache::CacheKey;
use crate::services::videos;
use crate::state::AppState;

use super::MessageResponse;

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    #[serde(default)]
    pub folder_name: String,
    pub parent_folder_id: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    #[serde(default)]
    pub new_name: String,
    pub parent_folder_id: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveFileRequest {
    #[serde(default)]
    pub destination_folder_id: String,
    pub original_folder_id: Option<String>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParentFolderRequest {
    pub parent_folder_id: Option<String>,
}

fn required<'a>(value: &'a str, msg: &str) -> Result<&'a str, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(msg.to_string()));
    }
    Ok(value)
}

async fn cached_listing(state: &AppState, folder_id: &str) -> Result<Json<Value>, AppError> {
    let listing = state
        .cache
        .read_through(CacheKey::Folder(folder_id), || state.files.list_contents(folder_id))
        .await?;
    Ok(Json(listing))
}

/// List the user's root folder.
#[utoipa::path(
    get,
    path = "/api/files/list",
    responses(
        (status = 200, description = "Upstream folder listing", content_type = "application/json"),
        (status = 401, description = "No live session", body = ErrorResponse),
        (status = 404, description = "User root folder not found", body = ErrorResponse)
    ),
    tag = "Files"
)]
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn list_root(auth: AuthUser, State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let folder_id = auth.root_folder_id()?;
    cached_listing(&state, folder_id).await
}

/// List a subfolder.
#[utoipa::path(
    get,
    path = "/api/files/list/{folder_id}",
    params(("folder_id" = String, Path, description = "Remote folder id")),
    responses(
        (status = 200, description = "Upstream folder listing", content_type = "application/json"),
        (status = 401, description = "No live session", body = ErrorResponse)
    ),
    tag = "Files"
)]
#[instrument(skip(auth, state), fields(user_id = %auth.user.id))]
pub async fn list_folder(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    cached_listing(&state, &folder_id).await
}

#[utoipa::path(
    post,
    path = "/api/files/create-folder",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Upstream create-folder payload", content_type = "application/json"),
        (status = 400, description = "Missing folder name", body = ErrorResponse)
    ),
    tag = "Files"
)]
#[instrument(skip(auth, state, payload), fields(user_id = %auth.user.id))]
pub async fn create_folder(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateFolderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = required(&payload.folder_name, "Folder name is required.")?;
    let parent = auth.folder_or_root(payload.parent_folder_id.as_deref())?;

    let created = state.files.create_folder(name, Some(parent)).await?;
    state.cache.invalidate_folder(Some(parent)).await;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/files/rename-folder/{folder_id}",
    params(("folder_id" = String, Path, description = "Remote folder id")),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Folder renamed", body = MessageResponse),
        (status = 400, description = "Missing new name", body = ErrorResponse)
    ),
    tag = "Files"
)]
#[instrument(skip(auth, state, payload), fields(user_id = %auth.user.id))]
pub async fn rename_folder(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
    AppJson(payload): AppJson<RenameRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let new_name = required(&payload.new_name, "New name is required.")?;
    let parent = auth.folder_or_root(payload.parent_folder_id.as_deref())?;

    state.files.rename_folder(&folder_id, new_name).await?;
    state.cache.invalidate_folder(Some(&folder_id)).await;
    state.cache.invalidate_folder(Some(parent)).await;

    Ok(MessageResponse::new("Folder renamed successfully."))
}

#[utoipa::path(
    delete,
    path = "/api/files/delete-folder/{folder_id}",
    params(("folder_id" = String, Path, description = "Remote folder id")),
    request_body(content = ParentFolderRequest, description = "Optional parent folder"),
    responses(
        (status = 200, description = "Folder deleted", body = MessageResponse)
    ),
    tag = "Files"
)]
#[instrument(skip(auth, state, payload), fields(user_id = %auth.user.id))]
pub async fn delete_folder(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
    payload: Option<AppJson<ParentFolderRequest>>,
) -> Result<Json<MessageResponse>, AppError> {
    let payload = payload.map(|AppJson(p)| p).unwrap_or_default();
    let parent = auth.folder_or_root(payload.parent_folder_id.as_deref())?;

    state.files.delete_folder(&folder_id).await?;
    state.cache.invalidate_folder(Some(&folder_id)).await;
    state.cache.invalidate_folder(Some(parent)).await;

    Ok(MessageResponse::new("Folder deleted successfully."))
}

/// Rename a file. The matching video record, if any, takes the new title.
#[utoipa::path(
    put,
    path = "/api/files/rename-file/{file_id}",
    params(("file_id" = String, Path, description = "Remote file id")),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "File renamed", body = MessageResponse),
        (status = 400, description = "Missing new name", body = ErrorResponse)
    ),
    tag = "Files"
)]
#[instrument(skip(auth, state, payload), fields(user_id = %auth.user.id))]
pub async fn rename_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    AppJson(payload): AppJson<RenameRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let new_name = required(&payload.new_name, "New name is required.")?;
    let parent = auth.folder_or_root(payload.parent_folder_id.as_deref())?;

    state.files.rename_file(&file_id, new_name).await?;
    videos::rename_by_file_id(&state.db, &file_id, new_name).await?;
    state.cache.invalidate_folder(Some(parent)).await;

    Ok(MessageResponse::new("File renamed successfully."))
}

#[utoipa::path(
    put,
    path = "/api/files/move-file/{file_id}",
    params(("file_id" = String, Path, description = "Remote file id")),
    request_body = MoveFileRequest,
    responses(
        (status = 200, description = "File moved", body = MessageResponse),
        (status = 400, description = "Missing destination", body = ErrorResponse)
    ),
    tag = "Files"
)]
#[instrument(skip(auth, state, payload), fields(user_id = %auth.user.id))]
pub async fn move_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    AppJson(payload): AppJson<MoveFileRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let destination = required(&payload.destination_folder_id, "Destination folder is required.")?;
    let source = auth.folder_or_root(payload.original_folder_id.as_deref())?;

    state.files.move_file(&file_id, destination).await?;
    state.cache.invalidate_folder(Some(source)).await;
    state.cache.invalidate_folder(Some(destination)).await;

    Ok(MessageResponse::new("File moved successfully."))
}

/// Delete a file along with its video record and cached thumbnail.
#[utoipa::path(
    delete,
    path = "/api/files/delete-file/{file_id}",
    params(("file_id" = String, Path, description = "Remote file id")),
    request_body(content = ParentFolderRequest, description = "Optional parent folder"),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse)
    ),
    tag = "Files"
)]
#[instrument(skip(auth, state, payload), fields(user_id = %auth.user.id))]
pub async fn delete_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    payload: Option<AppJson<ParentFolderRequest>>,
) -> Result<Json<MessageResponse>, AppError> {
    let payload = payload.map(|AppJson(p)| p).unwrap_or_default();
    let parent = auth.folder_or_root(payload.parent_folder_id.as_deref())?;

    state.files.delete_file(&file_id).await?;
    let removed = videos::delete_by_file_id(&state.db, &file_id).await?;
    state.cache.invalidate_folder(Some(parent)).await;
    state.cache.invalidate_thumbnail(&file_id).await;

    tracing::debug!(removed, "deleted video records for file");
    Ok(MessageResponse::new("File deleted successfully."))
}

#[utoipa::path(
    get,
    path = "/api/files/thumbnail/{file_id}",
    params(("file_id" = String, Path, description = "Remote file id")),
    responses(
        (status = 200, description = "Upstream thumbnail payload", content_type = "application/json"),
        (status = 404, description = "Thumbnail not generated yet", body = ErrorResponse)
    ),
    tag = "Files"
)]
#[instrument(skip(auth, state), fields(user_id = %auth.user.id))]
pub async fn thumbnail(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let thumbnail = state
        .cache
        .read_through(CacheKey::Thumbnail(&file_id), || state.files.thumbnail(&file_id))
        .await
        .map_err(|err| {
            if err.is_not_found() {
                AppError::NotFound("Thumbnail not available yet.".into())
            } else {
                AppError::from(err)
            }
        })?;
    Ok(Json(thumbnail))
}
