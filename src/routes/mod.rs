mod auth;
mod files;
mod home;
mod videos;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

/// `{"msg": ...}` body used by every handler that only acknowledges.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub msg: String,
}

impl MessageResponse {
    pub fn new(msg: &str) -> Json<Self> {
        Json(Self {
            msg: msg.to_string(),
        })
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        home::root,
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        auth::github,
        auth::github_callback,
        files::list_root,
        files::list_folder,
        files::create_folder,
        files::rename_folder,
        files::delete_folder,
        files::rename_file,
        files::move_file,
        files::delete_file,
        files::thumbnail,
        videos::get_upload_url,
        videos::save_video_metadata,
        videos::remote_upload,
        videos::remote_upload_status,
        videos::remote_upload_remove,
        videos::my_videos,
    ),
    components(
        schemas(
            home::RootResponse,
            MessageResponse,
            crate::error::ErrorResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::UserResponse,
            files::CreateFolderRequest,
            files::RenameRequest,
            files::MoveFileRequest,
            files::ParentFolderRequest,
            videos::UploadUrlRequest,
            videos::SaveVideoMetadataRequest,
            videos::RemoteUploadRequest,
            videos::VideoResponse,
            videos::SavedVideoResponse,
            crate::entities::video::Status,
        )
    ),
    tags(
        (name = "General", description = "Service information"),
        (name = "Authentication", description = "Local and GitHub login backed by a session cookie"),
        (name = "Files", description = "Cached proxy for the remote file manager"),
        (name = "Videos", description = "Uploads and the video metadata store")
    ),
    info(
        title = "AuraHub API",
        version = "0.1.0",
        description = "Video hosting backend: accounts, a cached file-manager proxy, and upload tracking",
    )
)]
struct ApiDoc;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/github", get(auth::github))
        .route("/github/callback", get(auth::github_callback))
}

fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(files::list_root))
        .route("/list/{folder_id}", get(files::list_folder))
        .route("/create-folder", post(files::create_folder))
        .route("/rename-folder/{folder_id}", put(files::rename_folder))
        .route("/delete-folder/{folder_id}", delete(files::delete_folder))
        .route("/rename-file/{file_id}", put(files::rename_file))
        .route("/move-file/{file_id}", put(files::move_file))
        .route("/delete-file/{file_id}", delete(files::delete_file))
        .route("/thumbnail/{file_id}", get(files::thumbnail))
}

fn video_routes() -> Router<AppState> {
    Router::new()
        .route("/get-upload-url", post(videos::get_upload_url))
        .route("/save-video-metadata", post(videos::save_video_metadata))
        .route("/remote-upload", post(videos::remote_upload))
        .route("/remote-upload/status/{upload_id}", get(videos::remote_upload_status))
        .route("/remote-upload/remove/{upload_id}", delete(videos::remote_upload_remove))
        .route("/my-videos", get(videos::my_videos))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

pub fn create_routes(state: AppState) -> Router {
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    let cors = cors_layer(&state.config.allowed_origins);

    let app_routes = Router::new()
        .route("/", get(home::root))
        .nest("/api/auth", auth_routes())
        .nest("/api/files", file_routes())
        .nest("/api/videos", video_routes())
        .with_state(state);

    Router::new()
        .merge(swagger_router)
        .merge(app_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
