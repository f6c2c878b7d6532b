#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{json, Value};
use tower::ServiceExt;

use aurahub::config::Config;
use aurahub::routes::create_routes;
use aurahub::services::file_service::{FileService, UpstreamError, UpstreamResult};
use aurahub::state::AppState;

#[derive(Default)]
struct Folder {
    folders: Vec<Value>,
    files: Vec<Value>,
}

#[derive(Default)]
struct StubState {
    next_id: usize,
    folders: HashMap<String, Folder>,
    jobs: HashMap<String, Value>,
    thumbnails: HashMap<String, String>,
    calls: HashMap<&'static str, usize>,
}

impl StubState {
    fn record(&mut self, op: &'static str) {
        *self.calls.entry(op).or_default() += 1;
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut Vec<Value>> + '_ {
        self.folders
            .values_mut()
            .flat_map(|folder| [&mut folder.folders, &mut folder.files])
    }
}

fn same_id(entry: &Value, id: &str) -> bool {
    entry["id"].as_str() == Some(id)
}

/// In-memory file manager that counts every upstream call.
#[derive(Default)]
pub struct StubFileService {
    state: Mutex<StubState>,
}

impl StubFileService {
    pub fn calls(&self, op: &str) -> usize {
        self.state.lock().unwrap().calls.get(op).copied().unwrap_or(0)
    }

    pub fn add_file(&self, folder_id: &str, file_id: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .folders
            .entry(folder_id.to_string())
            .or_default()
            .files
            .push(json!({ "id": file_id, "name": name }));
        state
            .thumbnails
            .insert(file_id.to_string(), format!("https://thumbs.test/{}.jpg", file_id));
    }

    pub fn set_job(&self, upload_id: &str, report: Value) {
        self.state
            .lock()
            .unwrap()
            .jobs
            .insert(upload_id.to_string(), report);
    }

    pub fn has_job(&self, upload_id: &str) -> bool {
        self.state.lock().unwrap().jobs.contains_key(upload_id)
    }
}

fn not_found() -> UpstreamError {
    UpstreamError::Status {
        status: 404,
        body: "not found".into(),
    }
}

#[async_trait]
impl FileService for StubFileService {
    async fn list_contents(&self, folder_id: &str) -> UpstreamResult {
        let mut state = self.state.lock().unwrap();
        state.record("list_contents");
        let folder = state.folders.get(folder_id).ok_or_else(not_found)?;
        Ok(json!({ "folders": folder.folders, "files": folder.files }))
    }

    async fn create_folder(&self, name: &str, parent_folder_id: Option<&str>) -> UpstreamResult {
        let mut state = self.state.lock().unwrap();
        state.record("create_folder");
        let id = state.fresh_id("fld");
        state.folders.insert(id.clone(), Folder::default());
        if let Some(parent) = parent_folder_id {
            state
                .folders
                .entry(parent.to_string())
                .or_default()
                .folders
                .push(json!({ "id": id, "name": name }));
        }
        Ok(json!({ "folderid": id, "name": name }))
    }

    async fn rename_folder(&self, folder_id: &str, new_name: &str) -> UpstreamResult {
        let mut state = self.state.lock().unwrap();
        state.record("rename_folder");
        for entries in state.entries_mut() {
            for entry in entries.iter_mut().filter(|e| same_id(e, folder_id)) {
                entry["name"] = json!(new_name);
            }
        }
        Ok(json!(true))
    }

    async fn delete_folder(&self, folder_id: &str) -> UpstreamResult {
        let mut state = self.state.lock().unwrap();
        state.record("delete_folder");
        state.folders.remove(folder_id);
        for entries in state.entries_mut() {
            entries.retain(|e| !same_id(e, folder_id));
        }
        Ok(json!(true))
    }

    async fn rename_file(&self, file_id: &str, new_name: &str) -> UpstreamResult {
        let mut state = self.state.lock().unwrap();
        state.record("rename_file");
        for entries in state.entries_mut() {
            for entry in entries.iter_mut().filter(|e| same_id(e, file_id)) {
                entry["name"] = json!(new_name);
            }
        }
        Ok(json!(true))
    }

    async fn move_file(&self, file_id: &str, destination_folder_id: &str) -> UpstreamResult {
        let mut state = self.state.lock().unwrap();
        state.record("move_file");
        let mut moved = None;
        for folder in state.folders.values_mut() {
            if let Some(pos) = folder.files.iter().position(|e| same_id(e, file_id)) {
                moved = Some(folder.files.remove(pos));
            }
        }
        let entry = moved.ok_or_else(not_found)?;
        state
            .folders
            .entry(destination_folder_id.to_string())
            .or_default()
            .files
            .push(entry);
        Ok(json!(true))
    }

    async fn delete_file(&self, file_id: &str) -> UpstreamResult {
        let mut state = self.state.lock().unwrap();
        state.record("delete_file");
        for folder in state.folders.values_mut() {
            folder.files.retain(|e| !same_id(e, file_id));
        }
        state.thumbnails.remove(file_id);
        Ok(json!(true))
    }

    async fn upload_url(&self, folder_id: &str) -> UpstreamResult {
        let mut state = self.state.lock().unwrap();
        state.record("upload_url");
        Ok(json!({ "url": format!("https://upload.test/{}", folder_id) }))
    }

    async fn add_remote_upload(&self, url: &str, folder_id: &str) -> UpstreamResult {
        let mut state = self.state.lock().unwrap();
        state.record("add_remote_upload");
        let id = state.fresh_id("job");
        state.jobs.insert(
            id.clone(),
            json!({ "id": id, "status": "new", "remoteurl": url, "folderid": folder_id }),
        );
        Ok(json!({ "id": id, "folderid": folder_id }))
    }

    async fn remote_upload_status(&self, upload_id: &str) -> UpstreamResult {
        let mut state = self.state.lock().unwrap();
        state.record("remote_upload_status");
        let mut report = serde_json::Map::new();
        if let Some(job) = state.jobs.get(upload_id) {
            report.insert(upload_id.to_string(), job.clone());
        }
        Ok(Value::Object(report))
    }

    async fn remove_remote_upload(&self, upload_id: &str) -> UpstreamResult {
        let mut state = self.state.lock().unwrap();
        state.record("remove_remote_upload");
        state.jobs.remove(upload_id);
        Ok(json!(true))
    }

    async fn thumbnail(&self, file_id: &str) -> UpstreamResult {
        let mut state = self.state.lock().unwrap();
        state.record("thumbnail");
        let url = state.thumbnails.get(file_id).ok_or_else(not_found)?;
        Ok(json!({ "url": url }))
    }
}

pub struct TestApp {
    pub router: Router,
    pub files: Arc<StubFileService>,
    pub db: DatabaseConnection,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub raw: Vec<u8>,
}

impl TestResponse {
    /// `name=value` of the session cookie set by this response, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with("aurahub.sid=") && !value.starts_with("aurahub.sid=;"))
            .and_then(|value| value.split(';').next())
            .map(str::to_string)
    }
}

pub async fn test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("sqlite::memory:".to_string()),
        "SESSION_SECRET" => Some("test-secret".to_string()),
        _ => None,
    })
    .unwrap()
}

pub async fn spawn_app() -> TestApp {
    let db = test_db().await;
    let files = Arc::new(StubFileService::default());
    let state = AppState::new(db.clone(), files.clone(), test_config());

    TestApp {
        router: create_routes(state),
        files,
        db,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let raw = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        let body = serde_json::from_slice(&raw).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            raw,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, cookie, None).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> TestResponse {
        let body = json!({
            "name": name,
            "email": email,
            "password": password,
            "password2": password,
        });
        self.request(Method::POST, "/api/auth/register", None, Some(body))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        let body = json!({ "email": email, "password": password });
        self.request(Method::POST, "/api/auth/login", None, Some(body))
            .await
    }

    /// Registers and logs in a fresh account. Returns the cookie and the
    /// user's root folder id.
    pub async fn signed_in(&self, email: &str) -> (String, String) {
        let registered = self.register("Tester", email, "secret123").await;
        assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);

        let login = self.login(email, "secret123").await;
        assert_eq!(login.status, StatusCode::OK, "{:?}", login.body);
        let cookie = login.session_cookie().expect("login sets the session cookie");
        let root = login.body["streamtapeFolderId"].as_str().unwrap().to_string();
        (cookie, root)
    }
}

/// Names of the entries under `key` ("folders" or "files") in a listing.
pub fn names(listing: &Value, key: &str) -> Vec<String> {
    listing[key]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
