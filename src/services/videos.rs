//! Video metadata store.
//!
//! Records are keyed independently of the file service. Each one stays
//! reachable through its remote file id, its remote-upload job id, or both.
//! Nothing here is transactional with the upstream calls made around it.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::video::{self, Status};

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub uploader_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub source: VideoSource,
}

/// Where a new record comes from. Local uploads are complete on arrival;
/// remote ingestion starts out processing.
#[derive(Debug, Clone)]
pub enum VideoSource {
    LocalUpload { remote_file_id: String },
    RemoteIngestion { upload_id: String },
}

pub async fn create(db: &DatabaseConnection, new: NewVideo) -> Result<video::Model, sea_orm::DbErr> {
    let (remote_file_id, remote_upload_id, status) = match new.source {
        VideoSource::LocalUpload { remote_file_id } => (Some(remote_file_id), None, Status::Completed),
        VideoSource::RemoteIngestion { upload_id } => (None, Some(upload_id), Status::Processing),
    };

    video::ActiveModel {
        id: Set(Uuid::new_v4()),
        uploader_id: Set(new.uploader_id),
        remote_file_id: Set(remote_file_id),
        remote_upload_id: Set(remote_upload_id),
        title: Set(new.title),
        description: Set(new.description),
        status: Set(status),
        views: Set(0),
        created_at: Set(chrono::Utc::now().naive_utc()),
    }
    .insert(db)
    .await
}

/// All records of `owner`, newest first.
pub async fn find_by_owner(db: &DatabaseConnection, owner: Uuid) -> Result<Vec<video::Model>, sea_orm::DbErr> {
    video::Entity::find()
        .filter(video::Column::UploaderId.eq(owner))
        .order_by_desc(video::Column::CreatedAt)
        .all(db)
        .await
}

pub async fn find_by_upload_id(
    db: &DatabaseConnection,
    upload_id: &str,
) -> Result<Option<video::Model>, sea_orm::DbErr> {
    video::Entity::find()
        .filter(video::Column::RemoteUploadId.eq(upload_id))
        .one(db)
        .await
}

/// Applies a status transition to the record tracking `upload_id`. The
/// remote file id is written together with the status. Re-applying the same
/// transition leaves the record unchanged.
pub async fn update_by_upload_id(
    db: &DatabaseConnection,
    upload_id: &str,
    status: Status,
    remote_file_id: Option<String>,
) -> Result<Option<video::Model>, sea_orm::DbErr> {
    let Some(record) = find_by_upload_id(db, upload_id).await? else {
        return Ok(None);
    };

    let mut active = record.into_active_model();
    active.status = Set(status);
    if let Some(file_id) = remote_file_id {
        active.remote_file_id = Set(Some(file_id));
    }
    active.update(db).await.map(Some)
}

/// Mirrors an upstream file rename onto the record, if one exists.
pub async fn rename_by_file_id(
    db: &DatabaseConnection,
    file_id: &str,
    title: &str,
) -> Result<Option<video::Model>, sea_orm::DbErr> {
    let record = video::Entity::find()
        .filter(video::Column::RemoteFileId.eq(file_id))
        .one(db)
        .await?;

    let Some(record) = record else {
        return Ok(None);
    };

    let mut active = record.into_active_model();
    active.title = Set(title.to_string());
    active.update(db).await.map(Some)
}

pub async fn delete_by_upload_id(db: &DatabaseConnection, upload_id: &str) -> Result<u64, sea_orm::DbErr> {
    let result = video::Entity::delete_many()
        .filter(video::Column::RemoteUploadId.eq(upload_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn delete_by_file_id(db: &DatabaseConnection, file_id: &str) -> Result<u64, sea_orm::DbErr> {
    let result = video::Entity::delete_many()
        .filter(video::Column::RemoteFileId.eq(file_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// What an upstream ingestion status string means for the local record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobProgress {
    Finished,
    Failed,
    Pending,
}

impl JobProgress {
    pub fn from_upstream(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "finished" => JobProgress::Finished,
            "error" | "failed" => JobProgress::Failed,
            _ => JobProgress::Pending,
        }
    }
}
