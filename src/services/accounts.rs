use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set, SqlErr,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::user;
use crate::error::AppError;
use crate::services::file_service::{id_field, FileService};
use crate::services::github::GithubProfile;

pub const EMAIL_TAKEN: &str = "Email already registered";

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))
}

pub fn verify_password(password: &str, stored: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| AppError::Internal(format!("Stored hash unreadable: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Creates the per-user root folder on the file service.
pub async fn provision_root_folder(files: &dyn FileService) -> Result<String, AppError> {
    let folder_name = Uuid::new_v4().to_string();
    let payload = files.create_folder(&folder_name, None).await?;
    id_field(&payload, "folderid")
        .ok_or_else(|| AppError::Internal("Could not create user storage.".to_string()))
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<user::Model>, AppError> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await?)
}

fn map_unique_violation(err: sea_orm::DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::BadRequest(EMAIL_TAKEN.to_string()),
        _ => AppError::from(err),
    }
}

pub struct Registration<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Registers a local account. The root folder is only created once the email
/// is known to be free.
pub async fn register(
    db: &DatabaseConnection,
    files: &dyn FileService,
    registration: Registration<'_>,
) -> Result<user::Model, AppError> {
    let email = normalize_email(registration.email);
    if find_by_email(db, &email).await?.is_some() {
        return Err(AppError::BadRequest(EMAIL_TAKEN.to_string()));
    }

    let root_folder_id = provision_root_folder(files).await?;
    let password = hash_password(registration.password)?;

    let created = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(registration.name.trim().to_string()),
        email: Set(email),
        password: Set(password),
        github_id: Set(None),
        avatar: Set(None),
        root_folder_id: Set(root_folder_id),
        created_at: Set(chrono::Utc::now().naive_utc()),
    }
    .insert(db)
    .await
    .map_err(map_unique_violation)?;

    info!(user_id = %created.id, "registered new account");
    Ok(created)
}

/// Checks email/password credentials.
pub async fn authenticate(db: &DatabaseConnection, email: &str, password: &str) -> Result<user::Model, AppError> {
    let user = find_by_email(db, email)
        .await?
        .ok_or_else(|| AppError::BadRequest("That email is not registered".to_string()))?;

    if !verify_password(password, &user.password)? {
        return Err(AppError::BadRequest("Password incorrect".to_string()));
    }
    Ok(user)
}

/// Finds or creates the account behind a GitHub identity: by GitHub id
/// first, then by email (linking the id), else a brand-new account.
pub async fn resolve_github_user(
    db: &DatabaseConnection,
    files: &dyn FileService,
    profile: &GithubProfile,
) -> Result<user::Model, AppError> {
    let Some(email) = profile.email.as_deref().map(normalize_email) else {
        return Err(AppError::BadRequest(
            "GitHub email is private. Please make it public.".to_string(),
        ));
    };

    if let Some(existing) = user::Entity::find()
        .filter(user::Column::GithubId.eq(profile.id.as_str()))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    if let Some(existing) = find_by_email(db, &email).await? {
        let mut active = existing.into_active_model();
        active.github_id = Set(Some(profile.id.clone()));
        let linked = active.update(db).await?;
        info!(user_id = %linked.id, "linked GitHub identity to existing account");
        return Ok(linked);
    }

    let root_folder_id = provision_root_folder(files).await?;
    let password = hash_password(&Uuid::new_v4().to_string())?;

    let created = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(profile.display_name().to_string()),
        email: Set(email),
        password: Set(password),
        github_id: Set(Some(profile.id.clone())),
        avatar: Set(profile.avatar_url.clone()),
        root_folder_id: Set(root_folder_id),
        created_at: Set(chrono::Utc::now().naive_utc()),
    }
    .insert(db)
    .await
    .map_err(|e| {
        warn!(error = %e, "GitHub account insert failed");
        map_unique_violation(e)
    })?;

    info!(user_id = %created.id, "created account from GitHub login");
    Ok(created)
}
