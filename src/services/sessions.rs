//! Database-backed login sessions.
//!
//! The cookie carries a random token; only its SHA-256 digest is stored, so
//! any instance sharing the database can resolve it.

use base64::{engine::general_purpose, Engine as _};
use chrono::Duration;
use rand::RngCore;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::entities::{session, user};

fn generate_token() -> String {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Opens a session for `user_id` and returns the cookie token.
pub async fn create(db: &DatabaseConnection, user_id: Uuid, ttl_days: i64) -> Result<String, sea_orm::DbErr> {
    let token = generate_token();
    let now = chrono::Utc::now().naive_utc();

    session::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        token_hash: Set(hash_token(&token)),
        expires_at: Set(now + Duration::days(ttl_days)),
        created_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(token)
}

/// The user owning a live session for `token`. Expired sessions resolve to
/// nothing.
pub async fn resolve(db: &DatabaseConnection, token: &str) -> Result<Option<user::Model>, sea_orm::DbErr> {
    let now = chrono::Utc::now().naive_utc();
    let found = session::Entity::find()
        .filter(session::Column::TokenHash.eq(hash_token(token)))
        .filter(session::Column::ExpiresAt.gt(now))
        .find_also_related(user::Entity)
        .one(db)
        .await?;

    Ok(found.and_then(|(_, user)| user))
}

pub async fn destroy(db: &DatabaseConnection, token: &str) -> Result<u64, sea_orm::DbErr> {
    let result = session::Entity::delete_many()
        .filter(session::Column::TokenHash.eq(hash_token(token)))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn purge_expired(db: &DatabaseConnection) -> Result<u64, sea_orm::DbErr> {
    let now = chrono::Utc::now().naive_utc();
    let result = session::Entity::delete_many()
        .filter(session::Column::ExpiresAt.lte(now))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
