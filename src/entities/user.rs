use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Always stored lower-cased.
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string. OAuth-only accounts get a hash of a random secret.
    #[serde(skip_serializing)]
    pub password: String,
    #[sea_orm(unique)]
    pub github_id: Option<String>,
    pub avatar: Option<String>,
    /// Remote folder created at registration; never reassigned.
    pub root_folder_id: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::session::Entity")]
    Session,
    #[sea_orm(has_many = "super::video::Entity")]
    Video,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::video::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Video.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
