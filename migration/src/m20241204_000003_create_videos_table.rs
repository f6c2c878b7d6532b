use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Videos::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Videos::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Videos::UploaderId).uuid().not_null())
                    .col(ColumnDef::new(Videos::RemoteFileId).string().null())
                    .col(ColumnDef::new(Videos::RemoteUploadId).string().null())
                    .col(ColumnDef::new(Videos::Title).string().not_null())
                    .col(ColumnDef::new(Videos::Description).text().null())
                    .col(
                        ColumnDef::new(Videos::Status)
                            .string()
                            .not_null()
                            .default("completed"),
                    )
                    .col(ColumnDef::new(Videos::Views).integer().not_null().default(0))
                    .col(ColumnDef::new(Videos::CreatedAt).timestamp().not_null())
                    // Videos outlive their uploader row; nothing cascades.
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_videos_uploader_id")
                            .from(Videos::Table, Videos::UploaderId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_videos_remote_file_id")
                    .table(Videos::Table)
                    .col(Videos::RemoteFileId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_videos_remote_upload_id")
                    .table(Videos::Table)
                    .col(Videos::RemoteUploadId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_videos_uploader_created")
                    .table(Videos::Table)
                    .col(Videos::UploaderId)
                    .col(Videos::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Videos::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Videos {
    Table,
    Id,
    UploaderId,
    RemoteFileId,
    RemoteUploadId,
    Title,
    Description,
    Status,
    Views,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
