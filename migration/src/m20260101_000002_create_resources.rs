// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Resources::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Resources::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Resources::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(Resources::Url).string().not_null())
                    .col(
                        ColumnDef::new(Resources::Depth)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Resources::Status).string().not_null())
                    .col(ColumnDef::new(Resources::Payload).json().not_null())
                    .col(ColumnDef::new(Resources::ContentType).string())
                    .col(ColumnDef::new(Resources::Error).string())
                    .col(
                        ColumnDef::new(Resources::AttemptCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Resources::ScheduledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Resources::LockToken).uuid())
                    .col(ColumnDef::new(Resources::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Resources::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Resources::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Resources::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 项目内URL唯一，幂等批量插入依赖此约束
        manager
            .create_index(
                Index::create()
                    .name("idx_resources_project_url")
                    .table(Resources::Table)
                    .col(Resources::ProjectId)
                    .col(Resources::Url)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 队列认领查询路径
        manager
            .create_index(
                Index::create()
                    .name("idx_resources_project_status_scheduled")
                    .table(Resources::Table)
                    .col(Resources::ProjectId)
                    .col(Resources::Status)
                    .col(Resources::ScheduledAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Resources::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Resources {
    Table,
    Id,
    ProjectId,
    Url,
    Depth,
    Status,
    Payload,
    ContentType,
    Error,
    AttemptCount,
    ScheduledAt,
    LockToken,
    StartedAt,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}
