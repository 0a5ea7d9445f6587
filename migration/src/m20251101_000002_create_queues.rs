use sea_orm_migration::prelude::*;

use crate::m20251101_000001_create_users_and_umkm::Umkm;

#[derive(DeriveIden)]
pub(crate) enum Queues {
    Table,
    Id,
    UmkmId,
    QueueDate,
    QueueNumber,
    CustomerName,
    CustomerPhone,
    Status,
    CreatedAt,
    CalledAt,
    FinishedAt,
    CanceledAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Queues::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Queues::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Queues::UmkmId).big_integer().not_null())
                    .col(ColumnDef::new(Queues::QueueDate).date().not_null())
                    .col(ColumnDef::new(Queues::QueueNumber).integer().not_null())
                    .col(ColumnDef::new(Queues::CustomerName).string_len(120).null())
                    .col(ColumnDef::new(Queues::CustomerPhone).string_len(30).null())
                    .col(
                        ColumnDef::new(Queues::Status)
                            .string_len(20)
                            .not_null()
                            .default("waiting"),
                    )
                    .col(
                        ColumnDef::new(Queues::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Queues::CalledAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Queues::FinishedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Queues::CanceledAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_queues_umkm")
                            .from(Queues::Table, Queues::UmkmId)
                            .to(Umkm::Table, Umkm::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // one number per business per day; concurrent takers retry on conflict
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_queues_umkm_day_number")
                    .table(Queues::Table)
                    .col(Queues::UmkmId)
                    .col(Queues::QueueDate)
                    .col(Queues::QueueNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_queues_umkm_day_status")
                    .table(Queues::Table)
                    .col(Queues::UmkmId)
                    .col(Queues::QueueDate)
                    .col(Queues::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Queues::Table).to_owned())
            .await?;
        Ok(())
    }
}
