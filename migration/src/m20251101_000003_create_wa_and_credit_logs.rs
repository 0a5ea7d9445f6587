use sea_orm_migration::prelude::*;

use crate::m20251101_000001_create_users_and_umkm::Umkm;
use crate::m20251101_000002_create_queues::Queues;

#[derive(DeriveIden)]
enum WaLogs {
    Table,
    Id,
    UmkmId,
    QueueId,
    Kind,
    PhoneNumber,
    Message,
    Status,
    ResponseRaw,
    Success,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CreditLogs {
    Table,
    Id,
    UmkmId,
    Change,
    Description,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WaLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WaLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WaLogs::UmkmId).big_integer().not_null())
                    .col(ColumnDef::new(WaLogs::QueueId).big_integer().null())
                    .col(ColumnDef::new(WaLogs::Kind).string_len(20).not_null())
                    .col(ColumnDef::new(WaLogs::PhoneNumber).string_len(30).not_null())
                    .col(ColumnDef::new(WaLogs::Message).text().not_null())
                    .col(ColumnDef::new(WaLogs::Status).string_len(20).not_null())
                    .col(ColumnDef::new(WaLogs::ResponseRaw).text().null())
                    .col(
                        ColumnDef::new(WaLogs::Success)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(WaLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wa_logs_umkm")
                            .from(WaLogs::Table, WaLogs::UmkmId)
                            .to(Umkm::Table, Umkm::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wa_logs_queue")
                            .from(WaLogs::Table, WaLogs::QueueId)
                            .to(Queues::Table, Queues::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_wa_logs_queue_kind")
                    .table(WaLogs::Table)
                    .col(WaLogs::QueueId)
                    .col(WaLogs::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CreditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CreditLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CreditLogs::UmkmId).big_integer().not_null())
                    .col(ColumnDef::new(CreditLogs::Change).big_integer().not_null())
                    .col(ColumnDef::new(CreditLogs::Description).string_len(255).null())
                    .col(
                        ColumnDef::new(CreditLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_credit_logs_umkm")
                            .from(CreditLogs::Table, CreditLogs::UmkmId)
                            .to(Umkm::Table, Umkm::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_credit_logs_umkm")
                    .table(CreditLogs::Table)
                    .col(CreditLogs::UmkmId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CreditLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WaLogs::Table).to_owned())
            .await?;
        Ok(())
    }
}
