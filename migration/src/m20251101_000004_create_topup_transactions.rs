use sea_orm_migration::prelude::*;

use crate::m20251101_000001_create_users_and_umkm::{Umkm, Users};

#[derive(DeriveIden)]
enum TopupTransactions {
    Table,
    Id,
    UmkmId,
    UserId,
    PackageName,
    Credits,
    Amount,
    QrisImage,
    ProofImage,
    Status,
    SenderName,
    Note,
    AdminNote,
    CreatedAt,
    ConfirmedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Top-up state machine: pending -> waiting_admin -> success | rejected
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TopupTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TopupTransactions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TopupTransactions::UmkmId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TopupTransactions::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TopupTransactions::PackageName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TopupTransactions::Credits)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TopupTransactions::Amount).big_integer().null())
                    .col(
                        ColumnDef::new(TopupTransactions::QrisImage)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TopupTransactions::ProofImage)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TopupTransactions::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(TopupTransactions::SenderName)
                            .string_len(150)
                            .null(),
                    )
                    .col(ColumnDef::new(TopupTransactions::Note).string_len(255).null())
                    .col(
                        ColumnDef::new(TopupTransactions::AdminNote)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TopupTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TopupTransactions::ConfirmedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TopupTransactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_topup_umkm")
                            .from(TopupTransactions::Table, TopupTransactions::UmkmId)
                            .to(Umkm::Table, Umkm::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_topup_user")
                            .from(TopupTransactions::Table, TopupTransactions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_topup_transactions_status")
                    .table(TopupTransactions::Table)
                    .col(TopupTransactions::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TopupTransactions::Table).to_owned())
            .await?;
        Ok(())
    }
}
