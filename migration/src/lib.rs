pub use sea_orm_migration::prelude::*;

mod m20251101_000001_create_users_and_umkm;
mod m20251101_000002_create_queues;
mod m20251101_000003_create_wa_and_credit_logs;
mod m20251101_000004_create_topup_transactions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251101_000001_create_users_and_umkm::Migration),
            Box::new(m20251101_000002_create_queues::Migration),
            Box::new(m20251101_000003_create_wa_and_credit_logs::Migration),
            Box::new(m20251101_000004_create_topup_transactions::Migration),
        ]
    }
}
