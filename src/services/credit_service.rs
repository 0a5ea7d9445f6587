use crate::entities::{credit_log_entity as credit_logs, umkm_entity as umkm};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminAdjustCreditRequest, AdminAdjustCreditResponse, CreditLogResponse, CreditOverview,
    ListQuery, PaginatedResponse, PaginationParams,
};
use crate::services::owner_umkm;
use crate::utils::non_blank;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;

/// Takes one credit if the balance is still positive and records a `-1`
/// ledger row, both in one transaction. Returns false when there was nothing
/// left to take.
pub(crate) async fn debit_one<C: TransactionTrait>(
    db: &C,
    umkm_id: i64,
    description: &str,
) -> AppResult<bool> {
    let txn = db.begin().await?;
    let result = umkm::Entity::update_many()
        .col_expr(
            umkm::Column::CreditBalance,
            Expr::col(umkm::Column::CreditBalance).sub(1),
        )
        .col_expr(umkm::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(umkm::Column::Id.eq(umkm_id))
        .filter(umkm::Column::CreditBalance.gt(0))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        return Ok(false);
    }

    record(&txn, umkm_id, -1, Some(description.to_string())).await?;
    txn.commit().await?;
    Ok(true)
}

/// Applies a signed change. A negative change only goes through when the
/// balance covers it; returns false otherwise.
pub(crate) async fn apply_change<C: ConnectionTrait>(
    db: &C,
    umkm_id: i64,
    change: i64,
    description: Option<String>,
) -> AppResult<bool> {
    let mut update = umkm::Entity::update_many()
        .col_expr(
            umkm::Column::CreditBalance,
            Expr::col(umkm::Column::CreditBalance).add(change),
        )
        .col_expr(umkm::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(umkm::Column::Id.eq(umkm_id));
    if change < 0 {
        let required = change.checked_neg().ok_or_else(|| {
            AppError::ValidationError("Amount is out of range".to_string())
        })?;
        update = update.filter(umkm::Column::CreditBalance.gte(required));
    }

    let result = update.exec(db).await?;
    if result.rows_affected == 0 {
        return Ok(false);
    }

    record(db, umkm_id, change, description).await?;
    Ok(true)
}

async fn record<C: ConnectionTrait>(
    db: &C,
    umkm_id: i64,
    change: i64,
    description: Option<String>,
) -> AppResult<()> {
    credit_logs::ActiveModel {
        umkm_id: Set(umkm_id),
        change: Set(change),
        description: Set(description),
        created_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

pub(crate) async fn current_balance<C: ConnectionTrait>(db: &C, umkm_id: i64) -> AppResult<i64> {
    umkm::Entity::find_by_id(umkm_id)
        .select_only()
        .column(umkm::Column::CreditBalance)
        .into_tuple::<i64>()
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("UMKM not found".to_string()))
}

#[derive(Clone)]
pub struct CreditService {
    pool: Arc<DatabaseConnection>,
}

impl CreditService {
    pub fn new(pool: Arc<DatabaseConnection>) -> Self {
        Self { pool }
    }

    /// Current balance plus the newest-first ledger page
    pub async fn balance_and_ledger(
        &self,
        user_id: i64,
        query: &ListQuery,
    ) -> AppResult<CreditOverview> {
        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;
        let params = PaginationParams::new(query.page, query.per_page);

        let base_query =
            credit_logs::Entity::find().filter(credit_logs::Column::UmkmId.eq(owner.id));
        let total = base_query.clone().count(self.pool.as_ref()).await? as i64;

        let rows = base_query
            .order_by_desc(credit_logs::Column::CreatedAt)
            .order_by_desc(credit_logs::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(self.pool.as_ref())
            .await?;

        let items: Vec<CreditLogResponse> = rows.into_iter().map(Into::into).collect();

        Ok(CreditOverview {
            credit_balance: owner.credit_balance,
            ledger: PaginatedResponse::new(items, &params, total),
        })
    }

    /// Manual grant or revocation by an administrator
    pub async fn admin_adjust(
        &self,
        umkm_id: i64,
        request: AdminAdjustCreditRequest,
    ) -> AppResult<AdminAdjustCreditResponse> {
        if request.amount == 0 {
            return Err(AppError::ValidationError(
                "Amount must not be zero".to_string(),
            ));
        }

        let txn = self.pool.begin().await?;

        let exists = umkm::Entity::find_by_id(umkm_id).one(&txn).await?;
        if exists.is_none() {
            return Err(AppError::NotFound("UMKM not found".to_string()));
        }

        let description = non_blank(request.description.as_deref())
            .unwrap_or_else(|| format!("Penyesuaian kredit oleh admin ({:+}).", request.amount));

        if !apply_change(&txn, umkm_id, request.amount, Some(description)).await? {
            return Err(AppError::InsufficientCredit);
        }

        let credit_balance = current_balance(&txn, umkm_id).await?;
        txn.commit().await?;

        log::info!(
            "Admin adjusted credit of UMKM {} by {} (balance {})",
            umkm_id,
            request.amount,
            credit_balance
        );

        Ok(AdminAdjustCreditResponse {
            umkm_id,
            credit_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{count_starting_with, exec, ledger_row, statements};
    use sea_orm::{DatabaseBackend, MockDatabase};

    const LEDGER_INSERT: &str = r#"INSERT INTO "credit_logs""#;

    #[tokio::test]
    async fn test_debit_one_at_zero_balance_takes_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(0)])
            .into_connection();

        assert!(!debit_one(&db, 1, "Notifikasi").await.unwrap());
        assert_eq!(count_starting_with(&statements(Arc::new(db)), LEDGER_INSERT), 0);
    }

    #[tokio::test]
    async fn test_debit_one_writes_ledger_row() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1)])
            .append_query_results([vec![ledger_row(-1)]])
            .into_connection();

        assert!(debit_one(&db, 1, "Notifikasi").await.unwrap());

        let log = statements(Arc::new(db));
        assert_eq!(count_starting_with(&log, LEDGER_INSERT), 1);
        assert_eq!(count_starting_with(&log, "COMMIT"), 1);
    }

    #[tokio::test]
    async fn test_apply_change_refuses_uncovered_debit() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(0)])
            .into_connection();

        assert!(!apply_change(&db, 1, -5, None).await.unwrap());
        assert_eq!(count_starting_with(&statements(Arc::new(db)), LEDGER_INSERT), 0);
    }

    #[tokio::test]
    async fn test_apply_change_rejects_unrepresentable_debit() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = apply_change(&db, 1, i64::MIN, None).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_admin_adjust_rejects_zero() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = CreditService::new(Arc::new(db));

        let err = service
            .admin_adjust(
                1,
                AdminAdjustCreditRequest {
                    amount: 0,
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
