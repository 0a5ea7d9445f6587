use crate::entities::{TopupStatus, topup_entity as topups, umkm_entity as umkm};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminTopupQuery, ApproveTopupResponse, ListQuery, MediaType, PaginatedResponse,
    PaginationParams, RejectTopupRequest, StartTopupRequest, TopupResponse,
};
use crate::services::credit_service::{apply_change, current_balance};
use crate::services::notification_service::NotificationService;
use crate::services::owner_umkm;
use crate::utils::{MediaStorage, UploadedFile, has_allowed_extension, non_blank};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;

const DEFAULT_PACKAGE: &str = "Paket";
const DEFAULT_QRIS: &str = "img/qris_kecil.jpg";

/// Statuses an owner or admin may still act on
const OPEN_STATUSES: [TopupStatus; 2] = [TopupStatus::Pending, TopupStatus::WaitingAdmin];

/// QRIS payment image shown for a package
pub fn qris_image_for(package_name: &str) -> &'static str {
    match package_name {
        "Paket Kecil" => "img/qris_kecil.jpg",
        "Paket Rame" => "img/qris_rame.jpg",
        "Paket Sultan" => "img/qris_sultan.jpg",
        _ => DEFAULT_QRIS,
    }
}

/// Owner's transfer confirmation, read from a multipart form
#[derive(Debug, Default)]
pub struct TopupConfirmation<'a> {
    pub sender_name: Option<String>,
    pub note: Option<String>,
    pub proof: Option<&'a UploadedFile>,
}

#[derive(Clone)]
pub struct TopupService {
    pool: Arc<DatabaseConnection>,
    storage: MediaStorage,
    notifier: NotificationService,
}

impl TopupService {
    pub fn new(pool: Arc<DatabaseConnection>, storage: MediaStorage, notifier: NotificationService) -> Self {
        Self {
            pool,
            storage,
            notifier,
        }
    }

    pub async fn start(&self, user_id: i64, request: StartTopupRequest) -> AppResult<TopupResponse> {
        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;

        if request.credits <= 0 {
            return Err(AppError::ValidationError(
                "Paket top-up tidak valid".to_string(),
            ));
        }

        let package_name = non_blank(request.package_name.as_deref())
            .unwrap_or_else(|| DEFAULT_PACKAGE.to_string());
        let now = Utc::now();

        let tx = topups::ActiveModel {
            umkm_id: Set(owner.id),
            user_id: Set(user_id),
            qris_image: Set(Some(qris_image_for(&package_name).to_string())),
            package_name: Set(package_name),
            credits: Set(request.credits),
            amount: Set(request.amount.filter(|a| *a > 0)),
            status: Set(TopupStatus::Pending),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(self.pool.as_ref())
        .await?;

        log::info!(
            "Top-up #{} started by {}: {} ({} credits)",
            tx.id,
            owner.slug,
            tx.package_name,
            tx.credits
        );

        Ok(tx.into())
    }

    pub async fn get(&self, user_id: i64, tx_id: i64) -> AppResult<TopupResponse> {
        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;
        Ok(self.owned(owner.id, tx_id).await?.into())
    }

    pub async fn list(
        &self,
        user_id: i64,
        query: &ListQuery,
    ) -> AppResult<PaginatedResponse<TopupResponse>> {
        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;
        let params = PaginationParams::new(query.page, query.per_page);
        let base_query = topups::Entity::find().filter(topups::Column::UmkmId.eq(owner.id));
        self.page(base_query, &params).await
    }

    /// Records the transfer details and hands the transaction to the admin.
    pub async fn confirm(
        &self,
        user_id: i64,
        tx_id: i64,
        confirmation: TopupConfirmation<'_>,
        admin_link: &str,
    ) -> AppResult<TopupResponse> {
        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;
        let tx = self.owned(owner.id, tx_id).await?;

        if !tx.status.can_confirm() {
            return Err(AppError::Conflict(format!(
                "Transaksi sudah {}",
                tx.status
            )));
        }

        let proof_path = match confirmation.proof {
            Some(file) => {
                if !has_allowed_extension(&file.file_name, MediaType::Image.allowed_extensions()) {
                    return Err(AppError::ValidationError(
                        "Format bukti transfer tidak didukung. Gunakan gambar (jpg/png/jpeg/webp)."
                            .to_string(),
                    ));
                }
                Some(
                    self.storage
                        .save_topup_proof(&owner.slug, tx.id, &file.file_name, &file.bytes)
                        .await?,
                )
            }
            None => None,
        };

        let now = Utc::now();
        let sender_name = non_blank(confirmation.sender_name.as_deref());
        let note = non_blank(confirmation.note.as_deref());

        let mut update = topups::Entity::update_many()
            .col_expr(topups::Column::Status, Expr::value(TopupStatus::WaitingAdmin))
            .col_expr(topups::Column::UpdatedAt, Expr::value(now));
        if let Some(sender) = &sender_name {
            update = update.col_expr(topups::Column::SenderName, Expr::value(sender.clone()));
        }
        if let Some(note) = &note {
            update = update.col_expr(topups::Column::Note, Expr::value(note.clone()));
        }
        if let Some(path) = &proof_path {
            update = update.col_expr(topups::Column::ProofImage, Expr::value(path.clone()));
        }

        // the admin may have settled the transaction since it was read
        let written = update
            .filter(topups::Column::Id.eq(tx.id))
            .filter(topups::Column::Status.is_in(OPEN_STATUSES))
            .exec(self.pool.as_ref())
            .await;
        let rows_affected = match written {
            Ok(result) => result.rows_affected,
            Err(e) => {
                self.discard_upload(proof_path.as_deref()).await;
                return Err(e.into());
            }
        };
        if rows_affected == 0 {
            self.discard_upload(proof_path.as_deref()).await;
            return Err(AppError::Conflict(
                "Transaksi sudah diproses, silakan muat ulang".to_string(),
            ));
        }

        let previous_proof = tx.proof_image.clone();
        let updated = topups::Model {
            status: TopupStatus::WaitingAdmin,
            sender_name: sender_name.or(tx.sender_name),
            note: note.or(tx.note),
            proof_image: proof_path.clone().or(previous_proof.clone()),
            updated_at: Some(now),
            ..tx
        };

        if proof_path.is_some()
            && let Some(old) = previous_proof
        {
            self.storage.remove(&old).await;
        }

        match self.notifier.notify_topup_admin(&owner, &updated, admin_link).await {
            Ok(d) if d.sent() => {}
            Ok(d) => log::warn!(
                "Admin was not notified about top-up #{} (gateway status {})",
                updated.id,
                d.outcome.status
            ),
            Err(e) => log::error!("Admin notification for top-up #{} failed: {}", updated.id, e),
        }

        Ok(updated.into())
    }

    pub async fn admin_list(
        &self,
        query: &AdminTopupQuery,
    ) -> AppResult<PaginatedResponse<TopupResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let mut base_query = topups::Entity::find();

        if let Some(raw) = query.status.as_deref().filter(|s| !s.is_empty()) {
            let status: TopupStatus = raw.parse().map_err(AppError::ValidationError)?;
            base_query = base_query.filter(topups::Column::Status.eq(status));
        }

        self.page(base_query, &params).await
    }

    /// Marks the transaction paid and credits the business. Approving twice is a no-op.
    pub async fn admin_approve(&self, tx_id: i64) -> AppResult<ApproveTopupResponse> {
        let txn = self.pool.begin().await?;
        let now = Utc::now();

        let tx = topups::Entity::find_by_id(tx_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaksi tidak ditemukan".to_string()))?;

        match tx.status {
            TopupStatus::Success => {
                let credit_balance = current_balance(&txn, tx.umkm_id).await?;
                txn.commit().await?;
                return Ok(ApproveTopupResponse {
                    transaction: tx.into(),
                    credit_balance,
                    already_processed: true,
                });
            }
            TopupStatus::Rejected => {
                return Err(AppError::Conflict(
                    "Transaksi sudah ditolak".to_string(),
                ));
            }
            TopupStatus::Pending | TopupStatus::WaitingAdmin => {}
        }

        let claimed = topups::Entity::update_many()
            .col_expr(topups::Column::Status, Expr::value(TopupStatus::Success))
            .col_expr(topups::Column::ConfirmedAt, Expr::value(now))
            .col_expr(topups::Column::UpdatedAt, Expr::value(now))
            .filter(topups::Column::Id.eq(tx.id))
            .filter(topups::Column::Status.is_in(OPEN_STATUSES))
            .exec(&txn)
            .await?;
        if claimed.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Transaksi sedang diproses, silakan muat ulang".to_string(),
            ));
        }

        let description = format!("Top-up paket {} (ACC admin).", tx.package_name);
        if !apply_change(&txn, tx.umkm_id, tx.credits, Some(description)).await? {
            return Err(AppError::NotFound("UMKM tidak ditemukan".to_string()));
        }

        let credit_balance = current_balance(&txn, tx.umkm_id).await?;
        let owner = umkm::Entity::find_by_id(tx.umkm_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("UMKM tidak ditemukan".to_string()))?;

        txn.commit().await?;

        let approved = topups::Model {
            status: TopupStatus::Success,
            confirmed_at: Some(now),
            updated_at: Some(now),
            ..tx
        };

        log::info!(
            "Top-up #{} approved: +{} credits for {} (balance {})",
            approved.id,
            approved.credits,
            owner.slug,
            credit_balance
        );

        if let Err(e) = self
            .notifier
            .notify_topup_owner(&owner, &approved, credit_balance)
            .await
        {
            log::error!("Owner notification for top-up #{} failed: {}", approved.id, e);
        }

        Ok(ApproveTopupResponse {
            transaction: approved.into(),
            credit_balance,
            already_processed: false,
        })
    }

    pub async fn admin_reject(
        &self,
        tx_id: i64,
        request: RejectTopupRequest,
    ) -> AppResult<TopupResponse> {
        let tx = topups::Entity::find_by_id(tx_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("Transaksi tidak ditemukan".to_string()))?;

        if !tx.status.can_review() {
            return Err(AppError::Conflict(format!("Transaksi sudah {}", tx.status)));
        }

        let admin_note = non_blank(request.note.as_deref());
        let now = Utc::now();
        let result = topups::Entity::update_many()
            .col_expr(topups::Column::Status, Expr::value(TopupStatus::Rejected))
            .col_expr(topups::Column::AdminNote, Expr::value(admin_note.clone()))
            .col_expr(topups::Column::UpdatedAt, Expr::value(now))
            .filter(topups::Column::Id.eq(tx.id))
            .filter(topups::Column::Status.is_in(OPEN_STATUSES))
            .exec(self.pool.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Transaksi sedang diproses, silakan muat ulang".to_string(),
            ));
        }

        let updated = topups::Model {
            status: TopupStatus::Rejected,
            admin_note,
            updated_at: Some(now),
            ..tx
        };

        log::info!("Top-up #{} rejected", updated.id);
        Ok(updated.into())
    }

    async fn discard_upload(&self, path: Option<&str>) {
        if let Some(path) = path {
            self.storage.remove(path).await;
        }
    }

    async fn owned(&self, umkm_id: i64, tx_id: i64) -> AppResult<topups::Model> {
        topups::Entity::find_by_id(tx_id)
            .filter(topups::Column::UmkmId.eq(umkm_id))
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("Transaksi tidak ditemukan".to_string()))
    }

    async fn page(
        &self,
        base_query: sea_orm::Select<topups::Entity>,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<TopupResponse>> {
        let total = base_query.clone().count(self.pool.as_ref()).await? as i64;
        let rows = base_query
            .order_by_desc(topups::Column::CreatedAt)
            .order_by_desc(topups::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(self.pool.as_ref())
            .await?;
        Ok(PaginatedResponse::new(
            rows.into_iter().map(Into::into).collect(),
            params,
            total,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qris_image_for_package() {
        assert_eq!(qris_image_for("Paket Kecil"), "img/qris_kecil.jpg");
        assert_eq!(qris_image_for("Paket Rame"), "img/qris_rame.jpg");
        assert_eq!(qris_image_for("Paket Sultan"), "img/qris_sultan.jpg");
        assert_eq!(qris_image_for("Paket"), "img/qris_kecil.jpg");
        assert_eq!(qris_image_for("paket sultan"), "img/qris_kecil.jpg");
    }

    mod review {
        use super::*;
        use crate::entities::WaLogKind;
        use crate::services::test_support::*;
        use sea_orm::{DatabaseBackend, MockDatabase};

        const TOPUP_UPDATE: &str = r#"UPDATE "topup_transactions""#;

        fn service(db: &Arc<DatabaseConnection>, root: &std::path::Path) -> TopupService {
            let notifier = NotificationService::new(db.clone(), whatsapp(DEAD_GATEWAY));
            TopupService::new(db.clone(), MediaStorage::new(root), notifier)
        }

        #[tokio::test]
        async fn test_confirm_guards_status_in_update() {
            let dir = tempfile::tempdir().unwrap();
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![business(0)]])
                    .append_query_results([vec![topup(TopupStatus::Pending)]])
                    .append_exec_results([exec(1)])
                    .append_query_results([vec![wa_log(WaLogKind::TopupAdmin, None)]])
                    .into_connection(),
            );
            let confirmation = TopupConfirmation {
                sender_name: Some("Budi".into()),
                note: Some("  ".into()),
                proof: None,
            };

            let updated = service(&db, dir.path())
                .confirm(9, 31, confirmation, "http://x/admin")
                .await
                .unwrap();
            assert_eq!(updated.status, TopupStatus::WaitingAdmin);
            assert_eq!(updated.sender_name.as_deref(), Some("Budi"));
            assert_eq!(updated.note, None);

            let log = statements(db);
            let update = log.iter().find(|s| s.sql.starts_with(TOPUP_UPDATE)).unwrap();
            assert!(update.sql.contains(r#""status" IN ("#));
        }

        #[tokio::test]
        async fn test_confirm_after_concurrent_approval_is_conflict() {
            let dir = tempfile::tempdir().unwrap();
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![business(0)]])
                    .append_query_results([vec![topup(TopupStatus::WaitingAdmin)]])
                    .append_exec_results([exec(0)])
                    .into_connection(),
            );
            let proof = UploadedFile {
                field: "proof_image".into(),
                file_name: "bukti.jpg".into(),
                bytes: b"jpg".to_vec(),
            };
            let confirmation = TopupConfirmation {
                proof: Some(&proof),
                ..Default::default()
            };

            let err = service(&db, dir.path())
                .confirm(9, 31, confirmation, "http://x/admin")
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Conflict(_)));

            // the rejected upload is not left behind
            let proof_dir = dir.path().join("upload/warung-budi/topup");
            assert_eq!(std::fs::read_dir(proof_dir).unwrap().count(), 0);

            let log = statements(db);
            assert_eq!(count_starting_with(&log, r#"INSERT INTO "wa_logs""#), 0);
        }

        #[tokio::test]
        async fn test_reject_after_concurrent_approval_is_conflict() {
            let dir = tempfile::tempdir().unwrap();
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![topup(TopupStatus::WaitingAdmin)]])
                    .append_exec_results([exec(0)])
                    .into_connection(),
            );

            let err = service(&db, dir.path())
                .admin_reject(31, RejectTopupRequest { note: None })
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Conflict(_)));
        }

        #[tokio::test]
        async fn test_reject_records_admin_note() {
            let dir = tempfile::tempdir().unwrap();
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![topup(TopupStatus::WaitingAdmin)]])
                    .append_exec_results([exec(1)])
                    .into_connection(),
            );

            let rejected = service(&db, dir.path())
                .admin_reject(
                    31,
                    RejectTopupRequest {
                        note: Some("Transfer tidak masuk".into()),
                    },
                )
                .await
                .unwrap();
            assert_eq!(rejected.status, TopupStatus::Rejected);
            assert_eq!(rejected.admin_note.as_deref(), Some("Transfer tidak masuk"));
        }

        #[tokio::test]
        async fn test_reject_settled_transaction_is_conflict() {
            let dir = tempfile::tempdir().unwrap();
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![topup(TopupStatus::Success)]])
                    .into_connection(),
            );

            let err = service(&db, dir.path())
                .admin_reject(31, RejectTopupRequest { note: None })
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Conflict(_)));
            assert_eq!(count_starting_with(&statements(db), TOPUP_UPDATE), 0);
        }

        #[tokio::test]
        async fn test_approve_credits_once() {
            let dir = tempfile::tempdir().unwrap();
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![topup(TopupStatus::WaitingAdmin)]])
                    .append_exec_results([exec(1), exec(1)])
                    .append_query_results([vec![ledger_row(100)]])
                    .append_query_results([vec![balance_row(100)]])
                    .append_query_results([vec![business(100)]])
                    .append_query_results([vec![wa_log(WaLogKind::TopupOwner, None)]])
                    .into_connection(),
            );

            let approved = service(&db, dir.path()).admin_approve(31).await.unwrap();
            assert!(!approved.already_processed);
            assert_eq!(approved.credit_balance, 100);
            assert_eq!(approved.transaction.status, TopupStatus::Success);
            assert!(approved.transaction.confirmed_at.is_some());
        }

        #[tokio::test]
        async fn test_second_approve_is_already_processed() {
            let dir = tempfile::tempdir().unwrap();
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![topup(TopupStatus::Success)]])
                    .append_query_results([vec![balance_row(110)]])
                    .into_connection(),
            );

            let approved = service(&db, dir.path()).admin_approve(31).await.unwrap();
            assert!(approved.already_processed);
            assert_eq!(approved.credit_balance, 110);
            assert_eq!(count_starting_with(&statements(db), "UPDATE"), 0);
        }

        #[tokio::test]
        async fn test_approve_rejected_transaction_is_conflict() {
            let dir = tempfile::tempdir().unwrap();
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![topup(TopupStatus::Rejected)]])
                    .into_connection(),
            );

            let err = service(&db, dir.path()).admin_approve(31).await.unwrap_err();
            assert!(matches!(err, AppError::Conflict(_)));
        }
    }
}
