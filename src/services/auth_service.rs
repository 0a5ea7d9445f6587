use crate::config::{AdminConfig, AppConfig};
use crate::entities::{credit_log_entity as credit_logs, umkm_entity as umkm, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::utils::*;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, Set, SqlErr, TransactionTrait,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthService {
    pool: Arc<DatabaseConnection>,
    jwt_service: JwtService,
    storage: MediaStorage,
    app_config: AppConfig,
    admin_config: AdminConfig,
}

impl AuthService {
    pub fn new(
        pool: Arc<DatabaseConnection>,
        jwt_service: JwtService,
        storage: MediaStorage,
        app_config: AppConfig,
        admin_config: AdminConfig,
    ) -> Self {
        Self {
            pool,
            jwt_service,
            storage,
            app_config,
            admin_config,
        }
    }

    /// Creates the owner account together with its business profile.
    pub async fn register(&self, request: RegisterRequest, base_url: &str) -> AppResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();
        let slug = request.slug.trim().to_lowercase();
        validate_email(&email)?;
        validate_password(&request.password)?;
        validate_slug(&slug)?;

        let umkm_name = non_blank(Some(request.umkm_name.as_str()))
            .ok_or_else(|| AppError::ValidationError("Nama UMKM wajib diisi".to_string()))?;
        let owner_whatsapp = match non_blank(request.owner_whatsapp.as_deref()) {
            Some(number) => Some(validate_wa_number(&number)?),
            None => None,
        };

        if users::Entity::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(self.pool.as_ref())
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Email sudah terdaftar".to_string()));
        }
        if umkm::Entity::find()
            .filter(umkm::Column::Slug.eq(slug.as_str()))
            .one(self.pool.as_ref())
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Slug sudah digunakan".to_string()));
        }

        let password_hash = hash_password(&request.password)?;
        let is_admin = self.admin_config.is_admin_email(&email);
        let bonus = self.app_config.registration_bonus_credits.max(0);
        let now = Utc::now();

        let txn = self.pool.begin().await?;

        let user = users::ActiveModel {
            name: Set(non_blank(request.name.as_deref())),
            email: Set(email.clone()),
            password_hash: Set(password_hash),
            is_admin: Set(is_admin),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Email sudah terdaftar"))?;

        let business = umkm::ActiveModel {
            user_id: Set(user.id),
            name: Set(umkm_name),
            slug: Set(slug.clone()),
            owner_whatsapp: Set(owner_whatsapp),
            credit_balance: Set(bonus),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Slug sudah digunakan"))?;

        if bonus > 0 {
            credit_logs::ActiveModel {
                umkm_id: Set(business.id),
                change: Set(bonus),
                description: Set(Some("Bonus kredit registrasi".to_string())),
                created_at: Set(Some(now)),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        log::info!(
            "Registered {} with UMKM {} (admin: {})",
            user.email,
            business.slug,
            is_admin
        );

        // the account exists either way; a missing QR can be regenerated from settings
        let business = match write_umkm_qr(&self.storage, &slug, &queue_page_url(base_url, &slug)).await {
            Ok(file_name) => {
                let mut active = business.clone().into_active_model();
                active.qr_path = Set(Some(file_name));
                match active.update(self.pool.as_ref()).await {
                    Ok(updated) => updated,
                    Err(e) => {
                        log::error!("Failed to store QR path for {}: {}", slug, e);
                        business
                    }
                }
            }
            Err(e) => {
                log::error!("QR generation for {} failed: {}", slug, e);
                business
            }
        };

        self.issue_tokens(user, Some(&business))
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();
        let invalid = || AppError::AuthError("Email atau password salah".to_string());

        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&request.password, &user.password_hash)? {
            log::warn!("Failed login for {}", email);
            return Err(invalid());
        }

        let business = umkm::Entity::find()
            .filter(umkm::Column::UserId.eq(user.id))
            .one(self.pool.as_ref())
            .await?;

        self.issue_tokens(user, business.as_ref())
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid user ID in token".to_string()))?;

        let user = users::Entity::find_by_id(user_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::AuthError("User no longer exists".to_string()))?;

        let business = umkm::Entity::find()
            .filter(umkm::Column::UserId.eq(user.id))
            .one(self.pool.as_ref())
            .await?;

        self.issue_tokens(user, business.as_ref())
    }

    fn issue_tokens(
        &self,
        user: users::Model,
        business: Option<&umkm::Model>,
    ) -> AppResult<AuthResponse> {
        let access_token =
            self.jwt_service
                .generate_access_token(user.id, &user.email, user.is_admin)?;
        let refresh_token =
            self.jwt_service
                .generate_refresh_token(user.id, &user.email, user.is_admin)?;

        Ok(AuthResponse {
            user: UserResponse::new(user, business),
            access_token,
            refresh_token,
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }
}

/// A unique index fired between the existence check and the insert.
fn conflict_on_duplicate(err: DbErr, message: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(message.to_string()),
        _ => AppError::DatabaseError(err),
    }
}
