use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use crate::middlewares::require_admin;
use crate::models::*;
use crate::services::{CreditService, TopupService};

#[utoipa::path(
    get,
    path = "/admin/topups",
    tag = "admin",
    params(
        ("status" = Option<String>, Query, description = "pending | waiting_admin | success | rejected"),
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Top-up transactions of every business"),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn admin_list_topups(
    topup_service: web::Data<TopupService>,
    req: HttpRequest,
    query: web::Query<AdminTopupQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match topup_service.admin_list(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/topups/{id}/approve",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Transaction ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Credits added", body = ApproveTopupResponse),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Transaction not found"),
        (status = 409, description = "Transaction was rejected")
    )
)]
pub async fn approve_topup(
    topup_service: web::Data<TopupService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let admin = match require_admin(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };
    let tx_id = path.into_inner();

    match topup_service.admin_approve(tx_id).await {
        Ok(result) => {
            let message = if result.already_processed {
                "Transaksi ini sudah diproses sebelumnya."
            } else {
                log::info!("Admin {} approved top-up {}", admin.id, tx_id);
                "Top-up berhasil di-ACC dan kredit sudah ditambahkan."
            };
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": result,
                "message": message
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/topups/{id}/reject",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "Transaction ID")
    ),
    request_body = RejectTopupRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Transaction rejected", body = TopupResponse),
        (status = 403, description = "Not an administrator"),
        (status = 409, description = "Transaction already processed")
    )
)]
pub async fn reject_topup(
    topup_service: web::Data<TopupService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<RejectTopupRequest>,
) -> Result<HttpResponse> {
    let admin = match require_admin(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };
    let tx_id = path.into_inner();

    match topup_service.admin_reject(tx_id, request.into_inner()).await {
        Ok(tx) => {
            log::info!("Admin {} rejected top-up {}", admin.id, tx_id);
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": tx
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/umkm/{id}/credits",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "UMKM ID")
    ),
    request_body = AdminAdjustCreditRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Balance adjusted", body = AdminAdjustCreditResponse),
        (status = 402, description = "Adjustment would make the balance negative"),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "UMKM not found")
    )
)]
pub async fn adjust_credits(
    credit_service: web::Data<CreditService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<AdminAdjustCreditRequest>,
) -> Result<HttpResponse> {
    let admin = match require_admin(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };
    let umkm_id = path.into_inner();
    let amount = request.amount;

    match credit_service.admin_adjust(umkm_id, request.into_inner()).await {
        Ok(result) => {
            log::info!("Admin {} adjusted credits of UMKM {} by {:+}", admin.id, umkm_id, amount);
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": result
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/topups", web::get().to(admin_list_topups))
            .route("/topups/{id}/approve", web::post().to(approve_topup))
            .route("/topups/{id}/reject", web::post().to(reject_topup))
            .route("/umkm/{id}/credits", web::post().to(adjust_credits)),
    );
}
