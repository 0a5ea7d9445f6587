use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use crate::config::Config;
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::{TopupConfirmation, TopupService};
use crate::utils::{public_base_url, read_form};

#[utoipa::path(
    post,
    path = "/topup/start",
    tag = "topup",
    request_body = StartTopupRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Pending transaction with its QRIS image", body = TopupResponse),
        (status = 400, description = "Invalid package")
    )
)]
pub async fn start_topup(
    topup_service: web::Data<TopupService>,
    req: HttpRequest,
    request: web::Json<StartTopupRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match topup_service.start(user.id, request.into_inner()).await {
        Ok(tx) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": tx
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/topup",
    tag = "topup",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Own top-up transactions, newest first")
    )
)]
pub async fn list_topups(
    topup_service: web::Data<TopupService>,
    req: HttpRequest,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match topup_service.list(user.id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/topup/{id}",
    tag = "topup",
    params(
        ("id" = i64, Path, description = "Transaction ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Transaction", body = TopupResponse),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn get_topup(
    topup_service: web::Data<TopupService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match topup_service.get(user.id, path.into_inner()).await {
        Ok(tx) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": tx
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Multipart form (`multipart/form-data`): `sender_name`, `note`, optional `proof_image`.
#[utoipa::path(
    post,
    path = "/topup/{id}/confirm",
    tag = "topup",
    params(
        ("id" = i64, Path, description = "Transaction ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Waiting for admin review", body = TopupResponse),
        (status = 400, description = "Proof is not an image"),
        (status = 404, description = "Transaction not found"),
        (status = 409, description = "Transaction already processed")
    )
)]
pub async fn confirm_topup(
    topup_service: web::Data<TopupService>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<i64>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    let form = match read_form(payload, config.storage.max_upload_bytes).await {
        Ok(form) => form,
        Err(e) => return Ok(e.error_response()),
    };

    let base_url = public_base_url(&req, config.app.public_base_url.as_deref());
    let admin_link = format!("{}/api/v1/admin/topups", base_url);

    let confirmation = TopupConfirmation {
        sender_name: form.text("sender_name").map(str::to_string),
        note: form.text("note").map(str::to_string),
        proof: form.file("proof_image"),
    };

    match topup_service
        .confirm(user.id, path.into_inner(), confirmation, &admin_link)
        .await
    {
        Ok(tx) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": tx,
            "message": "Konfirmasi terkirim. Kredit akan ditambahkan setelah dicek admin."
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn topup_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/topup")
            .route("", web::get().to(list_topups))
            .route("/start", web::post().to(start_topup))
            .route("/{id}", web::get().to(get_topup))
            .route("/{id}/confirm", web::post().to(confirm_topup)),
    );
}
