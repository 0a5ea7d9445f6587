use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use crate::config::Config;
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::{DisplayUpdate, SettingsService};
use crate::utils::{public_base_url, read_form};

#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Business profile", body = UmkmResponse),
        (status = 404, description = "No business for this account")
    )
)]
pub async fn get_settings(
    settings_service: web::Data<SettingsService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match settings_service.get(user.id).await {
        Ok(umkm) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": umkm
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/settings",
    tag = "settings",
    request_body = UpdateSettingsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Profile updated", body = UmkmResponse),
        (status = 400, description = "Invalid name or WhatsApp number")
    )
)]
pub async fn update_settings(
    settings_service: web::Data<SettingsService>,
    req: HttpRequest,
    request: web::Json<UpdateSettingsRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match settings_service.update(user.id, request.into_inner()).await {
        Ok(umkm) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": umkm,
            "message": "Pengaturan UMKM berhasil disimpan."
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/settings/qr",
    tag = "settings",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "QR code written under /static/qr", body = QrResponse)
    )
)]
pub async fn regenerate_qr(
    settings_service: web::Data<SettingsService>,
    config: web::Data<Config>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };
    let base_url = public_base_url(&req, config.app.public_base_url.as_deref());

    match settings_service.regenerate_qr(user.id, &base_url).await {
        Ok(qr) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": qr,
            "message": "QR code berhasil dibuat ulang."
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Multipart form (`multipart/form-data`): `display_ticker`, repeated `image_files`
/// and `video_files`.
#[utoipa::path(
    post,
    path = "/settings/display",
    tag = "settings",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Kiosk settings updated", body = DisplayUpdateResponse),
        (status = 413, description = "Upload too large")
    )
)]
pub async fn update_display(
    settings_service: web::Data<SettingsService>,
    config: web::Data<Config>,
    req: HttpRequest,
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

    let update = DisplayUpdate {
        ticker: form.text("display_ticker").map(str::to_string),
        images: form.files("image_files").collect(),
        videos: form.files("video_files").collect(),
    };

    match settings_service.update_display(user.id, update).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result,
            "message": "Pengaturan display berhasil disimpan."
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/settings/display/delete",
    tag = "settings",
    request_body = DeleteMediaRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Media removed", body = DisplayUpdateResponse),
        (status = 404, description = "Path is not in the kiosk list")
    )
)]
pub async fn delete_display_media(
    settings_service: web::Data<SettingsService>,
    req: HttpRequest,
    request: web::Json<DeleteMediaRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match settings_service
        .delete_display_media(user.id, request.into_inner())
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result,
            "message": "Media berhasil dihapus."
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn settings_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/settings")
            .route("", web::get().to(get_settings))
            .route("", web::put().to(update_settings))
            .route("/qr", web::post().to(regenerate_qr))
            .route("/display", web::post().to(update_display))
            .route("/display/delete", web::post().to(delete_display_media)),
    );
}
