use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use crate::config::Config;
use crate::models::*;
use crate::realtime::snapshot_event_stream;
use crate::services::{QueueService, SettingsService};
use crate::utils::public_base_url;

#[utoipa::path(
    get,
    path = "/public/{slug}",
    tag = "public",
    params(
        ("slug" = String, Path, description = "Business slug"),
        ("ticket_id" = Option<i64>, Query, description = "Ticket to highlight")
    ),
    responses(
        (status = 200, description = "Queue status page", body = PublicQueueView),
        (status = 404, description = "Unknown business")
    )
)]
pub async fn queue_status(
    queue_service: web::Data<QueueService>,
    path: web::Path<String>,
    query: web::Query<PublicQueueQuery>,
) -> Result<HttpResponse> {
    match queue_service.public_view(&path, query.ticket_id).await {
        Ok(view) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": view
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/public/{slug}/take",
    tag = "public",
    params(
        ("slug" = String, Path, description = "Business slug")
    ),
    request_body = TakeTicketRequest,
    responses(
        (status = 200, description = "Ticket issued", body = TakeTicketResponse),
        (status = 400, description = "Invalid phone number"),
        (status = 404, description = "Unknown business"),
        (status = 409, description = "Queue busy, retry")
    )
)]
pub async fn take_ticket(
    queue_service: web::Data<QueueService>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<String>,
    request: web::Json<TakeTicketRequest>,
) -> Result<HttpResponse> {
    let base_url = public_base_url(&req, config.app.public_base_url.as_deref());
    match queue_service
        .take_ticket(&path, request.into_inner(), &base_url)
        .await
    {
        Ok(response) => {
            let message = format!("Nomor antrian Anda: {}", response.ticket.queue_number);
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": response,
                "message": message
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/public/{slug}/display",
    tag = "public",
    params(
        ("slug" = String, Path, description = "Business slug")
    ),
    responses(
        (status = 200, description = "Kiosk configuration and queue", body = DisplayViewResponse),
        (status = 404, description = "Unknown business")
    )
)]
pub async fn display(
    settings_service: web::Data<SettingsService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match settings_service.display_view(&path).await {
        Ok(view) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": view
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/public/{slug}/events",
    tag = "public",
    params(
        ("slug" = String, Path, description = "Business slug")
    ),
    responses(
        (status = 200, description = "Server-Sent Events stream of queue_update events", content_type = "text/event-stream"),
        (status = 404, description = "Unknown business")
    )
)]
pub async fn events(
    queue_service: web::Data<QueueService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let slug = path.into_inner();
    let business_id = match queue_service.business_id(&slug).await {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    // subscribe before reading the snapshot so no update slips in between
    let rx = queue_service.hub().subscribe(&slug).await;

    match queue_service.snapshot(business_id).await {
        Ok(snapshot) => {
            log::debug!("Display connected to {}", slug);
            Ok(HttpResponse::Ok()
                .content_type("text/event-stream")
                .insert_header(("Cache-Control", "no-cache"))
                .insert_header(("X-Accel-Buffering", "no"))
                .streaming(snapshot_event_stream(snapshot, rx)))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn public_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/public")
            .route("/{slug}", web::get().to(queue_status))
            .route("/{slug}/take", web::post().to(take_ticket))
            .route("/{slug}/display", web::get().to(display))
            .route("/{slug}/events", web::get().to(events)),
    );
}
