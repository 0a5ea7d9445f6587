use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use crate::config::Config;
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::{CreditService, NotificationService, QueueService, StatsService};
use crate::utils::public_base_url;

#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "dashboard",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Today's queue and credit balance", body = DashboardView),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No business for this account")
    )
)]
pub async fn overview(
    queue_service: web::Data<QueueService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match queue_service.dashboard(user.id).await {
        Ok(view) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": view
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/dashboard/queue/next",
    tag = "dashboard",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Called ticket finished, next one called", body = AdvanceResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn call_next(
    queue_service: web::Data<QueueService>,
    config: web::Data<Config>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };
    let base_url = public_base_url(&req, config.app.public_base_url.as_deref());

    match queue_service.call_next(user.id, &base_url).await {
        Ok(result) => {
            let message = advance_message(&result, "Nomor terakhir diselesaikan");
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
    path = "/dashboard/queue/skip",
    tag = "dashboard",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Called ticket marked no-show, next one called", body = AdvanceResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn skip(
    queue_service: web::Data<QueueService>,
    config: web::Data<Config>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };
    let base_url = public_base_url(&req, config.app.public_base_url.as_deref());

    match queue_service.skip(user.id, &base_url).await {
        Ok(result) => {
            let message = advance_message(&result, "Nomor dilewati");
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": result,
                "message": message
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

fn advance_message(result: &AdvanceResponse, closed_text: &str) -> String {
    match (&result.closed, &result.called) {
        (_, Some(called)) => format!("Memanggil nomor {}", called.queue_number),
        (Some(_), None) => format!("{closed_text}. Tidak ada antrian menunggu."),
        (None, None) => "Tidak ada antrian aktif.".to_string(),
    }
}

#[utoipa::path(
    post,
    path = "/dashboard/queue/{id}/finish",
    tag = "dashboard",
    params(
        ("id" = i64, Path, description = "Ticket ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Ticket done", body = TicketResponse),
        (status = 404, description = "Ticket not found"),
        (status = 409, description = "Ticket is not being called")
    )
)]
pub async fn finish(
    queue_service: web::Data<QueueService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match queue_service.finish(user.id, path.into_inner()).await {
        Ok(ticket) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": ticket
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/dashboard/queue/{id}/cancel",
    tag = "dashboard",
    params(
        ("id" = i64, Path, description = "Ticket ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Ticket canceled", body = TicketResponse),
        (status = 404, description = "Ticket not found"),
        (status = 409, description = "Ticket is no longer waiting")
    )
)]
pub async fn cancel(
    queue_service: web::Data<QueueService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match queue_service.cancel(user.id, path.into_inner()).await {
        Ok(ticket) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": ticket
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/dashboard/queue/{id}/notify",
    tag = "dashboard",
    params(
        ("id" = i64, Path, description = "Ticket ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Gateway answered; see `sent`", body = NotifyResponse),
        (status = 400, description = "Ticket has no phone number"),
        (status = 402, description = "No credit left"),
        (status = 404, description = "Ticket not found")
    )
)]
pub async fn notify(
    notification_service: web::Data<NotificationService>,
    config: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };
    let base_url = public_base_url(&req, config.app.public_base_url.as_deref());

    match notification_service
        .send_manual(user.id, path.into_inner(), &base_url)
        .await
    {
        Ok(result) => {
            let message = if result.sent {
                "Pesan WA berhasil dikirim!"
            } else {
                "Gagal mengirim WA. Kredit tidak dipotong."
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
    get,
    path = "/dashboard/stats",
    tag = "dashboard",
    params(
        ("day" = Option<String>, Query, description = "YYYY-MM-DD, defaults to today")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Tickets per hour", body = StatsResponse)
    )
)]
pub async fn stats(
    stats_service: web::Data<StatsService>,
    req: HttpRequest,
    query: web::Query<StatsQuery>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match stats_service.hourly(user.id, query.day.as_deref()).await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": stats
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/dashboard/credits",
    tag = "dashboard",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Balance and credit ledger", body = CreditOverview)
    )
)]
pub async fn credits(
    credit_service: web::Data<CreditService>,
    req: HttpRequest,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match credit_service.balance_and_ledger(user.id, &query).await {
        Ok(overview) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": overview
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/dashboard/wa-logs",
    tag = "dashboard",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "WhatsApp send log, newest first")
    )
)]
pub async fn wa_logs(
    notification_service: web::Data<NotificationService>,
    req: HttpRequest,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match notification_service.message_logs(user.id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn dashboard_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/dashboard")
            .route("", web::get().to(overview))
            .route("/queue/next", web::post().to(call_next))
            .route("/queue/skip", web::post().to(skip))
            .route("/queue/{id}/finish", web::post().to(finish))
            .route("/queue/{id}/cancel", web::post().to(cancel))
            .route("/queue/{id}/notify", web::post().to(notify))
            .route("/stats", web::get().to(stats))
            .route("/credits", web::get().to(credits))
            .route("/wa-logs", web::get().to(wa_logs)),
    );
}
