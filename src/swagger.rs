use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{QueueStatus, TopupStatus, WaLogKind};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::public::queue_status,
        handlers::public::take_ticket,
        handlers::public::display,
        handlers::public::events,
        handlers::dashboard::overview,
        handlers::dashboard::call_next,
        handlers::dashboard::skip,
        handlers::dashboard::finish,
        handlers::dashboard::cancel,
        handlers::dashboard::notify,
        handlers::dashboard::stats,
        handlers::dashboard::credits,
        handlers::dashboard::wa_logs,
        handlers::settings::get_settings,
        handlers::settings::update_settings,
        handlers::settings::regenerate_qr,
        handlers::settings::update_display,
        handlers::settings::delete_display_media,
        handlers::topup::start_topup,
        handlers::topup::list_topups,
        handlers::topup::get_topup,
        handlers::topup::confirm_topup,
        handlers::admin::admin_list_topups,
        handlers::admin::approve_topup,
        handlers::admin::reject_topup,
        handlers::admin::adjust_credits,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            UserResponse,
            AuthResponse,
            UmkmResponse,
            PublicUmkm,
            UpdateSettingsRequest,
            MediaType,
            DeleteMediaRequest,
            QrResponse,
            DisplayUpdateResponse,
            DisplayViewResponse,
            QueueStatus,
            TakeTicketRequest,
            TakeTicketResponse,
            TicketResponse,
            PublicTicket,
            QueueEntry,
            QueueSnapshot,
            PublicQueueView,
            DashboardView,
            AdvanceResponse,
            NotifyResponse,
            WaLogKind,
            WaLogResponse,
            CreditLogResponse,
            CreditOverview,
            AdminAdjustCreditRequest,
            AdminAdjustCreditResponse,
            TopupStatus,
            StartTopupRequest,
            TopupResponse,
            RejectTopupRequest,
            ApproveTopupResponse,
            HourlyCount,
            StatusCount,
            StatsResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and tokens"),
        (name = "public", description = "Customer ticket pages and kiosk displays"),
        (name = "dashboard", description = "Queue operation for the business owner"),
        (name = "settings", description = "Business profile, QR code and kiosk media"),
        (name = "topup", description = "Credit top-up via QRIS transfer"),
        (name = "admin", description = "Top-up review and credit adjustments"),
    ),
    info(
        title = "Antrian UMKM API",
        version = "1.0.0",
        description = "Queue management for small businesses with WhatsApp notifications"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
