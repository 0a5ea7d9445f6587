use actix_files::Files;
use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use antrian_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::WhatsAppService,
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    realtime::DisplayHub,
    services::*,
    swagger::swagger_config,
    utils::{JwtService, MediaStorage},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml()
        .map_err(|e| std::io::Error::other(format!("Failed to load configuration: {e}")))?;

    let pool = create_pool(&config.database)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to connect to database: {e}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to run database migrations: {e}")))?;
    let pool = Arc::new(pool);

    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    let storage = MediaStorage::new(&config.storage.static_dir);
    tokio::fs::create_dir_all(storage.qr_dir()).await?;
    tokio::fs::create_dir_all(storage.root().join("upload")).await?;

    let whatsapp = WhatsAppService::new(config.whatsapp.clone());
    if config.admin.emails.is_empty() {
        log::warn!("No admin emails configured; top-up approval is unavailable");
    }

    let hub = DisplayHub::new();
    let notification_service = NotificationService::new(pool.clone(), whatsapp);
    let queue_service = QueueService::new(pool.clone(), notification_service.clone(), hub);
    let auth_service = AuthService::new(
        pool.clone(),
        jwt_service.clone(),
        storage.clone(),
        config.app.clone(),
        config.admin.clone(),
    );
    let credit_service = CreditService::new(pool.clone());
    let topup_service = TopupService::new(
        pool.clone(),
        storage.clone(),
        notification_service.clone(),
    );
    let settings_service =
        SettingsService::new(pool.clone(), storage.clone(), queue_service.clone());
    let stats_service = StatsService::new(pool.clone());

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let bind = (config.server.host.clone(), config.server.port);
    let static_dir = config.storage.static_dir.clone();
    let config_data = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(config_data.clone())
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(queue_service.clone()))
            .app_data(web::Data::new(notification_service.clone()))
            .app_data(web::Data::new(credit_service.clone()))
            .app_data(web::Data::new(topup_service.clone()))
            .app_data(web::Data::new(settings_service.clone()))
            .app_data(web::Data::new(stats_service.clone()))
            .configure(swagger_config)
            .service(Files::new("/static", &static_dir))
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::public_config)
                    .configure(handlers::dashboard_config)
                    .configure(handlers::settings_config)
                    .configure(handlers::topup_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind(bind)?
    .run()
    .await
}
