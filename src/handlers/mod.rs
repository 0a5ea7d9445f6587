pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod public;
pub mod settings;
pub mod topup;

pub use admin::admin_config;
pub use auth::auth_config;
pub use dashboard::dashboard_config;
pub use public::public_config;
pub use settings::settings_config;
pub use topup::topup_config;
