use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    pub gateway_url: String,
    pub timeout_secs: u64,
    /// Receives top-up confirmation requests
    pub admin_number: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            gateway_url: "https://wa.sukipli.work/send-message".to_string(),
            timeout_secs: 10,
            admin_number: "628562603077".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root served under /static; holds upload/ and qr/
    pub static_dir: String,
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            static_dir: "static".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Used for ticket links and QR codes; falls back to the request host when unset
    #[serde(default)]
    pub public_base_url: Option<String>,
    pub registration_bonus_credits: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            public_base_url: None,
            registration_bonus_credits: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    /// Accounts registered with these emails get the admin role
    #[serde(default)]
    pub emails: Vec<String>,
}

impl AdminConfig {
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.emails
            .iter()
            .any(|e| e.trim().eq_ignore_ascii_case(email.trim()))
    }
}

fn parse_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("Failed to parse config file: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // no config file: environment variables and defaults only
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and no config.toml was found")?;

                let whatsapp_defaults = WhatsAppConfig::default();
                let storage_defaults = StorageConfig::default();

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                        refresh_token_expires_in: get_env_parse(
                            "JWT_REFRESH_EXPIRES_IN",
                            2_592_000i64,
                        ),
                    },
                    whatsapp: WhatsAppConfig {
                        gateway_url: get_env("WA_GATEWAY_URL")
                            .unwrap_or(whatsapp_defaults.gateway_url),
                        timeout_secs: get_env_parse(
                            "WA_TIMEOUT_SECS",
                            whatsapp_defaults.timeout_secs,
                        ),
                        admin_number: get_env("WA_ADMIN_NUMBER")
                            .unwrap_or(whatsapp_defaults.admin_number),
                    },
                    storage: StorageConfig {
                        static_dir: get_env("STATIC_DIR").unwrap_or(storage_defaults.static_dir),
                        max_upload_bytes: get_env_parse(
                            "MAX_UPLOAD_BYTES",
                            storage_defaults.max_upload_bytes,
                        ),
                    },
                    app: AppConfig {
                        public_base_url: get_env("PUBLIC_BASE_URL"),
                        registration_bonus_credits: get_env_parse(
                            "REGISTRATION_BONUS_CREDITS",
                            10i64,
                        ),
                    },
                    admin: AdminConfig {
                        emails: get_env("ADMIN_EMAILS")
                            .map(|v| parse_list(&v))
                            .unwrap_or_default(),
                    },
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // environment variables win over the file
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.refresh_token_expires_in = n;
        }
        if let Ok(v) = env::var("WA_GATEWAY_URL") {
            config.whatsapp.gateway_url = v;
        }
        if let Ok(v) = env::var("WA_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            config.whatsapp.timeout_secs = n;
        }
        if let Ok(v) = env::var("WA_ADMIN_NUMBER") {
            config.whatsapp.admin_number = v;
        }
        if let Ok(v) = env::var("STATIC_DIR") {
            config.storage.static_dir = v;
        }
        if let Ok(v) = env::var("MAX_UPLOAD_BYTES")
            && let Ok(n) = v.parse()
        {
            config.storage.max_upload_bytes = n;
        }
        if let Ok(v) = env::var("PUBLIC_BASE_URL") {
            config.app.public_base_url = Some(v);
        }
        if let Ok(v) = env::var("REGISTRATION_BONUS_CREDITS")
            && let Ok(n) = v.parse()
        {
            config.app.registration_bonus_credits = n;
        }
        if let Ok(v) = env::var("ADMIN_EMAILS") {
            config.admin.emails = parse_list(&v);
        }

        Ok(config)
    }
}
