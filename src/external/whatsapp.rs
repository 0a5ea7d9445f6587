use crate::config::WhatsAppConfig;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub number: &'a str,
    pub message: &'a str,
}

/// Result of one gateway call. `status` is the HTTP status code as text,
/// or `"error"` when no response was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub status: String,
    pub raw: String,
}

impl SendOutcome {
    pub fn success(&self) -> bool {
        self.status == "200"
    }

    fn failed(err: impl std::fmt::Display) -> Self {
        Self {
            status: "error".to_string(),
            raw: err.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct WhatsAppService {
    client: Client,
    config: WhatsAppConfig,
}

impl WhatsAppService {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn admin_number(&self) -> &str {
        &self.config.admin_number
    }

    /// Posts one message to the gateway. Never fails: transport errors are
    /// folded into the outcome so callers can always log the attempt.
    pub async fn send(&self, number: &str, message: &str) -> SendOutcome {
        let payload = SendMessageRequest { number, message };

        let response = self
            .client
            .post(&self.config.gateway_url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&payload)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                log::error!("WhatsApp gateway unreachable for {}: {}", number, e);
                return SendOutcome::failed(e);
            }
        };

        let status = response.status();
        let raw = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                log::error!("WhatsApp gateway body unreadable for {}: {}", number, e);
                return SendOutcome::failed(e);
            }
        };

        if status == reqwest::StatusCode::OK {
            log::info!("WhatsApp message sent to {}", number);
        } else {
            log::warn!("WhatsApp gateway answered {} for {}: {}", status, number, raw);
        }

        SendOutcome {
            status: status.as_u16().to_string(),
            raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_200_counts_as_success() {
        let ok = SendOutcome {
            status: "200".into(),
            raw: "{}".into(),
        };
        let created = SendOutcome {
            status: "201".into(),
            raw: "{}".into(),
        };
        assert!(ok.success());
        assert!(!created.success());
        assert!(!SendOutcome::failed("timeout").success());
    }

    #[tokio::test]
    async fn test_unreachable_gateway_yields_error_status() {
        let service = WhatsAppService::new(WhatsAppConfig {
            gateway_url: "http://127.0.0.1:9/send-message".into(),
            timeout_secs: 1,
            admin_number: "6280000000".into(),
        });
        let outcome = service.send("6281234567890", "halo").await;
        assert_eq!(outcome.status, "error");
        assert!(!outcome.success());
    }
}
