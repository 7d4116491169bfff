use std::time::Duration;

use log::*;
use market_common::Secret;

pub const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.sandbox.midtrans.com";
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway's REST API, without a trailing slash.
    pub base_url: String,
    /// The server key. It authenticates status queries and is the shared secret in notification signatures.
    pub server_key: Secret<String>,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_BASE_URL.to_string(),
            server_key: Secret::default(),
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    pub fn new(base_url: &str, server_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            server_key: Secret::new(server_key.to_string()),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("MKT_GATEWAY_BASE_URL").unwrap_or_else(|_| {
            warn!("🪛️ MKT_GATEWAY_BASE_URL not set, using {DEFAULT_GATEWAY_BASE_URL} as default");
            DEFAULT_GATEWAY_BASE_URL.to_string()
        });
        let server_key = Secret::new(std::env::var("MKT_GATEWAY_SERVER_KEY").unwrap_or_else(|_| {
            warn!(
                "🪛️ MKT_GATEWAY_SERVER_KEY not set. Every payment notification will be rejected and status checks will \
                 fail to authenticate."
            );
            String::default()
        }));
        let timeout = std::env::var("MKT_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid MKT_GATEWAY_TIMEOUT_SECS value '{s}'. {e}. Using the default."))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_GATEWAY_TIMEOUT);
        Self { base_url: base_url.trim_end_matches('/').to_string(), server_key, timeout }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = GatewayConfig::new("https://gateway.test/", "sk");
        assert_eq!(config.base_url, "https://gateway.test");
        assert_eq!(config.server_key.reveal(), "sk");
        assert_eq!(config.timeout, DEFAULT_GATEWAY_TIMEOUT);
        assert!(format!("{config:?}").contains("server_key: ****"));
    }
}
