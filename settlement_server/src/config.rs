use std::{env, net::IpAddr};

use gateway_tools::GatewayConfig;
use log::*;
use market_common::parse_boolean_flag;
use settlement_engine::db_types::SettlementMode;

const DEFAULT_MKT_HOST: &str = "127.0.0.1";
const DEFAULT_MKT_PORT: u16 = 8370;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// The requested settlement mode. The database may still downgrade to sequential settlements at start-up.
    pub settlement_mode: SettlementMode,
    pub gateway: GatewayConfig,
    /// If supplied, payment notifications are only accepted from these addresses. Signature checks apply either way.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub gateway_whitelist: Option<Vec<IpAddr>>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MKT_HOST.to_string(),
            port: DEFAULT_MKT_PORT,
            database_url: String::default(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            settlement_mode: SettlementMode::Atomic,
            gateway: GatewayConfig::default(),
            gateway_whitelist: None,
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MKT_HOST").ok().unwrap_or_else(|| DEFAULT_MKT_HOST.into());
        let port = env::var("MKT_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MKT_PORT. {e} Using the default, {DEFAULT_MKT_PORT}, instead."
                    );
                    DEFAULT_MKT_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MKT_PORT);
        let database_url = env::var("MKT_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ MKT_DATABASE_URL is not set. Please set it to the URL for the marketplace database.");
            String::default()
        });
        let max_connections = env::var("MKT_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for MKT_DB_MAX_CONNECTIONS. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
        let settlement_mode = configure_settlement_mode();
        let gateway = GatewayConfig::new_from_env_or_default();
        let gateway_whitelist = configure_gateway_whitelist();
        let use_x_forwarded_for = parse_boolean_flag(env::var("MKT_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("MKT_USE_FORWARDED").ok(), false);
        Self {
            host,
            port,
            database_url,
            max_connections,
            settlement_mode,
            gateway,
            gateway_whitelist,
            use_x_forwarded_for,
            use_forwarded,
        }
    }
}

fn configure_settlement_mode() -> SettlementMode {
    match env::var("MKT_SETTLEMENT_MODE") {
        Ok(s) => s.parse::<SettlementMode>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for MKT_SETTLEMENT_MODE. {e}. Using atomic settlements.");
            SettlementMode::Atomic
        }),
        Err(_) => {
            info!("🪛️ MKT_SETTLEMENT_MODE is not set. Using atomic settlements.");
            SettlementMode::Atomic
        },
    }
}

fn configure_gateway_whitelist() -> Option<Vec<IpAddr>> {
    let whitelist = env::var("MKT_GATEWAY_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
    match &whitelist {
        Some(whitelist) if whitelist.is_empty() => {
            warn!(
                "🚨️ The gateway IP whitelist was configured, but is empty. The server will run, but won't accept any \
                 payment notifications."
            );
        },
        None => {
            info!("🪛️ No gateway IP whitelist is set. Only signature validation will be used.");
        },
        Some(v) => {
            let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
            info!("🪛️ Gateway IP whitelist: {addrs}");
        },
    }
    whitelist
}

fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0", ""].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Gateway IP whitelist is disabled. If this is not what you want, set MKT_GATEWAY_IP_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = s
        .split(',')
        .filter_map(|s| {
            s.trim()
                .parse::<IpAddr>()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in MKT_GATEWAY_IP_WHITELIST: {e}"))
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The part of the configuration that request handlers need. It holds no secrets.
#[derive(Clone, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub gateway_whitelist: Option<Vec<IpAddr>>,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            gateway_whitelist: config.gateway_whitelist.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn whitelist_parsing() {
        assert!(parse_whitelist("none").is_none());
        assert!(parse_whitelist("False").is_none());
        let list = parse_whitelist("103.208.23.0, 103.208.23.6,not-an-ip").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], "103.208.23.0".parse::<IpAddr>().unwrap());
        assert!(parse_whitelist("garbage").unwrap().is_empty());
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::new("0.0.0.0", 9000);
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_connections, DEFAULT_DB_MAX_CONNECTIONS);
        assert_eq!(config.settlement_mode, SettlementMode::Atomic);
        assert!(config.gateway_whitelist.is_none());
    }
}
