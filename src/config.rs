use std::env;
use std::time::Duration;
use std::num::NonZeroU32;
use governor::Quota;

#[derive(Clone, Debug)]
pub struct Config {
    // Game server
    pub mc_host: String,
    pub mc_port: u16,
    pub rcon_port: u16,
    pub rcon_password: Option<String>,

    // HTTP listener
    pub bind_address: String,
    pub port: u16,
    pub api_prefix: String,

    // Console timeouts
    pub connect_timeout_ms: u64,
    pub command_timeout_ms: u64,

    // Rate limiting configs
    pub command_period_secs: u64,
    pub command_burst_limit: u32,

    // Other configs
    pub heap_top_n: usize,
    pub status_poll_secs: u64,
    pub admin_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mc_host: "127.0.0.1".to_string(),
            mc_port: 25565,
            rcon_port: 25575,
            rcon_password: None,
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            api_prefix: "/api".to_string(),
            connect_timeout_ms: 5_000,
            command_timeout_ms: 10_000,
            command_period_secs: 1,
            command_burst_limit: 30,
            heap_top_n: 20,
            status_poll_secs: 0,
            admin_token: None,
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

// Empty strings count as unset so `RCON_PASSWORD=` in a .env file still disables the console.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            mc_host: env::var("MC_HOST").unwrap_or(defaults.mc_host),
            mc_port: parsed("MC_PORT", defaults.mc_port),
            rcon_port: parsed("RCON_PORT", defaults.rcon_port),
            rcon_password: optional("RCON_PASSWORD"),

            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: parsed("PORT", defaults.port),
            api_prefix: env::var("API_PREFIX").unwrap_or(defaults.api_prefix),

            connect_timeout_ms: parsed("RCON_CONNECT_TIMEOUT_MS", defaults.connect_timeout_ms),
            command_timeout_ms: parsed("RCON_COMMAND_TIMEOUT_MS", defaults.command_timeout_ms),

            command_period_secs: parsed("COMMAND_PERIOD_SECS", defaults.command_period_secs),
            command_burst_limit: parsed("COMMAND_BURST_LIMIT", defaults.command_burst_limit),

            heap_top_n: parsed("HEAP_TOP_N", defaults.heap_top_n),
            status_poll_secs: parsed("STATUS_POLL_SECS", defaults.status_poll_secs),
            admin_token: optional("ADMIN_TOKEN"),
        }
    }

    pub fn bind(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.max(1))
    }

    pub fn command_quota(&self) -> Quota {
        let burst = NonZeroU32::new(self.command_burst_limit).unwrap_or(NonZeroU32::MIN);
        Quota::with_period(Duration::from_secs(self.command_period_secs))
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(burst)
    }
}
