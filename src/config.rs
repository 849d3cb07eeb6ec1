//! Engine configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_VOTE_RADIUS_M: f64 = 150.0;
pub const DEFAULT_DROP_RADIUS_M: f64 = 150.0;
pub const DEFAULT_ZOOM: u8 = 17;
pub const DEFAULT_DROP_ZOOM: u8 = 18;
pub const DEFAULT_MIN_DROP_ZOOM: u8 = 17;
pub const DEFAULT_EXPIRY_TICK_MS: u64 = 1000;
pub const DEFAULT_HOVER_REVERT_MS: u64 = 2000;
pub const DEFAULT_HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown DEJAMOO_BACKEND: {0} (expected 'http' or 'memory')")]
    UnknownBackend(String),
}

/// Which `Backend` implementation the binary wires up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    #[default]
    Http,
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub backend: BackendKind,
    pub api_base_url: String,
    /// Maximum distance between the user and a marker for votes to count.
    pub vote_radius_m: f64,
    /// Radius of the drop overlay around the user's position.
    pub drop_radius_m: f64,
    pub default_zoom: u8,
    /// Zoom applied when drop mode is armed.
    pub drop_zoom: u8,
    /// Below this zoom the drop overlay is hidden and drops are refused.
    pub min_drop_zoom: u8,
    pub expiry_tick: Duration,
    pub hover_revert: Duration,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Http,
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            vote_radius_m: DEFAULT_VOTE_RADIUS_M,
            drop_radius_m: DEFAULT_DROP_RADIUS_M,
            default_zoom: DEFAULT_ZOOM,
            drop_zoom: DEFAULT_DROP_ZOOM,
            min_drop_zoom: DEFAULT_MIN_DROP_ZOOM,
            expiry_tick: Duration::from_millis(DEFAULT_EXPIRY_TICK_MS),
            hover_revert: Duration::from_millis(DEFAULT_HOVER_REVERT_MS),
            request_timeout: Duration::from_secs(DEFAULT_HTTP_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_HTTP_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables. All keys are optional:
    ///
    /// - `DEJAMOO_BACKEND`: `http` (default) or `memory`
    /// - `DEJAMOO_API_URL`: backend base URL, trailing `/` trimmed
    /// - `VOTE_RADIUS_M`, `DROP_RADIUS_M`: meters, default 150
    /// - `DEFAULT_ZOOM` (17), `DROP_ZOOM` (18), `MIN_DROP_ZOOM` (17)
    /// - `EXPIRY_TICK_MS` (1000), `HOVER_REVERT_MS` (2000)
    /// - `HTTP_REQUEST_TIMEOUT_SECS` (30), `HTTP_CONNECT_TIMEOUT_SECS` (10)
    ///
    /// Unparsable numbers fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBackend` for an unrecognized `DEJAMOO_BACKEND`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = parse_backend(std::env::var("DEJAMOO_BACKEND").ok().as_deref())?;
        let api_base_url = std::env::var("DEJAMOO_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();

        Ok(Self {
            backend,
            api_base_url,
            vote_radius_m: env_parse("VOTE_RADIUS_M", DEFAULT_VOTE_RADIUS_M),
            drop_radius_m: env_parse("DROP_RADIUS_M", DEFAULT_DROP_RADIUS_M),
            default_zoom: env_parse("DEFAULT_ZOOM", DEFAULT_ZOOM),
            drop_zoom: env_parse("DROP_ZOOM", DEFAULT_DROP_ZOOM),
            min_drop_zoom: env_parse("MIN_DROP_ZOOM", DEFAULT_MIN_DROP_ZOOM),
            expiry_tick: Duration::from_millis(env_parse("EXPIRY_TICK_MS", DEFAULT_EXPIRY_TICK_MS)),
            hover_revert: Duration::from_millis(env_parse("HOVER_REVERT_MS", DEFAULT_HOVER_REVERT_MS)),
            request_timeout: Duration::from_secs(env_parse(
                "HTTP_REQUEST_TIMEOUT_SECS",
                DEFAULT_HTTP_REQUEST_TIMEOUT_SECS,
            )),
            connect_timeout: Duration::from_secs(env_parse(
                "HTTP_CONNECT_TIMEOUT_SECS",
                DEFAULT_HTTP_CONNECT_TIMEOUT_SECS,
            )),
        })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_backend(raw: Option<&str>) -> Result<BackendKind, ConfigError> {
    match raw.unwrap_or("http") {
        "http" => Ok(BackendKind::Http),
        "memory" => Ok(BackendKind::Memory),
        other => Err(ConfigError::UnknownBackend(other.to_owned())),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
