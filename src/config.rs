use once_cell::sync::Lazy;

#[derive(Debug)]
pub struct Config {
    pub log_1e_payloads: bool,
    pub melsec1e_dump_on_error: bool,
    pub melsec1e_linger_ms: u64,
}

impl Config {
    fn from_env() -> Self {
        let log_1e_payloads = std::env::var("LOG_1E_PAYLOADS")
            .map(|v| v == "1")
            .unwrap_or(false);
        let melsec1e_dump_on_error = std::env::var("MELSEC1E_DUMP_ON_ERROR")
            .map(|v| v == "1")
            .unwrap_or(false);
        let melsec1e_linger_ms = std::env::var("MELSEC1E_LINGER_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(200u64);
        Self {
            log_1e_payloads,
            melsec1e_dump_on_error,
            melsec1e_linger_ms,
        }
    }
}

/// Global config loaded once from environment at first access.
pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

/// Convenience accessor
pub fn config() -> &'static Config {
    &GLOBAL_CONFIG
}
