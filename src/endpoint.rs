use std::time::Duration;

/// Represents a connection target (PLC Ethernet adapter) including address,
/// per-command read deadline and the connect retry policy.
///
/// All parameters are supplied at construction and stay fixed for the life
/// of a client instance.
#[derive(Clone, Debug)]
pub struct ConnectionTarget {
    /// TCP address as "host:port"
    pub ip: String,
    pub port: u16,
    pub addr: String,
    /// Read deadline applied per command (first response chunk).
    pub timeout: Duration,
    /// Deadline for a single connect attempt.
    pub connect_timeout: Duration,
    /// How many connect attempts before giving up.
    pub connect_retries: u32,
    /// Fixed pause between connect attempts.
    pub connect_backoff: Duration,
}

const DEFAULT_IP: &str = "127.0.0.1";
// FX3U-ENET-L factory port for the ASCII channel
const DEFAULT_PORT: u16 = 1027;
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1500);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(2000);
const DEFAULT_CONNECT_RETRIES: u32 = 3;
const DEFAULT_CONNECT_BACKOFF: Duration = Duration::from_millis(50);

impl ConnectionTarget {
    /// Create a new `ConnectionTarget` with default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ip: DEFAULT_IP.to_string(),
            port: DEFAULT_PORT,
            addr: format!("{DEFAULT_IP}:{DEFAULT_PORT}"),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            connect_retries: DEFAULT_CONNECT_RETRIES,
            connect_backoff: DEFAULT_CONNECT_BACKOFF,
        }
    }
    #[must_use]
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = ip.into();
        self.addr = format!(
            "{self_ip}:{self_port}",
            self_ip = self.ip,
            self_port = self.port
        );
        self
    }
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self.addr = format!(
            "{self_ip}:{self_port}",
            self_ip = self.ip,
            self_port = self.port
        );
        self
    }
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
    #[must_use]
    pub const fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
    #[must_use]
    pub const fn with_connect_retries(mut self, connect_retries: u32) -> Self {
        self.connect_retries = connect_retries;
        self
    }
    #[must_use]
    pub const fn with_connect_backoff(mut self, connect_backoff: Duration) -> Self {
        self.connect_backoff = connect_backoff;
        self
    }
    #[must_use]
    pub const fn build(self) -> Self {
        self
    }
    /// Create a direct-connection target with default timeouts.
    #[must_use]
    pub fn direct(ip: impl Into<String>, port: u16) -> Self {
        Self::new().with_ip(ip).with_port(port)
    }
}
impl Default for ConnectionTarget {
    fn default() -> Self {
        Self::new()
    }
}
