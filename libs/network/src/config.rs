//! Remote Configuration

use lattice_actors::Props;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_RETRY_BACKOFF_FACTOR: u32 = 2;
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for one node's remote layer.
#[derive(Clone)]
pub struct RemoteConfig {
    /// Interface to bind the listener on.
    pub host: String,
    /// Port to bind; 0 picks any free port.
    pub port: u16,
    /// Hostname reported to peers, when it differs from `host`.
    pub advertised_host: Option<String>,
    /// Port reported to peers, when it differs from the bound port.
    pub advertised_port: Option<u16>,
    /// Max user messages coalesced into one wire frame.
    pub endpoint_writer_batch_size: usize,
    /// Connection attempts after the first before an endpoint gives up.
    pub max_retries: u32,
    /// Delay before the first reconnection attempt.
    pub retry_interval: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub retry_backoff_factor: u32,
    /// Upper bound on a single wire frame.
    pub max_frame_size: usize,
    pub connect_timeout: Duration,
    kinds: HashMap<String, Props>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            advertised_host: None,
            advertised_port: None,
            endpoint_writer_batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            retry_backoff_factor: DEFAULT_RETRY_BACKOFF_FACTOR,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            kinds: HashMap::new(),
        }
    }
}

impl RemoteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_advertised(mut self, host: impl Into<String>, port: u16) -> Self {
        self.advertised_host = Some(host.into());
        self.advertised_port = Some(port);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.endpoint_writer_batch_size = batch_size;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_retry_backoff_factor(mut self, factor: u32) -> Self {
        self.retry_backoff_factor = factor;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Register a named actor template for remote spawn.
    pub fn with_kind(mut self, kind: impl Into<String>, props: Props) -> Self {
        self.kinds.insert(kind.into(), props);
        self
    }

    pub fn kind(&self, kind: &str) -> Option<&Props> {
        self.kinds.get(kind)
    }

    pub fn known_kinds(&self) -> Vec<&str> {
        self.kinds.keys().map(String::as_str).collect()
    }

    /// Address the listener binds on.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Address reported to peers, given the actually bound port.
    pub fn advertised_address(&self, bound_port: u16) -> String {
        let host = self.advertised_host.as_deref().unwrap_or(&self.host);
        let port = self.advertised_port.unwrap_or(bound_port);
        format!("{host}:{port}")
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("advertised_host", &self.advertised_host)
            .field("advertised_port", &self.advertised_port)
            .field("endpoint_writer_batch_size", &self.endpoint_writer_batch_size)
            .field("max_retries", &self.max_retries)
            .field("retry_interval", &self.retry_interval)
            .field("retry_backoff_factor", &self.retry_backoff_factor)
            .field("max_frame_size", &self.max_frame_size)
            .field("connect_timeout", &self.connect_timeout)
            .field("kinds", &self.kinds.keys().collect::<Vec<_>>())
            .finish()
    }
}
