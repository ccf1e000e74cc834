use crate::model::{RelayError, Result};
use clap::{Parser, ValueEnum};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::sync::Semaphore;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
/// Largest outbound queue a tokio channel can hold.
pub const MAX_QUEUE_CAPACITY: usize = Semaphore::MAX_PERMITS;
pub const DEFAULT_JAEGER_ENDPOINT: &str = "http://jaeger:14268/api/traces";

/// What the hub does when a subscriber's outbound queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SlowConsumerPolicy {
    /// Discard the event for that subscriber only.
    #[default]
    Drop,
    /// Evict the subscriber, which closes its session.
    Disconnect,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "cursor-relay")]
#[command(version, about = "Relay live cursor positions between browser clients")]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to bind
    #[arg(short = 'p', long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Capacity of each client's outbound queue
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Policy applied to clients whose outbound queue is full
    #[arg(long, env = "SLOW_CONSUMER", value_enum, default_value_t = SlowConsumerPolicy::Drop)]
    pub slow_consumer: SlowConsumerPolicy,

    /// Echo events back to the client that caused them
    #[arg(long, env = "INCLUDE_SENDER")]
    pub include_sender: bool,

    /// Close connections that stay silent this long (0 disables)
    #[arg(long, env = "IDLE_TIMEOUT_SECS", default_value_t = 0)]
    pub idle_timeout_secs: u64,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    /// Export spans to Jaeger (requires the `telemetry` feature)
    #[arg(long, env = "ENABLE_TELEMETRY")]
    pub telemetry: bool,

    /// Jaeger collector endpoint
    #[arg(long, env = "JAEGER_ENDPOINT", default_value = DEFAULT_JAEGER_ENDPOINT)]
    pub jaeger_endpoint: String,
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            slow_consumer: SlowConsumerPolicy::Drop,
            include_sender: false,
            idle_timeout_secs: 0,
            log_json: false,
            telemetry: false,
            jaeger_endpoint: DEFAULT_JAEGER_ENDPOINT.to_string(),
        }
    }

    /// Parses command line arguments, falling back to environment variables.
    pub fn from_args() -> Result<Self> {
        Self::parse().validated()
    }

    pub fn validated(self) -> Result<Self> {
        if self.queue_capacity == 0 {
            return Err(RelayError::InvalidConfig(
                "queue capacity must be greater than zero".to_string(),
            ));
        }
        if self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(RelayError::InvalidConfig(format!(
                "queue capacity must not exceed {MAX_QUEUE_CAPACITY}"
            )));
        }
        Ok(self)
    }

    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
