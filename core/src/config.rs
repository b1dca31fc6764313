//! Per-client timeout configuration.
//!
//! # Design
//! Invalid values never fail construction: a non-positive timeout falls
//! back to `DEFAULT_TIMEOUT_MS`. The same rule applies when the config is
//! deserialized from a host application's settings file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connect and read timeout used when none (or a non-positive one) is given.
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Immutable timeouts applied to every call made by one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawClientConfig", into = "RawClientConfig")]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl ClientConfig {
    pub fn new(connect_timeout_ms: i64, read_timeout_ms: i64) -> Self {
        Self {
            connect_timeout: timeout_or_default(connect_timeout_ms),
            read_timeout: timeout_or_default(read_timeout_ms),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            read_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

fn timeout_or_default(ms: i64) -> Duration {
    match u64::try_from(ms) {
        Ok(ms) if ms > 0 => Duration::from_millis(ms),
        _ => Duration::from_millis(DEFAULT_TIMEOUT_MS),
    }
}

/// Wire shape of `ClientConfig`: plain millisecond counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawClientConfig {
    #[serde(default)]
    connect_timeout_ms: i64,
    #[serde(default)]
    read_timeout_ms: i64,
}

impl From<RawClientConfig> for ClientConfig {
    fn from(raw: RawClientConfig) -> Self {
        ClientConfig::new(raw.connect_timeout_ms, raw.read_timeout_ms)
    }
}

impl From<ClientConfig> for RawClientConfig {
    fn from(config: ClientConfig) -> Self {
        Self {
            connect_timeout_ms: duration_ms(config.connect_timeout),
            read_timeout_ms: duration_ms(config.read_timeout),
        }
    }
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
