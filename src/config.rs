use std::path::PathBuf;

use crate::retry::Backoff;

pub const DEFAULT_BROKER_URL: &str = "http://bgproutes.io:7000/broker/broker";
pub const DEFAULT_TMP_DIR: &str = "/tmp/gillstream";

/// Settings for a [GillStream](crate::GillStream).
///
/// ```
/// use gillstream::{Backoff, StreamConfig};
/// use std::time::Duration;
///
/// let config = StreamConfig::default()
///     .with_broker_url("http://localhost:7000/broker")
///     .with_tmp_dir("/var/tmp/gill")
///     .with_fetch_backoff(Backoff::new(Duration::from_secs(1), Duration::from_secs(4)));
/// assert_eq!(config.fetch_backoff.attempts(), 3);
/// assert_eq!(config.broker_backoff.attempts(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub broker_url: String,
    pub tmp_dir: PathBuf,
    pub broker_backoff: Backoff,
    pub fetch_backoff: Backoff,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            broker_url: DEFAULT_BROKER_URL.to_string(),
            tmp_dir: PathBuf::from(DEFAULT_TMP_DIR),
            broker_backoff: Backoff::broker(),
            fetch_backoff: Backoff::fetch(),
        }
    }
}

impl StreamConfig {
    /// Defaults, with `GILLSTREAM_BROKER_URL` and `GILLSTREAM_TMP_DIR` applied when set.
    pub fn from_env() -> StreamConfig {
        let mut config = StreamConfig::default();
        if let Ok(url) = std::env::var("GILLSTREAM_BROKER_URL") {
            config.broker_url = url;
        }
        if let Ok(dir) = std::env::var("GILLSTREAM_TMP_DIR") {
            config.tmp_dir = PathBuf::from(dir);
        }
        config
    }

    pub fn with_broker_url(self, broker_url: impl Into<String>) -> StreamConfig {
        StreamConfig {
            broker_url: broker_url.into(),
            ..self
        }
    }

    pub fn with_tmp_dir(self, tmp_dir: impl Into<PathBuf>) -> StreamConfig {
        StreamConfig {
            tmp_dir: tmp_dir.into(),
            ..self
        }
    }

    pub fn with_broker_backoff(self, broker_backoff: Backoff) -> StreamConfig {
        StreamConfig {
            broker_backoff,
            ..self
        }
    }

    pub fn with_fetch_backoff(self, fetch_backoff: Backoff) -> StreamConfig {
        StreamConfig {
            fetch_backoff,
            ..self
        }
    }
}
