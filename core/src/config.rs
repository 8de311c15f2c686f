//! Client-wide defaults for timeouts, user agent and TLS checks.
//!
//! `ClientConfig` seeds every new `RequestSpec`. It can be deserialized from
//! JSON, with durations given in whole seconds:
//!
//! ```
//! let config = lazy_http::ClientConfig::from_json(r#"{"total_timeout": 5}"#).unwrap();
//! assert_eq!(config.total_timeout.as_secs(), 5);
//! assert_eq!(config.user_agent, "HttpClient");
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{HttpError, Result};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = "HttpClient";
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[serde(deserialize_with = "seconds")]
    pub connect_timeout: Duration,
    #[serde(deserialize_with = "seconds")]
    pub total_timeout: Duration,
    pub user_agent: String,
    /// Setting this to `false` turns off certificate and host name
    /// verification for `https` URLs, for self-signed or test endpoints.
    pub verify_tls: bool,
    pub max_redirects: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            verify_tls: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl ClientConfig {
    /// Parse a JSON object; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| HttpError::InvalidArgument(format!("bad client config: {e}")))
    }
}

fn seconds<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_secs)
}
