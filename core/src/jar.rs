//! JSON cookie jar shared between requests through a file path.
//!
//! Cookies are bucketed by origin (`scheme://host:port`). On send, a cookie
//! is offered when its domain, path and `Secure` flag match the request URL
//! and it has not expired. On receipt, each `Set-Cookie` replaces any stored
//! cookie with the same name in that origin; one that is already expired
//! deletes it instead.
//!
//! The file is read and rewritten whole, without locking. Two clients using
//! the same path at the same time can lose each other's updates.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cookie::SetCookie;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieJar {
    entries: HashMap<String, Vec<SetCookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a jar from `path`. A missing file is an empty jar; so is one that
    /// does not parse, with a warning logged.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&contents) {
            Ok(jar) => Ok(jar),
            Err(e) => {
                warn!("ignoring unreadable cookie jar {}: {e}", path.display());
                Ok(Self::new())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;
        debug!("saved cookie jar to {}", path.display());
        Ok(())
    }

    /// Name/value pairs to send to `url` at time `now` (seconds since the epoch).
    pub fn request_cookies(&self, url: &Url, now: i64) -> Vec<(String, String)> {
        let Some(bucket) = self.entries.get(&origin_key(url)) else {
            return Vec::new();
        };
        let host = url.host_str().unwrap_or_default();
        let path = url.path();
        let is_https = url.scheme() == "https";

        bucket
            .iter()
            .filter(|c| !c.is_expired_at(now))
            .filter(|c| match &c.domain {
                Some(domain) => {
                    let domain = domain.trim_start_matches('.');
                    host == domain || host.ends_with(&format!(".{domain}"))
                }
                None => true,
            })
            .filter(|c| c.path.as_deref().map_or(true, |p| path.starts_with(p)))
            .filter(|c| !c.secure || is_https)
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect()
    }

    /// Record cookies received from `url` at time `now`.
    pub fn store(&mut self, url: &Url, cookies: &[SetCookie], now: i64) {
        if cookies.is_empty() {
            return;
        }
        let default_path = default_path(url);
        let bucket = self.entries.entry(origin_key(url)).or_default();

        for cookie in cookies {
            bucket.retain(|c| c.name != cookie.name);
            if cookie.is_expired_at(now) {
                continue;
            }
            let mut cookie = cookie.clone();
            if cookie.path.is_none() {
                cookie.path = Some(default_path.clone());
            }
            bucket.push(cookie);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn origin_key(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Directory of the request path, as RFC 6265 uses for cookies without `Path`.
fn default_path(url: &Url) -> String {
    match url.path().rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir.to_string(),
        _ => "/".to_string(),
    }
}

pub(crate) fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
