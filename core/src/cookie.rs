//! `Set-Cookie` parsing and `Cookie` header encoding.
//!
//! A `Set-Cookie` value is split on `"; "`. The first segment is always the
//! `name=value` pair; later segments only ever set attributes, so a stray
//! `Max-Age=60` can never replace the cookie's own name or value.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc2822;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use url::form_urlencoded;

/// One parsed `Set-Cookie` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Expiry as seconds since the Unix epoch.
    pub expires: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
}

impl SetCookie {
    /// Parse a `Set-Cookie` header value.
    ///
    /// Returns `None` when the leading segment is not a `name=value` pair or
    /// the name is empty.
    pub fn parse(line: &str) -> Option<SetCookie> {
        let mut segments = line.split("; ");
        let (name, value) = segments.next()?.split_once('=')?;
        let name = url_decode(name.trim());
        if name.is_empty() {
            return None;
        }

        let mut cookie = SetCookie {
            name,
            value: url_decode(strip_quotes(value.trim())),
            path: None,
            domain: None,
            expires: None,
            secure: false,
            http_only: false,
        };

        for segment in segments {
            let segment = segment.trim();
            match segment.split_once('=') {
                Some((key, value)) => {
                    let key = key.trim();
                    if key.eq_ignore_ascii_case("path") {
                        cookie.path = Some(value.to_string());
                    } else if key.eq_ignore_ascii_case("domain") {
                        cookie.domain = Some(value.to_string());
                    } else if key.eq_ignore_ascii_case("expires") {
                        cookie.expires = parse_cookie_date(value);
                    }
                }
                None => {
                    if segment.eq_ignore_ascii_case("httponly") {
                        cookie.http_only = true;
                    } else if segment.eq_ignore_ascii_case("secure") {
                        cookie.secure = true;
                    }
                }
            }
        }

        Some(cookie)
    }

    /// True if `Expires` lies at or before `now` (seconds since the epoch).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires.is_some_and(|t| t <= now)
    }
}

/// Build a `Cookie` header value: `name=value` pairs joined by `"; "`, each
/// value form-urlencoded.
pub fn cookie_header<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| format!("{name}={}", url_encode(value)))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Form-urlencode a single value (spaces become `+`).
pub fn url_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Inverse of `url_encode`: `+` becomes a space, `%XX` escapes are decoded.
/// Invalid UTF-8 is replaced rather than rejected.
pub fn url_decode(value: &str) -> String {
    let plus_decoded = value.replace('+', " ");
    percent_decode_str(&plus_decoded).decode_utf8_lossy().into_owned()
}

/// Strip exactly one pair of surrounding double quotes.
fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

const LEGACY_DATE_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!(
        "[weekday repr:short], [day]-[month repr:short]-[year] [hour]:[minute]:[second] GMT"
    ),
    format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    ),
];

/// Parse an `Expires` attribute into seconds since the epoch.
pub fn parse_cookie_date(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(dt) = OffsetDateTime::parse(value, &Rfc2822) {
        return Some(dt.unix_timestamp());
    }
    LEGACY_DATE_FORMATS.iter().find_map(|fmt| {
        let dt = PrimitiveDateTime::parse(value, *fmt).ok()?;
        Some(dt.assume_utc().unix_timestamp())
    })
}
