//! Turning a `RequestSpec` into one transfer and its decoded result.
//!
//! # Design
//! `assemble` is a pure function from spec to `WireRequest`, applying in
//! order: verbose tracing, TLS verification, basic auth, custom headers, the
//! `Cookie` header, then the query string (GET) or payload (everything
//! else). `execute` wraps it with the cookie jar, the `Transport` call and
//! the decoder. The transport is a trait so the lazy client can be driven by
//! a fake in tests.
//!
//! A transport performs one exchange. `execute` follows 301, 302, 303, 307
//! and 308 responses itself, up to `ClientConfig::max_redirects` hops, so
//! every hop's `Set-Cookie` lines reach the jar and the jar's cookies go out
//! on every hop. Hop header blocks are stacked in front of the final
//! response, which the decoder then discards.

use std::path::Path;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use url::{form_urlencoded, Url};

use crate::cookie::cookie_header;
use crate::decode::{decode_response, DecodedResponse};
use crate::error::{HttpError, Result, TransportErrorKind};
use crate::http::{HttpMethod, RawResponse, TransferOptions, WireBody, WireRequest};
use crate::jar::{self, CookieJar};
use crate::multipart::MultipartForm;
use crate::request::RequestSpec;

/// Performs a single blocking HTTP exchange. Redirect responses are returned
/// as they are, not followed.
pub trait Transport: Send + Sync {
    fn perform(&self, request: WireRequest) -> Result<RawResponse>;
}

/// Outcome of one successful transfer.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    /// Header block followed by body, exactly as the transport produced it.
    pub raw: Vec<u8>,
    pub header_size: usize,
    pub decoded: DecodedResponse,
    pub trace: Option<String>,
}

impl Response {
    pub fn from_raw(raw: RawResponse) -> Self {
        let decoded = decode_response(&raw.raw, raw.header_size);
        Self {
            status: raw.status,
            raw: raw.raw,
            header_size: raw.header_size,
            decoded,
            trace: raw.trace,
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.decoded.body
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        self.json_as()
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(self.body()).map_err(|e| HttpError::Decode(e.to_string()))
    }

    /// Write the body verbatim to `path`, returning the number of bytes written.
    pub fn save_body(&self, path: &Path) -> Result<usize> {
        std::fs::write(path, self.body())?;
        Ok(self.body().len())
    }
}

/// Build the wire request for `spec`. `jar_cookies` are sent before the
/// spec's own cookies, which win on a name clash.
pub fn assemble(spec: &RequestSpec, jar_cookies: &[(String, String)]) -> Result<WireRequest> {
    let is_https = spec.url.starts_with("https://");
    if is_https && !spec.config.verify_tls {
        warn!("TLS certificate and host verification disabled for {}", spec.url);
    }

    let options = TransferOptions {
        connect_timeout: spec.config.connect_timeout,
        total_timeout: spec.config.total_timeout,
        verify_tls: spec.config.verify_tls,
        verbose: spec.debug,
    };

    let mut headers = Vec::new();
    if !spec.headers.keys().any(|k| k.eq_ignore_ascii_case("user-agent")) {
        headers.push(("User-Agent".to_string(), spec.config.user_agent.clone()));
    }
    if let Some((user, pass)) = &spec.basic_auth {
        let credentials = STANDARD.encode(format!("{user}:{pass}"));
        headers.push(("Authorization".to_string(), format!("Basic {credentials}")));
    }
    headers.extend(spec.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

    let mut cookies: Vec<(&str, &str)> = jar_cookies
        .iter()
        .filter(|(name, _)| !spec.cookies.contains_key(name))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    cookies.extend(spec.cookies.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    if !cookies.is_empty() {
        headers.push(("Cookie".to_string(), cookie_header(cookies)));
    }

    let mut url = spec.url.clone();
    let body = if spec.method == HttpMethod::Get {
        if !spec.params.is_empty() {
            append_query(&mut url, &encode_params(spec));
        }
        WireBody::Empty
    } else if let Some(raw) = &spec.body {
        WireBody::Raw(raw.clone())
    } else if spec.params.is_empty() && spec.files.is_empty() {
        WireBody::Empty
    } else {
        let form = spec
            .params
            .iter()
            .fold(MultipartForm::new(), |form, (k, v)| form.field(k.clone(), v.clone()));
        let form = spec
            .files
            .iter()
            .fold(form, |form, (k, path)| form.file(k.clone(), path.clone()));
        headers.push(("Content-Type".to_string(), form.content_type()));
        WireBody::Multipart(form)
    };

    Ok(WireRequest {
        method: spec.method,
        url,
        headers,
        body,
        options,
    })
}

/// Run `spec` through `transport`, following redirects, with cookie jar
/// handling if configured.
///
/// Only transport failures are errors once the first exchange is under way.
/// A jar that cannot be written is logged and the response still returned.
pub fn execute(spec: &RequestSpec, transport: &dyn Transport) -> Result<Response> {
    let mut jar = match &spec.cookie_jar {
        Some(path) => Some(CookieJar::load(path)?),
        None => None,
    };

    let started = Instant::now();
    let mut hop = spec.clone();
    let mut stacked = Vec::new();
    let mut trace: Option<String> = None;
    let mut redirects = 0;

    let last = loop {
        let hop_url = Url::parse(&hop.url).ok();
        let jar_cookies = match (&jar, &hop_url) {
            (Some(jar), Some(url)) => jar.request_cookies(url, jar::now()),
            _ => Vec::new(),
        };

        let mut request = assemble(&hop, &jar_cookies)?;
        request.options.total_timeout = remaining(spec.config.total_timeout, started)?;
        debug!("executing {} {}", request.method, request.url);

        let raw = transport.perform(request)?;
        if let Some(t) = &raw.trace {
            trace.get_or_insert_with(String::new).push_str(t);
        }

        let head = decode_response(&raw.raw, raw.header_size);
        if let (Some(jar), Some(url)) = (jar.as_mut(), &hop_url) {
            jar.store(url, &head.cookies, jar::now());
        }

        let Some(target) = redirect_target(raw.status, &head, hop_url.as_ref()) else {
            break raw;
        };
        if spec.config.max_redirects == 0 {
            break raw;
        }
        if redirects == spec.config.max_redirects {
            return Err(HttpError::transport(
                TransportErrorKind::Protocol,
                format!("too many redirects (max {})", spec.config.max_redirects),
            ));
        }

        debug!("{} {} -> {} redirect to {target}", hop.method, hop.url, raw.status);
        stacked.extend_from_slice(&raw.raw[..raw.header_size.min(raw.raw.len())]);
        hop = redirected(&hop, raw.status, &target);
        redirects += 1;
    };

    let header_size = stacked.len() + last.header_size.min(last.raw.len());
    stacked.extend_from_slice(&last.raw);
    let response = Response::from_raw(RawResponse {
        status: last.status,
        header_size,
        raw: stacked,
        trace,
    });
    debug!(
        "{} {} -> {} ({} redirects, {} header bytes, {} body bytes)",
        spec.method,
        spec.url,
        response.status,
        redirects,
        response.header_size,
        response.body().len()
    );

    if let (Some(jar), Some(path)) = (&jar, &spec.cookie_jar) {
        if let Err(e) = jar.save(path) {
            warn!("could not save cookie jar {}: {e}", path.display());
        }
    }

    Ok(response)
}

/// Time left of the overall budget, shared by all hops.
fn remaining(total: Duration, started: Instant) -> Result<Duration> {
    total
        .checked_sub(started.elapsed())
        .filter(|left| !left.is_zero())
        .ok_or_else(|| {
            HttpError::transport(
                TransportErrorKind::Timeout,
                format!("timed out after {}s", total.as_secs()),
            )
        })
}

/// Absolute URL to follow, if `status` is a redirect carrying a usable `Location`.
fn redirect_target(status: u16, head: &DecodedResponse, from: Option<&Url>) -> Option<Url> {
    if !matches!(status, 301 | 302 | 303 | 307 | 308) {
        return None;
    }
    let location = head
        .headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("location"))
        .map(|(_, value)| value.trim())?;
    from?.join(location).ok()
}

/// The request to send to `target` after `hop` answered with `status`.
///
/// 301, 302 and 303 turn into a bare GET, as does any redirected GET (its
/// params are already in the first URL's query). 307 and 308 resend the
/// payload. Credentials are dropped when the host changes.
fn redirected(hop: &RequestSpec, status: u16, target: &Url) -> RequestSpec {
    let mut next = hop.clone();
    if hop.method == HttpMethod::Get || matches!(status, 301..=303) {
        next.method = HttpMethod::Get;
        next.body = None;
        next.params.clear();
        next.files.clear();
    }
    let same_host = Url::parse(&hop.url)
        .ok()
        .is_some_and(|from| from.host_str() == target.host_str());
    if !same_host {
        next.basic_auth = None;
    }
    next.url = target.to_string();
    next
}

fn encode_params(spec: &RequestSpec) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(spec.params.iter())
        .finish()
}

/// Append `query` with `&` when `url` already has a query, `?` otherwise.
fn append_query(url: &mut String, query: &str) {
    match url.find('?') {
        Some(pos) if pos + 1 == url.len() || url.ends_with('&') => {}
        Some(_) => url.push('&'),
        None => url.push('?'),
    }
    url.push_str(query);
}
