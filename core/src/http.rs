//! Wire-level request and response types.
//!
//! # Design
//! These types describe one HTTP transfer as plain data. `executor::assemble`
//! turns a `RequestSpec` into a `WireRequest`; a `Transport` performs it and
//! hands back a `RawResponse` holding the header block and the body in one
//! buffer, together with the byte length of the header block. Keeping the
//! boundary as data lets the assembly and decoding logic be tested without a
//! network.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::HttpError;
use crate::multipart::MultipartForm;

/// The five methods this client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = HttpError;

    /// Case-insensitive. Anything outside the five supported methods is an
    /// `InvalidArgument`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(HttpError::InvalidArgument(format!(
                "unsupported HTTP method {s:?}, expected one of GET, POST, PUT, PATCH, DELETE"
            ))),
        }
    }
}

impl From<HttpMethod> for http::Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Patch => http::Method::PATCH,
            HttpMethod::Delete => http::Method::DELETE,
        }
    }
}

/// Payload of a `WireRequest`.
#[derive(Debug, Clone, Default)]
pub enum WireBody {
    #[default]
    Empty,
    /// Sent verbatim.
    Raw(Vec<u8>),
    /// Fields and files encoded as `multipart/form-data` while sending.
    Multipart(MultipartForm),
}

/// Transfer limits and switches handed to the transport along with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
    /// When false, certificate and host name checks are skipped for `https`.
    pub verify_tls: bool,
    /// Capture a verbose trace of the exchange.
    pub verbose: bool,
}

/// A fully assembled HTTP request.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: HttpMethod,
    /// Final URL, query string included.
    pub url: String,
    /// Sent in order; names are kept as supplied.
    pub headers: Vec<(String, String)>,
    pub body: WireBody,
    pub options: TransferOptions,
}

impl WireRequest {
    /// First header whose name matches `name`, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw output of one transfer.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Length in bytes of the header block at the start of `raw`, including
    /// the terminating blank line.
    pub header_size: usize,
    /// Header block immediately followed by the body.
    pub raw: Vec<u8>,
    /// Verbose trace, present when `TransferOptions::verbose` was set.
    pub trace: Option<String>,
}
