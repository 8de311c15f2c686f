//! Single-request HTTP client with lazy execution.
//!
//! # Overview
//! A `RequestSpec` collects URL, method, headers, cookies, params, uploads,
//! auth and timeouts. `HttpClient` performs the transfer the first time any
//! result is asked for, then serves status, headers, cookies and body from a
//! cache until `reset` is called.
//!
//! ```no_run
//! use lazy_http::{HttpClient, RequestSpec};
//!
//! let spec = RequestSpec::get("https://example.com/search").param("q", "rust");
//! let mut client = HttpClient::new(spec);
//! let status = client.status_code()?;
//! let cookies = client.cookies()?;
//! # Ok::<(), lazy_http::HttpError>(())
//! ```
//!
//! # Design
//! - Request assembly (`executor::assemble`) and response decoding
//!   (`decode::decode_response`) are pure functions over plain data, so both
//!   are tested without a network.
//! - The transfer goes through the `Transport` trait; `UreqTransport` is the
//!   blocking default. A transport returns the header block and body in one
//!   buffer plus the header block's length, and the decoder splits on that.
//!   Redirects are followed by `executor::execute`, one exchange per hop.
//! - `executor::execute` can be used directly when no caching is wanted.
//! - Certificate checks stay on unless `verify_tls(false)` is set.

pub mod client;
pub mod config;
pub mod cookie;
pub mod decode;
pub mod error;
pub mod executor;
pub mod http;
pub mod jar;
pub mod multipart;
pub mod request;
pub mod transport;

pub use client::HttpClient;
pub use config::ClientConfig;
pub use cookie::SetCookie;
pub use decode::DecodedResponse;
pub use error::{HttpError, Result, TransportErrorKind};
pub use executor::{execute, Response, Transport};
pub use crate::http::{HttpMethod, RawResponse, TransferOptions, WireBody, WireRequest};
pub use jar::CookieJar;
pub use multipart::MultipartForm;
pub use request::RequestSpec;
pub use transport::UreqTransport;
