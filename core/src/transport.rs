//! Blocking transport backed by `ureq`.
//!
//! `ureq` hands back parsed parts, so the header block is rebuilt here in
//! HTTP/1.1 form (status line, one line per header value, blank line) and the
//! body appended after it. The reported `header_size` is the length of that
//! block. Header names come out lowercase because `http::HeaderMap`
//! normalizes them. Each call is a single exchange: redirects come back as
//! 3xx responses and `executor::execute` follows them.

use std::io::Read as _;

use log::trace;
use ureq::tls::TlsConfig;
use ureq::SendBody;

use crate::error::{HttpError, Result, TransportErrorKind};
use crate::http::{RawResponse, TransferOptions, WireBody, WireRequest};
use crate::executor::Transport;

/// The default `Transport`: one `ureq` agent per transfer, configured from
/// the request's `TransferOptions`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }

    fn agent(options: &TransferOptions) -> ureq::Agent {
        let tls = TlsConfig::builder()
            .disable_verification(!options.verify_tls)
            .build();
        ureq::Agent::config_builder()
            .timeout_connect(Some(options.connect_timeout))
            .timeout_global(Some(options.total_timeout))
            .max_redirects(0)
            .max_redirects_will_error(false)
            // Status codes are data here, not errors.
            .http_status_as_error(false)
            .tls_config(tls)
            .build()
            .new_agent()
    }
}

impl Transport for UreqTransport {
    fn perform(&self, request: WireRequest) -> Result<RawResponse> {
        let agent = Self::agent(&request.options);
        let mut trace = request.options.verbose.then(String::new);

        if let Some(t) = trace.as_mut() {
            trace_line(t, '>', &format!("{} {}", request.method, request.url));
            for (name, value) in &request.headers {
                trace_line(t, '>', &format!("{name}: {value}"));
            }
        }

        let mut builder = http::Request::builder()
            .method(http::Method::from(request.method))
            .uri(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let result = match request.body {
            WireBody::Empty => agent.run(builder.body(()).map_err(invalid_request)?),
            WireBody::Raw(bytes) => {
                if let Some(t) = trace.as_mut() {
                    trace_line(t, '>', &format!("[{} byte body]", bytes.len()));
                }
                agent.run(builder.body(bytes).map_err(invalid_request)?)
            }
            WireBody::Multipart(form) => {
                if let Some(t) = trace.as_mut() {
                    trace_line(t, '>', &format!("[multipart body, boundary {}]", form.boundary()));
                }
                let reader = form
                    .reader()
                    .map_err(|e| HttpError::transport(TransportErrorKind::Io, e.to_string()))?;
                let body = SendBody::from_owned_reader(reader);
                agent.run(builder.body(body).map_err(invalid_request)?)
            }
        };

        let response = result.map_err(map_ureq_error)?;
        let (parts, body) = response.into_parts();

        let mut head = format!(
            "{:?} {} {}\r\n",
            parts.version,
            parts.status.as_u16(),
            parts.status.canonical_reason().unwrap_or("")
        );
        for (name, value) in &parts.headers {
            head.push_str(&format!(
                "{}: {}\r\n",
                name,
                String::from_utf8_lossy(value.as_bytes())
            ));
        }
        head.push_str("\r\n");

        if let Some(t) = trace.as_mut() {
            for line in head.lines().filter(|l| !l.is_empty()) {
                trace_line(t, '<', line);
            }
        }

        let header_size = head.len();
        let mut raw = head.into_bytes();
        body.into_reader()
            .read_to_end(&mut raw)
            .map_err(|e| HttpError::transport(TransportErrorKind::Io, e.to_string()))?;

        Ok(RawResponse {
            status: parts.status.as_u16(),
            header_size,
            raw,
            trace,
        })
    }
}

fn trace_line(buf: &mut String, direction: char, line: &str) {
    trace!("{direction} {line}");
    buf.push(direction);
    buf.push(' ');
    buf.push_str(line);
    buf.push('\n');
}

fn invalid_request(e: http::Error) -> HttpError {
    HttpError::transport(TransportErrorKind::Protocol, format!("malformed request: {e}"))
}

fn map_ureq_error(e: ureq::Error) -> HttpError {
    match e {
        ureq::Error::Timeout(t) => {
            HttpError::transport(TransportErrorKind::Timeout, format!("timed out ({t:?})"))
        }
        ureq::Error::HostNotFound => {
            HttpError::transport(TransportErrorKind::HostNotFound, "host not found")
        }
        ureq::Error::ConnectionFailed => {
            HttpError::transport(TransportErrorKind::Connection, "connection failed")
        }
        ureq::Error::Io(e) => HttpError::transport(TransportErrorKind::Io, e.to_string()),
        other => {
            let message = other.to_string();
            let lower = message.to_ascii_lowercase();
            let kind = if lower.contains("tls") || lower.contains("certificate") {
                TransportErrorKind::Tls
            } else {
                TransportErrorKind::Other
            };
            HttpError::transport(kind, message)
        }
    }
}
