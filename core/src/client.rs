//! Lazy, cache-once HTTP client.
//!
//! # Design
//! `HttpClient` pairs a `RequestSpec` with an optional cached `Response`.
//! Every accessor runs the transfer if no response is cached yet, then reads
//! from the cache. A failed transfer caches nothing, so the caller can fix
//! the spec and ask again. `reset` drops the cache and keeps the spec; it is
//! the only way to send a second request through the same client. Clones
//! share the transport but never the cached response.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::cookie::SetCookie;
use crate::error::Result;
use crate::executor::{self, Response, Transport};
use crate::request::RequestSpec;
use crate::transport::UreqTransport;

pub struct HttpClient {
    spec: RequestSpec,
    transport: Arc<dyn Transport>,
    response: Option<Response>,
}

impl HttpClient {
    /// Client for `spec` using the default `ureq` transport.
    pub fn new(spec: RequestSpec) -> Self {
        Self::with_transport(spec, Arc::new(UreqTransport::new()))
    }

    /// Start from a URL and method name; the method is validated immediately.
    pub fn request(url: impl Into<String>, method: &str) -> Result<Self> {
        Ok(Self::new(RequestSpec::new(url, method)?))
    }

    pub fn with_transport(spec: RequestSpec, transport: Arc<dyn Transport>) -> Self {
        Self {
            spec,
            transport,
            response: None,
        }
    }

    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    /// Replace URL and method. Does not clear a cached response; call `reset`
    /// for the change to take effect on an executed client.
    pub fn set_url(&mut self, url: impl Into<String>, method: &str) -> Result<&mut Self> {
        self.configure(|spec| spec.set_url(url, method))
    }

    /// Rebuild the spec with `f`. On error the previous spec is kept.
    pub fn configure<F>(&mut self, f: F) -> Result<&mut Self>
    where
        F: FnOnce(RequestSpec) -> Result<RequestSpec>,
    {
        self.spec = f(self.spec.clone())?;
        Ok(self)
    }

    pub fn is_executed(&self) -> bool {
        self.response.is_some()
    }

    /// Perform the transfer unless a response is already cached.
    pub fn execute(&mut self) -> Result<&Response> {
        let response = match self.response.take() {
            Some(response) => response,
            None => executor::execute(&self.spec, self.transport.as_ref())?,
        };
        Ok(self.response.insert(response))
    }

    /// Forget the cached response. The spec is left as is.
    pub fn reset(&mut self) -> &mut Self {
        self.response = None;
        self
    }

    /// Header block and body exactly as received.
    pub fn raw_response(&mut self) -> Result<&[u8]> {
        Ok(&self.execute()?.raw)
    }

    pub fn status_code(&mut self) -> Result<u16> {
        Ok(self.execute()?.status)
    }

    pub fn status_line(&mut self) -> Result<Option<&str>> {
        Ok(self.execute()?.decoded.status_line.as_deref())
    }

    /// Response headers other than `Set-Cookie`; repeated names keep the last value.
    pub fn headers(&mut self) -> Result<&HashMap<String, String>> {
        Ok(&self.execute()?.decoded.headers)
    }

    /// Name to value for every cookie the response set.
    pub fn cookies(&mut self) -> Result<HashMap<String, String>> {
        Ok(self.execute()?.decoded.cookie_map())
    }

    /// Full `Set-Cookie` records, attributes included.
    pub fn set_cookies(&mut self) -> Result<&[SetCookie]> {
        Ok(&self.execute()?.decoded.cookies)
    }

    pub fn body(&mut self) -> Result<&[u8]> {
        Ok(self.execute()?.body())
    }

    pub fn text(&mut self) -> Result<String> {
        Ok(String::from_utf8_lossy(self.execute()?.body()).into_owned())
    }

    pub fn json(&mut self) -> Result<serde_json::Value> {
        self.execute()?.json()
    }

    pub fn json_as<T: DeserializeOwned>(&mut self) -> Result<T> {
        self.execute()?.json_as()
    }

    /// Write the body to `path`, returning the number of bytes written.
    pub fn save_body(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        self.execute()?.save_body(path.as_ref())
    }

    /// Verbose trace, if the spec had `debug` enabled.
    pub fn debug_trace(&mut self) -> Result<Option<&str>> {
        Ok(self.execute()?.trace.as_deref())
    }
}

impl Clone for HttpClient {
    /// The copy starts unexecuted.
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            transport: Arc::clone(&self.transport),
            response: None,
        }
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("spec", &self.spec)
            .field("executed", &self.is_executed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::{HttpError, TransportErrorKind};
    use crate::http::{RawResponse, WireRequest};

    const REPLY: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nSet-Cookie: k1=v1; Path=/\r\nSet-Cookie: k2=v2; HttpOnly\r\n\r\n{\"n\":1}";

    /// Counts calls; fails the first `failures` of them.
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
        failures: usize,
    }

    impl Transport for Counting {
        fn perform(&self, request: WireRequest) -> Result<RawResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(HttpError::Transport {
                    kind: TransportErrorKind::Connection,
                    message: format!("refused: {}", request.url),
                });
            }
            Ok(RawResponse {
                status: 200,
                header_size: REPLY.find("\r\n\r\n").unwrap() + 4,
                raw: REPLY.as_bytes().to_vec(),
                trace: None,
            })
        }
    }

    fn client(transport: &Arc<Counting>) -> HttpClient {
        HttpClient::with_transport(RequestSpec::get("http://h/"), transport.clone())
    }

    #[test]
    fn nothing_happens_until_first_access() {
        let transport = Arc::new(Counting::default());
        let c = client(&transport);
        assert!(!c.is_executed());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn accessors_share_one_transfer() {
        let transport = Arc::new(Counting::default());
        let mut c = client(&transport);

        assert_eq!(c.status_code().unwrap(), 200);
        assert_eq!(c.headers().unwrap()["Content-Type"], "application/json");
        assert_eq!(c.json().unwrap()["n"], 1);
        assert_eq!(c.body().unwrap(), b"{\"n\":1}");
        assert!(c.raw_response().unwrap().starts_with(b"HTTP/1.1 200 OK"));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(c.is_executed());
    }

    #[test]
    fn cookies_surface_name_and_value_only() {
        let transport = Arc::new(Counting::default());
        let mut c = client(&transport);

        let cookies = c.cookies().unwrap();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies["k1"], "v1");
        assert_eq!(cookies["k2"], "v2");
        assert!(!c.headers().unwrap().contains_key("Set-Cookie"));

        let records = c.set_cookies().unwrap();
        assert_eq!(records[0].path.as_deref(), Some("/"));
        assert!(records[1].http_only);
    }

    #[test]
    fn reset_forces_a_new_transfer() {
        let transport = Arc::new(Counting::default());
        let mut c = client(&transport);

        c.status_code().unwrap();
        c.reset();
        assert!(!c.is_executed());
        c.status_code().unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn clone_of_executed_client_transfers_again() {
        let transport = Arc::new(Counting::default());
        let mut original = client(&transport);
        original.body().unwrap();

        let mut copy = original.clone();
        assert!(!copy.is_executed());
        copy.body().unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert!(original.is_executed());
    }

    #[test]
    fn transport_failure_leaves_client_unexecuted() {
        let transport = Arc::new(Counting {
            failures: 1,
            ..Counting::default()
        });
        let mut c = client(&transport);

        let err = c.status_code().unwrap_err();
        assert!(matches!(
            err,
            HttpError::Transport {
                kind: TransportErrorKind::Connection,
                ..
            }
        ));
        assert!(!c.is_executed());

        assert_eq!(c.status_code().unwrap(), 200);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unwritable_cookie_jar_does_not_repeat_the_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(Counting::default());
        let spec = RequestSpec::post("http://h/order")
            .body("buy")
            .cookie_jar(dir.path().join("no-such-dir").join("jar.json"));
        let mut c = HttpClient::with_transport(spec, transport.clone());

        assert_eq!(c.status_code().unwrap(), 200);
        assert_eq!(c.status_code().unwrap(), 200);
        assert!(c.is_executed());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn set_url_with_bad_method_fails_before_any_transfer() {
        let transport = Arc::new(Counting::default());
        let mut c = client(&transport);

        let err = c.set_url("http://h/other", "HEAD").unwrap_err();
        assert!(matches!(err, HttpError::InvalidArgument(_)));
        assert_eq!(c.spec().url(), "http://h/");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn url_change_needs_reset_to_apply() {
        let transport = Arc::new(Counting::default());
        let mut c = client(&transport);
        c.status_code().unwrap();

        c.set_url("http://h/next", "GET").unwrap();
        c.status_code().unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        c.reset().status_code().unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn typed_json_and_text() {
        #[derive(serde::Deserialize)]
        struct Payload {
            n: u32,
        }

        let transport = Arc::new(Counting::default());
        let mut c = client(&transport);
        assert_eq!(c.json_as::<Payload>().unwrap().n, 1);
        assert_eq!(c.text().unwrap(), "{\"n\":1}");
        assert_eq!(c.status_line().unwrap(), Some("HTTP/1.1 200 OK"));
        assert_eq!(c.debug_trace().unwrap(), None);
    }
}
