//! Declarative configuration for one HTTP call.
//!
//! # Design
//! `RequestSpec` is a by-value builder. Setters that can fail validate on the
//! spot and return `Result<Self>`, so a bad method or a missing upload is
//! reported at the line that introduced it. No setter touches the network;
//! the only I/O done here is the existence check for uploads and draining a
//! caller-supplied body reader.

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{HttpError, Result};
use crate::http::HttpMethod;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub(crate) url: String,
    pub(crate) method: HttpMethod,
    pub(crate) config: ClientConfig,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) cookies: BTreeMap<String, String>,
    pub(crate) cookie_jar: Option<PathBuf>,
    pub(crate) body: Option<Vec<u8>>,
    pub(crate) params: BTreeMap<String, String>,
    pub(crate) files: BTreeMap<String, PathBuf>,
    pub(crate) basic_auth: Option<(String, String)>,
    pub(crate) debug: bool,
}

impl RequestSpec {
    /// Start a spec for `url`, validating `method` immediately.
    pub fn new(url: impl Into<String>, method: &str) -> Result<Self> {
        Ok(Self::with_method(url, method.parse()?))
    }

    pub fn with_method(url: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            url: url.into(),
            method,
            config: ClientConfig::default(),
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            cookie_jar: None,
            body: None,
            params: BTreeMap::new(),
            files: BTreeMap::new(),
            basic_auth: None,
            debug: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::with_method(url, HttpMethod::Get)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::with_method(url, HttpMethod::Post)
    }

    /// Replace both URL and method.
    pub fn set_url(mut self, url: impl Into<String>, method: &str) -> Result<Self> {
        self.method = method.parse()?;
        self.url = url.into();
        Ok(self)
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.total_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Pass `false` to skip certificate and host name checks on `https` URLs.
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.config.verify_tls = verify;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Load cookies from, and save received cookies to, a JSON file at `path`.
    pub fn cookie_jar(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookie_jar = Some(path.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach a file upload under form field `field`.
    ///
    /// Only POST requests may carry files, and `path` must name an existing
    /// regular file now. The file is read when the request is sent.
    pub fn file(mut self, field: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        if self.method != HttpMethod::Post {
            return Err(HttpError::UnsupportedOperation(format!(
                "file uploads require POST, request method is {}",
                self.method
            )));
        }
        let path = path.into();
        if !path.is_file() {
            return Err(HttpError::NotFound(path));
        }
        self.files.insert(field.into(), path);
        Ok(self)
    }

    /// Raw payload, sent verbatim in place of params and files.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Take ownership of `reader`, rewind it, and drain it into the body.
    ///
    /// The reader is consumed and dropped before this returns. A caller that
    /// shares the underlying source (a cloned file handle, say) will find its
    /// position at the end.
    pub fn body_from_reader<R: Read + Seek>(mut self, mut reader: R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;
        self.body = Some(body);
        Ok(self)
    }

    /// Concatenate already produced chunks into the body.
    pub fn body_from_chunks<I, B>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut body = Vec::new();
        for chunk in chunks {
            body.extend_from_slice(chunk.as_ref());
        }
        self.body = Some(body);
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    /// Capture a verbose trace of the exchange.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn http_method(&self) -> HttpMethod {
        self.method
    }

    pub fn client_config(&self) -> &ClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn defaults_come_from_client_config() {
        let spec = RequestSpec::get("http://localhost/");
        assert_eq!(spec.config.connect_timeout, Duration::from_secs(10));
        assert_eq!(spec.config.total_timeout, Duration::from_secs(30));
        assert_eq!(spec.config.user_agent, "HttpClient");
        assert!(!spec.debug);
    }

    #[test]
    fn invalid_method_fails_immediately() {
        let err = RequestSpec::new("http://localhost/", "HEAD").unwrap_err();
        assert!(matches!(err, HttpError::InvalidArgument(_)));

        let err = RequestSpec::get("http://localhost/")
            .set_url("http://localhost/other", "TRACE")
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidArgument(_)));
    }

    #[test]
    fn set_url_replaces_url_and_method() {
        let spec = RequestSpec::get("http://a/")
            .set_url("http://b/", "put")
            .unwrap();
        assert_eq!(spec.url(), "http://b/");
        assert_eq!(spec.http_method(), HttpMethod::Put);
    }

    #[test]
    fn file_on_get_is_unsupported() {
        let upload = tempfile::NamedTempFile::new().unwrap();
        let err = RequestSpec::get("http://localhost/")
            .file("f", upload.path())
            .unwrap_err();
        assert!(matches!(err, HttpError::UnsupportedOperation(_)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        let err = RequestSpec::post("http://localhost/")
            .file("f", &missing)
            .unwrap_err();
        assert!(matches!(err, HttpError::NotFound(p) if p == missing));
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RequestSpec::post("http://localhost/")
            .file("f", dir.path())
            .unwrap_err();
        assert!(matches!(err, HttpError::NotFound(_)));
    }

    #[test]
    fn file_on_post_is_recorded_by_path() {
        let upload = tempfile::NamedTempFile::new().unwrap();
        let spec = RequestSpec::post("http://localhost/")
            .file("f", upload.path())
            .unwrap();
        assert_eq!(spec.files["f"], upload.path());
    }

    #[test]
    fn body_from_reader_rewinds_before_draining() {
        let mut source = Cursor::new(b"full payload".to_vec());
        source.seek(SeekFrom::Start(5)).unwrap();
        let spec = RequestSpec::post("http://localhost/")
            .body_from_reader(source)
            .unwrap();
        assert_eq!(spec.body.as_deref(), Some(&b"full payload"[..]));
    }

    #[test]
    fn body_from_chunks_concatenates() {
        let spec = RequestSpec::post("http://localhost/").body_from_chunks(["ab", "cd", "e"]);
        assert_eq!(spec.body.as_deref(), Some(&b"abcde"[..]));
    }

    #[test]
    fn later_param_overwrites_earlier() {
        let spec = RequestSpec::get("http://localhost/")
            .param("a", "1")
            .params([("a", "2"), ("b", "3")]);
        assert_eq!(spec.params["a"], "2");
        assert_eq!(spec.params["b"], "3");
    }
}
