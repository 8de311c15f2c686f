//! `multipart/form-data` bodies that stream uploads from disk.
//!
//! Files are recorded by path and only opened when `reader` is called, so
//! the memory held for an upload is bounded by the part headers, not by the
//! file size.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Form fields and file parts for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartForm {
    boundary: String,
    fields: Vec<(String, String)>,
    files: Vec<(String, PathBuf)>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::with_boundary(format!("------------------------{}", Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            fields: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.push((name.into(), path.into()));
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn files(&self) -> &[(String, PathBuf)] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Open every file and return a reader producing the encoded body.
    ///
    /// Fails if a file can no longer be opened.
    pub fn reader(&self) -> io::Result<Box<dyn Read + Send + 'static>> {
        let mut head = Vec::new();
        for (name, value) in &self.fields {
            head.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    self.boundary,
                    escape_quotes(name)
                )
                .as_bytes(),
            );
            head.extend_from_slice(value.as_bytes());
            head.extend_from_slice(b"\r\n");
        }

        let mut reader: Box<dyn Read + Send> = Box::new(Cursor::new(head));
        for (name, path) in &self.files {
            let file = File::open(path)?;
            let part_head = format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                self.boundary,
                escape_quotes(name),
                escape_quotes(&file_name(path)),
            );
            reader = Box::new(
                reader
                    .chain(Cursor::new(part_head.into_bytes()))
                    .chain(file)
                    .chain(Cursor::new(b"\r\n".to_vec())),
            );
        }

        let tail = format!("--{}--\r\n", self.boundary);
        Ok(Box::new(reader.chain(Cursor::new(tail.into_bytes()))))
    }

    /// Encode the whole body into memory.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.reader()?.read_to_end(&mut out)?;
        Ok(out)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}

fn escape_quotes(s: &str) -> String {
    s.replace('"', "%22")
}
