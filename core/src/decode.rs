//! Response decoding: header block, status line, `Set-Cookie` and body.
//!
//! # Design
//! The transport reports how many bytes of its output belong to the header
//! block. That length, not a search for the first blank line, decides where
//! the body starts: a header block can contain several stacked sections
//! (interim `100 Continue`, proxy `CONNECT`, redirect hops), each ending in a
//! blank line of its own.
//!
//! Within the header block only the last section counts. Its first line
//! without a `": "` separator is the status line. Every other line is split on
//! the first `": "`, so values may contain colons. `Set-Cookie` lines, matched
//! without regard to case, go to cookie parsing and never into the header map.
//! Other repeated headers keep their last value.

use std::collections::HashMap;

use log::trace;

use crate::cookie::SetCookie;

/// Structured view of one raw response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedResponse {
    pub status_line: Option<String>,
    /// Header names are kept as received.
    pub headers: HashMap<String, String>,
    /// Every `Set-Cookie` line of the final section, in order.
    pub cookies: Vec<SetCookie>,
    pub body: Vec<u8>,
}

impl DecodedResponse {
    /// Cookie names mapped to their values; a later line for the same name wins.
    pub fn cookie_map(&self) -> HashMap<String, String> {
        self.cookies
            .iter()
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect()
    }
}

/// Split `raw` at `header_size` and decode both halves.
///
/// A `header_size` past the end of `raw` is clamped, leaving an empty body.
pub fn decode_response(raw: &[u8], header_size: usize) -> DecodedResponse {
    let split = header_size.min(raw.len());
    let (head, body) = raw.split_at(split);

    let mut decoded = decode_headers(&String::from_utf8_lossy(head));
    decoded.body = body.to_vec();
    decoded
}

/// Decode a header block, which may hold several blank-line separated sections.
pub fn decode_headers(block: &str) -> DecodedResponse {
    let normalized = block.replace("\r\n", "\n");
    let section = normalized
        .split("\n\n")
        .filter(|s| !s.trim().is_empty())
        .last()
        .unwrap_or("");

    let mut decoded = DecodedResponse::default();
    for line in section.lines().filter(|l| !l.is_empty()) {
        let Some((key, value)) = line.split_once(": ") else {
            if decoded.status_line.is_none() {
                decoded.status_line = Some(line.to_string());
            }
            continue;
        };

        if key.eq_ignore_ascii_case("set-cookie") {
            match SetCookie::parse(value) {
                Some(cookie) => decoded.cookies.push(cookie),
                None => trace!("ignoring malformed Set-Cookie value {value:?}"),
            }
        } else {
            decoded.headers.insert(key.to_string(), value.to_string());
        }
    }
    decoded
}
