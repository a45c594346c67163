//! Response records.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Classification of a response relative to the controller's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response with readable status, headers and body.
    Basic,
    /// Cross-origin response that passed CORS.
    Cors,
    /// Cross-origin response whose contents are hidden.
    Opaque,
    /// Network error stand-in.
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Error => "error",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "basic" => Some(ResponseType::Basic),
            "cors" => Some(ResponseType::Cors),
            "opaque" => Some(ResponseType::Opaque),
            "error" => Some(ResponseType::Error),
            _ => None,
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable snapshot of a network response.
///
/// The body is a shared `Bytes` buffer, so cloning a response to store it
/// never contends with the copy handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Final URL the response was served from.
    pub url: Url,
    pub status: u16,
    /// Header names are lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    pub response_type: ResponseType,
}

impl Response {
    pub fn new(url: Url, status: u16, response_type: ResponseType) -> Self {
        Self { url, status, headers: BTreeMap::new(), body: Bytes::new(), response_type }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only complete same-origin responses are written to the runtime cache.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }

    /// Header names listed in `Vary`, lower-cased.
    ///
    /// `None` means `Vary: *`, which matches no later request.
    pub fn vary(&self) -> Option<Vec<String>> {
        let Some(raw) = self.header("vary") else {
            return Some(Vec::new());
        };
        let mut names = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if name == "*" {
                return None;
            }
            names.push(name.to_ascii_lowercase());
        }
        Some(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, response_type: ResponseType) -> Response {
        Response::new(Url::parse("https://example.com/a.css").unwrap(), status, response_type)
    }

    #[test]
    fn test_cacheable_requires_200_basic() {
        assert!(response(200, ResponseType::Basic).is_cacheable());
        assert!(!response(204, ResponseType::Basic).is_cacheable());
        assert!(!response(404, ResponseType::Basic).is_cacheable());
        assert!(!response(200, ResponseType::Cors).is_cacheable());
        assert!(!response(0, ResponseType::Opaque).is_cacheable());
    }

    #[test]
    fn test_is_ok_range() {
        assert!(response(200, ResponseType::Basic).is_ok());
        assert!(response(299, ResponseType::Basic).is_ok());
        assert!(!response(301, ResponseType::Basic).is_ok());
        assert!(!response(500, ResponseType::Basic).is_ok());
    }

    #[test]
    fn test_vary_parsing() {
        let plain = response(200, ResponseType::Basic);
        assert_eq!(plain.vary(), Some(vec![]));

        let varied = plain.clone().with_header("Vary", "Accept-Encoding, Accept-Language");
        assert_eq!(varied.vary(), Some(vec!["accept-encoding".to_string(), "accept-language".to_string()]));

        let star = plain.with_header("vary", "Accept, *");
        assert_eq!(star.vary(), None);
    }

    #[test]
    fn test_clone_shares_body() {
        let original = response(200, ResponseType::Basic).with_body("body { color: red }");
        let copy = original.clone();
        assert_eq!(original.body.as_ptr(), copy.body.as_ptr());
    }

    #[test]
    fn test_response_type_round_trip() {
        for t in [ResponseType::Basic, ResponseType::Cors, ResponseType::Opaque, ResponseType::Error] {
            assert_eq!(ResponseType::parse(t.as_str()), Some(t));
        }
        assert_eq!(ResponseType::parse("opaqueredirect"), None);
    }
}
