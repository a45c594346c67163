//! Intercepted requests and their fetch destination.

use std::collections::BTreeMap;
use std::fmt;

use url::Url;

use super::hash::compute_cache_key;

/// What kind of resource a request is fetching.
///
/// Mirrors the fetch destination hint the page's runtime attaches to every
/// outgoing request. Only `Document` (a top-level navigation) is routed
/// network-first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Destination {
    Document,
    Font,
    Image,
    Script,
    Style,
    Manifest,
    /// `fetch()`/XHR calls carry an empty destination.
    #[default]
    Empty,
    Other(String),
}

impl Destination {
    /// Parse a destination hint, case-insensitively.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "document" => Destination::Document,
            "font" => Destination::Font,
            "image" => Destination::Image,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "manifest" => Destination::Manifest,
            "" => Destination::Empty,
            other => Destination::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Destination::Document => "document",
            Destination::Font => "font",
            Destination::Image => "image",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Manifest => "manifest",
            Destination::Empty => "",
            Destination::Other(s) => s,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Destination::Document)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing request as seen by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Upper-cased HTTP method.
    pub method: String,
    pub url: Url,
    /// Header names are lower-cased.
    pub headers: BTreeMap<String, String>,
    pub destination: Destination,
}

impl Request {
    pub fn new(method: &str, url: Url) -> Self {
        Self { method: method.to_ascii_uppercase(), url, headers: BTreeMap::new(), destination: Destination::Empty }
    }

    /// A plain GET with an empty destination.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// A top-level navigation.
    pub fn navigate(url: Url) -> Self {
        Self::get(url).with_destination(Destination::Document)
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// The URL used for matching: fragments never reach the cache.
    pub fn cache_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.to_string()
    }

    /// Key this request is stored under within a partition.
    pub fn key(&self) -> String {
        compute_cache_key(&self.method, &self.cache_url())
    }
}
