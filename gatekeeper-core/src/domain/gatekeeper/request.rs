//! Framework-independent view of an inbound request

use http::{HeaderMap, HeaderValue, Method, Uri};

/// Borrowed method, URI and headers of the request being gated
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    method: &'a Method,
    uri: &'a Uri,
    headers: &'a HeaderMap,
}

impl<'a> GateRequest<'a> {
    pub fn new(method: &'a Method, uri: &'a Uri, headers: &'a HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
        }
    }

    pub fn from_request<B>(request: &'a http::Request<B>) -> Self {
        Self::new(request.method(), request.uri(), request.headers())
    }

    pub fn method(&self) -> &'a Method {
        self.method
    }

    pub fn path(&self) -> &'a str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&'a str> {
        self.uri.query()
    }

    pub fn headers(&self) -> &'a HeaderMap {
        self.headers
    }

    /// Trimmed, non-empty UTF-8 header value
    pub fn header(&self, name: &str) -> Option<&'a str> {
        header_str(self.headers, name)
    }

    pub fn header_value(&self, name: &str) -> Option<&'a HeaderValue> {
        self.headers.get(name)
    }

    /// First value of a query parameter, percent-decoded
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn is_preflight(&self) -> bool {
        self.method == Method::OPTIONS
    }
}

/// Trimmed header value; empty or non-UTF-8 values count as absent.
pub fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
