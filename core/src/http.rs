//! HTTP requests and responses described as plain data.
//!
//! # Design
//! `StoreClient` builds `HttpRequest` values and parses `HttpResponse`
//! values without touching the network. `HttpClient` sits between the two:
//! it decorates the request (credential, content type), hands it to a
//! `Transport`, and classifies the outcome.
//!
//! Requests are never mutated once handed out. Header injection and the
//! retry marker both produce a new descriptor.

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
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

/// An outbound request.
///
/// `retried` is set on the single re-issue that follows a timeout and is
/// what bounds the client to one retry per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub retried: bool,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set `name`, replacing any existing value regardless of case.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// The same request, marked as the one permitted retry.
    pub fn into_retry(self) -> Self {
        Self {
            retried: true,
            ..self
        }
    }
}

/// A response as returned by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_header_replaces_case_insensitively() {
        let req = HttpRequest::new(HttpMethod::Get, "http://x/products")
            .with_header("Authorization", "Bearer old")
            .with_header("authorization", "Bearer new");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("AUTHORIZATION"), Some("Bearer new"));
    }

    #[test]
    fn into_retry_keeps_everything_else() {
        let req = HttpRequest::new(HttpMethod::Post, "http://x/bookings")
            .with_header("content-type", "application/json")
            .with_body("{}".to_string());
        let retry = req.clone().into_retry();
        assert!(!req.retried);
        assert!(retry.retried);
        assert_eq!(retry.method, req.method);
        assert_eq!(retry.url, req.url);
        assert_eq!(retry.headers, req.headers);
        assert_eq!(retry.body, req.body);
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(401, "").is_success());
    }

    #[test]
    fn method_names() {
        assert_eq!(HttpMethod::Patch.as_str(), "PATCH");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }
}
