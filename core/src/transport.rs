//! The I/O seam between `HttpClient` and the network.
//!
//! A `Transport` executes one `HttpRequest` and reports either the response,
//! whatever its status, or a failure below HTTP. Tests substitute scripted
//! transports; `UreqTransport` is the blocking production implementation.

use std::io;
use std::time::Duration;

use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, RequestBuilder};

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a shared `ureq::Agent`.
///
/// 4xx/5xx responses are returned as data so `HttpClient` can classify
/// them; only timeouts and connection failures become `TransportError`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let body = request.body.as_deref().unwrap_or_default().as_bytes();

        let result = match request.method {
            HttpMethod::Get => without_body(self.agent.get(url), request).call(),
            HttpMethod::Delete => without_body(self.agent.delete(url), request).call(),
            HttpMethod::Post => with_body(self.agent.post(url), request).send(body),
            HttpMethod::Put => with_body(self.agent.put(url), request).send(body),
            HttpMethod::Patch => with_body(self.agent.patch(url), request).send(body),
        };

        let mut response = result.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response.body_mut().read_to_string().map_err(classify)?;

        Ok(HttpResponse { status, headers, body })
    }
}

fn without_body(builder: RequestBuilder<WithoutBody>, request: &HttpRequest) -> RequestBuilder<WithoutBody> {
    request
        .headers
        .iter()
        .fold(builder, |b, (k, v)| b.header(k.as_str(), v.as_str()))
}

fn with_body(builder: RequestBuilder<WithBody>, request: &HttpRequest) -> RequestBuilder<WithBody> {
    request
        .headers
        .iter()
        .fold(builder, |b, (k, v)| b.header(k.as_str(), v.as_str()))
}

fn classify(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
            TransportError::Timeout
        }
        other => TransportError::Connection(other.to_string()),
    }
}
