//! Request pipeline shared by every storefront call.
//!
//! # Design
//! `HttpClient` applies three policies around a `Transport`, in order:
//!
//! 1. attach the stored bearer credential (and a JSON content type when a
//!    body is present);
//! 2. execute the request;
//! 3. classify the outcome. A timeout is retried once after `retry_delay`,
//!    a 401 clears the session and notifies the `AuthListener`, and every
//!    other failure is returned as-is.
//!
//! The retry is bounded by `HttpRequest::retried`: the re-issued request
//! carries the flag, so a second timeout is surfaced instead of retried.
//! Each call is independent; the only state shared between concurrent
//! calls is the session store.

use std::sync::Arc;
use std::thread;

use log::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::session::{AuthListener, SessionStore, LOGIN_ROUTE};
use crate::transport::{Transport, UreqTransport};

#[derive(Clone)]
pub struct HttpClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionStore>,
    listener: Arc<dyn AuthListener>,
}

impl HttpClient {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionStore>,
        listener: Arc<dyn AuthListener>,
    ) -> Self {
        Self {
            config,
            transport,
            session,
            listener,
        }
    }

    /// Client over a blocking `ureq` transport honouring `config.timeout`.
    pub fn from_config(
        config: ClientConfig,
        session: Arc<dyn SessionStore>,
        listener: Arc<dyn AuthListener>,
    ) -> Self {
        let transport = Arc::new(UreqTransport::new(config.timeout));
        Self::new(config, transport, session, listener)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Decorate `request` with the stored credential and default headers.
    ///
    /// A missing credential is not an error; the request goes out
    /// unauthenticated.
    pub fn authorize(&self, request: HttpRequest) -> HttpRequest {
        let request = match self.session.get() {
            Some(token) => request.with_header("authorization", format!("Bearer {token}")),
            None => request,
        };
        if request.body.is_some() && request.header("content-type").is_none() {
            request.with_header("content-type", "application/json")
        } else {
            request
        }
    }

    /// Send `request` and return the 2xx response, or the classified failure.
    pub fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let request = self.authorize(request);
        debug!(
            "{} {}{}",
            request.method.as_str(),
            request.url,
            if request.retried { " (retry)" } else { "" }
        );

        match self.transport.execute(&request) {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => Err(self.reject(&request, response)),
            Err(TransportError::Timeout) if !request.retried => {
                warn!(
                    "{} {} timed out, retrying in {:?}",
                    request.method.as_str(),
                    request.url,
                    self.config.retry_delay
                );
                thread::sleep(self.config.retry_delay);
                self.send(request.into_retry())
            }
            Err(TransportError::Timeout) => Err(ApiError::Timeout),
            Err(TransportError::Connection(msg)) => Err(ApiError::Transport(msg)),
        }
    }

    fn reject(&self, request: &HttpRequest, response: HttpResponse) -> ApiError {
        if response.status == 401 {
            self.invalidate_session(request.header("authorization").is_some());
        }
        ApiError::from_status(response.status, &response.body)
    }

    /// Drop the credential and send the user to the login route.
    ///
    /// A request that carried a token navigates only if it is the one that
    /// removed that token, so concurrent rejections of the same token sign
    /// out once. A request sent without a token always navigates.
    fn invalidate_session(&self, sent_credential: bool) {
        let removed = self.session.clear().is_some();
        if removed || !sent_credential {
            info!("request unauthenticated, signing out");
            self.listener.on_unauthenticated(LOGIN_ROUTE);
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").field("config", &self.config).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Barrier, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::http::HttpMethod;
    use crate::session::MemorySessionStore;

    type Outcome = Result<HttpResponse, TransportError>;

    /// Replays a fixed script of outcomes and records every request it saw.
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<VecDeque<Outcome>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Outcome>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                seen: Mutex::default(),
            })
        }

        fn seen(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&self, request: &HttpRequest) -> Outcome {
            self.seen.lock().unwrap().push(request.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("transport called more often than scripted")
        }
    }

    /// Answers 401 to everyone, after all callers have arrived.
    struct RejectAll {
        barrier: Barrier,
    }

    impl Transport for RejectAll {
        fn execute(&self, _request: &HttpRequest) -> Outcome {
            self.barrier.wait();
            Ok(HttpResponse::new(401, r#"{"message":"Token expired"}"#))
        }
    }

    #[derive(Default)]
    struct CountingListener {
        calls: AtomicUsize,
        route: Mutex<Option<String>>,
    }

    impl AuthListener for CountingListener {
        fn on_unauthenticated(&self, login_route: &str) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.route.lock().unwrap() = Some(login_route.to_string());
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new("http://api.test").with_retry_delay(Duration::ZERO)
    }

    fn client(
        transport: Arc<dyn Transport>,
        session: Arc<MemorySessionStore>,
        listener: Arc<CountingListener>,
    ) -> HttpClient {
        HttpClient::new(config(), transport, session, listener)
    }

    fn get(path: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, format!("http://api.test{path}"))
    }

    #[test]
    fn attaches_bearer_token() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(200, "{}"))]);
        let session = Arc::new(MemorySessionStore::with_token("tok"));
        let c = client(transport.clone(), session, Arc::default());

        c.send(get("/bookings")).unwrap();

        let seen = transport.seen();
        assert_eq!(seen[0].header("Authorization"), Some("Bearer tok"));
    }

    #[test]
    fn proceeds_without_token() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(200, "{}"))]);
        let c = client(transport.clone(), Arc::default(), Arc::default());

        c.send(get("/products")).unwrap();

        assert_eq!(transport.seen()[0].header("authorization"), None);
    }

    #[test]
    fn json_content_type_only_with_body() {
        let c = client(ScriptedTransport::new(vec![]), Arc::default(), Arc::default());

        let with_body = c.authorize(
            HttpRequest::new(HttpMethod::Post, "http://api.test/bookings").with_body("{}".to_string()),
        );
        assert_eq!(with_body.header("content-type"), Some("application/json"));

        let without = c.authorize(get("/products"));
        assert_eq!(without.header("content-type"), None);
    }

    #[test]
    fn success_passes_through_unmodified() {
        let response = HttpResponse {
            status: 201,
            headers: vec![("x-request-id".to_string(), "7".to_string())],
            body: r#"{"booking":{}}"#.to_string(),
        };
        let transport = ScriptedTransport::new(vec![Ok(response.clone())]);
        let c = client(transport, Arc::default(), Arc::default());

        assert_eq!(c.send(get("/bookings")).unwrap(), response);
    }

    #[test]
    fn timeout_then_success_resolves_with_retry() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Timeout),
            Ok(HttpResponse::new(200, r#"{"products":[]}"#)),
        ]);
        let c = client(transport.clone(), Arc::default(), Arc::default());

        let response = c.send(get("/products")).unwrap();
        assert_eq!(response.body, r#"{"products":[]}"#);

        let seen = transport.seen();
        assert_eq!(seen.len(), 2);
        assert!(!seen[0].retried);
        assert!(seen[1].retried);
        assert_eq!(seen[0].url, seen[1].url);
    }

    #[test]
    fn second_timeout_is_surfaced() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
        ]);
        let c = client(transport.clone(), Arc::default(), Arc::default());

        let err = c.send(get("/products")).unwrap_err();
        assert!(matches!(err, ApiError::Timeout));
        assert_eq!(transport.seen().len(), 2);
    }

    #[test]
    fn already_retried_request_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Err(TransportError::Timeout)]);
        let c = client(transport.clone(), Arc::default(), Arc::default());

        let err = c.send(get("/products").into_retry()).unwrap_err();
        assert!(matches!(err, ApiError::Timeout));
        assert_eq!(transport.seen().len(), 1);
    }

    #[test]
    fn retry_waits_for_configured_delay() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Timeout),
            Ok(HttpResponse::new(200, "{}")),
        ]);
        let config = ClientConfig::new("http://api.test").with_retry_delay(Duration::from_millis(50));
        let c = HttpClient::new(
            config,
            transport,
            Arc::new(MemorySessionStore::new()),
            Arc::new(CountingListener::default()),
        );

        let started = std::time::Instant::now();
        c.send(get("/products")).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn connection_failure_is_not_retried() {
        let transport =
            ScriptedTransport::new(vec![Err(TransportError::Connection("refused".to_string()))]);
        let c = client(transport.clone(), Arc::default(), Arc::default());

        let err = c.send(get("/products")).unwrap_err();
        assert!(matches!(err, ApiError::Transport(ref m) if m == "refused"));
        assert_eq!(transport.seen().len(), 1);
    }

    #[test]
    fn unauthorized_clears_session_and_notifies() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(401, ""))]);
        let session = Arc::new(MemorySessionStore::with_token("stale"));
        let listener = Arc::new(CountingListener::default());
        let c = client(transport, session.clone(), listener.clone());

        let err = c.send(get("/bookings")).unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(session.get(), None);
        assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
        assert_eq!(listener.route.lock().unwrap().as_deref(), Some("/login"));
    }

    #[test]
    fn unauthorized_after_retry_still_signs_out() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Timeout),
            Ok(HttpResponse::new(401, "")),
        ]);
        let session = Arc::new(MemorySessionStore::with_token("stale"));
        let listener = Arc::new(CountingListener::default());
        let c = client(transport, session.clone(), listener.clone());

        assert!(matches!(c.send(get("/bookings")), Err(ApiError::Unauthorized)));
        assert_eq!(session.get(), None);
        assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unauthorized_without_token_still_navigates() {
        let transport = ScriptedTransport::new(vec![
            Ok(HttpResponse::new(401, r#"{"message":"No token provided"}"#)),
            Ok(HttpResponse::new(401, r#"{"message":"No token provided"}"#)),
        ]);
        let session = Arc::new(MemorySessionStore::new());
        let listener = Arc::new(CountingListener::default());
        let c = client(transport.clone(), session.clone(), listener.clone());

        assert!(matches!(c.send(get("/bookings")), Err(ApiError::Unauthorized)));
        assert_eq!(transport.seen()[0].header("authorization"), None);
        assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
        assert_eq!(listener.route.lock().unwrap().as_deref(), Some("/login"));

        assert!(matches!(c.send(get("/bookings")), Err(ApiError::Unauthorized)));
        assert_eq!(listener.calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.get(), None);
    }

    #[test]
    fn concurrent_rejections_sign_out_once() {
        const CALLERS: usize = 6;
        let transport = Arc::new(RejectAll {
            barrier: Barrier::new(CALLERS),
        });
        let session = Arc::new(MemorySessionStore::with_token("stale"));
        let listener = Arc::new(CountingListener::default());
        let c = client(transport, session.clone(), listener.clone());

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let c = c.clone();
                thread::spawn(move || c.send(get("/bookings")))
            })
            .collect();
        for h in handles {
            assert!(matches!(h.join().unwrap(), Err(ApiError::Unauthorized)));
        }

        assert_eq!(session.get(), None);
        assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn other_failures_propagate_unchanged() {
        let transport = ScriptedTransport::new(vec![
            Ok(HttpResponse::new(500, r#"{"message":"Database unavailable"}"#)),
            Ok(HttpResponse::new(404, "")),
        ]);
        let session = Arc::new(MemorySessionStore::with_token("tok"));
        let listener = Arc::new(CountingListener::default());
        let c = client(transport.clone(), session.clone(), listener.clone());

        match c.send(get("/products")).unwrap_err() {
            ApiError::Http { status, message, .. } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Database unavailable");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(c.send(get("/products/x")), Err(ApiError::NotFound)));

        assert_eq!(transport.seen().len(), 2);
        assert_eq!(session.get().as_deref(), Some("tok"));
        assert_eq!(listener.calls.load(Ordering::SeqCst), 0);
    }
}
