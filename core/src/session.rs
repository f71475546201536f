//! Credential storage and the sign-out hook.
//!
//! # Design
//! `HttpClient` never reaches for ambient state. It reads the bearer token
//! from an injected `SessionStore` before every request and, when the server
//! rejects it, clears the store and notifies an injected `AuthListener`.
//!
//! `clear` returns the token it actually removed. When several in-flight
//! requests are rejected at once only one of them observes `Some`, and only
//! that one fires the listener.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Route the UI navigates to once the session is gone.
pub const LOGIN_ROUTE: &str = "/login";

/// Storage for the single bearer credential.
pub trait SessionStore: Send + Sync {
    fn get(&self) -> Option<String>;

    fn store(&self, token: &str);

    /// Remove the credential, returning it if one was present.
    fn clear(&self) -> Option<String>;
}

/// Receives the forced sign-out after an authentication failure.
pub trait AuthListener: Send + Sync {
    fn on_unauthenticated(&self, login_route: &str);
}

impl<F> AuthListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_unauthenticated(&self, login_route: &str) {
        self(login_route)
    }
}

/// Listener that ignores sign-out events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuthListener;

impl AuthListener for NoopAuthListener {
    fn on_unauthenticated(&self, _login_route: &str) {}
}

/// In-process session, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn store(&self, token: &str) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
    }

    fn clear(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Session persisted as a single file holding the raw token.
///
/// A missing or empty file means "signed out". The mutex serialises
/// clear-and-report so concurrent rejections remove the file once.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                log::warn!("cannot read session file {}: {e}", self.path.display());
                None
            }
        }
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<String> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.read()
    }

    fn store(&self, token: &str) {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = fs::write(&self.path, token) {
            log::warn!("cannot write session file {}: {e}", self.path.display());
        }
    }

    fn clear(&self) -> Option<String> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let token = self.read();
        match fs::remove_file(&self.path) {
            Ok(()) => token,
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                log::warn!("cannot remove session file {}: {e}", self.path.display());
                token
            }
        }
    }
}
