//! The cookie seam used by the fetch engine.

use crate::cookies::canonicalcookie::CanonicalCookie;
use crate::cookies::monster::CookieMonster;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

/// Process-lifetime jar used by `cookies(None)`.
static DEFAULT_JAR: Lazy<Arc<CookieMonster>> = Lazy::new(|| Arc::new(CookieMonster::new()));

/// The (host, path, secure) view of a request that cookie matching needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    /// `host[:port]` as sent on the wire.
    pub host: String,
    /// Path and query.
    pub path: String,
    pub secure: bool,
}

impl RequestOrigin {
    pub fn new(host: impl Into<String>, path: impl Into<String>, secure: bool) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            secure,
        }
    }

    /// Lowercase hostname; cookies ignore ports.
    pub fn hostname(&self) -> String {
        let host = self.host.as_str();
        let bare = if host.starts_with('[') {
            // IPv6 literal, keep the brackets.
            host.find(']').map_or(host, |end| &host[..=end])
        } else {
            host.rsplit_once(':').map_or(host, |(name, _)| name)
        };
        bare.to_ascii_lowercase()
    }

    /// Path without the query.
    pub fn path_only(&self) -> &str {
        let path = self.path.split(['?', '#']).next().unwrap_or("");
        if path.is_empty() {
            "/"
        } else {
            path
        }
    }
}

/// Storage behind a [`CookieAgent`].
pub trait CookieStore: Send + Sync {
    /// Ingest one Set-Cookie line received from `origin`.
    fn save_cookie(&self, origin: &RequestOrigin, line: &str);

    /// Cookies that should accompany a request to `origin`.
    fn cookies_for(&self, origin: &RequestOrigin) -> Vec<CanonicalCookie>;
}

/// Attaches outgoing cookies and ingests incoming ones.
#[derive(Clone)]
pub struct CookieAgent {
    store: Arc<dyn CookieStore>,
}

impl fmt::Debug for CookieAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieAgent").finish_non_exhaustive()
    }
}

impl CookieAgent {
    pub fn new(store: Arc<dyn CookieStore>) -> Self {
        Self { store }
    }

    /// Agent over the shared in-memory jar.
    pub fn with_default_jar() -> Self {
        Self::new(default_jar())
    }

    /// `Cookie` header value for `origin`, or `None` when nothing matches.
    pub fn attach(&self, origin: &RequestOrigin) -> Option<String> {
        let cookies = self.store.cookies_for(origin);
        if cookies.is_empty() {
            return None;
        }
        let value = cookies
            .iter()
            .map(CanonicalCookie::pair)
            .collect::<Vec<_>>()
            .join("; ");
        tracing::debug!(host = %origin.host, cookie = %value, "attach cookies");
        Some(value)
    }

    /// Store every Set-Cookie value a response to `origin` carried.
    pub fn store(&self, origin: &RequestOrigin, set_cookies: &[String]) {
        if set_cookies.is_empty() {
            return;
        }
        tracing::debug!(host = %origin.host, count = set_cookies.len(), "storing cookies");
        for line in set_cookies {
            self.store.save_cookie(origin, line);
        }
    }
}

/// The shared in-memory jar.
pub fn default_jar() -> Arc<CookieMonster> {
    Arc::clone(&DEFAULT_JAR)
}
