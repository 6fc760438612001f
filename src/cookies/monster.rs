use crate::cookies::agent::{CookieStore, RequestOrigin};
use crate::cookies::canonicalcookie::CanonicalCookie;
use dashmap::DashMap;
use std::sync::Arc;
use time::OffsetDateTime;

/// Maximum cookies per domain (Chromium default).
const MAX_COOKIES_PER_DOMAIN: usize = 50;

/// In-memory cookie jar.
/// Modeled after Chromium's `net::CookieMonster`.
#[derive(Debug, Clone, Default)]
pub struct CookieMonster {
    // Map<Domain, List<Cookie>>
    store: Arc<DashMap<String, Vec<CanonicalCookie>>>,
}

impl CookieMonster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_canonical_cookie(&self, cookie: CanonicalCookie) {
        let now = OffsetDateTime::now_utc();
        let mut entry = self.store.entry(cookie.domain.clone()).or_default();

        // Replace on (name, path); an already-expired cookie deletes.
        entry.retain(|c| c.name != cookie.name || c.path != cookie.path);
        if cookie.is_expired(now) {
            return;
        }

        while entry.len() >= MAX_COOKIES_PER_DOMAIN {
            let oldest = entry
                .iter()
                .enumerate()
                .min_by_key(|(_, c)| c.creation_time)
                .map(|(i, _)| i);
            match oldest {
                Some(idx) => {
                    entry.remove(idx);
                }
                None => break,
            }
        }

        entry.push(cookie);
    }

    /// Parse a Set-Cookie line from `origin` and store it if acceptable.
    pub fn parse_and_save_cookie(&self, origin: &RequestOrigin, cookie_line: &str) -> bool {
        match CanonicalCookie::from_set_cookie(origin, cookie_line, OffsetDateTime::now_utc()) {
            Some(cookie) => {
                self.set_canonical_cookie(cookie);
                true
            }
            None => {
                tracing::debug!(host = %origin.host, line = cookie_line, "rejected cookie");
                false
            }
        }
    }

    /// Cookies to send to `origin`, longest path first then oldest first.
    pub fn get_cookies_for_origin(&self, origin: &RequestOrigin) -> Vec<CanonicalCookie> {
        let host = origin.hostname();
        let now = OffsetDateTime::now_utc();
        let mut result = Vec::new();

        for domain in Self::get_matching_domains(&host) {
            if let Some(entry) = self.store.get(&domain) {
                result.extend(
                    entry
                        .iter()
                        .filter(|c| !c.is_expired(now) && c.matches(origin))
                        .cloned(),
                );
            }
        }

        result.sort_by(|a, b| {
            b.path
                .len()
                .cmp(&a.path.len())
                .then_with(|| a.creation_time.cmp(&b.creation_time))
        });
        result
    }

    /// The host itself and all parent domains.
    fn get_matching_domains(host: &str) -> Vec<String> {
        let mut domains = vec![host.to_string()];
        let mut rest = host;
        while let Some((_, parent)) = rest.split_once('.') {
            if parent.is_empty() {
                break;
            }
            domains.push(parent.to_string());
            rest = parent;
        }
        domains
    }

    pub fn total_cookie_count(&self) -> usize {
        self.store.iter().map(|e| e.value().len()).sum()
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}

impl CookieStore for CookieMonster {
    fn save_cookie(&self, origin: &RequestOrigin, line: &str) {
        self.parse_and_save_cookie(origin, line);
    }

    fn cookies_for(&self, origin: &RequestOrigin) -> Vec<CanonicalCookie> {
        self.get_cookies_for_origin(origin)
    }
}
