use crate::cookies::agent::RequestOrigin;
use cookie::Cookie;
use time::{Duration, OffsetDateTime};

/// Represents a cookie.
/// Modeled after Chromium's `net::CanonicalCookie`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalCookie {
    pub name: String,
    pub value: String,
    /// Lowercase hostname, no leading dot, no port.
    pub domain: String,
    pub path: String,
    pub creation_time: OffsetDateTime,
    pub expiration_time: Option<OffsetDateTime>,
    pub secure: bool,
    pub http_only: bool,
    pub host_only: bool,
}

impl CanonicalCookie {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
        creation_time: OffsetDateTime,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: path.into(),
            creation_time,
            expiration_time: None,
            secure: false,
            http_only: false,
            host_only: true,
        }
    }

    /// Parse one Set-Cookie line received from `origin`.
    ///
    /// Returns `None` for lines a browser would ignore: unparsable input, a
    /// Domain attribute the origin may not set, or a Secure cookie sent over
    /// a plain connection.
    pub fn from_set_cookie(origin: &RequestOrigin, line: &str, now: OffsetDateTime) -> Option<Self> {
        let parsed = Cookie::parse(line).ok()?;
        let host = origin.hostname();

        let (domain, host_only) = match parsed.domain() {
            Some(d) if !d.is_empty() => {
                let d = d.trim_start_matches('.').to_ascii_lowercase();
                if !Self::domain_matches(&d, &host, false) {
                    return None;
                }
                // Refuse bare top-level labels unless the host is exactly that.
                if !d.contains('.') && d != host {
                    return None;
                }
                (d, false)
            }
            _ => (host, true),
        };

        let path = match parsed.path() {
            Some(p) if p.starts_with('/') => p.to_string(),
            _ => "/".to_string(),
        };

        let secure = parsed.secure().unwrap_or(false);
        if secure && !origin.secure {
            return None;
        }

        // Max-Age wins over Expires.
        let expiration_time = match parsed.max_age() {
            Some(age) if age <= Duration::ZERO => Some(OffsetDateTime::UNIX_EPOCH),
            Some(age) => Some(now + age),
            None => parsed.expires().and_then(|e| e.datetime()),
        };

        Some(Self {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path,
            creation_time: now,
            expiration_time,
            secure,
            http_only: parsed.http_only().unwrap_or(false),
            host_only,
        })
    }

    pub fn is_expired(&self, current_time: OffsetDateTime) -> bool {
        self.expiration_time
            .is_some_and(|expiry| expiry <= current_time)
    }

    /// Whether this cookie should be sent to `origin`.
    pub fn matches(&self, origin: &RequestOrigin) -> bool {
        Self::domain_matches(&self.domain, &origin.hostname(), self.host_only)
            && Self::path_matches(&self.path, origin.path_only())
            && (!self.secure || origin.secure)
    }

    /// RFC 6265 domain matching.
    pub fn domain_matches(cookie_domain: &str, request_host: &str, host_only: bool) -> bool {
        if cookie_domain.eq_ignore_ascii_case(request_host) {
            return true;
        }
        if host_only || request_host.len() <= cookie_domain.len() {
            return false;
        }

        let split = request_host.len() - cookie_domain.len();
        request_host.is_char_boundary(split)
            && request_host[split..].eq_ignore_ascii_case(cookie_domain)
            && request_host.as_bytes()[split - 1] == b'.'
    }

    /// RFC 6265 path matching.
    pub fn path_matches(cookie_path: &str, request_path: &str) -> bool {
        if request_path == cookie_path {
            return true;
        }
        request_path.starts_with(cookie_path)
            && (cookie_path.ends_with('/')
                || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
    }

    /// `name=value` as sent in a Cookie header.
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(host: &str, path: &str, secure: bool) -> RequestOrigin {
        RequestOrigin::new(host, path, secure)
    }

    fn parse(o: &RequestOrigin, line: &str) -> Option<CanonicalCookie> {
        CanonicalCookie::from_set_cookie(o, line, OffsetDateTime::now_utc())
    }

    #[test]
    fn test_host_only_defaults() {
        let c = parse(&origin("Example.com:8080", "/a/b?x=1", false), "sid=42").unwrap();
        assert_eq!(c.domain, "example.com");
        assert!(c.host_only);
        assert_eq!(c.path, "/");
        assert_eq!(c.pair(), "sid=42");
        assert!(c.expiration_time.is_none());
    }

    #[test]
    fn test_domain_attribute() {
        let o = origin("www.example.com", "/", false);
        let c = parse(&o, "a=1; Domain=.example.com").unwrap();
        assert_eq!(c.domain, "example.com");
        assert!(!c.host_only);

        assert!(parse(&o, "a=1; Domain=other.com").is_none());
        assert!(parse(&o, "a=1; Domain=com").is_none());
    }

    #[test]
    fn test_secure_requires_secure_origin() {
        assert!(parse(&origin("example.com", "/", false), "a=1; Secure").is_none());
        assert!(parse(&origin("example.com", "/", true), "a=1; Secure").unwrap().secure);
    }

    #[test]
    fn test_max_age_expiry() {
        let now = OffsetDateTime::now_utc();
        let o = origin("example.com", "/", false);
        let c = CanonicalCookie::from_set_cookie(&o, "a=1; Max-Age=60", now).unwrap();
        assert_eq!(c.expiration_time, Some(now + Duration::seconds(60)));
        assert!(!c.is_expired(now));

        let gone = CanonicalCookie::from_set_cookie(&o, "a=1; Max-Age=0", now).unwrap();
        assert!(gone.is_expired(now));
    }

    #[test]
    fn test_domain_matching() {
        assert!(CanonicalCookie::domain_matches("example.com", "example.com", true));
        assert!(!CanonicalCookie::domain_matches("example.com", "www.example.com", true));
        assert!(CanonicalCookie::domain_matches("example.com", "www.example.com", false));
        assert!(!CanonicalCookie::domain_matches("example.com", "badexample.com", false));
    }

    #[test]
    fn test_path_matching() {
        assert!(CanonicalCookie::path_matches("/", "/anything"));
        assert!(CanonicalCookie::path_matches("/docs", "/docs"));
        assert!(CanonicalCookie::path_matches("/docs", "/docs/page"));
        assert!(!CanonicalCookie::path_matches("/docs", "/docsearch"));
        assert!(CanonicalCookie::path_matches("/docs/", "/docs/page"));
    }

    #[test]
    fn test_matches_origin() {
        let c = parse(&origin("example.com", "/", true), "a=1; Path=/api; Secure").unwrap();
        assert!(c.matches(&origin("example.com:443", "/api/users?page=2", true)));
        assert!(!c.matches(&origin("example.com", "/api/users", false)));
        assert!(!c.matches(&origin("example.com", "/web", true)));
    }
}
