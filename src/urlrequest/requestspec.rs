//! The mutable description of one logical fetch.

use crate::base::neterror::NetError;
use crate::cookies::agent::RequestOrigin;
use crate::http::contentdecoder::ACCEPT_ENCODING;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::requestbody::RequestBody;
use crate::http::transport::PhysicalRequest;
use http::header::{ACCEPT_ENCODING as ACCEPT_ENCODING_HEADER, AUTHORIZATION, COOKIE};
use http::{HeaderValue, Method};
use url::Url;

/// URL scheme of a request target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn parse(scheme: &str) -> Result<Self, NetError> {
        match scheme {
            s if s.eq_ignore_ascii_case("http") => Ok(Scheme::Http),
            s if s.eq_ignore_ascii_case("https") => Ok(Scheme::Https),
            _ => Err(NetError::UnknownUrlScheme),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub fn is_secure(self) -> bool {
        self == Scheme::Https
    }
}

/// Target, method, headers, payload and policies of a fetch.
///
/// Setters return `&mut Self` so calls chain. The few that can reject their
/// input return `Result` instead.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    scheme: Scheme,
    host: Option<String>,
    path: String,
    method: Method,
    headers: OrderedHeaderMap,
    auth: Option<String>,
    body: RequestBody,
    max_redirects_per_location: u32,
    follow_redirects: bool,
    decompress: bool,
}

impl Default for RequestSpec {
    fn default() -> Self {
        let mut headers = OrderedHeaderMap::new();
        headers.insert_typed(
            ACCEPT_ENCODING_HEADER,
            HeaderValue::from_static(ACCEPT_ENCODING),
        );
        Self {
            scheme: Scheme::Http,
            host: None,
            path: "/".to_string(),
            method: Method::GET,
            headers,
            auth: None,
            body: RequestBody::Empty,
            max_redirects_per_location: 0,
            follow_redirects: true,
            decompress: true,
        }
    }
}

impl RequestSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spec targeting an absolute URL.
    pub fn from_url(url: &str) -> Result<Self, NetError> {
        let mut spec = Self::default();
        spec.set_url(url, None)?;
        Ok(spec)
    }

    pub fn set_scheme(&mut self, scheme: Scheme) -> &mut Self {
        self.scheme = scheme;
        self
    }

    pub fn set_secure(&mut self, secure: bool) -> &mut Self {
        self.set_scheme(if secure { Scheme::Https } else { Scheme::Http })
    }

    /// `host[:port]`
    pub fn set_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = Some(host.into());
        self
    }

    /// Path and query, sent verbatim.
    pub fn set_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.path = path.into();
        self
    }

    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.method = method;
        self
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self, NetError> {
        self.headers.insert(name, value)?;
        Ok(self)
    }

    pub fn set_headers<I, K, V>(&mut self, pairs: I) -> Result<&mut Self, NetError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.headers.extend(pairs)?;
        Ok(self)
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.headers.remove(name);
        self
    }

    /// `user:password` when a password is given, otherwise `username` as an
    /// opaque token.
    pub fn set_auth(&mut self, username: &str, password: Option<&str>) -> &mut Self {
        self.auth = Some(match password {
            Some(password) => format!("{}:{}", username, password),
            None => username.to_string(),
        });
        self
    }

    pub fn set_body(&mut self, body: impl Into<RequestBody>) -> &mut Self {
        self.body = body.into();
        self
    }

    pub fn set_max_redirects_per_location(&mut self, max: u32) -> &mut Self {
        self.max_redirects_per_location = max;
        self
    }

    pub fn set_follow_redirects(&mut self, follow: bool) -> &mut Self {
        self.follow_redirects = follow;
        self
    }

    pub fn set_decompress(&mut self, decompress: bool) -> &mut Self {
        self.decompress = decompress;
        self
    }

    /// Point the request at `url`, resolved against `base` when relative.
    pub fn set_url(&mut self, url: &str, base: Option<&Url>) -> Result<&mut Self, NetError> {
        let parsed = match base {
            Some(base) => base.join(url),
            None => Url::parse(url),
        }
        .map_err(|_| NetError::InvalidUrl)?;
        self.apply_url(&parsed)
    }

    /// Copy scheme, host, path and any embedded credentials from `url`.
    pub fn apply_url(&mut self, url: &Url) -> Result<&mut Self, NetError> {
        let scheme = Scheme::parse(url.scheme())?;
        let hostname = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(NetError::InvalidUrl)?;

        // Url::port() is None for the scheme's default port.
        let host = match url.port() {
            Some(port) => format!("{}:{}", hostname, port),
            None => hostname.to_string(),
        };
        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        self.scheme = scheme;
        self.host = Some(host);
        self.path = path;
        if !url.username().is_empty() || url.password().is_some() {
            let username = url.username().to_string();
            self.set_auth(&username, url.password());
        }
        Ok(self)
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &OrderedHeaderMap {
        &self.headers
    }

    pub fn auth(&self) -> Option<&str> {
        self.auth.as_deref()
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn max_redirects_per_location(&self) -> u32 {
        self.max_redirects_per_location
    }

    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    pub fn decompress(&self) -> bool {
        self.decompress
    }

    /// Fails with `InvalidUrl` until a host is known.
    pub fn validate(&self) -> Result<(), NetError> {
        match self.host.as_deref() {
            Some(host) if !host.is_empty() => Ok(()),
            _ => Err(NetError::InvalidUrl),
        }
    }

    /// Absolute URL of the current target, the base for relative redirects.
    pub fn effective_url(&self) -> Result<Url, NetError> {
        self.validate()?;
        let host = self.host.as_deref().unwrap_or_default();
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        Url::parse(&format!("{}://{}{}", self.scheme.as_str(), host, path))
            .map_err(|_| NetError::InvalidUrl)
    }

    /// Identity of the current target for loop detection.
    pub fn location_key(&self) -> String {
        format!(
            "{}://{}{}",
            self.scheme.as_str(),
            self.host.as_deref().unwrap_or_default(),
            self.path
        )
    }

    /// What cookie matching needs to know about the current target.
    pub fn origin(&self) -> RequestOrigin {
        RequestOrigin::new(
            self.host.clone().unwrap_or_default(),
            self.path.clone(),
            self.scheme.is_secure(),
        )
    }

    /// Same scheme and host (port included) as `other`.
    pub fn same_origin(&self, other: &RequestSpec) -> bool {
        self.scheme == other.scheme
            && match (self.host.as_deref(), other.host.as_deref()) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => false,
            }
    }

    /// Freeze the request description into the request a transport sends.
    pub fn to_physical(&self, cookie: Option<&str>) -> Result<PhysicalRequest, NetError> {
        self.validate()?;

        let mut headers = self.headers.clone();
        if self.decompress && !headers.contains(ACCEPT_ENCODING_HEADER.as_str()) {
            headers.insert_typed(
                ACCEPT_ENCODING_HEADER,
                HeaderValue::from_static(ACCEPT_ENCODING),
            );
        }
        if let Some(cookie) = cookie {
            let value = HeaderValue::from_str(cookie).map_err(|_| NetError::InvalidHeader)?;
            headers.insert_typed(COOKIE, value);
        }

        Ok(PhysicalRequest {
            method: self.method.clone(),
            scheme: self.scheme,
            host: self.host.clone().unwrap_or_default(),
            path: if self.path.is_empty() {
                "/".to_string()
            } else {
                self.path.clone()
            },
            headers: headers.to_header_map(),
            auth: self.auth.clone(),
            body: self.body.clone(),
        })
    }

    /// Drop credentials before following a redirect to another origin.
    pub(crate) fn strip_credentials(&mut self) {
        self.auth = None;
        self.headers.remove(AUTHORIZATION.as_str());
        self.headers.remove(COOKIE.as_str());
    }
}
