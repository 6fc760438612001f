//! The seam between the fetch engine and the network.
//!
//! A [`Transport`] performs exactly one physical request: connect, write the
//! request head and payload, read the response head, and hand back the body
//! as a byte stream. Redirects, cookies and decoding all live above it.

use crate::base::neterror::NetError;
use crate::http::requestbody::RequestBody;
use crate::http::response::ResponseHead;
use crate::urlrequest::requestspec::Scheme;
use bytes::Bytes;
use futures::Stream;
use http::{HeaderMap, Method};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Response body chunks as they come off the wire.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, NetError>> + Send>>;

/// Alias for the `Future` type returned by a transport.
pub type Sending = Pin<Box<dyn Future<Output = Result<TransportResponse, NetError>> + Send>>;

/// Snapshot of everything needed to issue one physical request.
#[derive(Debug, Clone)]
pub struct PhysicalRequest {
    pub method: Method,
    pub scheme: Scheme,
    /// `host[:port]`
    pub host: String,
    /// Origin-form request target (path and query).
    pub path: String,
    pub headers: HeaderMap,
    /// Credential token (`user:pass` or opaque), rendered by the transport.
    pub auth: Option<String>,
    pub body: RequestBody,
}

impl PhysicalRequest {
    pub fn url(&self) -> String {
        format!("{}://{}{}", self.scheme.as_str(), self.host, self.path)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Response head plus the still-unread body.
pub struct TransportResponse {
    pub head: ResponseHead,
    pub body: BodyStream,
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

/// Trait for issuing physical requests.
///
/// Dropping the returned future, or the body stream it yields, cancels the
/// exchange at the connection level.
pub trait Transport: Send + Sync {
    fn send(&self, request: PhysicalRequest) -> Sending;
}

/// Blanket implementation for Arc-wrapped transports.
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: PhysicalRequest) -> Sending {
        (**self).send(request)
    }
}
