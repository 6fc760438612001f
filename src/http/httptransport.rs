//! Default [`Transport`]: one HTTP/1.1 connection per physical request.

use crate::base::neterror::NetError;
use crate::http::response::ResponseHead;
use crate::http::transport::{BodyStream, PhysicalRequest, Sending, Transport, TransportResponse};
use crate::socket::connectjob::ConnectJob;
use crate::socket::tls::TlsConfig;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::{future, TryStreamExt};
use http::header::{AUTHORIZATION, CONTENT_LENGTH, HOST};
use http::{HeaderValue, Request};
use http_body_util::BodyStream as FrameStream;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use std::time::Duration;

/// Connects, writes one request, and streams the response back.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    tls: Arc<TlsConfig>,
    connect_timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(tls: TlsConfig, connect_timeout: Option<Duration>) -> Self {
        Self {
            tls: Arc::new(tls),
            connect_timeout,
        }
    }

    async fn execute(
        tls: Arc<TlsConfig>,
        connect_timeout: Option<Duration>,
        request: PhysicalRequest,
    ) -> Result<TransportResponse, NetError> {
        let url = request.url();

        let connect = ConnectJob::connect(request.scheme, &request.host, &tls);
        let socket = match connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| NetError::ConnectionTimedOut)??,
            None => connect.await?,
        };

        let io = TokioIo::new(socket);
        let (mut sender, conn) = http1::handshake(io)
            .await
            .map_err(|e| NetError::from_hyper(&e))?;

        // Drives the connection until the response body is drained or dropped.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "connection closed with error");
            }
        });

        let http_request = build_request(request)?;
        let response = sender
            .send_request(http_request)
            .await
            .map_err(|e| NetError::from_hyper(&e))?;

        let (parts, body) = response.into_parts();
        let head = ResponseHead::from_parts(parts).with_url(url);
        let body: BodyStream = Box::pin(
            FrameStream::new(body)
                .map_err(|e| NetError::from_hyper(&e))
                .try_filter_map(|frame| future::ready(Ok(frame.into_data().ok()))),
        );

        Ok(TransportResponse { head, body })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: PhysicalRequest) -> Sending {
        Box::pin(Self::execute(
            Arc::clone(&self.tls),
            self.connect_timeout,
            request,
        ))
    }
}

/// Render a [`PhysicalRequest`] as an origin-form HTTP/1.1 request.
fn build_request(
    request: PhysicalRequest,
) -> Result<Request<http_body_util::Full<bytes::Bytes>>, NetError> {
    let PhysicalRequest {
        method,
        host,
        path,
        mut headers,
        auth,
        body,
        ..
    } = request;

    if !headers.contains_key(HOST) {
        let value = HeaderValue::from_str(&host).map_err(|_| NetError::InvalidUrl)?;
        headers.insert(HOST, value);
    }

    if let Some(token) = auth {
        if !headers.contains_key(AUTHORIZATION) {
            let value = HeaderValue::from_str(&format!("Basic {}", STANDARD.encode(token)))
                .map_err(|_| NetError::InvalidHeader)?;
            headers.insert(AUTHORIZATION, value);
        }
    }

    if !body.is_empty() {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    }

    let mut req = Request::builder()
        .method(method)
        .uri(path.as_str())
        .body(body.into_full())
        .map_err(|_| NetError::InvalidUrl)?;
    *req.headers_mut() = headers;
    Ok(req)
}
