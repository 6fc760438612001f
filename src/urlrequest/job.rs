//! The fetch engine: one logical fetch, any number of physical requests.

use crate::base::fetchstate::FetchState;
use crate::base::neterror::NetError;
use crate::cookies::agent::CookieAgent;
use crate::http::contentdecoder::{ContentDecoder, ContentEncoding};
use crate::http::response::ResponseHead;
use crate::http::transport::{BodyStream, Transport, TransportResponse};
use crate::urlrequest::redirecttracker::RedirectTracker;
use crate::urlrequest::requestspec::RequestSpec;
use bytes::Bytes;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

/// Chunks (or the single terminal error) handed to the caller.
pub type OutputSender = mpsc::Sender<Result<Bytes, NetError>>;

/// Channel ends the engine drives.
pub(crate) struct EngineLink {
    pub abort: watch::Receiver<bool>,
    pub output: OutputSender,
    pub response: oneshot::Sender<ResponseHead>,
    pub state: watch::Sender<FetchState>,
}

/// How a fetch ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    /// Aborted between physical requests.
    Aborted,
    /// The caller dropped the output stream.
    Detached,
}

/// Runs the request/redirect/decode loop for a single logical fetch.
///
/// Owns its spec and tracker outright; nothing is shared with other fetches
/// except the cookie store and the transport.
pub struct FetchEngine {
    spec: RequestSpec,
    tracker: RedirectTracker,
    cookies: Option<CookieAgent>,
    transport: Arc<dyn Transport>,
    abort: watch::Receiver<bool>,
    output: OutputSender,
    response: Option<oneshot::Sender<ResponseHead>>,
    state: watch::Sender<FetchState>,
}

impl FetchEngine {
    pub(crate) fn new(
        spec: RequestSpec,
        cookies: Option<CookieAgent>,
        transport: Arc<dyn Transport>,
        link: EngineLink,
    ) -> Self {
        let tracker = RedirectTracker::new(spec.max_redirects_per_location());
        Self {
            spec,
            tracker,
            cookies,
            transport,
            abort: link.abort,
            output: link.output,
            response: Some(link.response),
            state: link.state,
        }
    }

    /// Drive the fetch to a terminal state. Dropping the engine afterwards
    /// closes the output stream.
    pub async fn run(mut self) {
        if self.is_aborted() {
            debug!("fetch aborted before start");
            self.set_state(FetchState::Aborted);
            return;
        }

        match self.drive().await {
            Ok(Outcome::Completed) => self.set_state(FetchState::Closed),
            Ok(Outcome::Aborted) => {
                debug!(url = %self.spec.location_key(), "fetch aborted between requests");
                self.set_state(FetchState::Aborted);
            }
            Ok(Outcome::Detached) => {
                debug!(url = %self.spec.location_key(), "output stream dropped");
                self.set_state(FetchState::Closed);
            }
            Err(err) => {
                warn!(url = %self.spec.location_key(), error = %err, "fetch failed");
                let state = if self.is_aborted() {
                    FetchState::Aborted
                } else {
                    FetchState::Failed
                };
                self.set_state(state);
                let _ = self.output.send(Err(err)).await;
            }
        }
    }

    async fn drive(&mut self) -> Result<Outcome, NetError> {
        self.spec.validate()?;

        loop {
            if self.is_aborted() {
                return Ok(Outcome::Aborted);
            }

            let origin = self.spec.origin();
            let cookie = self.cookies.as_ref().and_then(|agent| agent.attach(&origin));
            let request = self.spec.to_physical(cookie.as_deref())?;

            // Every issued request counts against its location; only the
            // visit made while redirecting decides on a loop.
            self.tracker.visit(&self.spec.location_key());

            self.set_state(FetchState::InFlight);
            debug!(method = %request.method, url = %request.url(), "issuing request");
            let TransportResponse { head, body } =
                self.abortable(self.transport.send(request)).await??;
            debug!(status = head.status().as_u16(), url = %head.url(), "response received");

            if let Some(agent) = &self.cookies {
                agent.store(&origin, &head.set_cookies());
            }

            let status = head.status();
            if status.is_redirection() && self.spec.follow_redirects() {
                self.set_state(FetchState::Redirecting);
                drop(body);
                self.follow(&head)?;
                continue;
            }

            if !status.is_success() && !status.is_redirection() {
                return Err(NetError::HttpError {
                    status: status.as_u16(),
                });
            }

            return self.emit(head, body).await;
        }
    }

    /// Re-target the request at the response's Location.
    fn follow(&mut self, head: &ResponseHead) -> Result<(), NetError> {
        let location = head.location().unwrap_or_default().trim().to_string();
        let invalid = || NetError::InvalidRedirect {
            location: location.clone(),
        };
        if location.is_empty() {
            return Err(invalid());
        }

        let base = self.spec.effective_url()?;
        let target = base.join(&location).map_err(|_| invalid())?;
        let previous = self.spec.clone();
        self.spec.apply_url(&target).map_err(|_| invalid())?;

        let embeds_credentials = !target.username().is_empty() || target.password().is_some();
        if !embeds_credentials && !self.spec.same_origin(&previous) {
            self.spec.strip_credentials();
        }

        if self.tracker.visit(&self.spec.location_key()) {
            return Err(NetError::RedirectLoop { location });
        }

        debug!(status = head.status().as_u16(), from = %base, to = %target, "following redirect");
        Ok(())
    }

    /// Relay the final response body to the caller.
    async fn emit(&mut self, head: ResponseHead, mut body: BodyStream) -> Result<Outcome, NetError> {
        self.set_state(FetchState::Emitting);

        let mut decoder = if self.spec.decompress() && head.is_success() {
            Self::select_decoder(&head)
        } else {
            None
        };

        if let Some(tx) = self.response.take() {
            let _ = tx.send(head);
        }

        while let Some(chunk) = self.abortable(body.next()).await? {
            let chunk = chunk?;
            let data = match decoder.as_mut() {
                Some(decoder) => decoder.decode(&chunk)?,
                None => chunk,
            };
            if !data.is_empty() && !self.deliver(data).await? {
                return Ok(Outcome::Detached);
            }
        }

        if let Some(decoder) = decoder {
            let tail = decoder.finish()?;
            if !tail.is_empty() && !self.deliver(tail).await? {
                return Ok(Outcome::Detached);
            }
        }

        Ok(Outcome::Completed)
    }

    fn select_decoder(head: &ResponseHead) -> Option<ContentDecoder> {
        let encoding = ContentEncoding::from_header(head.content_encoding());
        let decoder = encoding.decoder();
        if decoder.is_some() {
            debug!(encoding = encoding.as_str(), "decompressing response");
        }
        decoder
    }

    /// Send one chunk, waiting for the consumer. `false` once it is gone.
    async fn deliver(&self, data: Bytes) -> Result<bool, NetError> {
        let sent = self.abortable(self.output.send(Ok(data))).await?;
        Ok(sent.is_ok())
    }

    /// Race `fut` against abort; abort wins as a connection reset.
    async fn abortable<F: Future>(&self, fut: F) -> Result<F::Output, NetError> {
        let mut abort = self.abort.clone();
        tokio::select! {
            biased;
            _ = wait_aborted(&mut abort) => Err(NetError::ConnectionReset),
            out = fut => Ok(out),
        }
    }

    fn is_aborted(&self) -> bool {
        *self.abort.borrow()
    }

    fn set_state(&self, state: FetchState) {
        self.state.send_replace(state);
    }
}

async fn wait_aborted(abort: &mut watch::Receiver<bool>) {
    if abort.wait_for(|aborted| *aborted).await.is_err() {
        // Handle gone without aborting: never fires.
        std::future::pending::<()>().await;
    }
}
