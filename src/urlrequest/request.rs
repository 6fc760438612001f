use crate::base::fetchstate::FetchState;
use crate::base::neterror::NetError;
use crate::cookies::agent::{CookieAgent, CookieStore};
use crate::http::requestbody::RequestBody;
use crate::http::response::ResponseHead;
use crate::urlrequest::context::FetchContext;
use crate::urlrequest::job::{EngineLink, FetchEngine};
use crate::urlrequest::requestspec::RequestSpec;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use http::header::USER_AGENT;
use http::Method;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use tokio::sync::{mpsc, oneshot, watch};

/// Start a fetch of `url` with the default context.
///
/// The fetch begins on the first poll of the returned stream (or the first
/// call to [`Fetch::response`], [`Fetch::bytes`] and friends). A malformed
/// URL is reported there as well.
pub fn fetch(url: &str) -> Fetch {
    Fetch::new(Some(url), true)
}

/// Handle to one logical fetch: a fluent request builder that is also the
/// stream of decoded response bytes.
///
/// Setters return `&mut Self` and never fail; the first invalid input is
/// held back and surfaces as the stream's single error once the fetch runs.
/// Configuration changes after the fetch has started have no effect.
pub struct Fetch {
    context: FetchContext,
    spec: RequestSpec,
    cookies: Option<CookieAgent>,
    autostart: bool,
    started: bool,
    aborted: bool,
    pending_error: Option<NetError>,
    waker: Option<Waker>,

    abort_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<FetchState>,
    state_tx: Option<watch::Sender<FetchState>>,
    output_tx: Option<mpsc::Sender<Result<Bytes, NetError>>>,
    output_rx: mpsc::Receiver<Result<Bytes, NetError>>,
    response_tx: Option<oneshot::Sender<ResponseHead>>,
    response_rx: Option<oneshot::Receiver<ResponseHead>>,
    response: Option<ResponseHead>,
}

impl Fetch {
    /// `url` may be `None` to configure the target with setters. With
    /// `autostart` off nothing happens until [`Fetch::run`].
    pub fn new(url: Option<&str>, autostart: bool) -> Self {
        let mut fetch = Self::with_context(FetchContext::global());
        fetch.autostart = autostart;
        if let Some(url) = url {
            fetch.url(url);
        }
        fetch
    }

    /// A fetch that waits for an explicit [`Fetch::run`].
    pub fn manual() -> Self {
        Self::new(None, false)
    }

    /// An auto-starting fetch with no target, issued through `context`.
    pub fn with_context(context: FetchContext) -> Self {
        let (abort_tx, _) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(FetchState::Idle);
        let (output_tx, output_rx) = mpsc::channel(context.channel_capacity());
        let (response_tx, response_rx) = oneshot::channel();

        let mut spec = RequestSpec::new();
        let mut pending_error = None;
        if let Some(ua) = context.user_agent() {
            if let Err(e) = spec.set_header(USER_AGENT.as_str(), ua) {
                pending_error = Some(e);
            }
        }

        Self {
            context,
            spec,
            cookies: None,
            autostart: true,
            started: false,
            aborted: false,
            pending_error,
            waker: None,
            abort_tx,
            state_rx,
            state_tx: Some(state_tx),
            output_tx: Some(output_tx),
            output_rx,
            response_tx: Some(response_tx),
            response_rx: Some(response_rx),
            response: None,
        }
    }

    fn record<T>(&mut self, result: Result<T, NetError>) -> &mut Self {
        if let Err(e) = result {
            self.pending_error.get_or_insert(e);
        }
        self
    }

    /// `host[:port]`
    pub fn host(&mut self, host: impl Into<String>) -> &mut Self {
        self.spec.set_host(host);
        self
    }

    /// Path and query.
    pub fn path(&mut self, path: impl Into<String>) -> &mut Self {
        self.spec.set_path(path);
        self
    }

    /// Request method, e.g. `"POST"` or `Method::PUT`.
    pub fn method<M>(&mut self, method: M) -> &mut Self
    where
        Method: TryFrom<M>,
    {
        match Method::try_from(method) {
            Ok(method) => {
                self.spec.set_method(method);
                self
            }
            Err(_) => self.record::<()>(Err(NetError::MethodNotSupported)),
        }
    }

    pub fn secure(&mut self, secure: bool) -> &mut Self {
        self.spec.set_secure(secure);
        self
    }

    /// Set one header; a later call for the same name wins.
    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        let result = self.spec.set_header(name, value).map(|_| ());
        self.record(result)
    }

    /// Alias of [`Fetch::header`].
    pub fn set(&mut self, name: &str, value: &str) -> &mut Self {
        self.header(name, value)
    }

    /// Merge many headers at once.
    pub fn headers<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let result = self.spec.set_headers(pairs).map(|_| ());
        self.record(result)
    }

    pub fn user_agent(&mut self, ua: &str) -> &mut Self {
        self.header(USER_AGENT.as_str(), ua)
    }

    /// `user:password`, or an opaque token when `password` is `None`.
    pub fn auth(&mut self, username: &str, password: Option<&str>) -> &mut Self {
        self.spec.set_auth(username, password);
        self
    }

    /// Payload sent with every physical request.
    pub fn send(&mut self, body: impl Into<RequestBody>) -> &mut Self {
        self.spec.set_body(body);
        self
    }

    /// Re-target the fetch. Relative URLs resolve against the current target.
    pub fn url(&mut self, url: &str) -> &mut Self {
        let base = self.spec.effective_url().ok();
        let result = self.spec.set_url(url, base.as_ref()).map(|_| ());
        self.record(result)
    }

    pub fn follow_redirects(&mut self, follow: bool) -> &mut Self {
        self.spec.set_follow_redirects(follow);
        self
    }

    /// Keep cookies across hops in `jar`, or in the process-wide jar when
    /// `None`. Lets a location be revisited once so a redirect back to it
    /// can carry a freshly set cookie.
    pub fn cookies(&mut self, jar: Option<Arc<dyn CookieStore>>) -> &mut Self {
        self.cookies = Some(match jar {
            Some(store) => CookieAgent::new(store),
            None => CookieAgent::with_default_jar(),
        });
        let budget = self.spec.max_redirects_per_location().max(1);
        self.spec.set_max_redirects_per_location(budget);
        self
    }

    /// Decode `Content-Encoding` (on by default).
    pub fn inflate(&mut self, inflate: bool) -> &mut Self {
        self.spec.set_decompress(inflate);
        self
    }

    pub fn max_redirects_per_location(&mut self, max: u32) -> &mut Self {
        self.spec.set_max_redirects_per_location(max);
        self
    }

    /// Stop the fetch. Before it starts, the stream ends with no data and no
    /// error; while it is in flight, it ends with a connection reset.
    /// Further calls do nothing.
    pub fn abort(&mut self) -> &mut Self {
        if self.aborted {
            return self;
        }
        self.aborted = true;
        self.abort_tx.send_replace(true);
        tracing::debug!(started = self.started, "fetch aborted");
        self
    }

    /// Start the fetch. Only the first call has an effect.
    pub fn run(&mut self) -> &mut Self {
        if self.started {
            return self;
        }
        self.started = true;

        let (Some(output), Some(response), Some(state)) = (
            self.output_tx.take(),
            self.response_tx.take(),
            self.state_tx.take(),
        ) else {
            return self;
        };

        if self.aborted {
            state.send_replace(FetchState::Aborted);
        } else if let Some(err) = self.pending_error.take() {
            tracing::warn!(error = %err, "fetch not started");
            state.send_replace(FetchState::Failed);
            // Capacity is at least one and nothing else has been sent.
            let _ = output.try_send(Err(err));
        } else {
            let engine = FetchEngine::new(
                self.spec.clone(),
                self.cookies.clone(),
                Arc::clone(self.context.transport()),
                EngineLink {
                    abort: self.abort_tx.subscribe(),
                    output,
                    response,
                    state,
                },
            );
            tokio::spawn(engine.run());
        }

        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
        self
    }

    fn autostart(&mut self) {
        if self.autostart && !self.started {
            self.run();
        }
    }

    pub fn state(&self) -> FetchState {
        *self.state_rx.borrow()
    }

    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The final response head, available before any body bytes. `None`
    /// when the fetch ends without one, or when a manual fetch was never run.
    pub async fn response(&mut self) -> Option<ResponseHead> {
        self.autostart();
        if self.response.is_none() && self.started {
            if let Some(rx) = self.response_rx.take() {
                self.response = rx.await.ok();
            }
        }
        self.response.clone()
    }

    /// Collect the whole decoded body.
    pub async fn bytes(&mut self) -> Result<Bytes, NetError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Collect the body as UTF-8 text.
    pub async fn text(&mut self) -> Result<String, NetError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| NetError::InvalidUtf8)
    }

    /// Collect the body and parse it as JSON.
    #[cfg(feature = "json")]
    pub async fn json<T: serde::de::DeserializeOwned>(&mut self) -> Result<T, NetError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|_| NetError::JsonParseError)
    }
}

impl Default for Fetch {
    fn default() -> Self {
        Self::new(None, true)
    }
}

impl Stream for Fetch {
    type Item = Result<Bytes, NetError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.autostart();

        if !this.started {
            if this.aborted {
                return Poll::Ready(None);
            }
            this.waker = Some(cx.waker().clone());
            return Poll::Pending;
        }

        // After abort, buffered data is dropped; only the error gets through.
        loop {
            match this.output_rx.poll_recv(cx) {
                Poll::Ready(Some(Ok(_))) if this.aborted => continue,
                other => return other,
            }
        }
    }
}

impl fmt::Debug for Fetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetch")
            .field("spec", &self.spec)
            .field("state", &self.state())
            .field("started", &self.started)
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}
