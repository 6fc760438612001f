//! Fetch Context - shared configuration for fetches.
//!
//! Based on Chromium's net::URLRequestContext: one place that owns the
//! transport and the knobs every fetch started from it shares.

use crate::http::httptransport::HttpTransport;
use crate::http::transport::Transport;
use crate::socket::tls::TlsConfig;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

static DEFAULT_CONTEXT: Lazy<FetchContext> = Lazy::new(FetchContext::new);

/// Configuration options for a [`FetchContext`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User-Agent sent unless a fetch sets its own (None = no header).
    pub user_agent: Option<String>,

    /// Limit on DNS + TCP + TLS setup per physical request.
    pub connect_timeout: Option<Duration>,

    /// Decoded chunks buffered ahead of the consumer.
    pub channel_capacity: usize,

    /// TLS settings for `https` targets.
    pub tls: TlsConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            connect_timeout: Some(Duration::from_secs(30)),
            channel_capacity: 16,
            tls: TlsConfig::default(),
        }
    }
}

/// Configuration plus the transport fetches are issued through.
#[derive(Clone)]
pub struct FetchContext {
    transport: Arc<dyn Transport>,
    config: FetchConfig,
}

impl FetchContext {
    /// Create a context with default configuration.
    pub fn new() -> Self {
        Self::with_config(FetchConfig::default())
    }

    /// Create a context whose [`HttpTransport`] follows `config`.
    pub fn with_config(config: FetchConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(
            config.tls.clone(),
            config.connect_timeout,
        ));
        Self { transport, config }
    }

    /// Create a context over a caller-provided transport.
    pub fn with_transport(config: FetchConfig, transport: Arc<dyn Transport>) -> Self {
        Self { transport, config }
    }

    /// The process-wide context used by [`crate::fetch`].
    pub fn global() -> Self {
        DEFAULT_CONTEXT.clone()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.config.user_agent.as_deref()
    }

    /// Output buffer size, never below one chunk.
    pub fn channel_capacity(&self) -> usize {
        self.config.channel_capacity.max(1)
    }
}

impl Default for FetchContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FetchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
