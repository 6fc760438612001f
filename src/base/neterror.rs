use std::io;
use thiserror::Error;

/// Coarse classification of a [`NetError`].
///
/// Every fetch failure falls into exactly one of these buckets; callers that
/// only care about "what went wrong" rather than the precise code can match
/// on this instead of the full enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The URL (or a redirect target) could not be used.
    InvalidUrl,
    /// The final response status was not acceptable.
    Http,
    /// A location exceeded its visit budget.
    RedirectLoop,
    /// Connection level failure, including abort-induced resets.
    Transport,
    /// A content codec rejected the response body.
    Decode,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NetError {
    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection aborted")]
    ConnectionAborted,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Connection to {host}:{port} failed: {reason}")]
    ConnectionFailedTo {
        host: String,
        port: u16,
        reason: String,
    },
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("Name {domain} not resolved: {reason}")]
    NameNotResolvedFor { domain: String, reason: String },
    #[error("Socket not connected")]
    SocketNotConnected,
    #[error("SSL protocol error")]
    SslProtocolError,
    #[error("Connection timed out")]
    ConnectionTimedOut,

    // URL Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Unknown URL scheme")]
    UnknownUrlScheme,
    #[error("Invalid redirect: {location}")]
    InvalidRedirect { location: String },

    // HTTP Errors
    #[error("HTTP Error: {status}")]
    HttpError { status: u16 },
    #[error("Redirect loop detected: {location}")]
    RedirectLoop { location: String },
    #[error("Invalid header")]
    InvalidHeader,
    #[error("Method not supported")]
    MethodNotSupported,
    #[error("Invalid HTTP response")]
    InvalidHttpResponse,
    #[error("Content decoding failed ({encoding}): {reason}")]
    ContentDecodingFailed {
        encoding: &'static str,
        reason: String,
    },

    // Body Consumption Errors
    #[error("Response body is not valid UTF-8")]
    InvalidUtf8,
    #[error("Response body is not valid JSON")]
    JsonParseError,
}

impl NetError {
    /// Chromium-style numeric code for this error.
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionAborted => -103,
            NetError::ConnectionFailed => -104,
            NetError::ConnectionFailedTo { .. } => -104,
            NetError::NameNotResolved => -105,
            NetError::NameNotResolvedFor { .. } => -105,
            NetError::SslProtocolError => -107,
            NetError::SocketNotConnected => -112,
            NetError::ConnectionTimedOut => -118,

            NetError::InvalidUrl => -300,
            NetError::UnknownUrlScheme => -302,
            NetError::InvalidRedirect { .. } => -303,
            NetError::MethodNotSupported => -322,
            NetError::ContentDecodingFailed { .. } => -330,
            NetError::InvalidHttpResponse => -370,

            // Custom codes, kept clear of the Blob range (-900 to -906)
            NetError::RedirectLoop { .. } => -10000,
            NetError::HttpError { .. } => -10001,
            NetError::InvalidHeader => -10002,
            NetError::InvalidUtf8 => -10003,
            NetError::JsonParseError => -10004,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NetError::InvalidUrl
            | NetError::UnknownUrlScheme
            | NetError::InvalidRedirect { .. }
            | NetError::InvalidHeader
            | NetError::MethodNotSupported => ErrorKind::InvalidUrl,
            NetError::HttpError { .. } => ErrorKind::Http,
            NetError::RedirectLoop { .. } => ErrorKind::RedirectLoop,
            NetError::ContentDecodingFailed { .. }
            | NetError::InvalidUtf8
            | NetError::JsonParseError => ErrorKind::Decode,
            _ => ErrorKind::Transport,
        }
    }

    /// True for connection level failures (DNS, reset, timeout, abort).
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// Status code carried by an [`NetError::HttpError`].
    pub fn status(&self) -> Option<u16> {
        match self {
            NetError::HttpError { status } => Some(*status),
            _ => None,
        }
    }

    pub fn connection_failed_to(host: impl Into<String>, port: u16, err: io::Error) -> Self {
        NetError::ConnectionFailedTo {
            host: host.into(),
            port,
            reason: err.to_string(),
        }
    }

    pub fn dns_failed(domain: impl Into<String>, err: io::Error) -> Self {
        NetError::NameNotResolvedFor {
            domain: domain.into(),
            reason: err.to_string(),
        }
    }

    pub fn decoding_failed(encoding: &'static str, err: impl std::fmt::Display) -> Self {
        NetError::ContentDecodingFailed {
            encoding,
            reason: err.to_string(),
        }
    }

    /// Map a hyper error onto the closest network error.
    pub fn from_hyper(err: &hyper::Error) -> Self {
        use std::error::Error as _;

        let mut source = err.source();
        while let Some(cause) = source {
            if let Some(io_err) = cause.downcast_ref::<io::Error>() {
                return NetError::from(io_err.kind());
            }
            source = cause.source();
        }

        if err.is_parse() || err.is_parse_status() {
            NetError::InvalidHttpResponse
        } else if err.is_timeout() {
            NetError::ConnectionTimedOut
        } else if err.is_canceled() {
            NetError::ConnectionAborted
        } else {
            NetError::ConnectionClosed
        }
    }
}

impl From<io::ErrorKind> for NetError {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe => NetError::ConnectionReset,
            io::ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
            io::ErrorKind::ConnectionAborted => NetError::ConnectionAborted,
            io::ErrorKind::NotConnected => NetError::SocketNotConnected,
            io::ErrorKind::TimedOut => NetError::ConnectionTimedOut,
            io::ErrorKind::UnexpectedEof => NetError::ConnectionClosed,
            _ => NetError::ConnectionFailed,
        }
    }
}

impl From<io::Error> for NetError {
    fn from(err: io::Error) -> Self {
        NetError::from(err.kind())
    }
}
