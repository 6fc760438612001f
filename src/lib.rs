//! # fetchlet
//!
//! A fluent, stream-oriented HTTP(S) GET/POST helper.
//!
//! One call turns a URL into a single stream of decoded body bytes, however
//! many redirects it takes to get there. The request can still be tuned
//! (headers, auth, method, payload, cookies) and aborted.
//!
//! ## Features
//!
//! - **Redirects**: followed in a loop, with per-location loop detection
//! - **Decompression**: gzip, deflate and (feature `brotli`) brotli
//! - **Cookies**: optional jar carried across hops
//! - **Backpressure**: bounded output buffer, the network waits for the reader
//! - **TLS**: BoringSSL for `https`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fetchlet::fetch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fetchlet::NetError> {
//!     let mut f = fetch("http://example.com/simple/data");
//!     f.header("Accept", "text/plain").cookies(None);
//!
//!     if let Some(head) = f.response().await {
//!         println!("Status: {}", head.status());
//!     }
//!     let body = f.text().await?;
//!     println!("{}", body);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error definitions and fetch state
//! - [`cookies`] - Cookie jar and the agent the engine uses
//! - [`http`] - Headers, payloads, decoding and the transport seam
//! - [`socket`] - DNS, TCP and TLS connection setup
//! - [`urlrequest`] - The `Fetch` handle and the redirect state machine

pub mod base;
pub mod cookies;
pub mod http;
pub mod socket;
pub mod urlrequest;

pub use crate::base::fetchstate::FetchState;
pub use crate::base::neterror::{ErrorKind, NetError};
pub use crate::cookies::{CookieMonster, CookieStore};
pub use crate::http::contentdecoder::{ACCEPT_ENCODING, BROTLI};
pub use crate::http::response::ResponseHead;
pub use crate::urlrequest::{fetch, Fetch, FetchConfig, FetchContext};
