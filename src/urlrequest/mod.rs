//! The caller-facing fetch API and the engine behind it.
//!
//! - [`request`]: the [`Fetch`](request::Fetch) handle and [`fetch`](request::fetch)
//! - [`requestspec`]: target, headers, payload and policies of a fetch
//! - [`redirecttracker`]: per-location visit budget for loop detection
//! - [`job`]: the request/redirect/decode state machine
//! - [`context`]: shared configuration and transport

pub mod context;
pub mod job;
pub mod redirecttracker;
pub mod request;
pub mod requestspec;

pub use context::{FetchConfig, FetchContext};
pub use job::FetchEngine;
pub use redirecttracker::RedirectTracker;
pub use request::{fetch, Fetch};
pub use requestspec::{RequestSpec, Scheme};
