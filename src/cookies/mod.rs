//! Cookie handling.
//!
//! | Chromium (C++) | fetchlet (Rust) | Responsibility |
//! |----------------|-----------------|----------------|
//! | `net::CookieMonster` | [`CookieMonster`](monster::CookieMonster) | In-memory jar |
//! | `net::CanonicalCookie` | [`CanonicalCookie`](canonicalcookie::CanonicalCookie) | Single cookie |
//! | `net::CookieStore` | [`CookieStore`](agent::CookieStore) | Jar interface |
//!
//! [`CookieAgent`](agent::CookieAgent) is what the fetch engine talks to: it
//! attaches a `Cookie` header before each physical request and stores the
//! `Set-Cookie` lines of every response.

pub mod agent;
pub mod canonicalcookie;
pub mod monster;

pub use agent::{default_jar, CookieAgent, CookieStore, RequestOrigin};
pub use canonicalcookie::CanonicalCookie;
pub use monster::CookieMonster;
