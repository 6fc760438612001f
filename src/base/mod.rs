//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): network error codes, classified by [`ErrorKind`](neterror::ErrorKind)
//! - [`FetchState`](fetchstate::FetchState): lifecycle of one logical fetch

pub mod fetchstate;
pub mod neterror;
