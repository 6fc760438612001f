//! Socket establishment.
//!
//! - [`connectjob`]: DNS → TCP → TLS connection flow
//! - [`client`]: plain or TLS stream behind one type
//! - [`tls`]: TLS configuration with BoringSSL

pub mod client;
pub mod connectjob;
pub mod tls;
