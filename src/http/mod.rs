//! HTTP plumbing below the fetch engine: headers, payloads, response heads,
//! content decoding, and the transport that puts bytes on the wire.

pub mod contentdecoder;
pub mod httptransport;
pub mod orderedheaders;
pub mod requestbody;
pub mod response;
pub mod transport;

// Re-exports for convenience
pub use contentdecoder::{ContentDecoder, ContentEncoding};
pub use httptransport::HttpTransport;
pub use orderedheaders::OrderedHeaderMap;
pub use requestbody::RequestBody;
pub use response::ResponseHead;
pub use transport::{BodyStream, PhysicalRequest, Transport, TransportResponse};
