//! gRPC wire conventions the gateway relies on.
//!
//! A call is one HTTP/2 stream. The request path names the method
//! (`/package.Service/Method`) and the outcome travels in the `grpc-status`
//! trailer. Nothing here parses message payloads.

pub mod status;

pub use status::{Code, Status, CONTENT_TYPE_GRPC, GRPC_MESSAGE, GRPC_STATUS};
