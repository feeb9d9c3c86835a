//! Call forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Call past the gates (any method)
//!     → director.rs (select backend, copy metadata + x-forwarded-for)
//!     → relay.rs (stream request frames to backend,
//!                 stream response frames + trailers back)
//! ```
//!
//! # Design Decisions
//! - No per-method code: the relay works on the method path and raw frames
//! - Backend errors are returned verbatim; transport failures become
//!   `UNAVAILABLE`
//! - No retries, no internal timeouts: the caller's deadline bounds the call

pub mod director;
pub mod relay;

pub use director::{forwarding_headers, Direction, StreamDirector, X_FORWARDED_FOR};
pub use relay::relay_handler;
