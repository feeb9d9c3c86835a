//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming call:
//!     → auth.rs (verify bearer token)
//!     → Pass to cache / metrics gates
//! ```
//!
//! # Design Decisions
//! - Runs before every other gate: rejected callers never touch the cache
//!   or a backend
//! - Fail closed: reject on any verification failure
//! - Stateless: no sessions, each call is verified on its own

pub mod auth;

pub use auth::{AuthError, Authenticator, JwtAuthenticator};
