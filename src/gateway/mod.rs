//! Request forwarding gateway.
//!
//! # Data Flow
//! ```text
//! Browser request (/api/proxy/{*path})
//!     → handler.rs (resolve path, extract auth + content type)
//!     → body.rs (decode body per content type)
//!     → url.rs (compute upstream URL)
//!     → forward.rs (single upstream call, auth relay)
//!     → classify.rs (binary | json | no-content | unrecognized)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - Stateless: nothing survives a request except the pooled client
//! - Exactly one upstream call per inbound request
//! - Every failure becomes a well-formed JSON response

pub mod auth;
pub mod body;
pub mod classify;
pub mod client;
pub mod error;
pub mod forward;
pub mod handler;
pub mod image;
pub mod url;

pub use body::OutboundBody;
pub use classify::{classify, ResponseKind};
pub use error::{GatewayError, GatewayResult};
pub use forward::{Forwarder, UpstreamCall};
pub use self::url::UrlNormalizer;
