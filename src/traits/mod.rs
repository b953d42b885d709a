//! Traits shared by the session layer.
//!
//! - [`Healthcheck`]: liveness probing, implemented by
//!   [`RenderSession`](crate::RenderSession).

mod healthcheck;

pub use healthcheck::Healthcheck;
