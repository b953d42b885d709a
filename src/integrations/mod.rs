//! Web framework integrations.
//!
//! | Framework | Feature Flag | Module |
//! |-----------|--------------|--------|
//! | Axum | `axum-integration` | `axum` |
//!
//! The integration only maps HTTP onto [`crate::service`]; all conversion
//! logic lives there.

#[cfg(feature = "axum-integration")]
pub mod axum;
