//! Convenient imports for common usage patterns.
//!
//! ```rust,ignore
//! use html2pdf_gateway::prelude::*;
//! ```
//!
//! This imports the session layer ([`SessionManager`], [`ChromeEngine`],
//! [`SessionStats`]), the conversion layer ([`ConversionService`],
//! [`DocumentRenderer`], [`RenderRequest`]), storage ([`ArtifactStore`],
//! [`LocalStorageProvider`]) and the error types, plus [`Arc`].

pub use crate::config::{ServerConfig, ServerConfigBuilder, StorageConfig};
pub use crate::engine::ChromeEngine;
pub use crate::error::{EngineError, Result};
pub use crate::handle::ContextHandle;
pub use crate::layout::{PageLayout, WaitPolicy};
pub use crate::manager::{SessionManager, SessionManagerBuilder};
pub use crate::service::{ConversionService, DocumentRenderer, RenderRequest, ServiceError};
pub use crate::stats::SessionStats;
pub use crate::storage::{ArtifactStore, LocalStorageProvider, StorageError};
pub use crate::traits::Healthcheck;

#[cfg(feature = "env-config")]
pub use crate::config::env::from_env;

pub use std::sync::Arc;
