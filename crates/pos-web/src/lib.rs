//! Shared axum scaffolding for the POS transactional core's HTTP surfaces.
//!
//! Every service crate (`pos-cart`, `pos-terminal`, `pos-stock`,
//! `pos-report`) builds its router on top of this crate: the uniform error
//! envelope, the bearer-JWT / API-key / service-JWT auth extractors, the
//! correlation-id middleware, and the health-check handlers.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod envelope;
pub mod extractors;
pub mod handlers;
pub mod middleware;

pub use auth::{mint_service_token, AuthError, JwtKeys, ResolvedTerminal, ServiceClaims, TenantClaims, TerminalApiKey};
pub use envelope::AppError;
pub use extractors::{AcceptLanguage, CorrelationId};
pub use handlers::{health_check, health_check_ready, ComponentHealth, HealthCheckable, HealthStatus, SystemHealthCheck};
pub use middleware::{correlation_id_layer, CorrelationIdExt, CORRELATION_ID_HEADER};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
