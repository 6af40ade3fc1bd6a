//! Handlers shared across every service crate's router.

pub mod health;

pub use health::{
    health_check, health_check_ready, ComponentHealth, HealthCheckable, HealthStatus,
    SystemHealthCheck,
};
