//! Liveness and readiness endpoints.
//!
//! Liveness (`GET /health`) answers "is the process alive" and never checks
//! a dependency. Readiness (`GET /health/ready`) aggregates whatever
//! dependency checks the owning service registers — its Postgres pool, its
//! event bus connection, its circuit breaker state — and degrades the HTTP
//! status accordingly.

use axum::{async_trait, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

/// Health status for a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    #[must_use]
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

/// Health of a single dependency, as reported by a [`HealthCheckable`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub message: String,
    pub last_check: SystemTime,
}

impl ComponentHealth {
    #[must_use]
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            message: message.into(),
            last_check: SystemTime::now(),
        }
    }

    #[must_use]
    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            message: message.into(),
            last_check: SystemTime::now(),
        }
    }

    #[must_use]
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message: message.into(),
            last_check: SystemTime::now(),
        }
    }
}

/// A dependency a service wants surfaced on its readiness probe: a
/// Postgres pool, the event bus connection, the delivery tracker's
/// circuit breaker.
#[async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn check_health(&self) -> ComponentHealth;
    fn component_name(&self) -> &str;
}

/// Aggregates every registered [`HealthCheckable`] into one readiness
/// verdict: unhealthy if any component is unhealthy, degraded if any is
/// degraded, healthy only if all are healthy.
#[derive(Default, Clone)]
pub struct SystemHealthCheck {
    checks: Vec<Arc<dyn HealthCheckable>>,
}

impl SystemHealthCheck {
    #[must_use]
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn add_check(&mut self, check: Arc<dyn HealthCheckable>) {
        self.checks.push(check);
    }

    pub async fn check_all(&self) -> HashMap<String, ComponentHealth> {
        let futures = self.checks.iter().map(|check| async move {
            (check.component_name().to_string(), check.check_health().await)
        });
        futures::future::join_all(futures).await.into_iter().collect()
    }

    pub async fn overall_health(&self) -> HealthStatus {
        let results = self.check_all().await;
        if results.values().any(|h| h.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if results.values().any(|h| h.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Simple liveness probe. Returns 200 OK unconditionally: if this handler
/// runs at all, the process is alive. Does not touch any dependency.
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness probe: aggregates the dependency checks registered on the
/// service's [`SystemHealthCheck`].
pub async fn health_check_ready(State(system_health): State<Arc<SystemHealthCheck>>) -> (StatusCode, Json<HashMap<String, ComponentHealth>>) {
    let results = system_health.check_all().await;
    let status = if results.values().any(|h| h.status == HealthStatus::Unhealthy) {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockHealthCheck {
        name: String,
        status: HealthStatus,
    }

    #[async_trait]
    impl HealthCheckable for MockHealthCheck {
        async fn check_health(&self) -> ComponentHealth {
            match self.status {
                HealthStatus::Healthy => ComponentHealth::healthy("ok"),
                HealthStatus::Degraded => ComponentHealth::degraded("slow"),
                HealthStatus::Unhealthy => ComponentHealth::unhealthy("down"),
            }
        }

        fn component_name(&self) -> &str {
            &self.name
        }
    }

    #[tokio::test]
    async fn liveness_is_always_ok() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn overall_health_is_worst_of_components() {
        let mut system = SystemHealthCheck::new();
        system.add_check(Arc::new(MockHealthCheck {
            name: "postgres".to_string(),
            status: HealthStatus::Healthy,
        }));
        system.add_check(Arc::new(MockHealthCheck {
            name: "redpanda".to_string(),
            status: HealthStatus::Degraded,
        }));

        assert_eq!(system.overall_health().await, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn unhealthy_component_dominates() {
        let mut system = SystemHealthCheck::new();
        system.add_check(Arc::new(MockHealthCheck {
            name: "postgres".to_string(),
            status: HealthStatus::Unhealthy,
        }));
        system.add_check(Arc::new(MockHealthCheck {
            name: "redpanda".to_string(),
            status: HealthStatus::Healthy,
        }));

        assert_eq!(system.overall_health().await, HealthStatus::Unhealthy);
    }
}
