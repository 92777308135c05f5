//! Health checks
//!
//! `/health/live` only proves the process answers. `/health/ready` and
//! `/health` ping the database and look at the attachment directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use fo_db::Database;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }

    fn combine(self, other: HealthStatus) -> HealthStatus {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            (Self::Degraded, _) | (_, Self::Degraded) => Self::Degraded,
            _ => Self::Healthy,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: Vec<ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    pub fn http_status(&self) -> StatusCode {
        if self.status.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Timeout for a single check
    pub check_timeout: Duration,
    /// How long a report is reused
    pub cache_duration: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_timeout: Duration::from_secs(5),
            cache_duration: Duration::from_secs(10),
        }
    }
}

struct CachedHealth {
    report: HealthReport,
    cached_at: Instant,
}

pub struct HealthChecker {
    config: HealthConfig,
    start_time: Instant,
    cache: RwLock<Option<CachedHealth>>,
    database: Option<Database>,
    storage_root: Option<PathBuf>,
}

impl HealthChecker {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            cache: RwLock::new(None),
            database: None,
            storage_root: None,
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = Some(root.into());
        self
    }

    /// Cached report, or a fresh one once the cache has expired
    pub async fn check(&self) -> HealthReport {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.cached_at.elapsed() < self.config.cache_duration {
                    debug!("Returning cached health report");
                    return cached.report.clone();
                }
            }
        }

        let report = self.perform_checks().await;

        let mut cache = self.cache.write().await;
        *cache = Some(CachedHealth {
            report: report.clone(),
            cached_at: Instant::now(),
        });
        report
    }

    async fn perform_checks(&self) -> HealthReport {
        let components = vec![self.check_database().await, self.check_storage().await];
        let status = components
            .iter()
            .fold(HealthStatus::Healthy, |acc, c| acc.combine(c.status));

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
            timestamp: chrono::Utc::now(),
        }
    }

    async fn check_database(&self) -> ComponentHealth {
        let start = Instant::now();
        let Some(database) = &self.database else {
            return ComponentHealth {
                name: "database".to_string(),
                status: HealthStatus::Degraded,
                message: Some("In-memory store, data is not persisted".to_string()),
                response_time_ms: 0,
                details: Some(serde_json::json!({ "backend": "memory" })),
            };
        };

        let (status, message) = match tokio::time::timeout(self.config.check_timeout, database.ping()).await {
            Ok(Ok(())) => (HealthStatus::Healthy, "Connected".to_string()),
            Ok(Err(e)) => {
                warn!(error = %e, "Database health check failed");
                (HealthStatus::Unhealthy, e.to_string())
            }
            Err(_) => {
                warn!("Database health check timed out");
                (HealthStatus::Unhealthy, "Timed out".to_string())
            }
        };
        let stats = database.stats();

        ComponentHealth {
            name: "database".to_string(),
            status,
            message: Some(message),
            response_time_ms: start.elapsed().as_millis() as u64,
            details: Some(serde_json::json!({
                "backend": "postgres",
                "pool_size": stats.size,
                "idle_connections": stats.idle,
            })),
        }
    }

    async fn check_storage(&self) -> ComponentHealth {
        let start = Instant::now();
        let Some(root) = &self.storage_root else {
            return ComponentHealth {
                name: "storage".to_string(),
                status: HealthStatus::Healthy,
                message: Some("In-memory storage".to_string()),
                response_time_ms: 0,
                details: None,
            };
        };

        let (status, message) = match tokio::fs::metadata(root).await {
            Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => {
                (HealthStatus::Healthy, "Writable".to_string())
            }
            Ok(_) => (HealthStatus::Degraded, "Not a writable directory".to_string()),
            // Created on the first upload
            Err(_) => (HealthStatus::Degraded, "Directory does not exist yet".to_string()),
        };

        ComponentHealth {
            name: "storage".to_string(),
            status,
            message: Some(message),
            response_time_ms: start.elapsed().as_millis() as u64,
            details: Some(serde_json::json!({ "path": root.display().to_string() })),
        }
    }
}

/// State of the health routes
#[derive(Clone)]
pub struct HealthState {
    pub health: Arc<HealthChecker>,
}

/// Liveness check
pub async fn liveness() -> &'static str {
    "OK"
}

/// Readiness check
pub async fn readiness(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.health.check().await;
    (report.http_status(), Json(report))
}

/// Full report
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.health.check().await;
    (report.http_status(), Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_is_degraded_but_serving() {
        let checker = HealthChecker::new(HealthConfig::default());
        let report = checker.check().await;

        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.http_status(), StatusCode::OK);
        assert_eq!(report.components.len(), 2);
    }

    #[tokio::test]
    async fn test_health_cache() {
        let checker = HealthChecker::new(HealthConfig {
            cache_duration: Duration::from_secs(60),
            ..Default::default()
        });

        let first = checker.check().await;
        let second = checker.check().await;
        assert_eq!(first.timestamp, second.timestamp);
    }

    #[tokio::test]
    async fn test_existing_storage_directory_is_healthy() {
        let checker = HealthChecker::new(HealthConfig::default()).with_storage_root(std::env::temp_dir());
        let report = checker.check().await;

        let storage = report.components.iter().find(|c| c.name == "storage").unwrap();
        assert_eq!(storage.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_unhealthy_wins() {
        assert_eq!(
            HealthStatus::Degraded.combine(HealthStatus::Unhealthy),
            HealthStatus::Unhealthy
        );
        assert_eq!(HealthStatus::Healthy.combine(HealthStatus::Degraded), HealthStatus::Degraded);
        assert_eq!(HealthStatus::Healthy.combine(HealthStatus::Healthy), HealthStatus::Healthy);
    }
}
