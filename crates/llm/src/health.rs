use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::llm_trait::GenerationBackend;

/// Backend health snapshot
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub connected: bool,

    pub model_available: bool,

    /// Backend metadata for the configured model; empty when not fetched
    pub model_info: serde_json::Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub checked_at: DateTime<Utc>,
}

/// Probe the backend; model checks only run once it is reachable
///
/// Never fails: problems end up in `error`.
pub async fn check_backend_health(backend: &dyn GenerationBackend) -> HealthReport {
    let mut report = HealthReport {
        connected: false,
        model_available: false,
        model_info: serde_json::Value::Object(serde_json::Map::new()),
        error: None,
        checked_at: Utc::now(),
    };

    report.connected = backend.test_connection().await;
    if !report.connected {
        debug!("Backend unreachable, skipping model checks");
        return report;
    }

    report.model_available = backend.check_model_availability().await;

    match backend.model_info().await {
        Ok(info) => report.model_info = info,
        Err(e) => report.error = Some(e.to_string()),
    }

    report
}
