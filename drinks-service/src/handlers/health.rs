use axum::{extract::State, Json};
use serde_json::{json, Value};
use service_core::error::AppError;

use crate::AppState;

/// GET /health. 503 when storage is unreachable.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.repo.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Storage health check failed");
        AppError::ServiceUnavailable
    })?;

    let keys = state.keys.current();

    Ok(Json(json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "storage": "up",
            "signing_keys": {
                "count": keys.len(),
                "loaded_at": keys.loaded_at().to_rfc3339(),
            }
        }
    })))
}
