//! Root health check.

use axum::Json;
use serde::{Deserialize, Serialize};

/// Body returned by `GET /`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"OK"`.
    pub message: String,
}

impl HealthResponse {
    /// The only health payload the service produces.
    pub fn ok() -> Self {
        Self {
            message: "OK".to_string(),
        }
    }
}

/// `GET /` — always `200 {"message": "OK"}`.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let json = serde_json::to_string(&HealthResponse::ok()).unwrap();
        assert_eq!(json, r#"{"message":"OK"}"#);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let Json(body) = health().await;
        assert_eq!(body, HealthResponse::ok());
    }
}
