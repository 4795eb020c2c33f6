use api_types::health::{HealthResponse, SystemInfo};
use axum::Json;

pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "available".to_string(),
        system_info: SystemInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    })
}
