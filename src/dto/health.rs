use serde::Serialize;
use utoipa::ToSchema;

/// Health payload for `/healthcheck`, reporting whether the shared session
/// store is reachable.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `"ok"` with storage attached, `"degraded"` without.
    pub status: String,
}

impl HealthResponse {
    /// Payload for a backend with its shared store attached.
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
        }
    }

    /// Payload for a backend running without its shared store; session edits
    /// stay local until the supervisor reconnects.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".into(),
        }
    }
}
