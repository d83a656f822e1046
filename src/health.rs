use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Liveness and readiness flags reported on `/health` and `/ready`
#[derive(Clone)]
pub struct HealthState {
    pub is_ready: Arc<RwLock<bool>>,
    pub is_healthy: Arc<RwLock<bool>>,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            is_ready: Arc::new(RwLock::new(false)),
            is_healthy: Arc::new(RwLock::new(true)),
        }
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.is_ready.write().await = ready;
    }

    pub async fn set_healthy(&self, healthy: bool) {
        *self.is_healthy.write().await = healthy;
    }

    pub async fn health_response(&self) -> Response<Full<Bytes>> {
        if *self.is_healthy.read().await {
            plain(StatusCode::OK, "OK")
        } else {
            plain(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")
        }
    }

    pub async fn ready_response(&self) -> Response<Full<Bytes>> {
        if *self.is_ready.read().await {
            plain(StatusCode::OK, "Ready")
        } else {
            plain(StatusCode::SERVICE_UNAVAILABLE, "Not Ready")
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn plain(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_state_creation() {
        let state = HealthState::new();
        assert!(!*state.is_ready.read().await);
        assert!(*state.is_healthy.read().await);
    }

    #[tokio::test]
    async fn test_health_state_updates() {
        let state = HealthState::new();
        assert_eq!(state.ready_response().await.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.set_ready(true).await;
        assert_eq!(state.ready_response().await.status(), StatusCode::OK);

        state.set_healthy(false).await;
        assert_eq!(state.health_response().await.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
