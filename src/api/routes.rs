//! API Routes
//!
//! Record administration, name-server control, health and metrics.
//!
//! Record endpoints take the JSON record envelope as the raw request body and
//! answer with `{"success", "msg"}`; queries add `totalCount` and
//! `recordListJson`.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::api::Metrics;
use crate::config::ManagerConfig;
use crate::control::{ControlError, NameServerControl};
use crate::types::{ApiResponse, DnsRecord, QueryResponse};
use crate::zone::{QueryFilter, ZoneEngine, ZoneError};

/// Shared API state
pub struct ApiState {
    pub config: Arc<ManagerConfig>,
    pub engine: Arc<ZoneEngine>,
    pub control: Arc<dyn NameServerControl>,
    pub metrics: Arc<Metrics>,
}

impl ApiState {
    /// Count a failed zone request and wrap it for the response
    fn reject(&self, e: ZoneError) -> ApiError {
        if e.is_client_error() {
            self.metrics.inc_rejected();
        } else {
            if e.is_structural() {
                error!("Zone structure is damaged: {}", e);
            } else {
                error!("Zone mutation failed: {}", e);
            }
            self.metrics.inc_failed_mutations();
        }
        ApiError::Zone(e)
    }

    /// Refresh the zone gauges from the engine
    async fn refresh_zone_metrics(&self) {
        let serial = self.engine.serial().await.unwrap_or(0);
        self.metrics.set_zone(serial, self.engine.record_count().await);
    }

    /// Bookkeeping after a successful Add/Delete
    async fn after_mutation(&self) {
        self.refresh_zone_metrics().await;

        if !self.config.auto_reload {
            return;
        }
        match self.control.reload().await {
            Ok(_) => self.metrics.inc_reloads(),
            Err(e) => {
                // The mutation is already on disk; only report the reload
                warn!("Automatic name-server reload failed: {}", e);
                self.metrics.inc_control_failures();
            }
        }
    }
}

/// Error returned by a handler
#[derive(Debug)]
pub enum ApiError {
    Zone(ZoneError),
    Control(ControlError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::Zone(e) => {
                let status = match e {
                    ZoneError::InvalidField(_) | ZoneError::UnsupportedType(_) | ZoneError::Decode(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    ZoneError::Conflict => StatusCode::CONFLICT,
                    ZoneError::NotFound => StatusCode::NOT_FOUND,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::Control(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
        };

        (status, Json(ApiResponse::error(msg))).into_response()
    }
}

/// Build the API router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        // Records
        .route("/QueryDNSRecord", post(query_records))
        .route("/AddDNSRecord", post(add_record))
        .route("/DelDNSRecord", post(delete_record))

        // Name server
        .route("/ReloadZone", post(reload_zone))
        .route("/QueryDnsServiceStatus", post(service_status))
        .route("/RestartDnsService", post(restart_service))

        // Health & Status
        .route("/health", get(health_check))
        .route("/status", get(get_status))

        // Metrics
        .route("/metrics", get(get_metrics_prometheus))
        .route("/metrics/json", get(get_metrics_json))

        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_api_server(
    config: Arc<ManagerConfig>,
    engine: Arc<ZoneEngine>,
    control: Arc<dyn NameServerControl>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let addr = config.api_addr()?;
    let state = Arc::new(ApiState {
        config,
        engine,
        control,
        metrics,
    });
    state.refresh_zone_metrics().await;

    let app = router(state);

    info!("📡 HTTP API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// POST /QueryDNSRecord - Records matching the envelope (all when empty)
async fn query_records(
    State(state): State<Arc<ApiState>>,
    body: String,
) -> Result<Json<QueryResponse>, ApiError> {
    let filter = if body.trim().is_empty() {
        QueryFilter::all()
    } else {
        DnsRecord::from_json(&body)
            .and_then(|request| request.to_filter())
            .map_err(|e| state.reject(e))?
    };

    let records = state.engine.query(&filter).await;
    state.metrics.inc_queries();

    Ok(Json(QueryResponse::new(&records)))
}

/// POST /AddDNSRecord
async fn add_record(
    State(state): State<Arc<ApiState>>,
    body: String,
) -> Result<Json<ApiResponse>, ApiError> {
    let request = DnsRecord::from_json(&body).map_err(|e| state.reject(e))?;
    state.engine.add(&request).await.map_err(|e| state.reject(e))?;

    state.metrics.inc_records_added();
    state.after_mutation().await;

    Ok(Json(ApiResponse::ok()))
}

/// POST /DelDNSRecord
async fn delete_record(
    State(state): State<Arc<ApiState>>,
    body: String,
) -> Result<Json<ApiResponse>, ApiError> {
    let request = DnsRecord::from_json(&body).map_err(|e| state.reject(e))?;
    state.engine.delete(&request).await.map_err(|e| state.reject(e))?;

    state.metrics.inc_records_deleted();
    state.after_mutation().await;

    Ok(Json(ApiResponse::ok()))
}

/// POST /ReloadZone - Ask the name server to reload the zone
async fn reload_zone(State(state): State<Arc<ApiState>>) -> Result<Json<ApiResponse>, ApiError> {
    let output = state.control.reload().await.map_err(|e| control_failed(&state, e))?;
    state.metrics.inc_reloads();
    Ok(Json(ApiResponse::message(output)))
}

/// POST /QueryDnsServiceStatus
async fn service_status(State(state): State<Arc<ApiState>>) -> Result<Json<ApiResponse>, ApiError> {
    let output = state.control.status().await.map_err(|e| control_failed(&state, e))?;
    Ok(Json(ApiResponse::message(output)))
}

/// POST /RestartDnsService
async fn restart_service(State(state): State<Arc<ApiState>>) -> Result<Json<ApiResponse>, ApiError> {
    let output = state.control.restart().await.map_err(|e| control_failed(&state, e))?;
    Ok(Json(ApiResponse::message(output)))
}

fn control_failed(state: &ApiState, e: ControlError) -> ApiError {
    warn!("Name-server command failed: {}", e);
    state.metrics.inc_control_failures();
    ApiError::Control(e)
}

/// GET /health - Simple health check
async fn health_check() -> impl IntoResponse {
    "OK"
}

/// GET /status - Detailed status
async fn get_status(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let serial = state.engine.serial().await.ok();
    let health = if serial.is_some() { "healthy" } else { "degraded" };

    let status = serde_json::json!({
        "status": health,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.metrics.uptime_secs(),
        "zone": {
            "file": state.engine.zone_file().display().to_string(),
            "serial": serial,
            "records": state.engine.record_count().await,
            "auto_reload": state.config.auto_reload,
        }
    });

    Json(status)
}

/// GET /metrics - Prometheus format metrics
async fn get_metrics_prometheus(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    state.refresh_zone_metrics().await;

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.to_prometheus(),
    )
}

/// GET /metrics/json - JSON format metrics
async fn get_metrics_json(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    state.refresh_zone_metrics().await;
    Json(state.metrics.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::mock::MockControl;
    use crate::zone::{Skeleton, ZoneFile};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::atomic::Ordering;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    struct Harness {
        _dir: TempDir,
        state: Arc<ApiState>,
        control: Arc<MockControl>,
    }

    async fn harness(auto_reload: bool, control: MockControl) -> Harness {
        let dir = tempdir().unwrap();
        let skeleton = Skeleton {
            serial: Some(2024010101),
            ..Skeleton::default()
        };
        let engine = ZoneEngine::open(ZoneFile::new(dir.path().join("chn.zone")), &skeleton, true)
            .await
            .unwrap();

        let config = ManagerConfig {
            auto_reload,
            ..ManagerConfig::default()
        };
        let control = Arc::new(control);
        let state = Arc::new(ApiState {
            config: Arc::new(config),
            engine: Arc::new(engine),
            control: control.clone(),
            metrics: Arc::new(Metrics::new()),
        });

        Harness {
            _dir: dir,
            state,
            control,
        }
    }

    async fn call(state: &Arc<ApiState>, method: &str, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    const A_RECORD: &str = r#"{"domainName":"www.example.chn","ttl":"120","type":"A","data":"192.0.2.10"}"#;

    #[tokio::test]
    async fn test_add_query_delete() {
        let h = harness(false, MockControl::default()).await;

        let (status, json) = call(&h.state, "POST", "/AddDNSRecord", A_RECORD).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["msg"], "ok");

        let (status, json) = call(&h.state, "POST", "/QueryDNSRecord", r#"{"type":"A"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["totalCount"], 1);
        assert_eq!(json["recordListJson"][0]["domainName"], "www.example.chn");
        assert_eq!(json["recordListJson"][0]["data"], "192.0.2.10");

        let (status, _) = call(&h.state, "POST", "/DelDNSRecord", A_RECORD).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.state.engine.serial().await.unwrap(), 2024010103);
        assert_eq!(h.state.metrics.records_deleted.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_empty_query_body_returns_everything() {
        let h = harness(false, MockControl::default()).await;
        let (status, json) = call(&h.state, "POST", "/QueryDNSRecord", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["totalCount"], 1);
        assert_eq!(json["recordListJson"][0]["type"], "NS");
        assert_eq!(json["recordListJson"][0]["data"], "a.gtld-servers.chn");
    }

    #[tokio::test]
    async fn test_error_status_codes() {
        let h = harness(false, MockControl::default()).await;

        let (status, json) = call(&h.state, "POST", "/AddDNSRecord", "{oops").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let (status, _) = call(
            &h.state,
            "POST",
            "/AddDNSRecord",
            r#"{"domainName":"mail.example.chn","ttl":"300","type":"MX","data":"mx1.example.chn"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&h.state, "POST", "/QueryDNSRecord", r#"{"type":"AAAA"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        call(&h.state, "POST", "/AddDNSRecord", A_RECORD).await;
        let (status, _) = call(&h.state, "POST", "/AddDNSRecord", A_RECORD).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, json) = call(
            &h.state,
            "POST",
            "/DelDNSRecord",
            r#"{"domainName":"nope.example.chn","type":"A","data":"192.0.2.99"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["msg"], "No matching record found");

        assert_eq!(h.state.metrics.rejected_requests.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn test_auto_reload_after_mutation() {
        let h = harness(true, MockControl::default()).await;
        call(&h.state, "POST", "/AddDNSRecord", A_RECORD).await;

        assert_eq!(h.control.reloads.load(Ordering::Relaxed), 1);
        assert_eq!(h.state.metrics.reloads.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_auto_reload_failure_keeps_mutation() {
        let h = harness(true, MockControl::failing()).await;
        let (status, json) = call(&h.state, "POST", "/AddDNSRecord", A_RECORD).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(h.state.engine.record_count().await, 2);
        assert_eq!(h.state.metrics.control_failures.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_service_commands() {
        let h = harness(false, MockControl::default()).await;

        let (status, json) = call(&h.state, "POST", "/ReloadZone", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["msg"], "server reload successful");

        let (_, json) = call(&h.state, "POST", "/QueryDnsServiceStatus", "").await;
        assert_eq!(json["msg"], "active (running)");

        call(&h.state, "POST", "/RestartDnsService", "").await;
        assert_eq!(h.control.restarts.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_service_command_failure() {
        let h = harness(false, MockControl::failing()).await;
        let (status, json) = call(&h.state, "POST", "/ReloadZone", "").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_status_and_metrics() {
        let h = harness(false, MockControl::default()).await;
        call(&h.state, "POST", "/AddDNSRecord", A_RECORD).await;

        let (status, json) = call(&h.state, "GET", "/status", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["zone"]["serial"], 2024010102);
        assert_eq!(json["zone"]["records"], 2);

        let (_, json) = call(&h.state, "GET", "/metrics/json", "").await;
        assert_eq!(json["records"]["added"], 1);
        assert_eq!(json["zone"]["serial"], 2024010102);
    }
}
