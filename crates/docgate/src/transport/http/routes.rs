//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::Serialize;

use crate::admission::AdmissionError;
use crate::health::Health;
use crate::service::SubmissionService;
use crate::submission::{Accepted, SubmissionError, SubmissionRequest};
use crate::version::VersionInfo;

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: Health,
    pub capacity: usize,
    pub available: usize,
    pub window_ms: u64,
    pub generation: u64,
    pub version: VersionInfo,
}

async fn health_check(State(service): State<Arc<SubmissionService>>) -> Json<HealthCheckResponse> {
    let snapshot = service.snapshot();

    Json(HealthCheckResponse {
        status: Health::from_snapshot(&snapshot),
        capacity: snapshot.capacity,
        available: snapshot.available,
        window_ms: snapshot.window.as_millis() as u64,
        generation: snapshot.generation,
        version: service.version().clone(),
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn failed(status: StatusCode, error: impl ToString) -> (StatusCode, Json<serde_json::Value>) {
    (
        status,
        Json(serde_json::json!({
            "status": "failed",
            "error": error.to_string(),
        })),
    )
}

/// Forward one document through the gate.
///
/// If the client disconnects while waiting for admission, axum drops this
/// future and the wait ends without taking a permit.
async fn submit_document(
    State(service): State<Arc<SubmissionService>>,
    headers: HeaderMap,
    Json(document): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(token) = bearer_token(&headers) else {
        return failed(StatusCode::UNAUTHORIZED, "Missing bearer token");
    };

    let request = SubmissionRequest::new(document, token);
    submission_response(service.submit(&request).await)
}

fn submission_response(
    result: Result<Accepted, SubmissionError>,
) -> (StatusCode, Json<serde_json::Value>) {
    match result {
        Ok(accepted) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "accepted",
                "submission_id": accepted.submission_id,
                "response": accepted.body,
            })),
        ),
        Err(SubmissionError::RemoteRejected { status, body }) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({
                "status": "rejected",
                "code": status,
                "error": body,
            })),
        ),
        Err(e @ SubmissionError::Network(_)) => failed(StatusCode::BAD_GATEWAY, e),
        Err(e @ SubmissionError::AdmissionCancelled(AdmissionError::TimedOut(_))) => {
            failed(StatusCode::TOO_MANY_REQUESTS, e)
        }
        Err(e @ SubmissionError::AdmissionCancelled(_)) => {
            failed(StatusCode::SERVICE_UNAVAILABLE, e)
        }
        Err(e @ SubmissionError::InvalidCredential) => failed(StatusCode::UNAUTHORIZED, e),
        Err(e @ SubmissionError::Serialization(_)) => {
            failed(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn shutdown(State(service): State<Arc<SubmissionService>>) -> impl IntoResponse {
    tracing::info!("Shutdown requested via HTTP");
    service.trigger_shutdown();
    (StatusCode::OK, Json(serde_json::json!({})))
}

pub fn routes(service: Arc<SubmissionService>) -> Router {
    Router::new()
        .route("/health-check", get(health_check))
        .route("/shutdown", post(shutdown))
        .route("/documents", post(submit_document))
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::GateConfig;

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body();
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn service(config: GateConfig) -> Arc<SubmissionService> {
        Arc::new(SubmissionService::start(&config).unwrap())
    }

    fn gate(server: &MockServer, capacity: usize) -> GateConfig {
        GateConfig::new(
            &format!("{}/documents/create", server.uri()),
            Duration::from_secs(60),
            capacity,
        )
        .unwrap()
    }

    fn post_document(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/documents").header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(r#"{"doc_id":"doc-1"}"#)).unwrap()
    }

    #[tokio::test]
    async fn health_check_reports_pool() {
        let server = MockServer::start().await;
        let service = service(gate(&server, 3));
        let app = routes(service);

        let response = app
            .oneshot(Request::get("/health-check").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["status"], "READY");
        assert_eq!(json["capacity"], 3);
        assert_eq!(json["available"], 3);
        assert_eq!(json["window_ms"], 60_000);
        assert_eq!(json["generation"], 0);
        assert!(json["version"]["docgate"].is_string());
    }

    #[tokio::test]
    async fn health_check_exhausted_after_window_is_spent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let service = service(gate(&server, 1));

        let response = routes(Arc::clone(&service))
            .oneshot(post_document(Some("sig")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = routes(service)
            .oneshot(Request::get("/health-check").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(json["status"], "EXHAUSTED");
        assert_eq!(json["available"], 0);
    }

    #[tokio::test]
    async fn documents_requires_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let service = service(gate(&server, 1));

        let response = routes(Arc::clone(&service))
            .oneshot(post_document(None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = response_json(response).await;
        assert_eq!(json["status"], "failed");
        assert_eq!(service.snapshot().available, 1);
    }

    #[tokio::test]
    async fn documents_forwards_and_reports_acceptance() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/documents/create"))
            .and(header("authorization", "Bearer sig-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("registered"))
            .expect(1)
            .mount(&server)
            .await;
        let service = service(gate(&server, 2));

        let response = routes(service)
            .oneshot(post_document(Some("sig-1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "accepted");
        assert_eq!(json["response"], "registered");
        assert!(json["submission_id"].is_string());
    }

    #[tokio::test]
    async fn documents_maps_remote_rejection_to_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .expect(1)
            .mount(&server)
            .await;
        let service = service(gate(&server, 2));

        let response = routes(service)
            .oneshot(post_document(Some("sig")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = response_json(response).await;
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["code"], 500);
        assert_eq!(json["error"], "internal");
    }

    #[tokio::test]
    async fn documents_times_out_with_too_many_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        let config = gate(&server, 1).with_max_wait(Duration::from_millis(50));
        let service = service(config);

        let first = routes(Arc::clone(&service))
            .oneshot(post_document(Some("sig")))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = routes(service)
            .oneshot(post_document(Some("sig")))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn documents_unavailable_after_shutdown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let service = service(gate(&server, 1));
        service.shutdown().await;

        let response = routes(service)
            .oneshot(post_document(Some("sig")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Admission controller closed");
    }

    #[tokio::test]
    async fn shutdown_endpoint_triggers_signal() {
        let server = MockServer::start().await;
        let service = service(gate(&server, 1));
        let rx = service.shutdown_rx();

        let response = routes(service)
            .oneshot(Request::post("/shutdown").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(*rx.borrow());
    }

    #[test]
    fn admission_and_credential_failures_map_to_client_statuses() {
        let (status, Json(json)) =
            submission_response(Err(SubmissionError::AdmissionCancelled(
                AdmissionError::Cancelled,
            )));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["status"], "failed");

        let (status, _) = submission_response(Err(SubmissionError::InvalidCredential));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
