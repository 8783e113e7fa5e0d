//! HTTP API
//!
//! Record ingress/administration routes and the WebSocket subscriber feed.

pub mod error;
pub mod routes;
pub mod ws;

use std::future::Future;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::db::SqliteRecordStore;
use crate::service::IngestionService;

pub use error::{ApiError, ErrorResponse};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IngestionService<SqliteRecordStore>>,
}

impl AppState {
    pub fn new(service: Arc<IngestionService<SqliteRecordStore>>) -> Self {
        Self { service }
    }
}

/// Build the store router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/processed_agent_data/",
            get(routes::list_records).post(routes::create_records),
        )
        .route(
            "/processed_agent_data/{id}",
            get(routes::get_record)
                .put(routes::update_record)
                .delete(routes::delete_record),
        )
        .route("/ws/", get(ws::subscribe))
        .route("/health", get(routes::health))
        .with_state(state)
}

/// Serve the API on `listener` until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let address = listener.local_addr()?;
    info!(address = %address, "Store API listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Store API stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{fail_after_two_inserts, reading};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use broadcaster::Broadcaster;
    use contracts::PersistedRecord;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn test_app() -> (Router, AppState) {
        let store = SqliteRecordStore::in_memory().await.unwrap();
        let state = AppState::new(Arc::new(IngestionService::new(store, Broadcaster::new(8))));
        (build_router(state.clone()), state)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn batch_body() -> Value {
        json!([
            {
                "roadState": "Smooth",
                "accelerometer": {"x": 1.0, "y": 2.0, "z": 10.0},
                "gps": {"lat": 55.7, "lon": 37.5},
                "timestamp": "2024-03-01T12:00:00Z"
            },
            {
                "roadState": "Bumpy",
                "accelerometer": {"x": 1.0, "y": 2.0, "z": 10.1},
                "gps": {"lat": 55.8, "lon": 37.6},
                "timestamp": "2024-03-01T12:00:01Z"
            }
        ])
    }

    #[tokio::test]
    async fn test_post_batch_returns_created_records() {
        let (app, state) = test_app().await;
        let mut sub = state.service.broadcaster().subscribe();

        let response = app
            .oneshot(json_request(Method::POST, "/processed_agent_data/", batch_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let records: Vec<PersistedRecord> =
            serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].id < records[1].id);
        assert_eq!(records[1].z, 10.1);
        assert_eq!(sub.try_recv().unwrap(), records[0]);
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_unprocessable() {
        let (app, _state) = test_app().await;
        let body = json!([{"roadState": "Gravel"}]);

        let response = app
            .oneshot(json_request(Method::POST, "/processed_agent_data/", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["error"], "INVALID_PAYLOAD");
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let (app, _state) = test_app().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/processed_agent_data/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("[{"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_persist_failure_is_500_and_stores_nothing() {
        let (app, state) = test_app().await;
        fail_after_two_inserts(state.service.store()).await;
        let mut body = batch_body();
        if let Value::Array(items) = &mut body {
            let third = items[0].clone();
            items.push(third);
        }

        let response = app
            .oneshot(json_request(Method::POST, "/processed_agent_data/", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "PERSIST_FAILURE");
        assert_eq!(state.service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_crud_routes() {
        let (app, state) = test_app().await;
        let persisted = state
            .service
            .ingest(&[reading(10.0, 0), reading(11.0, 1)])
            .await
            .unwrap();
        let id = persisted[0].id;

        let response = app
            .clone()
            .oneshot(empty_request(Method::GET, "/processed_agent_data/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);

        let response = app
            .clone()
            .oneshot(empty_request(
                Method::GET,
                &format!("/processed_agent_data/{id}"),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["id"], id);

        let update = json!({
            "roadState": "Bumpy",
            "accelerometer": {"x": 0.0, "y": 0.0, "z": 13.0},
            "gps": {"lat": 1.0, "lon": 2.0},
            "timestamp": "2024-03-02T00:00:00Z"
        });
        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/processed_agent_data/{id}"),
                update,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["z"], 13.0);

        let response = app
            .clone()
            .oneshot(empty_request(
                Method::DELETE,
                &format!("/processed_agent_data/{id}"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(empty_request(
                Method::GET,
                &format!("/processed_agent_data/{id}"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_subscribers() {
        let (app, state) = test_app().await;
        let _sub = state.service.broadcaster().subscribe();

        let response = app
            .oneshot(empty_request(Method::GET, "/health"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["subscribers"], 1);
    }
}
