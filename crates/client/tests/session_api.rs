use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use crudstack_api::config::ApiConfig;
use crudstack_client::{ClientConfig, SessionContext, UsersClient};
use crudstack_core::{User, UserId};
use serde_json::json;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    /// Auth backend stub serving only `GET /user`.
    async fn identity(status: StatusCode, body: serde_json::Value) -> Self {
        let app = Router::new().route(
            "/user",
            get(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        Self::spawn(app).await
    }

    fn client(&self) -> UsersClient {
        let config = ClientConfig::default().with_base_url(&self.base_url).unwrap();
        UsersClient::new(&config).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn resolve(srv: &TestServer) -> Arc<SessionContext<User>> {
    let session = Arc::new(SessionContext::new());
    session.initialize(&srv.client()).await.unwrap();
    session
}

#[tokio::test]
async fn empty_array_is_a_guest() {
    let srv = TestServer::identity(StatusCode::OK, json!([])).await;
    let session = resolve(&srv).await;
    assert!(session.is_guest());
}

#[tokio::test]
async fn unauthorized_is_a_guest() {
    let srv = TestServer::identity(StatusCode::UNAUTHORIZED, json!({ "message": "Unauthenticated." })).await;
    let session = resolve(&srv).await;
    assert!(session.is_guest());
}

#[tokio::test]
async fn signed_in_user_is_resolved() {
    let srv = TestServer::identity(
        StatusCode::OK,
        json!({
            "id": 4,
            "name": "Grace",
            "email": "grace@navy.mil",
            "email_verified_at": "2024-01-02T03:04:05Z",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
        }),
    )
    .await;

    let session = resolve(&srv).await;
    assert!(session.is_authenticated());
    assert_eq!(session.user().map(|u| u.id), Some(UserId::new(4)));
}

#[tokio::test]
async fn users_backend_without_identity_route_is_a_guest() {
    let srv = TestServer::spawn(crudstack_api::app::build_app(&ApiConfig::default())).await;
    let session = resolve(&srv).await;
    assert!(session.is_guest());
    assert!(!session.is_loading());
}
