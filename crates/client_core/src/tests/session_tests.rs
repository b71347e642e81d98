use super::*;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde_json::json;
use shared::domain::EntityId;
use tokio::net::TcpListener;

async fn login(
    State(hits): State<Arc<AtomicUsize>>,
    Json(request): Json<LoginRequest>,
) -> axum::response::Response {
    hits.fetch_add(1, Ordering::SeqCst);
    match (request.email.as_str(), request.password.as_str()) {
        ("misty@example.com", "staryu") => Json(json!({
            "user": { "id": 2, "name": "Misty", "email": "misty@example.com" }
        }))
        .into_response(),
        ("misty@example.com", _) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Wrong password" })),
        )
            .into_response(),
        _ => (StatusCode::UNAUTHORIZED, "nope").into_response(),
    }
}

async fn spawn_auth_backend() -> (String, Arc<AtomicUsize>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/api/login", post(login))
        .with_state(hits.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), hits)
}

#[tokio::test]
async fn successful_login_begins_session() {
    let (base_url, hits) = spawn_auth_backend().await;
    let auth = AuthClient::new(base_url);
    let session = SessionContext::new();

    let user = auth
        .authenticate(&session, " misty@example.com ", "staryu")
        .await
        .expect("login");
    assert_eq!(user.id, EntityId(2));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let observer = session.clone();
    assert!(observer.is_authenticated().await);
    assert_eq!(
        observer.current_user().await.map(|u| u.name),
        Some("Misty".to_string())
    );
}

#[tokio::test]
async fn rejection_surfaces_backend_message_and_keeps_session_empty() {
    let (base_url, _hits) = spawn_auth_backend().await;
    let auth = AuthClient::new(base_url);
    let session = SessionContext::new();

    let err = auth
        .authenticate(&session, "misty@example.com", "psyduck")
        .await
        .expect_err("rejected");
    assert!(matches!(err, AuthError::Rejected(ref message) if message == "Wrong password"));
    assert!(!session.is_authenticated().await);
}

#[tokio::test]
async fn unstructured_rejection_falls_back_to_generic_message() {
    let (base_url, _hits) = spawn_auth_backend().await;
    let auth = AuthClient::new(base_url);
    let session = SessionContext::new();

    let err = auth
        .authenticate(&session, "gary@example.com", "eevee")
        .await
        .expect_err("rejected");
    assert!(matches!(err, AuthError::Rejected(ref message) if message == GENERIC_AUTH_FAILURE));
}

#[tokio::test]
async fn missing_credentials_skip_the_network() {
    let (base_url, hits) = spawn_auth_backend().await;
    let auth = AuthClient::new(base_url);
    let session = SessionContext::new();

    for (email, password) in [("", "staryu"), ("   ", "staryu"), ("misty@example.com", "")] {
        let err = auth
            .authenticate(&session, email, password)
            .await
            .expect_err("missing");
        assert!(matches!(err, AuthError::MissingCredentials));
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn logout_clears_the_shared_session() {
    let (base_url, _hits) = spawn_auth_backend().await;
    let auth = AuthClient::new(base_url);
    let session = SessionContext::new();
    auth.authenticate(&session, "misty@example.com", "staryu")
        .await
        .expect("login");

    let observer = session.clone();
    auth.logout(&session).await;
    assert!(observer.current().await.is_none());

    // a second logout is a no-op
    auth.logout(&session).await;
    assert!(!observer.is_authenticated().await);
}
