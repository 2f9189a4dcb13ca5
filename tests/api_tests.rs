//! HTTP-level tests for the user API.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use crm_users::api::{self, AppState};
use crm_users::config::Config;
use crm_users::db::{NewAddress, NewUser, User};
use crm_users::domain::Role;
use crm_users::state::SharedState;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn spawn_app() -> (Router, Arc<AppState>) {
    let db_path =
        std::env::temp_dir().join(format!("crm-users-api-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.security.argon2_parallelism = 1;

    let shared = SharedState::new(config)
        .await
        .expect("Failed to create shared state");
    let state = api::create_app_state(Arc::new(shared), None);
    let app = api::router(state.clone()).await;
    (app, state)
}

async fn seed_user(state: &AppState, email: &str, password: &str, active: bool) -> User {
    state
        .store()
        .insert_user(NewUser {
            email: email.to_string(),
            password_hash: state.shared.passwords.hash(password).unwrap(),
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            role: Role::User,
            active,
            is_institution: false,
            institution_name: None,
            ext_id: None,
            source: "web".to_string(),
        })
        .await
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn login(app: &Router, body: Value) -> String {
    let (status, body) = send(app, post_json("/api/v1/users/login", &body)).await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["access"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_user_info_without_token_is_forbidden() {
    let (app, _state) = spawn_app().await;

    let (status, body) = send(&app, get_with_token("/api/v1/user/info", None)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        json!({ "status": "error", "message": "Cannot authorize user" })
    );
}

#[tokio::test]
async fn test_user_info_with_unknown_token_is_forbidden() {
    let (app, _state) = spawn_app().await;

    let (status, body) = send(
        &app,
        get_with_token("/api/v1/user/info", Some("not-a-real-token")),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Cannot authorize user");
}

#[tokio::test]
async fn test_login_then_user_info() {
    let (app, state) = spawn_app().await;
    let user = seed_user(&state, "jane@example.com", "secret-pass", true).await;

    let token = login(
        &app,
        json!({ "email": "jane@example.com", "password": "secret-pass" }),
    )
    .await;
    assert_eq!(token.len(), 64);

    let (status, body) = send(&app, get_with_token("/api/v1/user/info", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "ok",
            "user": {
                "id": user.id,
                "email": "jane@example.com",
                "first_name": "Jane",
                "last_name": "Doe"
            }
        })
    );

    let attempts = state
        .store()
        .list_login_attempts("jane@example.com", 10)
        .await
        .unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, "api_ok");
    assert_eq!(attempts[0].source, "api");
}

#[tokio::test]
async fn test_username_alias_is_accepted() {
    let (app, state) = spawn_app().await;
    seed_user(&state, "jane@example.com", "secret-pass", true).await;

    login(
        &app,
        json!({ "username": "jane@example.com", "password": "secret-pass" }),
    )
    .await;
}

#[tokio::test]
async fn test_token_source_data_is_passed_through() {
    let (app, state) = spawn_app().await;
    seed_user(&state, "jane@example.com", "secret-pass", true).await;

    let token = login(
        &app,
        json!({
            "email": "jane@example.com",
            "password": "secret-pass",
            "source": "ios",
            "source_data": { "device": "iPhone", "build": 42 }
        }),
    )
    .await;

    let (status, body) = send(&app, get_with_token("/api/v1/user/info", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "ios");
    assert_eq!(body["ios"], json!({ "device": "iPhone", "build": 42 }));
}

#[tokio::test]
async fn test_reserved_source_does_not_shadow_user() {
    let (app, state) = spawn_app().await;
    seed_user(&state, "jane@example.com", "secret-pass", true).await;

    let token = login(
        &app,
        json!({
            "email": "jane@example.com",
            "password": "secret-pass",
            "source": "user",
            "source_data": { "evil": true }
        }),
    )
    .await;

    let (status, body) = send(&app, get_with_token("/api/v1/user/info", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "jane@example.com");
    assert_eq!(body["source"], "user");
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let (app, state) = spawn_app().await;
    seed_user(&state, "jane@example.com", "secret-pass", true).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/users/login",
            &json!({ "email": "jane@example.com", "password": "nope" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "invalid_credential");
    assert_eq!(body["message"], "Wrong e-mail or password.");
}

#[tokio::test]
async fn test_login_with_unknown_email_is_unauthorized() {
    let (app, _state) = spawn_app().await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/users/login",
            &json!({ "email": "ghost@example.com", "password": "nope" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "identity_not_found");
}

#[tokio::test]
async fn test_password_reset_endpoint() {
    let (app, state) = spawn_app().await;
    let user = seed_user(&state, "jane@example.com", "secret-pass", true).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/users/password-reset",
            &json!({ "email": "jane@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(
        state
            .store()
            .latest_password_reset_token(user.id)
            .await
            .unwrap()
            .is_some()
    );

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/users/password-reset",
            &json!({ "email": "ghost@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["errors"][0]["field"], "email");
    assert_eq!(
        body["errors"][0]["message"],
        "No account exists for this e-mail."
    );
}

#[tokio::test]
async fn test_data_download_requires_token() {
    let (app, state) = spawn_app().await;
    let user = seed_user(&state, "jane@example.com", "secret-pass", true).await;
    state
        .store()
        .add_address(NewAddress {
            user_id: user.id,
            address_type: "home".to_string(),
            city: Some("Bratislava".to_string()),
            ..NewAddress::default()
        })
        .await
        .unwrap();

    let (status, _) = send(&app, get_with_token("/api/v1/user/data-download", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let token = login(
        &app,
        json!({ "email": "jane@example.com", "password": "secret-pass" }),
    )
    .await;
    let (status, body) = send(
        &app,
        get_with_token("/api/v1/user/data-download", Some(&token)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["addresses"][0]["city"], "Bratislava");
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let (app, _state) = spawn_app().await;

    let response = app
        .oneshot(get_with_token("/api/metrics", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        String::from_utf8(bytes.to_vec()).unwrap(),
        "Metrics not enabled or failed to initialize"
    );
}
