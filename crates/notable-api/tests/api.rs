use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use notable_api::auth::{AppState, AppStateInner};
use notable_api::routes::router;
use notable_api::token::TokenService;
use notable_db::Database;

fn test_state() -> AppState {
    let db = Database::open_in_memory().unwrap();
    let tokens = TokenService::new("test-secret", Duration::minutes(60));
    Arc::new(AppStateInner { db, tokens })
}

fn test_app() -> Router {
    router(test_state())
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

/// Signup + login; returns (user id, bearer token).
async fn signup_and_login(app: &Router, name: &str, email: &str) -> (String, String) {
    let (status, user) = send(
        app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "name": name, "email": email, "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = user["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");

    (user_id, body["access_token"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn signup_validates_input() {
    let app = test_app();

    let cases = [
        json!({ "name": "", "email": "a@x.com", "password": "secret123" }),
        json!({ "name": "Alice", "email": "not-an-email", "password": "secret123" }),
        json!({ "name": "Alice", "email": "a@x.com", "password": "short" }),
    ];
    for body in cases {
        let (status, _) = send(&app, "POST", "/api/auth/signup", None, Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = test_app();
    let body = json!({ "name": "Alice", "email": "a@x.com", "password": "secret123" });

    let (status, _) = send(&app, "POST", "/api/auth/signup", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, detail) = send(&app, "POST", "/api/auth/signup", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(detail["detail"], "email already registered");
}

#[tokio::test]
async fn login_does_not_reveal_which_credential_failed() {
    let app = test_app();
    signup_and_login(&app, "Alice", "a@x.com").await;

    let (status, wrong_password) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_email) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@x.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(wrong_password["detail"], unknown_email["detail"]);
}

#[tokio::test]
async fn me_returns_current_user() {
    let app = test_app();
    let (user_id, token) = signup_and_login(&app, "Alice", "a@x.com").await;

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id.as_str());
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["email"], "a@x.com");
}

#[tokio::test]
async fn missing_and_malformed_credentials_are_unauthorized() {
    let app = test_app();

    let (status, _) = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/auth/me", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn note_lifecycle() {
    let app = test_app();
    let (user_id, token) = signup_and_login(&app, "Alice", "a@x.com").await;

    let (status, note) = send(
        &app,
        "POST",
        "/api/notes",
        Some(&token),
        Some(json!({ "title": "T1", "body": "B1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["owner_id"], user_id.as_str());
    assert_eq!(note["title"], "T1");
    assert_eq!(note["body"], "B1");
    let note_id = note["id"].as_str().unwrap().to_string();
    let note_uri = format!("/api/notes/{}", note_id);

    let (status, fetched) = send(&app, "GET", &note_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], note_id.as_str());

    // Partial update: new title, body explicitly cleared.
    let (status, updated) = send(
        &app,
        "PUT",
        &note_uri,
        Some(&token),
        Some(json!({ "title": "T1 edited", "body": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "T1 edited");
    assert_eq!(updated["body"], Value::Null);

    let (status, _) = send(&app, "DELETE", &note_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &note_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_title_is_rejected() {
    let app = test_app();
    let (_, token) = signup_and_login(&app, "Alice", "a@x.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/notes",
        Some(&token),
        Some(json!({ "title": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, note) = send(
        &app,
        "POST",
        "/api/notes",
        Some(&token),
        Some(json!({ "title": "T1" })),
    )
    .await;
    let uri = format!("/api/notes/{}", note["id"].as_str().unwrap());

    let (status, _) = send(&app, "PUT", &uri, Some(&token), Some(json!({ "title": "" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn notes_are_owner_only() {
    let app = test_app();
    let (_, alice) = signup_and_login(&app, "Alice", "a@x.com").await;
    let (_, bob) = signup_and_login(&app, "Bob", "b@x.com").await;

    let (_, note) = send(
        &app,
        "POST",
        "/api/notes",
        Some(&alice),
        Some(json!({ "title": "T1", "body": "B1" })),
    )
    .await;
    let uri = format!("/api/notes/{}", note["id"].as_str().unwrap());

    let (status, _) = send(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "PUT",
        &uri,
        Some(&bob),
        Some(json!({ "title": "hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The note is unchanged.
    let (status, fetched) = send(&app, "GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "T1");
}

#[tokio::test]
async fn listing_is_scoped_and_ordered() {
    let app = test_app();
    let (_, alice) = signup_and_login(&app, "Alice", "a@x.com").await;
    let (_, bob) = signup_and_login(&app, "Bob", "b@x.com").await;

    for title in ["first", "second"] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/notes",
            Some(&alice),
            Some(json!({ "title": title })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    send(
        &app,
        "POST",
        "/api/notes",
        Some(&bob),
        Some(json!({ "title": "bobs" })),
    )
    .await;

    let (status, listed) = send(&app, "GET", "/api/notes", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    // Most recently updated first.
    assert_eq!(listed[0]["title"], "second");
    assert_eq!(listed[1]["title"], "first");

    let (_, bobs) = send(&app, "GET", "/api/notes", Some(&bob), None).await;
    assert_eq!(bobs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_note_id_is_not_found() {
    let app = test_app();
    let (_, token) = signup_and_login(&app, "Alice", "a@x.com").await;

    let uri = format!("/api/notes/{}", Uuid::new_v4());
    let (status, _) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let state = test_state();
    let app = router(state.clone());
    let (user_id, _) = signup_and_login(&app, "Alice", "a@x.com").await;

    let expired = state
        .tokens
        .issue_with_ttl(Uuid::parse_str(&user_id).unwrap(), Duration::minutes(-5))
        .unwrap();

    let (status, body) = send(&app, "GET", "/api/notes", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "token expired");
}

#[tokio::test]
async fn token_for_deleted_user_is_rejected() {
    let state = test_state();
    let app = router(state.clone());

    // Valid signature, but the subject never existed in the store.
    let stale = state.tokens.issue(Uuid::new_v4()).unwrap();

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&stale), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "user not found");
}
