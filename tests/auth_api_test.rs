//! Registration, login and token inspection over HTTP.

mod common;

use axum::http::Method;
use common::{response_json, TestApp, ADMIN_EMAIL, ADMIN_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn register_returns_token_and_customer_profile() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/api/register",
            json!({"name": " Bia ", "email": "  Bia@Example.com ", "password": "segredo1"}),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["email"], "bia@example.com");
    assert_eq!(body["user"]["name"], "Bia");
    assert_eq!(body["user"]["isAdmin"], false);

    let again = app
        .post(
            "/api/register",
            json!({"name": "Bia 2", "email": "bia@example.com", "password": "segredo2"}),
        )
        .await;
    assert_eq!(again.status(), 409);
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .post(
            "/api/register",
            json!({"name": "Bia", "email": "bia@example.com", "password": "123"}),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn admin_login_and_me() {
    let app = TestApp::new().await;

    let login = app
        .post(
            "/api/auth/login",
            json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD}),
        )
        .await;
    assert_eq!(login.status(), 200);
    let body = response_json(login).await;
    assert_eq!(body["user"]["isAdmin"], true);
    let token = body["token"].as_str().unwrap().to_string();

    let me = app
        .request(Method::GET, "/api/auth/me", None, Some(&token))
        .await;
    assert_eq!(me.status(), 200);
    let me = response_json(me).await;
    assert_eq!(me["email"], ADMIN_EMAIL);
    assert!(me["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    let response = app
        .post(
            "/api/auth/login",
            json!({"email": ADMIN_EMAIL, "password": "wrong-password"}),
        )
        .await;
    assert_eq!(response.status(), 401);

    let unknown = app
        .post(
            "/api/auth/login",
            json!({"email": "nobody@loja.test", "password": "whatever"}),
        )
        .await;
    assert_eq!(unknown.status(), 401);
}

#[tokio::test]
async fn me_requires_a_token() {
    let app = TestApp::new().await;
    assert_eq!(app.get("/api/auth/me").await.status(), 401);
}

#[tokio::test]
async fn mistyped_login_body_is_bad_request() {
    let app = TestApp::new().await;
    let response = app
        .post("/api/auth/login", json!({"email": ["a@b.com"], "password": 123}))
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Bad Request");
}
