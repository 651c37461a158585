mod common;

use axum::http::{Method, StatusCode};
use common::{PASSWORD, TestApp, authed, get, json_request};
use serde_json::json;

#[tokio::test]
async fn register_login_and_me() {
    let app = TestApp::new().await;
    let (user_id, _) = app.register("alice", false).await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({ "email": "ALICE@example.com", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["token"].as_str().unwrap().to_owned();
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = app.send(authed(Method::GET, "/auth/me", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id);
    assert_eq!(body["name"], "alice");
}

#[tokio::test]
async fn bad_credentials_and_tokens_are_unauthorized() {
    let app = TestApp::new().await;
    app.register("alice", false).await;

    let (status, _) = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({ "email": "alice@example.com", "password": "wrong-password" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(get("/auth/me")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.send(authed(Method::GET, "/auth/me", "not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_registrations_conflict() {
    let app = TestApp::new().await;
    app.register("alice", false).await;

    let (status, _) = app
        .send(json_request(
            Method::POST,
            "/auth/register",
            None,
            json!({ "name": "alice2", "email": "alice@example.com", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(json_request(
            Method::POST,
            "/auth/register",
            None,
            json!({ "name": "a", "email": "not-an-email", "password": "123" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_edits_need_the_current_password() {
    let app = TestApp::new().await;
    let (user_id, token) = app.register("alice", false).await;
    let (other_id, _) = app.register("bobby", false).await;
    let uri = format!("/users/{user_id}");

    let (status, _) = app
        .send(json_request(Method::PUT, &uri, Some(&token), json!({ "name": "alicia" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(json_request(
            Method::PUT,
            &uri,
            Some(&token),
            json!({ "current_password": "nope-nope", "name": "alicia" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(json_request(
            Method::PUT,
            &format!("/users/{other_id}"),
            Some(&token),
            json!({ "current_password": PASSWORD, "name": "hijack" }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(json_request(
            Method::PUT,
            &uri,
            Some(&token),
            json!({ "current_password": PASSWORD, "name": "alicia", "ai_enabled": true }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "alicia");
    assert_eq!(body["ai_enabled"], true);
}

#[tokio::test]
async fn user_detail_lists_published_games() {
    let app = TestApp::new().await;
    let (user_id, token) = app.register("alice", false).await;
    app.publish(&token, "Portfolio Piece").await;

    let (status, body) = app.send(get(&format!("/users/{user_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "alice");
    assert_eq!(body["games"][0]["title"], "Portfolio Piece");

    let (status, body) = app.send(get("/users")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn recommendations_require_opt_in() {
    let app = TestApp::with_ai_answer("[1]").await;
    let (_, token) = app.register("alice", false).await;

    let (status, _) = app
        .send(authed(Method::GET, "/ai/recommendations", &token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn recommendations_only_contain_unplayed_candidates() {
    // Fresh database: the three games below get ids 1, 2 and 3.
    let app = TestApp::with_ai_answer("```json\n[2, 1, 999]\n```").await;
    let (_, author) = app.register("alice", false).await;
    let liked = app.publish(&author, "Liked Game").await;
    let candidate = app.publish(&author, "Fresh Game").await;
    app.publish(&author, "Other Game").await;
    assert_eq!((liked, candidate), (1, 2));

    let (_, reader) = app.register("rita", true).await;
    app.play(&reader, liked, 1.0).await;
    let (status, _) = app
        .send(json_request(
            Method::POST,
            &format!("/games/{liked}/comments"),
            Some(&reader),
            json!({ "quality": 5, "difficulty": 2, "body": "loved it" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(authed(Method::GET, "/ai/recommendations", &reader))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0]["id"], candidate);
    assert_eq!(recommendations[0]["title"], "Fresh Game");
}

#[tokio::test]
async fn recommendations_explain_empty_results() {
    let app = TestApp::with_ai_answer("[]").await;
    let (_, token) = app.register("rita", true).await;

    let (status, body) = app
        .send(authed(Method::GET, "/ai/recommendations", &token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 0);
    assert!(body["message"].is_string());
}
