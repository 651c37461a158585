mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, authed, get, json_request};
use serde_json::{Value, json};

async fn comment(
    app: &TestApp,
    token: &str,
    game_id: i64,
    quality: i64,
    difficulty: i64,
) -> (StatusCode, Value) {
    app.send(json_request(
        Method::POST,
        &format!("/games/{game_id}/comments"),
        Some(token),
        json!({ "quality": quality, "difficulty": difficulty, "body": "played it" }),
    ))
    .await
}

async fn averages(app: &TestApp, game_id: i64) -> (f64, f64) {
    let (_, body) = app.send(get(&format!("/games/{game_id}"))).await;
    (
        body["avg_quality"].as_f64().unwrap(),
        body["avg_difficulty"].as_f64().unwrap(),
    )
}

#[tokio::test]
async fn commenting_requires_recorded_play_time() {
    let app = TestApp::new().await;
    let (_, token) = app.register("alice", false).await;
    let game_id = app.publish(&token, "Unplayed").await;

    let (status, _) = comment(&app, &token, game_id, 4, 2).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn averages_follow_every_comment_mutation() {
    let app = TestApp::new().await;
    let (_, author) = app.register("alice", false).await;
    let (_, bob) = app.register("bobby", false).await;
    let game_id = app.publish(&author, "Rated Game").await;
    assert_eq!(averages(&app, game_id).await, (0.0, 0.0));

    app.play(&author, game_id, 1.0).await;
    app.play(&bob, game_id, 2.0).await;

    let (status, first) = comment(&app, &author, game_id, 5, 4).await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert!(first["ai_response"].is_null());
    assert_eq!(first["play_time_hours"], 1.0);
    let (status, second) = comment(&app, &bob, game_id, 3, 2).await;
    assert_eq!(status, StatusCode::CREATED, "{second}");
    assert_eq!(averages(&app, game_id).await, (4.0, 3.0));

    let second_id = second["id"].as_i64().unwrap();
    let (status, updated) = app
        .send(json_request(
            Method::PUT,
            &format!("/games/{game_id}/comments/{second_id}"),
            Some(&bob),
            json!({ "quality": 5 }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["difficulty"], 2);
    assert_eq!(averages(&app, game_id).await, (5.0, 3.0));

    let (status, _) = app
        .send(authed(
            Method::DELETE,
            &format!("/games/{game_id}/comments/{second_id}"),
            &bob,
        ))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(averages(&app, game_id).await, (5.0, 4.0));

    let first_id = first["id"].as_i64().unwrap();
    let (status, _) = app
        .send(authed(
            Method::DELETE,
            &format!("/games/{game_id}/comments/{first_id}"),
            &author,
        ))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(averages(&app, game_id).await, (0.0, 0.0));
}

#[tokio::test]
async fn one_comment_per_user_and_game() {
    let app = TestApp::new().await;
    let (_, token) = app.register("alice", false).await;
    let game_id = app.publish(&token, "Once").await;
    app.play(&token, game_id, 0.5).await;

    let (status, _) = comment(&app, &token, game_id, 4, 2).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = comment(&app, &token, game_id, 1, 1).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn out_of_range_ratings_are_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.register("alice", false).await;
    let game_id = app.publish(&token, "Strict").await;
    app.play(&token, game_id, 0.5).await;

    let (status, body) = comment(&app, &token, game_id, 6, 2).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "validation failed");
}

#[tokio::test]
async fn listing_reports_snapshot_and_current_play_time() {
    let app = TestApp::new().await;
    let (_, token) = app.register("alice", false).await;
    let game_id = app.publish(&token, "Timed").await;
    app.play(&token, game_id, 1.0).await;
    comment(&app, &token, game_id, 4, 3).await;
    app.play(&token, game_id, 0.5).await;

    let (status, body) = app
        .send(get(&format!("/games/{game_id}/comments")))
        .await;
    assert_eq!(status, StatusCode::OK);
    let comments = body.as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["author_name"], "alice");
    assert_eq!(comments[0]["play_time_hours"], 1.0);
    assert_eq!(comments[0]["current_play_time_hours"], 1.5);
}

#[tokio::test]
async fn comments_are_scoped_to_their_game() {
    let app = TestApp::new().await;
    let (_, token) = app.register("alice", false).await;
    let first_game = app.publish(&token, "First").await;
    let second_game = app.publish(&token, "Second").await;
    app.play(&token, first_game, 1.0).await;
    let (_, created) = comment(&app, &token, first_game, 4, 3).await;
    let comment_id = created["id"].as_i64().unwrap();

    let (status, _) = app
        .send(get(&format!("/games/{second_game}/comments/{comment_id}")))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(authed(
            Method::DELETE,
            &format!("/games/{second_game}/comments/{comment_id}"),
            &token,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_the_author_edits_a_comment() {
    let app = TestApp::new().await;
    let (_, author) = app.register("alice", false).await;
    let (_, intruder) = app.register("mallory", false).await;
    let game_id = app.publish(&author, "Guarded").await;
    app.play(&author, game_id, 1.0).await;
    let (_, created) = comment(&app, &author, game_id, 4, 3).await;
    let comment_id = created["id"].as_i64().unwrap();

    let (status, _) = app
        .send(json_request(
            Method::PUT,
            &format!("/games/{game_id}/comments/{comment_id}"),
            Some(&intruder),
            json!({ "body": "rewritten" }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app
        .send(get(&format!("/games/{game_id}/comments/{comment_id}")))
        .await;
    assert_eq!(body["body"], "played it");
}

#[tokio::test]
async fn outlier_ratings_get_an_ai_reaction() {
    let app = TestApp::with_ai_answer("Bold take on a crowd favourite!").await;
    let (_, author) = app.register("alice", false).await;
    let (_, bob) = app.register("bobby", false).await;
    let (_, carol) = app.register("carol", false).await;
    let game_id = app.publish(&author, "Divisive").await;

    for token in [&author, &bob, &carol] {
        app.play(token, game_id, 1.0).await;
    }
    let (_, body) = comment(&app, &author, game_id, 3, 3).await;
    assert!(body["ai_response"].is_null());
    comment(&app, &bob, game_id, 3, 3).await;

    let (status, body) = comment(&app, &carol, game_id, 5, 3).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["ai_response"], "Bold take on a crowd favourite!");
}
