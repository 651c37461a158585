mod common;

use axum::http::{Method, StatusCode};
use common::{Part, TestApp, authed, get, multipart_request, zip_bytes};

#[tokio::test]
async fn nested_entry_point_becomes_the_playable_path() {
    let app = TestApp::new().await;
    let (_, token) = app.register("alice", false).await;

    let (status, body) = app
        .upload_game(
            &token,
            "Space Blaster",
            &[("sub/index.html", "<html></html>"), ("sub/game.js", "run()")],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let id = body["id"].as_i64().unwrap();
    let playable_path = body["playable_path"].as_str().unwrap();
    assert_eq!(playable_path, format!("{id}/sub/"));
    assert!(
        body["playable_url"]
            .as_str()
            .unwrap()
            .ends_with(&format!("/executables/{id}/sub/index.html"))
    );
    assert_eq!(body["author_name"], "alice");
    assert!(
        app.state
            .paths()
            .executables_root()
            .join(playable_path)
            .join("index.html")
            .is_file()
    );

    let (status, body) = app.send(get(&format!("/games/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Space Blaster");
}

#[tokio::test]
async fn extracted_games_are_served_statically() {
    let app = TestApp::new().await;
    let (_, token) = app.register("alice", false).await;
    let id = app.publish(&token, "Static Game").await;

    let (status, _) = app.send(get(&format!("/executables/{id}/index.html"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_entry_point_leaves_no_row_and_no_files() {
    let app = TestApp::new().await;
    let (_, token) = app.register("alice", false).await;

    let (status, body) = app
        .upload_game(&token, "Broken Game", &[("readme.txt", "no html here")])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("index.html"));

    let (_, games) = app.send(get("/games")).await;
    assert_eq!(games.as_array().unwrap().len(), 0);
    assert_eq!(app.uploads_count(), 0);
    assert_eq!(app.executables_count(), 0);
}

#[tokio::test]
async fn corrupt_archives_are_rejected_and_rolled_back() {
    let app = TestApp::new().await;
    let (_, token) = app.register("alice", false).await;

    let (status, _) = app
        .send(multipart_request(
            Method::POST,
            "/games",
            Some(&token),
            &[
                Part::text("title", "Not A Zip"),
                Part::file("archive", "game.zip", "application/zip", b"garbage".to_vec()),
                Part::file("image", "cover.png", "image/png", b"png".to_vec()),
            ],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.uploads_count(), 0);
    assert_eq!(app.executables_count(), 0);
}

#[tokio::test]
async fn missing_image_fails_before_any_write() {
    let app = TestApp::new().await;
    let (_, token) = app.register("alice", false).await;

    let (status, _) = app
        .send(multipart_request(
            Method::POST,
            "/games",
            Some(&token),
            &[
                Part::text("title", "No Cover"),
                Part::file(
                    "archive",
                    "game.zip",
                    "application/zip",
                    zip_bytes(&[("index.html", "<html>")]),
                ),
            ],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.uploads_count(), 0);
}

#[tokio::test]
async fn creation_requires_a_token() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(multipart_request(
            Method::POST,
            "/games",
            None,
            &[Part::text("title", "Anonymous")],
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn non_owners_cannot_modify_a_game() {
    let app = TestApp::new().await;
    let (_, owner) = app.register("alice", false).await;
    let (_, intruder) = app.register("mallory", false).await;
    let id = app.publish(&owner, "Alice Game").await;

    let (status, _) = app
        .send(multipart_request(
            Method::PUT,
            &format!("/games/{id}"),
            Some(&intruder),
            &[Part::text("title", "Hijacked")],
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(authed(Method::DELETE, &format!("/games/{id}"), &intruder))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(get(&format!("/games/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Alice Game");
}

#[tokio::test]
async fn owners_update_text_and_replace_archives() {
    let app = TestApp::new().await;
    let (_, token) = app.register("alice", false).await;
    let id = app.publish(&token, "First Title").await;

    let (status, body) = app
        .send(multipart_request(
            Method::PUT,
            &format!("/games/{id}"),
            Some(&token),
            &[
                Part::text("title", "Second Title"),
                Part::file(
                    "archive",
                    "v2.zip",
                    "application/zip",
                    zip_bytes(&[("dist/index.html", "<html>v2</html>")]),
                ),
            ],
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["title"], "Second Title");
    assert_eq!(body["description"], "A small browser game");
    assert_eq!(body["playable_path"], format!("{id}/dist/"));

    let root = app.state.paths().executables_path(id);
    assert!(root.join("dist").join("index.html").is_file());
    assert!(!root.join("index.html").exists());
    // Old archive replaced: one archive and one image remain.
    assert_eq!(app.uploads_count(), 2);
    // Neither the staging nor the parked previous directory survives the swap.
    assert_eq!(app.executables_count(), 1);
}

#[tokio::test]
async fn failed_archive_replacement_keeps_the_game_playable() {
    let app = TestApp::new().await;
    let (_, token) = app.register("alice", false).await;
    let id = app.publish(&token, "Stable Game").await;

    let (status, _) = app
        .send(multipart_request(
            Method::PUT,
            &format!("/games/{id}"),
            Some(&token),
            &[Part::file(
                "archive",
                "broken.zip",
                "application/zip",
                zip_bytes(&[("notes.txt", "oops")]),
            )],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.send(get(&format!("/games/{id}"))).await;
    assert_eq!(body["playable_path"], format!("{id}/"));
    assert!(
        app.state
            .paths()
            .executables_path(id)
            .join("index.html")
            .is_file()
    );
    assert_eq!(app.uploads_count(), 2);
    assert_eq!(app.executables_count(), 1);
}

#[tokio::test]
async fn empty_updates_are_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.register("alice", false).await;
    let id = app.publish(&token, "Same Game").await;

    let (status, _) = app
        .send(multipart_request(
            Method::PUT,
            &format!("/games/{id}"),
            Some(&token),
            &[Part::text("title", "   ")],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_a_game_removes_its_files() {
    let app = TestApp::new().await;
    let (_, token) = app.register("alice", false).await;
    let id = app.publish(&token, "Short Lived").await;

    let (status, _) = app
        .send(authed(Method::DELETE, &format!("/games/{id}"), &token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(get(&format!("/games/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.uploads_count(), 0);
    assert_eq!(app.executables_count(), 0);
}

#[tokio::test]
async fn games_outlive_their_deleted_author() {
    let app = TestApp::new().await;
    let (user_id, token) = app.register("alice", false).await;
    let id = app.publish(&token, "Orphan Game").await;

    let (status, _) = app
        .send(authed(Method::DELETE, &format!("/users/{user_id}"), &token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.send(get(&format!("/games/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user_id"].is_null());
    assert_eq!(body["author_name"], "unknown author");
}

#[tokio::test]
async fn degraded_storage_answers_service_unavailable() {
    let app = TestApp::new().await;
    app.state.clear_store().await;

    let (status, _) = app.send(get("/games")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = app.send(get("/healthcheck")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
}
