use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use pageit_members::config::PagingConfig;
use pageit_members::http::{router, AppState};
use pageit_members::{db, MemberRepository};
use serde_json::Value;
use tower::ServiceExt;

async fn seeded_app() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("members.sqlite3");
    let database = db::connect(&path.display().to_string())
        .await
        .expect("open database");
    let members = MemberRepository::new(database);
    db::seed_members(&members).await.expect("seed");
    (dir, router(AppState::new(members, PagingConfig::default())))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn usernames(body: &Value) -> Vec<String> {
    body["content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["username"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_ok() {
    let (_dir, app) = seeded_app().await;
    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn default_page_is_five_by_username() {
    let (_dir, app) = seeded_app().await;
    let (status, body) = get_json(app, "/members").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        usernames(&body),
        vec!["member1", "member10", "member100", "member11", "member12"]
    );
    assert_eq!(body["total_elements"], 100);
    assert_eq!(body["total_pages"], 20);
    assert_eq!(body["number"], 0);
    assert_eq!(body["size"], 5);
    assert_eq!(body["first"], true);
    assert_eq!(body["last"], false);
    assert_eq!(body["has_next"], true);

    let first = &body["content"][0];
    assert!(first["id"].is_i64());
    assert!(first["team_name"].is_null());
    assert!(first.get("age").is_none());
}

#[tokio::test]
async fn page_size_and_sort_from_query() {
    let (_dir, app) = seeded_app().await;
    let (status, body) = get_json(app, "/members?page=1&size=3&sort=age,desc").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(usernames(&body), vec!["member97", "member96", "member95"]);
    assert_eq!(body["number"], 1);
    assert_eq!(body["total_pages"], 34);
    assert_eq!(body["first"], false);
}

#[tokio::test]
async fn last_page_reports_no_next() {
    let (_dir, app) = seeded_app().await;
    let (status, body) = get_json(app, "/members?page=33&size=3&sort=id").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(usernames(&body), vec!["member100"]);
    assert_eq!(body["last"], true);
    assert_eq!(body["has_next"], false);
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let (_dir, app) = seeded_app().await;

    let (status, body) = get_json(app.clone(), "/members?size=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = get_json(app.clone(), "/members?sort=password").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app, "/members?page=minus-one").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_failure_is_internal_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("empty.sqlite3");
    // No schema applied: every member query fails.
    let database = pageit_libsql::open_database(&path.display().to_string()).expect("open");
    let app = router(AppState::new(
        MemberRepository::new(database),
        PagingConfig::default(),
    ));

    let (status, body) = get_json(app, "/members").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal server error");
}
