//! Download endpoint tests driven through the router without a socket.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use keiba_scraper::serve::router;
use tempfile::TempDir;
use tower::ServiceExt;

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn seeded_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("races.csv"), "date,track\n2024-01-03,川崎\n").unwrap();
    std::fs::write(dir.path().join("horse_odds.csv"), "date,track\n").unwrap();
    std::fs::write(dir.path().join("checkpoint.json"), "{}").unwrap();
    dir
}

#[tokio::test]
async fn test_listing_shows_only_csv_files_sorted() {
    let dir = seeded_dir();
    let app = router(dir.path());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    let entries: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["horse_odds.csv", "races.csv"]);
}

#[tokio::test]
async fn test_download_returns_attachment() {
    let dir = seeded_dir();
    let app = router(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/files/races.csv")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap(),
        "attachment; filename=\"races.csv\""
    );

    let body = body_string(response).await;
    assert!(body.contains("2024-01-03,川崎"));
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let dir = seeded_dir();
    let app = router(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/files/missing.csv")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_csv_and_traversal_names_rejected() {
    let dir = seeded_dir();

    for uri in ["/files/checkpoint.json", "/files/..%2Fraces.csv"] {
        let response = router(dir.path())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
    }
}
