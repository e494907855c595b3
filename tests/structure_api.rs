//! Organization chart editor over HTTP

mod common;

use common::{png, upload, TestApp};
use hyper::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn test_empty_chart_lists_full_roster() {
    let app = TestApp::new().await;

    let response = app.get("/api/structure").await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["sectionTitle"], "Struktur Organisasi");
    let positions = body["positions"].as_array().unwrap();
    assert_eq!(positions.len(), 18);
    assert_eq!(positions[0]["order"], 1);
    assert_eq!(positions[0]["label"], "Kepala Sekolah");
    assert_eq!(positions[0]["displayTitle"], "Kepala Sekolah");
    assert!(positions.iter().all(|p| p["name"].is_null() && p["image"].is_null()));

    // Every order appears in exactly one tier
    let mut orders: Vec<u64> = body["rows"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|row| row.as_array().unwrap().iter().map(|o| o.as_u64().unwrap()))
        .collect();
    orders.sort_unstable();
    assert_eq!(orders, (1..=18).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_save_round_trip_with_portrait() {
    let app = TestApp::new().await;

    let response = app
        .admin(
            Method::PUT,
            "/admin/api/structure",
            Some(json!({
                "sectionTitle": "Struktur Organisasi SMK",
                "positions": [
                    {"order": 1, "name": "Drs. Budi Santoso", "image": upload("image/png", &png(1))},
                    {"order": 2, "title": "Wakasek Kurikulum", "name": "Sari Dewi"},
                    {"order": 99, "name": "Tidak terdaftar"}
                ]
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.json());

    let saved = response.json();
    assert_eq!(saved["sectionTitle"], "Struktur Organisasi SMK");
    assert_eq!(saved["positions"].as_array().unwrap().len(), 18);
    assert_eq!(saved["positions"][1]["displayTitle"], "Wakasek Kurikulum");

    let reference = saved["positions"][0]["image"]["reference"].as_str().unwrap().to_string();
    assert!(app.blobs.exists(&reference).await);
    let url = saved["positions"][0]["image"]["url"].as_str().unwrap();
    assert!(url.ends_with(&format!("/media/{}", reference)));

    // Public read matches what the editor saved
    let public = app.get("/api/structure").await.json();
    assert_eq!(public["positions"], saved["positions"]);
    assert_eq!(public["positions"][0]["name"], "Drs. Budi Santoso");

    // The portrait is served back
    let media = app.get(&format!("/media/{}", reference)).await;
    assert_eq!(media.status, StatusCode::OK);
    assert_eq!(media.header("content-type"), Some("image/png"));
    assert_eq!(media.body.as_ref(), png(1).as_slice());

    // Profile page carries the same chart
    let profile = app.get("/api/profile").await.json();
    assert_eq!(profile["structure"]["positions"], saved["positions"]);
}

#[tokio::test]
async fn test_save_replaces_whole_chart_but_keeps_portraits() {
    let app = TestApp::new().await;

    let first = app
        .admin(
            Method::PUT,
            "/admin/api/structure",
            Some(json!({
                "positions": [
                    {"order": 1, "name": "Budi", "image": upload("image/png", &png(2))},
                    {"order": 3, "name": "Citra"}
                ]
            })),
        )
        .await
        .json();
    let portrait = first["positions"][0]["image"].clone();

    let second = app
        .admin(
            Method::PUT,
            "/admin/api/structure",
            Some(json!({"positions": [{"order": 1, "name": "Budi Santoso"}]})),
        )
        .await
        .json();

    assert_eq!(second["positions"][0]["name"], "Budi Santoso");
    assert_eq!(second["positions"][0]["image"], portrait);
    assert!(second["positions"][2]["name"].is_null());
    assert_eq!(second["sectionTitle"], "Struktur Organisasi");
}

#[tokio::test]
async fn test_null_image_removes_one_portrait() {
    let app = TestApp::new().await;

    app.admin(
        Method::PUT,
        "/admin/api/structure",
        Some(json!({
            "positions": [
                {"order": 1, "name": "Budi", "image": upload("image/png", &png(5))},
                {"order": 2, "name": "Sari", "image": upload("image/png", &png(6))}
            ]
        })),
    )
    .await;

    let response = app
        .admin(
            Method::PUT,
            "/admin/api/structure",
            Some(json!({
                "positions": [
                    {"order": 1, "name": "Budi", "image": null},
                    {"order": 2, "name": "Sari"}
                ]
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.json());

    let saved = response.json();
    assert_eq!(saved["positions"][0]["name"], "Budi");
    assert!(saved["positions"][0]["image"].is_null());
    assert!(saved["positions"][1]["image"]["reference"].is_string());
}

#[tokio::test]
async fn test_rejected_image_leaves_chart_untouched() {
    let app = TestApp::new().await;

    let before = app
        .admin(
            Method::PUT,
            "/admin/api/structure",
            Some(json!({"positions": [{"order": 1, "name": "Budi"}]})),
        )
        .await
        .json();

    let response = app
        .admin(
            Method::PUT,
            "/admin/api/structure",
            Some(json!({
                "positions": [
                    {"order": 1, "name": "Ganti", "image": upload("image/png", &png(3))},
                    {"order": 2, "name": "Sari", "image": upload("image/png", b"plain text")}
                ]
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.json()["fields"]["positions.2.image"].is_array());

    let after = app.admin(Method::GET, "/admin/api/structure", None).await.json();
    assert_eq!(after["positions"], before["positions"]);
    assert_eq!(app.blobs.stats().await.unwrap().total_blobs, 0);
}

#[tokio::test]
async fn test_editor_requires_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::PUT,
            "/admin/api/structure",
            Some("wrong-token"),
            Some(json!({"positions": []})),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.header("www-authenticate"), Some("Bearer"));

    let response = app.get("/admin/api/structure").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
