use notes_server::entity::comment;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn migrating_twice_inserts_each_comment_once() {
    let app = TestApp::spawn().await;
    let payload = json!({"comments": {"S1": {"study": [{"text": "x", "time": 1000}]}}});

    let first = app.post(routes::MIGRATE, &payload).await;
    assert_eq!(first.status, 200, "{}", first.text);
    assert_eq!(first.body, json!({"migrated": 1}));

    let second = app.post(routes::MIGRATE, &payload).await;
    assert_eq!(second.body, json!({"migrated": 0}));

    let study = app.study("S1").await;
    let comments = study["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["text"], "x");
    assert_eq!(comments[0]["time"], 1000);
}

#[tokio::test]
async fn both_series_shapes_are_imported() {
    let app = TestApp::spawn().await;
    let payload = json!({"comments": {"S1": {
        "description": "Chest",
        "study": [],
        "series": {
            "OLD": [{"text": "bare list", "time": 1}],
            "NEW": {"description": "Axial", "comments": [{"text": "object form", "time": 2}]}
        }
    }}});

    let res = app.post(routes::MIGRATE, &payload).await;
    assert_eq!(res.body["migrated"], 2);

    let study = app.study("S1").await;
    assert_eq!(study["description"], "Chest");
    assert_eq!(study["series"]["OLD"]["comments"][0]["text"], "bare list");
    assert_eq!(study["series"]["NEW"]["description"], "Axial");
    assert_eq!(study["series"]["NEW"]["comments"][0]["text"], "object form");
}

#[tokio::test]
async fn existing_descriptions_are_never_overwritten() {
    let app = TestApp::spawn().await;
    app.put(&routes::study_description("S1"), &json!({"description": "server copy"}))
        .await;

    app.post(
        routes::MIGRATE,
        &json!({"comments": {"S1": {"description": "local copy"}, "S2": {"description": "new"}}}),
    )
    .await;

    assert_eq!(app.study("S1").await["description"], "server copy");
    assert_eq!(app.study("S2").await["description"], "new");
}

#[tokio::test]
async fn malformed_study_entries_are_skipped() {
    let app = TestApp::spawn().await;
    let payload = json!({"comments": {
        "BAD1": "not an object",
        "BAD2": [1, 2, 3],
        "GOOD": {"study": [{"text": "kept", "time": 10}, {"text": "  "}]}
    }});

    let res = app.post(routes::MIGRATE, &payload).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["migrated"], 1);
    assert_eq!(app.study("GOOD").await["comments"][0]["text"], "kept");
    assert!(app.study("BAD1").await.is_null());
}

#[tokio::test]
async fn malformed_fields_inside_a_study_do_not_drop_the_study() {
    let app = TestApp::spawn().await;
    let payload = json!({"comments": {
        "S1": {
            "description": "Chest",
            "study": [{"text": "keep me", "time": 1}, {"text": 7, "time": 2}],
            "series": {"SE1": null, "SE2": [{"text": "axial", "time": 3}]}
        },
        "S2": {"description": "Head", "study": null}
    }});

    let res = app.post(routes::MIGRATE, &payload).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["migrated"], 2);

    let s1 = app.study("S1").await;
    assert_eq!(s1["description"], "Chest");
    assert_eq!(s1["comments"].as_array().unwrap().len(), 1);
    assert_eq!(s1["comments"][0]["text"], "keep me");
    assert!(s1["series"]["SE1"].is_null());
    assert_eq!(s1["series"]["SE2"]["comments"][0]["text"], "axial");

    assert_eq!(app.study("S2").await["description"], "Head");
}

#[tokio::test]
async fn non_object_comments_is_rejected() {
    let app = TestApp::spawn().await;
    let res = app.post(routes::MIGRATE, &json!({"comments": [1]})).await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn missing_comments_migrates_nothing() {
    let app = TestApp::spawn().await;
    let res = app.post(routes::MIGRATE, &json!({})).await;
    assert_eq!(res.body, json!({"migrated": 0}));
}

#[tokio::test]
async fn comments_without_time_get_server_time() {
    let app = TestApp::spawn().await;
    let before = notes_common::time::now_ms();
    app.post(
        routes::MIGRATE,
        &json!({"comments": {"S1": {"study": [{"text": "undated"}]}}}),
    )
    .await;

    let time = app.study("S1").await["comments"][0]["time"].as_i64().unwrap();
    assert!(time >= before);
}

#[tokio::test]
async fn migrated_rows_share_the_comment_dedup_index() {
    let app = TestApp::spawn().await;
    let time = notes_common::time::now_ms() - 1_000;
    app.add_comment("S1", json!({"text": "same", "time": time}))
        .await;

    let res = app
        .post(
            routes::MIGRATE,
            &json!({"comments": {"S1": {"study": [{"text": "same", "time": time}]}}}),
        )
        .await;
    assert_eq!(res.body["migrated"], 0);

    let rows = comment::Entity::find().count(&app.db).await.unwrap();
    assert_eq!(rows, 1);
}
