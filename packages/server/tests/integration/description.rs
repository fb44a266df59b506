use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn study_description_is_trimmed_and_stamped() {
    let app = TestApp::spawn().await;
    let before = notes_common::time::now_ms();

    let res = app
        .put(&routes::study_description("S1"), &json!({"description": "  Follow-up  "}))
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["studyUid"], "S1");
    assert_eq!(res.body["description"], "Follow-up");
    assert!(res.body["updatedAt"].as_i64().unwrap() >= before);
    assert!(res.body.get("seriesUid").is_none());
}

#[tokio::test]
async fn saving_empty_description_removes_the_study() {
    let app = TestApp::spawn().await;
    app.put(&routes::study_description("S1"), &json!({"description": "keep me"}))
        .await;
    assert_eq!(app.study("S1").await["description"], "keep me");

    let res = app
        .put(&routes::study_description("S1"), &json!({"description": ""}))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["description"], "");

    assert!(app.study("S1").await.is_null());
}

#[tokio::test]
async fn whitespace_or_missing_description_counts_as_empty() {
    let app = TestApp::spawn().await;

    for body in [json!({"description": "   \n"}), json!({}), json!(null)] {
        app.put(&routes::study_description("S1"), &json!({"description": "x"}))
            .await;
        let res = app.put(&routes::study_description("S1"), &body).await;
        assert_eq!(res.status, 200, "{body}: {}", res.text);
        assert_eq!(res.body["description"], "");
        assert!(app.study("S1").await.is_null(), "{body}");
    }

    app.put(&routes::study_description("S1"), &json!({"description": "x"}))
        .await;
    let res = app.put_empty(&routes::study_description("S1")).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert!(app.study("S1").await.is_null());
}

#[tokio::test]
async fn clearing_description_keeps_other_notes() {
    let app = TestApp::spawn().await;
    app.put(&routes::study_description("S1"), &json!({"description": "desc"}))
        .await;
    app.add_comment("S1", json!({"text": "still here"})).await;

    app.put(&routes::study_description("S1"), &json!({"description": ""}))
        .await;

    let study = app.study("S1").await;
    assert_eq!(study["description"], "");
    assert_eq!(study["comments"][0]["text"], "still here");
}

#[tokio::test]
async fn series_description_round_trip_and_clear() {
    let app = TestApp::spawn().await;

    let res = app
        .put(&routes::series_description("S1", "SER1"), &json!({"description": " Sagittal "}))
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["seriesUid"], "SER1");
    assert_eq!(res.body["description"], "Sagittal");

    let res = app
        .put(&routes::series_description("S1", "SER1"), &json!({"description": "Coronal"}))
        .await;
    assert_eq!(res.body["description"], "Coronal");
    assert_eq!(app.study("S1").await["series"]["SER1"]["description"], "Coronal");

    app.put(&routes::series_description("S1", "SER1"), &json!({"description": " "}))
        .await;
    assert!(app.study("S1").await.is_null());
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = TestApp::spawn().await;
    let res = app
        .client
        .put(format!("http://{}{}", app.addr, routes::study_description("S1")))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}
