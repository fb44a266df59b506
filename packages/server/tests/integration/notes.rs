use serde_json::json;

use crate::common::{TestApp, routes};

mod batch_load {
    use super::*;

    #[tokio::test]
    async fn missing_or_blank_studies_yield_empty_map() {
        let app = TestApp::spawn().await;

        for path in [routes::NOTES, "/api/notes/", "/api/notes?studies=", "/api/notes?studies=,%20,"] {
            let res = app.get(path).await;
            assert_eq!(res.status, 200, "{path}: {}", res.text);
            assert_eq!(res.body, json!({"studies": {}}), "{path}");
        }
    }

    #[tokio::test]
    async fn exactly_two_hundred_studies_are_accepted() {
        let app = TestApp::spawn().await;
        let uids: Vec<String> = (0..200).map(|i| format!("1.2.840.{i}")).collect();
        let refs: Vec<&str> = uids.iter().map(String::as_str).collect();

        let res = app.get(&routes::load(&refs)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["studies"], json!({}));
    }

    #[tokio::test]
    async fn two_hundred_and_one_studies_are_rejected() {
        let app = TestApp::spawn().await;
        let uids: Vec<String> = (0..201).map(|i| format!("1.2.840.{i}")).collect();
        let refs: Vec<&str> = uids.iter().map(String::as_str).collect();

        let res = app.get(&routes::load(&refs)).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(res.body["error"].as_str().unwrap().contains("200"));
    }

    #[tokio::test]
    async fn duplicate_uids_count_once_towards_the_limit() {
        let app = TestApp::spawn().await;
        let mut uids: Vec<String> = (0..200).map(|i| format!("1.2.840.{i}")).collect();
        uids.push("1.2.840.0".to_string());
        let refs: Vec<&str> = uids.iter().map(String::as_str).collect();

        let res = app.get(&routes::load(&refs)).await;
        assert_eq!(res.status, 200, "{}", res.text);
    }

    #[tokio::test]
    async fn only_studies_with_notes_are_returned() {
        let app = TestApp::spawn().await;
        app.put(&routes::study_description("S1"), &json!({"description": "Chest CT"}))
            .await;

        let res = app.get(&routes::load(&["S1", "S2"])).await;
        assert_eq!(res.status, 200);
        let studies = res.body["studies"].as_object().unwrap();
        assert_eq!(studies.len(), 1);
        assert_eq!(studies["S1"]["description"], "Chest CT");
        assert_eq!(studies["S1"]["comments"], json!([]));
        assert_eq!(studies["S1"]["series"], json!({}));
        assert_eq!(studies["S1"]["reports"], json!([]));
    }

    #[tokio::test]
    async fn comments_are_sorted_by_time() {
        let app = TestApp::spawn().await;
        let base = notes_common::time::now_ms() - 10_000;

        for offset in [3, 1, 2] {
            app.add_comment("S1", json!({"text": format!("c{offset}"), "time": base + offset}))
                .await;
        }

        let study = app.study("S1").await;
        let texts: Vec<&str> = study["comments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["text"].as_str().unwrap())
            .collect();
        assert_eq!(texts, ["c1", "c2", "c3"]);
    }

    #[tokio::test]
    async fn series_notes_nest_under_their_study() {
        let app = TestApp::spawn().await;
        app.put(
            &routes::series_description("S1", "SER1"),
            &json!({"description": "Axial"}),
        )
        .await;
        app.add_comment("S1", json!({"text": "series note", "seriesUid": "SER1"}))
            .await;
        app.add_comment("S1", json!({"text": "study note"})).await;

        let study = app.study("S1").await;
        assert_eq!(study["description"], "");
        assert_eq!(study["series"]["SER1"]["description"], "Axial");
        assert_eq!(study["series"]["SER1"]["comments"][0]["text"], "series note");
        assert_eq!(study["comments"].as_array().unwrap().len(), 1);
        assert_eq!(study["comments"][0]["text"], "study note");
    }

    #[tokio::test]
    async fn same_series_uid_under_two_studies_stays_separate() {
        let app = TestApp::spawn().await;
        app.put(&routes::series_description("A", "SER"), &json!({"description": "from A"}))
            .await;
        app.put(&routes::series_description("B", "SER"), &json!({"description": "from B"}))
            .await;

        let res = app.get(&routes::load(&["A", "B"])).await;
        assert_eq!(res.body["studies"]["A"]["series"]["SER"]["description"], "from A");
        assert_eq!(res.body["studies"]["B"]["series"]["SER"]["description"], "from B");
    }

    #[tokio::test]
    async fn uids_with_reserved_characters_round_trip() {
        let app = TestApp::spawn().await;
        let uid = "study with,comma&amp";
        let encoded = urlencoding::encode(uid).into_owned();
        let res = app
            .put(
                &format!("/api/notes/{encoded}/description"),
                &json!({"description": "odd uid"}),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["studyUid"], uid);

        assert_eq!(app.study(uid).await["description"], "odd uid");
    }
}
