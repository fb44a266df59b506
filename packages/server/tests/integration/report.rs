use serde_json::json;

use crate::common::{TestApp, UploadMeta, routes};

const PDF: &[u8] = b"%PDF-1.7 fake report";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

mod upload {
    use super::*;

    #[tokio::test]
    async fn upload_returns_metadata() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_report(
                "S1",
                "findings.pdf",
                PDF.to_vec(),
                UploadMeta {
                    id: Some("report-0001"),
                    name: Some("Radiology findings"),
                    mime: Some("application/pdf"),
                    ..Default::default()
                },
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["id"], "report-0001");
        assert_eq!(res.body["studyUid"], "S1");
        assert_eq!(res.body["name"], "Radiology findings");
        assert_eq!(res.body["type"], "pdf");
        assert_eq!(res.body["size"], PDF.len());
        assert_eq!(res.body["addedAt"], res.body["updatedAt"]);

        let study = app.study("S1").await;
        assert_eq!(study["reports"][0]["id"], "report-0001");
    }

    #[tokio::test]
    async fn short_id_is_replaced_with_a_generated_one() {
        let app = TestApp::spawn().await;
        let res = app
            .upload_report(
                "S1",
                "a.pdf",
                PDF.to_vec(),
                UploadMeta {
                    id: Some("short1"),
                    ..Default::default()
                },
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let id = res.body["id"].as_str().unwrap();
        assert_ne!(id, "short1");
        assert!((8..=64).contains(&id.len()));
        assert!(notes_common::is_valid_report_id(id));
    }

    #[tokio::test]
    async fn valid_id_is_kept_verbatim() {
        let app = TestApp::spawn().await;
        let res = app
            .upload_report(
                "S1",
                "a.pdf",
                PDF.to_vec(),
                UploadMeta {
                    id: Some("valid1234"),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(res.body["id"], "valid1234");
    }

    #[tokio::test]
    async fn type_is_detected_from_extension_or_hint() {
        let app = TestApp::spawn().await;

        let res = app
            .upload_report("S1", "scan.PNG", PNG.to_vec(), UploadMeta::default())
            .await;
        assert_eq!(res.body["type"], "png");

        let res = app
            .upload_report(
                "S1",
                "blob",
                b"jpeg".to_vec(),
                UploadMeta {
                    report_type: Some("jpg"),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["type"], "jpg");
        assert_eq!(res.body["name"], "blob");
    }

    #[tokio::test]
    async fn unsupported_type_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app
            .upload_report(
                "S1",
                "notes.txt",
                b"plain".to_vec(),
                UploadMeta {
                    mime: Some("text/plain"),
                    ..Default::default()
                },
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "Unsupported report file type");
        assert!(app.study("S1").await.is_null());
    }

    #[tokio::test]
    async fn missing_file_part_is_rejected() {
        let app = TestApp::spawn().await;
        let form = reqwest::multipart::Form::new().text("name", "no file");
        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::reports("S1")))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn long_names_are_capped() {
        let app = TestApp::spawn().await;
        let long = "n".repeat(400);
        let res = app
            .upload_report(
                "S1",
                "a.pdf",
                PDF.to_vec(),
                UploadMeta {
                    name: Some(&long),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(res.body["name"].as_str().unwrap().len(), 255);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app
            .upload_report("S1", "big.pdf", vec![b'x'; 1024 * 1024 + 1], UploadMeta::default())
            .await;
        assert_eq!(res.status, 413);
    }
}

mod upsert {
    use super::*;

    #[tokio::test]
    async fn reupload_with_same_id_replaces_in_place() {
        let app = TestApp::spawn().await;
        let id = "stable-report-id-0001";

        let first = app
            .upload_report(
                "S1",
                "v1.pdf",
                b"%PDF first".to_vec(),
                UploadMeta {
                    id: Some(id),
                    name: Some("First"),
                    added_at: Some(1_000),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(first.status, 200, "{}", first.text);
        assert_eq!(first.body["addedAt"], 1_000);

        let second = app
            .upload_report(
                "S1",
                "v2.pdf",
                b"%PDF second".to_vec(),
                UploadMeta {
                    id: Some(id),
                    name: Some("Second"),
                    added_at: Some(5_000),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(second.status, 200, "{}", second.text);
        assert_eq!(second.body["id"], id);
        assert_eq!(second.body["name"], "Second");
        assert_eq!(second.body["addedAt"], 1_000);
        assert!(second.body["updatedAt"].as_i64() >= first.body["updatedAt"].as_i64());

        let reports = app.study("S1").await["reports"].clone();
        assert_eq!(reports.as_array().unwrap().len(), 1);
        assert_eq!(reports[0]["name"], "Second");

        let (status, _, bytes) = app.get_bytes(&routes::report_file(id)).await;
        assert_eq!(status, 200);
        assert_eq!(bytes, b"%PDF second");
    }

    #[tokio::test]
    async fn id_owned_by_another_study_conflicts() {
        let app = TestApp::spawn().await;
        let meta = || UploadMeta {
            id: Some("shared-report-id"),
            ..Default::default()
        };

        app.upload_report("A", "a.pdf", PDF.to_vec(), meta()).await;
        let res = app.upload_report("B", "b.pdf", PDF.to_vec(), meta()).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
        assert!(app.study("B").await.is_null());
    }
}

mod download_and_delete {
    use super::*;

    #[tokio::test]
    async fn download_serves_bytes_with_stored_content_type() {
        let app = TestApp::spawn().await;
        let res = app
            .upload_report("S1", "scan.png", PNG.to_vec(), UploadMeta::default())
            .await;
        let id = res.body["id"].as_str().unwrap().to_string();

        let (status, content_type, bytes) = app.get_bytes(&routes::report_file(&id)).await;
        assert_eq!(status, 200);
        assert_eq!(content_type.as_deref(), Some("image/png"));
        assert_eq!(bytes, PNG);
    }

    #[tokio::test]
    async fn unknown_report_file_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app.get(&routes::report_file("does-not-exist")).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn delete_removes_metadata_and_file() {
        let app = TestApp::spawn().await;
        let res = app
            .upload_report("S1", "a.pdf", PDF.to_vec(), UploadMeta::default())
            .await;
        let id = res.body["id"].as_str().unwrap().to_string();

        let res = app.delete(&routes::report("S1", &id)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body, json!({"deleted": true, "id": id}));

        assert_eq!(app.get(&routes::report_file(&id)).await.status, 404);
        assert!(app.study("S1").await.is_null());
        assert_eq!(app.delete(&routes::report("S1", &id)).await.status, 404);
    }

    #[tokio::test]
    async fn delete_through_other_study_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app
            .upload_report("A", "a.pdf", PDF.to_vec(), UploadMeta::default())
            .await;
        let id = res.body["id"].as_str().unwrap().to_string();

        assert_eq!(app.delete(&routes::report("B", &id)).await.status, 404);
        assert_eq!(app.get_bytes(&routes::report_file(&id)).await.0, 200);
    }

    #[tokio::test]
    async fn shared_content_survives_deleting_one_report() {
        let app = TestApp::spawn().await;
        let a = app
            .upload_report("S1", "a.pdf", PDF.to_vec(), UploadMeta::default())
            .await;
        let b = app
            .upload_report("S2", "b.pdf", PDF.to_vec(), UploadMeta::default())
            .await;
        let a_id = a.body["id"].as_str().unwrap().to_string();
        let b_id = b.body["id"].as_str().unwrap().to_string();

        app.delete(&routes::report("S1", &a_id)).await;

        let (status, _, bytes) = app.get_bytes(&routes::report_file(&b_id)).await;
        assert_eq!(status, 200);
        assert_eq!(bytes, PDF);
    }

    #[tokio::test]
    async fn deleting_while_reuploading_same_bytes_keeps_the_file() {
        let app = TestApp::spawn().await;
        for round in 0..8 {
            let body = format!("%PDF-1.7 round {round}").into_bytes();
            let first = app
                .upload_report("S1", "a.pdf", body.clone(), UploadMeta::default())
                .await;
            let first_id = first.body["id"].as_str().unwrap().to_string();

            let delete_path = routes::report("S1", &first_id);
            let (deleted, second) = tokio::join!(
                app.delete(&delete_path),
                app.upload_report("S2", "b.pdf", body.clone(), UploadMeta::default()),
            );
            assert_eq!(deleted.status, 200);
            assert_eq!(second.status, 200);

            let second_id = second.body["id"].as_str().unwrap();
            let (status, _, bytes) = app.get_bytes(&routes::report_file(second_id)).await;
            assert_eq!(status, 200, "round {round}");
            assert_eq!(bytes, body);
        }
    }
}
