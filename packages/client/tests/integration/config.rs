use notes_client::{BackendKind, ClientConfig, DeploymentMode, NotesApi};
use serde_json::Value;

use crate::common::{dead_url, uids};

// The only test that touches these variables, so it does not race with the rest.
#[tokio::test]
async fn configured_local_mode_writes_to_the_notes_file() {
    let dir = tempfile::tempdir().unwrap();
    let notes_path = dir.path().join("nested").join("notes.json");
    let config_path = dir.path().join("client.toml");
    std::fs::write(
        &config_path,
        format!(
            "mode = \"personal\"\nserver_url = \"{}\"\nnotes_path = \"{}\"\n",
            dead_url().await,
            notes_path.display()
        ),
    )
    .unwrap();

    // SAFETY: no other test reads or writes the client config variables.
    unsafe {
        std::env::set_var("DICOM_NOTES_CLIENT_CONFIG", &config_path);
        std::env::set_var("DICOM_NOTES_CLIENT__FEATURES__NOTES_SERVER", "false");
        std::env::set_var("DICOM_NOTES_CLIENT__TIMEOUT_SECS", "2");
    }
    let loaded = ClientConfig::load();
    unsafe {
        std::env::remove_var("DICOM_NOTES_CLIENT_CONFIG");
        std::env::remove_var("DICOM_NOTES_CLIENT__FEATURES__NOTES_SERVER");
        std::env::remove_var("DICOM_NOTES_CLIENT__TIMEOUT_SECS");
    }
    let config = loaded.expect("client config should load");

    assert_eq!(config.deployment_mode(), DeploymentMode::Personal);
    assert_eq!(config.notes_path, notes_path);
    assert_eq!(config.timeout_secs, Some(2));
    assert!(!config.features().notes_server);
    assert!(config.features().notes_persistence);

    let api = NotesApi::from_config(&config).expect("notes api should build");
    assert_eq!(api.backend(), BackendKind::Local);

    let saved = api
        .save_study_description("1.2.840.9", Some("  chest CT "))
        .await
        .expect("description should be saved locally");
    assert_eq!(saved.description(), "chest CT");

    let raw = std::fs::read_to_string(&notes_path).expect("notes file should exist");
    let document: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        document["studies"]["1.2.840.9"]["description"],
        "chest CT"
    );

    let notes = api.load_notes(&uids(&["1.2.840.9"])).await;
    assert_eq!(notes.studies["1.2.840.9"].description, "chest CT");
}
