use std::time::Duration;

use resume_autofill::{
    matcher::ai_model::ModelSettings,
    storage::store::{
        JsonFileStore, KeyValueStore, MODEL_SETTINGS_KEY, MemoryStore, RESUME_DATA_KEY, RetryPolicy, StoreError,
        get_typed, load_model_settings, load_resume, save_with_retry, set_typed,
    },
};
use serde_json::json;

use crate::common::resumes::full_resume;

mod common;

fn quick() -> RetryPolicy {
    RetryPolicy {
        retries: 2,
        delay: Duration::from_millis(1),
    }
}

// =========================================================================
// JSON file store
// =========================================================================

#[test]
fn missing_or_blank_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let store = JsonFileStore::new(&path);
    assert_eq!(store.get(RESUME_DATA_KEY).unwrap(), None);

    std::fs::write(&path, "  \n").unwrap();
    assert_eq!(store.get(RESUME_DATA_KEY).unwrap(), None);
}

#[test]
fn values_persist_across_store_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let store = JsonFileStore::new(&path);
    store.set("a", json!({"x": 1})).unwrap();
    store.set("b", json!([1, 2])).unwrap();
    store.set("a", json!("replaced")).unwrap();

    let reopened = JsonFileStore::new(&path);
    assert_eq!(reopened.get("a").unwrap(), Some(json!("replaced")));
    assert_eq!(reopened.get("b").unwrap(), Some(json!([1, 2])));
    assert_eq!(reopened.path(), path.as_path());
}

#[test]
fn corrupt_file_is_a_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "{not json").unwrap();

    let store = JsonFileStore::new(&path);
    assert!(matches!(store.get("a"), Err(StoreError::Json { .. })));
    assert!(store.set("a", json!(1)).is_err());
}

// =========================================================================
// Typed access
// =========================================================================

#[test]
fn resume_and_settings_round_trip_through_typed_helpers() {
    let store = MemoryStore::new();
    assert_eq!(load_resume(&store).unwrap(), None);

    set_typed(&store, RESUME_DATA_KEY, &full_resume()).unwrap();
    assert_eq!(load_resume(&store).unwrap(), Some(full_resume()));

    // the extension stores camelCase keys
    store
        .set(MODEL_SETTINGS_KEY, json!({"provider": "kimi", "apiKey": "sk-1", "customUrl": "http://localhost:8000/v1"}))
        .unwrap();
    let settings = load_model_settings(&store).unwrap().unwrap();
    assert_eq!(settings.provider.as_deref(), Some("kimi"));
    assert_eq!(settings.api_key.as_deref(), Some("sk-1"));
    assert_eq!(settings.custom_url.as_deref(), Some("http://localhost:8000/v1"));
    assert!(settings.is_configured());
}

#[test]
fn wrongly_shaped_value_is_reported_with_its_key() {
    let store = MemoryStore::new();
    store.set(MODEL_SETTINGS_KEY, json!("just a string")).unwrap();

    match get_typed::<ModelSettings>(&store, MODEL_SETTINGS_KEY) {
        Err(StoreError::Json { key, .. }) => assert_eq!(key, MODEL_SETTINGS_KEY),
        other => panic!("expected a JSON error, got {:?}", other),
    }
}

// =========================================================================
// Retry
// =========================================================================

#[test]
fn save_with_retry_writes_through_on_first_success() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(&dir.path().join("store.json"));

    save_with_retry(&store, RESUME_DATA_KEY, &json!({"personalInfo": {"name": "张三"}}), quick()).unwrap();
    let resume = load_resume(&store).unwrap().unwrap();
    assert_eq!(resume.personal_info, Some(json!({"name": "张三"})));
}

#[test]
fn save_with_retry_returns_the_last_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(&dir.path().join("no-such-dir").join("store.json"));

    let result = save_with_retry(&store, "k", &json!(1), quick());
    assert!(matches!(result, Err(StoreError::Io { .. })));
}

#[test]
fn default_retry_policy() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.retries, 3);
    assert_eq!(policy.delay, Duration::from_millis(500));
}
