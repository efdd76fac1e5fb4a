use spark_core::config::StoreConfig;
use spark_core::{
    ManualClock, MemoryStorage, MutationOutcome, SqliteKvStorage, StorageError, StorageResult,
    TaskFeeling, TaskNode, TaskStatus, TaskStorage, TaskStore, STORAGE_KEY,
};

const T0: i64 = 1_767_225_600_000;

struct BrokenStorage;

impl TaskStorage for BrokenStorage {
    fn load(&self) -> StorageResult<Option<Vec<TaskNode>>> {
        Err(StorageError::Unavailable("disk gone".to_string()))
    }

    fn save(&self, _tasks: &[TaskNode]) -> StorageResult<()> {
        Err(StorageError::Unavailable("disk gone".to_string()))
    }
}

#[test]
fn reload_from_sqlite_file_restores_collection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spark.sqlite3");

    let (root, step) = {
        let storage = SqliteKvStorage::open(&path).unwrap();
        let mut store = TaskStore::with_clock(storage, ManualClock::new(T0));
        let root = store.add_task("write intro", None);
        let step = store.split_task(&root).unwrap();
        store.update_task_content(&step, "outline");
        store.complete_task(&root, Some(TaskFeeling::Great));
        store.update_task_reflection(&root, "easier than expected");
        (root, step)
    };

    let reopened = TaskStore::with_clock(
        SqliteKvStorage::open(&path).unwrap(),
        ManualClock::new(T0),
    );
    assert_eq!(reopened.len(), 2);
    let root_task = reopened.get(&root).unwrap();
    assert_eq!(root_task.status, TaskStatus::Completed);
    assert_eq!(root_task.feeling, Some(TaskFeeling::Great));
    assert_eq!(
        root_task.reflection.as_deref(),
        Some("easier than expected")
    );
    assert_eq!(reopened.get(&step).unwrap().parent_id, Some(root));
}

#[test]
fn config_selects_file_and_key() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::default()
        .with_db_path(dir.path().join("custom.sqlite3"))
        .with_storage_key("spark-storage-test");

    let storage = SqliteKvStorage::from_config(&config).unwrap();
    assert_eq!(storage.key(), "spark-storage-test");
    let mut store = TaskStore::with_clock(storage, ManualClock::new(T0));
    store.add_task("keyed", None);

    let default_key = SqliteKvStorage::open(&config.db_path).unwrap();
    assert_eq!(default_key.key(), STORAGE_KEY);
    assert!(default_key.load().unwrap().is_none());
}

#[test]
fn document_written_by_store_matches_persisted_layout() {
    let storage = SqliteKvStorage::in_memory().unwrap();
    let mut store = TaskStore::with_clock(storage, ManualClock::new(T0));
    store.add_task("layout", None);

    let raw = store.storage().raw_entry().unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["version"], 0);
    assert_eq!(value["state"]["tasks"][0]["content"], "layout");
    assert_eq!(value["state"]["tasks"][0]["status"], "active");
    assert_eq!(value["state"]["tasks"][0]["createdAt"], T0);
}

#[test]
fn persisted_document_from_older_client_loads() {
    let raw = r#"{
        "state": {
            "tasks": [
                {
                    "id": "a",
                    "content": "legacy",
                    "status": "completed",
                    "parentId": null,
                    "feeling": "🙂",
                    "createdAt": 10,
                    "completedAt": 20
                },
                {
                    "id": "b",
                    "content": "",
                    "status": "active",
                    "parentId": "a",
                    "createdAt": 15
                }
            ],
            "activePopoverId": null
        },
        "version": 0
    }"#;
    let store = TaskStore::with_clock(MemoryStorage::with_raw(raw), ManualClock::new(T0));

    assert_eq!(store.len(), 2);
    let roots = spark_core::root_tasks(store.tasks());
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].id.as_str(), "a");
    assert!(spark_core::is_chain_active("a", store.tasks()));
}

#[test]
fn malformed_document_survives_memory_only_session() {
    let storage = MemoryStorage::with_raw("{ not json");
    let mut store = TaskStore::with_clock(storage.clone(), ManualClock::new(T0));
    assert!(store.is_empty());
    assert!(!store.is_persisting());

    let id = store.add_task("scratch", None);

    assert!(store.get(&id).is_some());
    assert_eq!(storage.raw().as_deref(), Some("{ not json"));
}

#[test]
fn newer_document_version_is_left_untouched() {
    let raw = r#"{
        "state": {
            "tasks": [
                { "id": "a", "content": "from newer client", "status": "active", "createdAt": 1 }
            ]
        },
        "version": 3
    }"#;
    let storage = MemoryStorage::with_raw(raw);
    assert!(matches!(
        storage.load(),
        Err(StorageError::UnsupportedVersion { found: 3, .. })
    ));

    let mut store = TaskStore::with_clock(storage.clone(), ManualClock::new(T0));
    assert!(store.is_empty());
    store.add_task("new", None);
    store.archive_completed();

    assert!(storage.raw().unwrap().contains("from newer client"));
}

#[test]
fn one_bad_record_keeps_the_rest_and_backs_up_original() {
    let raw = r#"{
        "state": {
            "tasks": [
                { "id": "a", "content": "years of history", "status": "completed",
                  "feeling": "🙂", "createdAt": 1, "completedAt": 2 },
                { "id": "b", "content": "odd mood", "status": "completed",
                  "feeling": "😀", "createdAt": 3, "completedAt": 4 }
            ]
        },
        "version": 0
    }"#;
    let storage = MemoryStorage::with_raw(raw);
    let mut store = TaskStore::with_clock(storage.clone(), ManualClock::new(T0));

    assert_eq!(store.len(), 1);
    assert_eq!(store.tasks()[0].content, "years of history");
    assert!(store.is_persisting());
    assert_eq!(storage.backup_raw().as_deref(), Some(raw));

    store.add_task("next", None);
    assert!(storage.raw().unwrap().contains("years of history"));
    assert_eq!(storage.backup_raw().as_deref(), Some(raw));
}

#[test]
fn unreadable_sqlite_entry_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spark.sqlite3");
    {
        let storage = SqliteKvStorage::open(&path).unwrap();
        storage.put_raw_entry("corrupt").unwrap();
    }

    {
        let mut store = TaskStore::with_clock(
            SqliteKvStorage::open(&path).unwrap(),
            ManualClock::new(T0),
        );
        store.add_task("lost on exit", None);
        assert_eq!(
            store.storage().raw_entry().unwrap().as_deref(),
            Some("corrupt")
        );
    }

    let storage = SqliteKvStorage::open(&path).unwrap();
    assert_eq!(storage.raw_entry().unwrap().as_deref(), Some("corrupt"));
}

#[test]
fn failing_storage_keeps_session_in_memory() {
    let mut store = TaskStore::with_clock(BrokenStorage, ManualClock::new(T0));
    assert!(store.is_empty());
    assert!(!store.is_persisting());

    let id = store.add_task("still works", None);
    assert_eq!(
        store.complete_task(&id, Some(TaskFeeling::Neutral)),
        MutationOutcome::Applied
    );
    assert_eq!(store.get(&id).unwrap().status, TaskStatus::Completed);
}

#[test]
fn clearing_kv_entry_yields_empty_store_on_next_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spark.sqlite3");
    {
        let mut store = TaskStore::with_clock(
            SqliteKvStorage::open(&path).unwrap(),
            ManualClock::new(T0),
        );
        store.add_task("temporary", None);
        store.storage().clear().unwrap();
    }

    let store = TaskStore::with_clock(SqliteKvStorage::open(&path).unwrap(), ManualClock::new(T0));
    assert!(store.is_empty());
}
