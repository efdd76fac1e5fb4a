use serde_json::json;
use spark_core::{TaskFeeling, TaskId, TaskNode, TaskStatus};

#[test]
fn fresh_node_serializes_required_fields_only() {
    let node = TaskNode::with_id(TaskId::from("t-1"), "draft", None, 1_000);

    let value = serde_json::to_value(&node).unwrap();
    assert_eq!(
        value,
        json!({
            "id": "t-1",
            "content": "draft",
            "status": "active",
            "parentId": null,
            "createdAt": 1000
        })
    );
}

#[test]
fn completed_node_uses_camel_case_and_emoji_feeling() {
    let mut node = TaskNode::with_id(TaskId::from("t-2"), "ship", Some(TaskId::from("t-1")), 5);
    node.status = TaskStatus::Completed;
    node.completed_at = Some(9);
    node.feeling = Some(TaskFeeling::Great);
    node.reflection = Some("smooth".to_string());
    node.archived = Some(true);

    let value = serde_json::to_value(&node).unwrap();
    assert_eq!(value["parentId"], "t-1");
    assert_eq!(value["status"], "completed");
    assert_eq!(value["feeling"], "🤩");
    assert_eq!(value["completedAt"], 9);
    assert_eq!(value["reflection"], "smooth");
    assert_eq!(value["archived"], true);
}

#[test]
fn explicit_nulls_and_missing_optionals_both_load() {
    let with_nulls = json!({
        "id": "a",
        "content": "x",
        "status": "frozen",
        "parentId": null,
        "feeling": null,
        "reflection": null,
        "createdAt": 1,
        "completedAt": null,
        "archived": null
    });
    let sparse = json!({
        "id": "a",
        "content": "x",
        "status": "frozen",
        "createdAt": 1
    });

    let from_nulls: TaskNode = serde_json::from_value(with_nulls).unwrap();
    let from_sparse: TaskNode = serde_json::from_value(sparse).unwrap();
    assert_eq!(from_nulls, from_sparse);
    assert!(from_nulls.is_frozen());
}

#[test]
fn unknown_status_is_rejected() {
    let raw = json!({
        "id": "a",
        "content": "x",
        "status": "paused",
        "createdAt": 1
    });
    assert!(serde_json::from_value::<TaskNode>(raw).is_err());
}

#[test]
fn generated_ids_are_unique() {
    let first = TaskId::generate();
    let second = TaskId::generate();
    assert_ne!(first, second);
    assert_eq!(first.as_str().len(), 36);
}
