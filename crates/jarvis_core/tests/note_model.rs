use chrono::{TimeZone, Utc};
use jarvis_core::{Note, NoteBody, NoteDraft, NotePatch, NoteType, NoteValidationError};

fn stored_task() -> Note {
    let created = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    Note {
        id: 7,
        name: "file taxes".to_string(),
        content: "before the deadline".to_string(),
        tags: vec!["home".to_string()],
        created,
        updated: created,
        body: NoteBody::Task {
            due_date: None,
            done: false,
        },
    }
}

#[test]
fn note_serializes_flat_with_type_tag() {
    let note = Note {
        body: NoteBody::Event {
            date: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        },
        ..stored_task()
    };

    let json = serde_json::to_value(&note).unwrap();
    assert_eq!(json["id"], 7);
    assert_eq!(json["type"], "event");
    assert_eq!(json["name"], "file taxes");
    assert_eq!(json["tags"], serde_json::json!(["home"]));
    assert_eq!(json["created"], "2024-05-01T08:00:00Z");
    assert_eq!(json["date"], "2024-06-01T12:00:00Z");
    assert!(json.get("done").is_none());

    let decoded: Note = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, note);
}

#[test]
fn task_json_defaults_optional_fields() {
    let decoded: Note = serde_json::from_value(serde_json::json!({
        "id": 3,
        "type": "task",
        "name": "water plants",
        "content": "",
        "created": "2024-05-01T08:00:00Z",
        "updated": "2024-05-01T08:00:00Z"
    }))
    .unwrap();

    assert!(decoded.tags.is_empty());
    assert_eq!(
        decoded.body,
        NoteBody::Task {
            due_date: None,
            done: false
        }
    );
}

#[test]
fn draft_validation_builds_variant_payloads() {
    let event = NoteDraft {
        date: Some("2024-06-01T09:00:00".to_string()),
        ..NoteDraft::new(NoteType::Event, "standup", "")
    }
    .validate()
    .unwrap();
    assert_eq!(
        event.body,
        NoteBody::Event {
            date: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
        }
    );

    let task = NoteDraft {
        due_date: Some("2024-06-02".to_string()),
        done: Some(true),
        ..NoteDraft::new(NoteType::Task, "ship", "v1")
    }
    .validate()
    .unwrap();
    assert_eq!(
        task.body,
        NoteBody::Task {
            due_date: Some(Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap()),
            done: true
        }
    );
}

#[test]
fn draft_validation_reports_each_failure_kind() {
    let missing_type = NoteDraft {
        kind: None,
        ..NoteDraft::new(NoteType::Memo, "a", "b")
    };
    assert_eq!(
        missing_type.validate().unwrap_err(),
        NoteValidationError::MissingField("type")
    );

    let unknown_type = NoteDraft {
        kind: Some("journal".to_string()),
        ..NoteDraft::new(NoteType::Memo, "a", "b")
    };
    assert!(matches!(
        unknown_type.validate().unwrap_err(),
        NoteValidationError::InvalidType(_)
    ));

    let blank_name = NoteDraft::new(NoteType::Memo, "   ", "b");
    assert_eq!(
        blank_name.validate().unwrap_err(),
        NoteValidationError::BlankName
    );

    let missing_content = NoteDraft {
        content: None,
        ..NoteDraft::new(NoteType::Memo, "a", "b")
    };
    assert_eq!(
        missing_content.validate().unwrap_err(),
        NoteValidationError::MissingField("content")
    );

    let event_without_date = NoteDraft::new(NoteType::Event, "a", "b");
    assert_eq!(
        event_without_date.validate().unwrap_err(),
        NoteValidationError::MissingField("date")
    );

    let bad_date = NoteDraft {
        date: Some("soon".to_string()),
        ..NoteDraft::new(NoteType::Event, "a", "b")
    };
    assert!(matches!(
        bad_date.validate().unwrap_err(),
        NoteValidationError::InvalidTimestamp { field: "date", .. }
    ));

    let memo_with_done = NoteDraft {
        done: Some(true),
        ..NoteDraft::new(NoteType::Memo, "a", "b")
    };
    assert_eq!(
        memo_with_done.validate().unwrap_err(),
        NoteValidationError::FieldNotAllowed {
            field: "done",
            kind: NoteType::Memo
        }
    );
}

#[test]
fn draft_accepts_empty_content() {
    let memo = NoteDraft::new(NoteType::Memo, "title only", "")
        .validate()
        .unwrap();
    assert_eq!(memo.content, "");
}

#[test]
fn patch_merges_only_present_fields_and_advances_updated() {
    let current = stored_task();
    let patch = NotePatch {
        done: Some(true),
        ..NotePatch::for_type(NoteType::Task)
    };

    let mut next = patch.apply(&current).unwrap();
    assert_eq!(next.updated, current.updated);
    next.touch(current.updated).unwrap();
    assert_eq!(next.name, current.name);
    assert_eq!(next.content, current.content);
    assert_eq!(next.tags, current.tags);
    assert_eq!(next.created, current.created);
    assert!(next.updated > current.updated);
    assert_eq!(
        next.body,
        NoteBody::Task {
            due_date: None,
            done: true
        }
    );
}

#[test]
fn patch_rejects_immutable_and_foreign_fields() {
    let current = stored_task();

    let wrong_id = NotePatch {
        id: Some(99),
        ..NotePatch::for_type(NoteType::Task)
    };
    assert_eq!(
        wrong_id.apply(&current).unwrap_err(),
        NoteValidationError::ImmutableField("id")
    );

    let moved_created = NotePatch {
        created: Some("2020-01-01T00:00:00Z".to_string()),
        ..NotePatch::for_type(NoteType::Task)
    };
    assert_eq!(
        moved_created.apply(&current).unwrap_err(),
        NoteValidationError::ImmutableField("created")
    );

    let event_field = NotePatch {
        date: Some("2024-06-01".to_string()),
        ..NotePatch::for_type(NoteType::Task)
    };
    assert_eq!(
        event_field.apply(&current).unwrap_err(),
        NoteValidationError::FieldNotAllowed {
            field: "date",
            kind: NoteType::Task
        }
    );

    let unchanged_created = NotePatch {
        created: Some("2024-05-01T17:00:00+09:00".to_string()),
        updated: Some("2000-01-01".to_string()),
        ..NotePatch::for_type(NoteType::Task)
    };
    let next = unchanged_created.apply(&current).unwrap();
    assert_eq!(next.updated, current.updated);
}

#[test]
fn patch_without_type_is_rejected() {
    let patch = NotePatch {
        name: Some("renamed".to_string()),
        ..NotePatch::default()
    };
    assert_eq!(
        patch.note_type().unwrap_err(),
        NoteValidationError::MissingField("type")
    );
}

#[test]
fn draft_deserializes_from_request_json() {
    let draft: NoteDraft = serde_json::from_value(serde_json::json!({
        "type": "memo",
        "name": "Test Memo",
        "content": "hi",
        "tags": ["x"]
    }))
    .unwrap();

    assert_eq!(draft.note_type().unwrap(), NoteType::Memo);
    assert_eq!(draft.tags, vec!["x"]);
}

#[test]
fn patch_due_date_tells_null_from_absent() {
    let absent: NotePatch = serde_json::from_value(serde_json::json!({ "type": "task" })).unwrap();
    let cleared: NotePatch =
        serde_json::from_value(serde_json::json!({ "type": "task", "due_date": null })).unwrap();
    let set: NotePatch =
        serde_json::from_value(serde_json::json!({ "type": "task", "due_date": "2024-06-02" }))
            .unwrap();
    assert_eq!(absent.due_date, None);
    assert_eq!(cleared.due_date, Some(None));
    assert_eq!(set.due_date, Some(Some("2024-06-02".to_string())));

    let current = Note {
        body: NoteBody::Task {
            due_date: Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
            done: false,
        },
        ..stored_task()
    };
    assert_eq!(absent.apply(&current).unwrap().body, current.body);
    assert_eq!(
        cleared.apply(&current).unwrap().body,
        NoteBody::Task {
            due_date: None,
            done: false
        }
    );

    let json = serde_json::to_value(&cleared).unwrap();
    assert!(json["due_date"].is_null());
    assert!(json.as_object().unwrap().contains_key("due_date"));
}
