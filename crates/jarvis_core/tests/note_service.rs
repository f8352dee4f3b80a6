use jarvis_core::db::open_db_in_memory;
use jarvis_core::{
    NoteDraft, NoteFilterParams, NotePatch, NoteService, NoteType, NoteValidationError,
    RepoError, SqliteNoteRepository,
};

#[test]
fn create_returns_stored_record_with_assigned_fields() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = NoteService::new(SqliteNoteRepository::try_new(&mut conn).unwrap());

    let note = service
        .create_note(&NoteDraft::new(NoteType::Memo, "Test Memo", "hi").with_tags(["x", "y"]))
        .unwrap();

    assert_eq!(note.id, 1);
    assert_eq!(note.kind(), NoteType::Memo);
    assert_eq!(note.created, note.updated);
    assert_eq!(
        service.get_note("memo", note.id).unwrap(),
        Some(note.clone())
    );
}

#[test]
fn list_all_concatenates_partitions_in_type_order() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = NoteService::new(SqliteNoteRepository::try_new(&mut conn).unwrap());

    service
        .create_note(&NoteDraft::new(NoteType::Task, "task", ""))
        .unwrap();
    service
        .create_note(&NoteDraft {
            date: Some("2024-06-01".to_string()),
            ..NoteDraft::new(NoteType::Event, "event", "")
        })
        .unwrap();
    service
        .create_note(&NoteDraft::new(NoteType::Memo, "memo", ""))
        .unwrap();

    let kinds = service
        .list_all()
        .unwrap()
        .iter()
        .map(|note| note.kind())
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec![NoteType::Memo, NoteType::Event, NoteType::Task]);
    assert_eq!(service.list_notes("Task").unwrap().len(), 1);
}

#[test]
fn unknown_type_names_are_rejected_everywhere() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = NoteService::new(SqliteNoteRepository::try_new(&mut conn).unwrap());

    assert!(matches!(
        service.get_note("journal", 1).unwrap_err(),
        RepoError::InvalidType(_)
    ));
    assert!(matches!(
        service.list_notes("journal").unwrap_err(),
        RepoError::InvalidType(_)
    ));
    assert!(matches!(
        service
            .filter_notes("journal", &NoteFilterParams::default())
            .unwrap_err(),
        RepoError::InvalidType(_)
    ));
    assert!(matches!(
        service.delete_note("journal", 1).unwrap_err(),
        RepoError::InvalidType(_)
    ));
    assert!(matches!(
        service.delete_all(Some("journal")).unwrap_err(),
        RepoError::InvalidType(_)
    ));
}

#[test]
fn update_returns_merged_record() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = NoteService::new(SqliteNoteRepository::try_new(&mut conn).unwrap());

    let created = service
        .create_note(&NoteDraft::new(NoteType::Memo, "draft", "v1"))
        .unwrap();
    let updated = service
        .update_note(
            created.id,
            &NotePatch {
                content: Some("v2".to_string()),
                ..NotePatch::for_type(NoteType::Memo)
            },
        )
        .unwrap();

    assert_eq!(updated.name, "draft");
    assert_eq!(updated.content, "v2");
    assert!(updated.updated > created.updated);
    assert_eq!(updated.created, created.created);
}

#[test]
fn update_without_type_is_a_validation_error() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = NoteService::new(SqliteNoteRepository::try_new(&mut conn).unwrap());

    let err = service
        .update_note(
            1,
            &NotePatch {
                name: Some("x".to_string()),
                ..NotePatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(NoteValidationError::MissingField("type"))
    ));
}

#[test]
fn filter_with_half_range_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let service = NoteService::new(SqliteNoteRepository::try_new(&mut conn).unwrap());

    let params = NoteFilterParams {
        created_start: Some("2024-01-01".to_string()),
        ..NoteFilterParams::default()
    };
    assert!(matches!(
        service.filter_notes("memo", &params).unwrap_err(),
        RepoError::Validation(NoteValidationError::IncompleteRange("created"))
    ));
}

#[test]
fn delete_then_get_returns_none() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = NoteService::new(SqliteNoteRepository::try_new(&mut conn).unwrap());

    let note = service
        .create_note(&NoteDraft::new(NoteType::Task, "done soon", ""))
        .unwrap();
    service.delete_note("task", note.id).unwrap();

    assert_eq!(service.get_note("task", note.id).unwrap(), None);
    assert!(matches!(
        service.delete_note("task", note.id).unwrap_err(),
        RepoError::NotFound { .. }
    ));
}

#[test]
fn delete_all_by_type_name() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = NoteService::new(SqliteNoteRepository::try_new(&mut conn).unwrap());

    service
        .create_note(&NoteDraft::new(NoteType::Memo, "m", ""))
        .unwrap();
    service
        .create_note(&NoteDraft::new(NoteType::Task, "t", ""))
        .unwrap();

    service.delete_all(Some("memo")).unwrap();
    assert_eq!(service.list_all().unwrap().len(), 1);

    service.delete_all(None).unwrap();
    assert!(service.list_all().unwrap().is_empty());
}
