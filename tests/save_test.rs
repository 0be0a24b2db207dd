//! Integration tests for single and batched saves.

mod common;

use assert_matches::assert_matches;
use common::{Curse, Note, Player, TestHarness};
use tabula::{Error, MemorySequence, Operation};

// ---------------------------------------------------------------------------
// save
// ---------------------------------------------------------------------------

#[test]
fn save_assigns_identifier_from_sequence() {
    let h = TestHarness::new();
    let mut player = Player::named("ayla");

    assert_eq!(h.handler.save(&mut player).unwrap(), 1);
    assert_eq!(player.id, 5);
    assert_eq!(h.next_id("Players"), Some(6));

    let loaded: Player = h.handler.load_one(&5).unwrap().unwrap();
    assert_eq!(loaded, player);
}

#[test]
fn save_keeps_explicit_identifier() {
    let h = TestHarness::new();
    let mut player = Player {
        id: 42,
        name: "bram".into(),
    };

    h.handler.save(&mut player).unwrap();
    assert_eq!(player.id, 42);
    assert_eq!(h.next_id("Players"), None);
}

#[test]
fn save_without_auto_increment_never_touches_identifier() {
    let h = TestHarness::new();
    let mut note = Note::new(0, "zero is a valid key here");

    h.handler.save(&mut note).unwrap();
    assert_eq!(note.id, 0);
    assert_eq!(h.count("Notes"), 1);
}

#[test]
fn save_twice_updates_row() {
    let h = TestHarness::new();
    let mut note = Note::new(1, "draft");
    h.handler.save(&mut note).unwrap();

    note.body = "final".into();
    h.handler.save(&mut note).unwrap();

    assert_eq!(h.count("Notes"), 1);
    let loaded: Note = h.handler.load_one(&1).unwrap().unwrap();
    assert_eq!(loaded.body, "final");
}

#[test]
fn save_reports_completion() {
    let h = TestHarness::new();
    let mut note = Note::new(7, "hello");
    h.handler.save(&mut note).unwrap();

    let executed = h.observer.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].sql.starts_with("INSERT INTO \"Notes\""));
    assert_eq!(executed[0].parameters, vec!["Id", "Body"]);
    assert_eq!(executed[0].affected, 1);
    assert!(executed[0].subject.contains("hello"));
    assert!(h.observer.failed().is_empty());
}

#[test]
fn serializer_mismatch_aborts_before_execution() {
    let h = TestHarness::new();
    let mut curse = Curse::new(1, -3);

    let err = h.handler.save(&mut curse).unwrap_err();
    assert_matches!(
        err,
        Error::TypeMismatch {
            stage: "returning value after serialization",
            ..
        }
    );

    assert_eq!(h.count("Curses"), 0);
    assert!(h.observer.executed().is_empty());

    let failed = h.observer.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].operation, Operation::Save);
    assert_eq!(failed[0].table.as_deref(), Some("Curses"));
    assert!(failed[0].subject.contains("power: -3"));
}

#[test]
fn constraint_violation_is_execution_error() {
    let h = TestHarness::new();
    let mut note = Note::new(1, "");

    let err = h.handler.save(&mut note).unwrap_err();
    assert!(err.is_execution());

    let failed = h.observer.failed();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].sql.as_deref().unwrap().starts_with("INSERT INTO \"Notes\""));
    assert!(h.observer.executed().is_empty());
}

// ---------------------------------------------------------------------------
// save_many
// ---------------------------------------------------------------------------

#[test]
fn save_many_allocates_consecutive_identifiers() {
    let h = TestHarness::new();
    let mut players = vec![Player::named("a"), Player::named("b"), Player::named("c")];
    let mut seen = Vec::new();

    let affected = h
        .handler
        .save_many_with(&mut players, |player, index| {
            seen.push((index, player.id, player.name.clone()));
        })
        .unwrap();

    assert_eq!(affected, 3);
    let ids: Vec<i64> = players.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![5, 6, 7]);
    assert_eq!(h.next_id("Players"), Some(8));
    assert_eq!(
        seen,
        vec![
            (0, 5, "a".to_string()),
            (1, 6, "b".to_string()),
            (2, 7, "c".to_string()),
        ]
    );
}

#[test]
fn save_many_advances_counter_by_batch_size() {
    let h = TestHarness::new();
    let mut first = vec![Player::named("a"), Player::named("b")];
    let mut second = vec![Player::named("c"), Player::named("d"), Player::named("e")];

    h.handler.save_many(&mut first).unwrap();
    h.handler.save_many(&mut second).unwrap();

    let ids: Vec<i64> = first.iter().chain(&second).map(|p| p.id).collect();
    assert_eq!(ids, vec![5, 6, 7, 8, 9]);
    assert_eq!(h.next_id("Players"), Some(10));
    assert_eq!(h.count("Players"), 5);
}

#[test]
fn save_many_binds_row_suffixed_parameters() {
    let h = TestHarness::new();
    let mut notes = vec![Note::new(1, "one"), Note::new(2, "two"), Note::new(3, "three")];

    h.handler.save_many(&mut notes).unwrap();

    let executed = h.observer.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(
        executed[0].parameters,
        vec!["Id", "Body", "Id1", "Body1", "Id2", "Body2"]
    );
    assert!(executed[0].subject.contains("count: 3"));
    assert_eq!(h.count("Notes"), 3);
}

#[test]
fn save_many_without_auto_increment_keeps_identifiers() {
    let h = TestHarness::new();
    let mut notes = vec![Note::new(10, "x"), Note::new(20, "y")];

    h.handler.save_many(&mut notes).unwrap();
    assert_eq!(notes[0].id, 10);
    assert_eq!(notes[1].id, 20);
}

#[test]
fn save_many_empty_batch_does_nothing() {
    let h = TestHarness::new();
    let mut players: Vec<Player> = Vec::new();

    assert_eq!(h.handler.save_many(&mut players).unwrap(), 0);
    assert!(h.observer.executed().is_empty());
    assert!(h.observer.failed().is_empty());
    assert_eq!(h.next_id("Players"), None);
}

#[test]
fn save_many_failure_reports_entry_being_processed() {
    let h = TestHarness::new();
    let mut curses = vec![Curse::new(1, 1), Curse::new(2, -2), Curse::new(3, 3)];
    let mut indices = Vec::new();

    let err = h
        .handler
        .save_many_with(&mut curses, |_, index| indices.push(index))
        .unwrap_err();

    assert_matches!(err, Error::TypeMismatch { .. });
    assert_eq!(indices, vec![0]);
    assert_eq!(h.count("Curses"), 0);

    let failed = h.observer.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].operation, Operation::SaveMany);
    assert!(failed[0].subject.contains("power: -2"));
}

#[test]
fn save_many_execution_failure_reports_last_entry() {
    let h = TestHarness::new();
    let mut notes = vec![Note::new(1, "ok"), Note::new(2, "")];

    let err = h.handler.save_many(&mut notes).unwrap_err();
    assert!(err.is_execution());
    assert_eq!(h.count("Notes"), 0);

    let failed = h.observer.failed();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].subject.contains("id: 2"));
}

#[test]
fn save_many_replaces_existing_rows() {
    let h = TestHarness::new();
    let mut notes = vec![Note::new(1, "old"), Note::new(2, "old")];
    h.handler.save_many(&mut notes).unwrap();

    for note in &mut notes {
        note.body = "new".into();
    }
    h.handler.save_many(&mut notes).unwrap();

    assert_eq!(h.count("Notes"), 2);
    let loaded: Vec<Note> = h.handler.load_all("Body", &"new".to_string()).unwrap();
    assert_eq!(loaded.len(), 2);
}

#[test]
fn save_against_missing_table_fails() {
    #[derive(Debug, Default)]
    struct Ghost {
        id: i64,
    }

    impl tabula::Entity for Ghost {
        type Key = i64;

        fn id(&self) -> &i64 {
            &self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = id;
        }

        fn describe(_table: &mut tabula::TableBuilder<Self>) {}
    }

    let h = TestHarness::new();
    let err = h.handler.save(&mut Ghost { id: 1 }).unwrap_err();
    assert!(err.is_execution());
    assert!(err.to_string().contains("no such table"));
    assert_eq!(h.observer.failed()[0].table.as_deref(), Some("Ghost"));
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

#[test]
fn save_many_on_single_connection_pool_advances_counter() {
    let h = TestHarness::with_pool_size(1);
    let mut first = vec![Player::named("a"), Player::named("b")];
    let mut second = vec![Player::named("c"), Player::named("d")];

    assert_eq!(h.handler.save_many(&mut first).unwrap(), 2);
    assert_eq!(h.next_id("Players"), Some(7));

    assert_eq!(h.handler.save_many(&mut second).unwrap(), 2);
    let ids: Vec<i64> = first.iter().chain(&second).map(|p| p.id).collect();
    assert_eq!(ids, vec![5, 6, 7, 8]);
    assert_eq!(h.count("Players"), 4);
    assert!(h.observer.failed().is_empty());
}

#[test]
fn save_many_over_parameter_limit_is_rejected_up_front() {
    let h = TestHarness::new();
    // Two columns per row.
    let mut players: Vec<Player> = (0..tabula::table::query::MAX_PARAMETERS / 2 + 1)
        .map(|i| Player::named(&format!("p{i}")))
        .collect();

    let err = h.handler.save_many(&mut players).unwrap_err();
    assert_matches!(err, Error::InvalidInput(_));
    assert!(err.to_string().contains("split the batch"));

    assert!(h.observer.executed().is_empty());
    assert_eq!(h.observer.failed().len(), 1);
    assert_eq!(h.next_id("Players"), None);
    assert!(players.iter().all(|p| p.id == 0));
}

#[test]
fn save_many_past_identifier_space_fails_before_execution() {
    #[derive(Debug, Default)]
    struct Token {
        id: i64,
    }

    impl tabula::Entity for Token {
        type Key = i64;

        fn id(&self) -> &i64 {
            &self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = id;
        }

        fn describe(table: &mut tabula::TableBuilder<Self>) {
            table
                .name("Tokens")
                .auto_increment(MemorySequence::starting_at(i64::MAX - 2));
        }
    }

    let h = TestHarness::new();
    h.db.get()
        .unwrap()
        .execute_batch("CREATE TABLE Tokens (Id INTEGER PRIMARY KEY)")
        .unwrap();

    let mut tokens = vec![Token::default(), Token::default(), Token::default()];
    let err = h.handler.save_many(&mut tokens).unwrap_err();
    assert_matches!(err, Error::InvalidInput(_));
    assert_eq!(h.count("Tokens"), 0);
    assert!(h.observer.executed().is_empty());

    // The failed batch consumed its start; one identifier is left.
    let mut last = vec![Token::default()];
    assert_eq!(h.handler.save_many(&mut last).unwrap(), 1);
    assert_eq!(last[0].id, i64::MAX - 1);

    let err = h.handler.save(&mut Token::default()).unwrap_err();
    assert_matches!(err, Error::InvalidInput(_));
}
