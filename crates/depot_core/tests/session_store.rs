mod common;

use common::{saved, saved_person, session, Member, Person, Team};
use depot_core::db::migrations::latest_version;
use depot_core::db::DbError;
use depot_core::model::entity::with_id;
use depot_core::{
    Depot, DepotError, Entity, EntryState, Session, SessionOptions, UpdateInput,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tempfile::tempdir;

#[test]
fn in_memory_store_is_fully_migrated() {
    let session = session();

    assert_eq!(session.schema_version().unwrap(), latest_version());
    assert!(session.can_connect());
    assert!(session.validate(true).unwrap());
}

#[test]
fn file_store_persists_across_sessions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("depot.sqlite3");

    let created = {
        let mut session = Session::open(SessionOptions::file(&path)).unwrap();
        saved_person(&mut session, "Ada")
    };

    let mut session = Session::open(SessionOptions::file(&path)).unwrap();
    assert_eq!(session.count::<Person>().unwrap(), 1);
    let loaded: Person = session.find(created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn raw_connection_must_be_migrated_first() {
    let conn = Connection::open_in_memory().unwrap();

    let err = Session::from_connection(conn).err().unwrap();

    assert!(matches!(
        err,
        DepotError::Db(DbError::UninitializedStore {
            actual_version: 0,
            ..
        })
    ));
}

#[test]
fn newer_store_version_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("PRAGMA user_version = 99;").unwrap();
    }

    let err = Session::open(SessionOptions::file(&path)).err().unwrap();

    assert!(matches!(
        err,
        DepotError::Db(DbError::UnsupportedSchemaVersion { db_version: 99, .. })
    ));
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Impostor {
    id: i64,
    timestamp: i64,
}

impl Entity for Impostor {
    const SET: &'static str = "people";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn set_timestamp(&mut self, timestamp: i64) {
        self.timestamp = timestamp;
    }
}

#[test]
fn two_types_cannot_share_a_set() {
    let session = session();
    session.register::<Person>().unwrap();

    let err = session.register::<Impostor>().unwrap_err();

    assert!(matches!(err, DepotError::InvalidInput(_)));
    assert_eq!(session.registered_sets(), vec!["people"]);
}

#[test]
fn failed_commit_writes_nothing_and_keeps_pending_entries() {
    let mut session = session();
    session.add(Person::new("Ann")).unwrap();
    session.update(with_id::<Person>(999)).unwrap();

    let err = session.save_changes().unwrap_err();

    assert!(matches!(err, DepotError::NotFound { set: "people", .. }));
    assert_eq!(session.count::<Person>().unwrap(), 0);
    assert_eq!(session.pending_changes(), 2);

    session.reject_changes();
    assert_eq!(session.pending_changes(), 0);
}

#[test]
fn added_entry_is_readable_through_its_handle_after_commit() {
    let mut session = session();
    let handle = session.add(Person::new("Bea")).unwrap();
    assert_eq!(session.pending_changes(), 1);

    assert_eq!(session.save_changes().unwrap(), 1);

    let stored: Person = session.entry(handle).unwrap().unwrap();
    assert!(stored.id > 0);
    assert!(stored.timestamp > 0);
    assert_eq!(session.state::<Person>(stored.id), EntryState::Unchanged);
}

#[test]
fn tracked_reads_return_the_identity_map_value() {
    let mut session = session();
    let ann = saved_person(&mut session, "Ann");
    let mut tracked: Person = session.find(ann.id).unwrap().unwrap();

    tracked.name = "Anna".to_string();
    assert_eq!(session.stage(tracked).unwrap(), EntryState::Modified);

    let again: Person = session.find(ann.id).unwrap().unwrap();
    let stored: Person = session.find_untracked(ann.id).unwrap().unwrap();
    assert_eq!(again.name, "Anna");
    assert_eq!(stored.name, "Ann");

    assert_eq!(session.save_changes().unwrap(), 1);
    let stored: Person = session.find_untracked(ann.id).unwrap().unwrap();
    assert_eq!(stored.name, "Anna");
}

#[test]
fn staging_an_identical_value_leaves_entry_unchanged() {
    let mut session = session();
    let ann = saved_person(&mut session, "Ann");
    session
        .set_state::<Person>(ann.id, EntryState::Detached)
        .unwrap();
    assert_eq!(session.state::<Person>(ann.id), EntryState::Detached);

    let attached = session.attach(ann.clone()).unwrap();
    assert_eq!(attached, ann);
    assert_eq!(session.state::<Person>(ann.id), EntryState::Unchanged);

    assert_eq!(session.stage(ann).unwrap(), EntryState::Unchanged);
    assert_eq!(session.pending_changes(), 0);
}

#[test]
fn attach_rejects_unsaved_entities() {
    let mut session = session();

    let err = session.attach(Person::new("New")).unwrap_err();

    assert!(matches!(err, DepotError::InvalidInput(_)));
}

#[test]
fn cyclic_relations_load_without_recursing_forever() {
    let mut session = session();
    let team = saved(&mut session, Team::new("Core"));
    let mut member = Member::new("kit");
    member.team = Some(with_id(team.id));
    let member = saved(&mut session, member);

    let mut roster = team.clone();
    roster.members = vec![with_id(member.id)];
    Depot::<Team>::new(&mut session)
        .update(UpdateInput::new(roster))
        .unwrap();

    let loaded: Team = session.find_untracked(team.id).unwrap().unwrap();
    assert_eq!(loaded.members.len(), 1);
    assert_eq!(loaded.members[0].nick, "kit");
    assert_eq!(
        loaded.members[0].team.as_ref().map(|team| team.id),
        Some(team.id)
    );

    let tracked: Team = session.find(team.id).unwrap().unwrap();
    assert_eq!(tracked.members[0].id, member.id);
}

#[test]
fn remove_record_deletes_immediately_and_untracks() {
    let mut session = session();
    let ann = saved_person(&mut session, "Ann");

    assert!(session.remove_record(Person::SET, ann.id).unwrap());
    assert!(!session.remove_record(Person::SET, ann.id).unwrap());

    assert_eq!(session.state::<Person>(ann.id), EntryState::Detached);
    assert!(session.find::<Person>(ann.id).unwrap().is_none());
}
