mod common;

use common::{saved, saved_person, session, Person};
use depot_core::model::entity::with_id;
use depot_core::{
    Depot, DepotError, EntityErrorKind, FilterQueryInput, QueryInput, RecordDisposer,
    UpdateInput,
};

#[test]
fn delete_by_id_returns_last_state_and_removes_row() {
    let mut session = session();
    let ann = saved_person(&mut session, "Ann");
    let mut depot = Depot::<Person>::new(&mut session);

    let deleted = depot.delete(ann.id).unwrap();

    assert_eq!(deleted.name, "Ann");
    assert!(matches!(
        depot.read(ann.id).unwrap_err(),
        DepotError::NotFound { .. }
    ));
    assert!(matches!(
        depot.delete(ann.id).unwrap_err(),
        DepotError::NotFound { .. }
    ));
}

#[test]
fn delete_many_isolates_missing_ids() {
    let mut session = session();
    let ann = saved_person(&mut session, "Ann");
    let bob = saved_person(&mut session, "Bob");

    let output = Depot::<Person>::new(&mut session)
        .delete_many(&[ann.id, 999, bob.id])
        .unwrap();

    assert_eq!(output.successes_count(), 2);
    assert_eq!(output.failures()[0].kind, EntityErrorKind::DeleteFailed);
    assert_eq!(output.failures()[0].entity, with_id::<Person>(999));
    assert_eq!(session.count::<Person>().unwrap(), 0);
}

#[test]
fn delete_entity_with_stale_id_fails_and_leaves_nothing_pending() {
    let mut session = session();

    let err = Depot::<Person>::new(&mut session)
        .delete_entity(with_id(404))
        .unwrap_err();

    assert!(matches!(err, DepotError::NotFound { .. }));
    assert_eq!(session.pending_changes(), 0);
}

#[test]
fn delete_entities_removes_each_entity() {
    let mut session = session();
    let ann = saved_person(&mut session, "Ann");
    let bob = saved_person(&mut session, "Bob");
    let cid = saved_person(&mut session, "Cid");

    let output = Depot::<Person>::new(&mut session)
        .delete_entities(vec![ann, bob])
        .unwrap();

    assert_eq!(output.successes_count(), 2);
    assert!(!output.failed());
    let remaining: Vec<Person> = session.query_untracked().unwrap().into_vec();
    assert_eq!(remaining, vec![cid]);
}

#[test]
fn delete_filter_removes_matches_only() {
    let mut session = session();
    let mut off = Person::new("Off");
    off.enabled = false;
    saved(&mut session, off);
    let on = saved_person(&mut session, "On");

    let output = Depot::<Person>::new(&mut session)
        .delete_filter(QueryInput::new(FilterQueryInput::new(|person: &Person| {
            !person.enabled
        })))
        .unwrap();

    assert_eq!(output.successes_count(), 1);
    assert_eq!(output.successes()[0].name, "Off");
    let remaining: Vec<Person> = session.query_untracked().unwrap().into_vec();
    assert_eq!(remaining, vec![on]);
}

#[test]
fn disposer_removes_what_the_depot_created() {
    let mut session = session();
    let kept = saved_person(&mut session, "Kept");
    let mut disposer = RecordDisposer::new();

    {
        let mut depot = Depot::<Person>::new(&mut session).with_disposer(&mut disposer);
        depot.create(Person::new("Temp 1")).unwrap();
        depot.create(Person::new("Temp 2")).unwrap();
    }

    assert_eq!(disposer.len(), 2);
    assert_eq!(disposer.records()[0].0, "people");
    assert_eq!(disposer.dispose(&mut session).unwrap(), 2);
    assert!(disposer.is_empty());

    let remaining: Vec<Person> = session.query_untracked().unwrap().into_vec();
    assert_eq!(remaining, vec![kept]);
}

#[test]
fn disposer_records_updated_entities_once_per_call() {
    let mut session = session();
    let ann = saved_person(&mut session, "Ann");
    let mut disposer = RecordDisposer::new();

    let created = {
        let mut depot = Depot::<Person>::new(&mut session).with_disposer(&mut disposer);
        let mut renamed = ann.clone();
        renamed.name = "Anna".to_string();
        depot.update(UpdateInput::new(renamed)).unwrap();
        depot
            .update(UpdateInput::new(Person::new("Fresh")).or_create())
            .unwrap()
            .updated
    };

    assert_eq!(
        disposer.records(),
        &[("people", ann.id), ("people", created.id)]
    );
    assert_eq!(disposer.dispose(&mut session).unwrap(), 2);
    assert_eq!(session.count::<Person>().unwrap(), 0);
}
