mod common;

use common::{saved, saved_person, session, Person};
use depot_core::{
    Depot, DepotError, FilterNode, FilterOperator, PropertyFilter, Query, QueryInput, Session,
    ViewInput, ViewOrdering,
};

fn seed(session: &mut Session, count: usize) -> Vec<Person> {
    (1..=count)
        .map(|index| saved_person(session, &format!("p{index:02}")))
        .collect()
}

fn ids(people: &[Person]) -> Vec<i64> {
    people.iter().map(|person| person.id).collect()
}

#[test]
fn view_pages_through_the_set() {
    let mut session = session();
    let people = seed(&mut session, 25);
    let mut depot = Depot::<Person>::new(&mut session);

    let second = depot.view(QueryInput::new(ViewInput::new(2, 10))).unwrap();
    assert_eq!(second.page, 2);
    assert_eq!(second.pages, 3);
    assert_eq!(second.count, 25);
    assert_eq!(ids(&second.entities), ids(&people[10..20]));

    let last = depot.view(QueryInput::new(ViewInput::new(3, 10))).unwrap();
    assert_eq!(ids(&last.entities), ids(&people[20..]));
}

#[test]
fn export_returns_every_match_on_one_page() {
    let mut session = session();
    seed(&mut session, 25);

    let output = Depot::<Person>::new(&mut session)
        .view(QueryInput::new(ViewInput::exported()))
        .unwrap();

    assert_eq!(output.pages, 1);
    assert_eq!(output.count, 25);
    assert_eq!(output.entities.len(), 25);
}

#[test]
fn orderings_apply_primary_key_then_tie_breaks() {
    let mut session = session();
    let b1 = saved_person(&mut session, "b");
    let a1 = saved_person(&mut session, "a");
    let b2 = saved_person(&mut session, "b");
    let a2 = saved_person(&mut session, "a");

    let input = ViewInput::new(1, 10)
        .with_ordering(ViewOrdering::ascending("name"))
        .with_ordering(ViewOrdering::descending("id"));
    let output = Depot::<Person>::new(&mut session)
        .view(QueryInput::new(input))
        .unwrap();

    assert_eq!(ids(&output.entities), vec![a2.id, a1.id, b2.id, b1.id]);
}

#[test]
fn unknown_ordering_property_fails_even_on_empty_set() {
    let mut session = session();

    let err = Depot::<Person>::new(&mut session)
        .view(QueryInput::new(
            ViewInput::new(1, 10).with_ordering(ViewOrdering::ascending("nope")),
        ))
        .unwrap_err();

    match err {
        DepotError::PropertyNotFound { set, property } => {
            assert_eq!(set, "people");
            assert_eq!(property, "nope");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn filters_compose_in_order_with_property_filters() {
    let mut session = session();
    let people = seed(&mut session, 6);
    let mut disabled = Person::new("p99");
    disabled.enabled = false;
    saved(&mut session, disabled);

    let input = ViewInput::new(1, 10)
        .with_filter(PropertyFilter::new(2, "enabled", FilterOperator::Equals, true))
        .with_filter(FilterNode::new(1, |person: &Person| person.id % 2 == 1))
        .with_filter(PropertyFilter::new(3, "name", FilterOperator::Contains, "p0"));
    let output = Depot::<Person>::new(&mut session)
        .view(QueryInput::new(input))
        .unwrap();

    let expected: Vec<i64> = ids(&people)
        .into_iter()
        .filter(|id| id % 2 == 1)
        .collect();
    assert_eq!(ids(&output.entities), expected);
    assert_eq!(output.count, expected.len());
}

#[test]
fn hooks_run_around_view_core_before_pagination() {
    let mut session = session();
    let people = seed(&mut session, 12);

    let input = QueryInput::new(ViewInput::new(1, 5))
        .with_pre_processor(|query: Query<Person>| query.filter(|person| person.id > 2))
        .with_post_processor(|query: Query<Person>| query.into_iter().take(7).collect());
    let output = Depot::<Person>::new(&mut session).view(input).unwrap();

    assert_eq!(output.count, 7);
    assert_eq!(output.pages, 2);
    assert_eq!(ids(&output.entities), ids(&people[2..7]));
}

#[test]
fn zero_range_is_rejected() {
    let mut session = session();
    seed(&mut session, 3);

    let err = Depot::<Person>::new(&mut session)
        .view(QueryInput::new(ViewInput::new(1, 0)))
        .unwrap_err();

    assert!(matches!(err, DepotError::InvalidInput(_)));
}

#[test]
fn capability_lookups_find_by_name_and_reference() {
    let mut session = session();
    let ann = saved_person(&mut session, "Ann");
    saved_person(&mut session, "Bob");
    let mut depot = Depot::<Person>::new(&mut session);

    assert_eq!(depot.read_by_name("Ann").unwrap().id, ann.id);
    assert_eq!(depot.read_by_reference(&ann.reference).unwrap().id, ann.id);
    assert!(matches!(
        depot.read_by_name("Zed").unwrap_err(),
        DepotError::NotFound { .. }
    ));

    let output = depot.set_enabled(ann.id, false).unwrap();
    assert_eq!(output.original.map(|person| person.enabled), Some(true));
    assert!(!output.updated.enabled);
    assert!(!depot.read(ann.id).unwrap().enabled);
}
