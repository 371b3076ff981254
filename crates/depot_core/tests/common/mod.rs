#![allow(dead_code)]

use depot_core::model::capability::{evaluate_named, evaluate_referenced, generate_reference};
use depot_core::{
    Activable, Depot, Entity, Named, PropertyValidationResult, Referenced, Relation, RelationSlot,
    Session, ValidationTrigger,
};
use serde::{Deserialize, Serialize};

macro_rules! identity {
    () => {
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
    };
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub timestamp: i64,
    pub name: String,
    pub description: Option<String>,
    pub reference: String,
    pub enabled: bool,
}

impl Person {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reference: generate_reference(),
            enabled: true,
            ..Self::default()
        }
    }
}

impl Entity for Person {
    const SET: &'static str = "people";

    identity!();

    fn evaluate(&self, _trigger: ValidationTrigger) -> Vec<PropertyValidationResult> {
        let mut results = evaluate_named(self);
        results.extend(evaluate_referenced(self));
        results
    }
}

impl Named for Person {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl Referenced for Person {
    fn reference(&self) -> &str {
        &self.reference
    }
}

impl Activable for Person {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: i64,
    pub timestamp: i64,
    pub label: String,
    pub wear: i64,
}

impl Part {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }
}

impl Entity for Part {
    const SET: &'static str = "parts";

    identity!();
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: i64,
    pub timestamp: i64,
    pub model: String,
    pub year: i64,
    pub owner: Option<Person>,
    pub parts: Vec<Part>,
}

impl Car {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            year: 2020,
            ..Self::default()
        }
    }
}

fn car_owner(car: &mut Car) -> RelationSlot<'_, Person> {
    RelationSlot::Single(&mut car.owner)
}

fn car_parts(car: &mut Car) -> RelationSlot<'_, Part> {
    RelationSlot::Collection(&mut car.parts)
}

impl Entity for Car {
    const SET: &'static str = "cars";

    identity!();

    fn relations() -> Vec<Relation<Self>> {
        vec![
            Relation::single("owner", car_owner),
            Relation::collection("parts", car_parts),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Garage {
    pub id: i64,
    pub timestamp: i64,
    pub city: String,
    pub cars: Vec<Car>,
}

impl Garage {
    pub fn new(city: &str) -> Self {
        Self {
            city: city.to_string(),
            ..Self::default()
        }
    }
}

fn garage_cars(garage: &mut Garage) -> RelationSlot<'_, Car> {
    RelationSlot::Collection(&mut garage.cars)
}

impl Entity for Garage {
    const SET: &'static str = "garages";

    identity!();

    fn relations() -> Vec<Relation<Self>> {
        vec![Relation::collection("cars", garage_cars)]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub timestamp: i64,
    pub title: String,
    pub members: Vec<Member>,
}

impl Team {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }
}

fn team_members(team: &mut Team) -> RelationSlot<'_, Member> {
    RelationSlot::Collection(&mut team.members)
}

impl Entity for Team {
    const SET: &'static str = "teams";

    identity!();

    fn relations() -> Vec<Relation<Self>> {
        vec![Relation::collection("members", team_members)]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub timestamp: i64,
    pub nick: String,
    pub team: Option<Team>,
}

impl Member {
    pub fn new(nick: &str) -> Self {
        Self {
            nick: nick.to_string(),
            ..Self::default()
        }
    }
}

fn member_team(member: &mut Member) -> RelationSlot<'_, Team> {
    RelationSlot::Single(&mut member.team)
}

impl Entity for Member {
    const SET: &'static str = "members";

    identity!();

    fn relations() -> Vec<Relation<Self>> {
        vec![Relation::single("team", member_team)]
    }
}

pub fn session() -> Session {
    Session::open_in_memory().unwrap()
}

pub fn saved<E: Entity>(session: &mut Session, entity: E) -> E {
    Depot::<E>::new(session).create(entity).unwrap()
}

pub fn saved_person(session: &mut Session, name: &str) -> Person {
    saved(session, Person::new(name))
}

pub fn saved_part(session: &mut Session, label: &str) -> Part {
    saved(session, Part::new(label))
}
