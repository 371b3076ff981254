//! Generic entity-access layer over a SQLite document store.
//! Depots compose the query pipeline, the graph reconciler and the batch
//! executor on top of a unit-of-work session.

pub mod batch;
pub mod db;
pub mod depot;
pub mod error;
pub mod logging;
pub mod model;
pub mod query;
pub mod reconcile;
pub mod session;
pub mod validation;

pub use batch::{BatchExecutor, BatchOperationOutput, EntityError, EntityErrorKind};
pub use depot::{
    Depot, DepotOptions, Disposer, RecordDisposer, UpdateInput, UpdateOutput, UpdateStrategy,
};
pub use error::{DepotError, DepotResult};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::capability::{Activable, Catalog, Named, Referenced};
pub use model::entity::{Entity, EntityId};
pub use model::relation::{Relation, RelationKind, RelationSlot};
pub use query::{
    FilterNode, FilterOperator, FilterQueryInput, FilteringBehavior, OrderDirection,
    PaginationOutput, PropertyFilter, Query, QueryInput, ViewFilterNode, ViewInput, ViewOrdering,
    ViewOutput,
};
pub use session::{EntryHandle, EntryState, Session, SessionOptions, StoreLocation};
pub use validation::{
    EntityValidationError, PropertyValidationResult, ValidationMode, ValidationTrigger,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
