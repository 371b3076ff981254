//! Depot orchestrator: CRUD, filtered reads and views over one entity set.
//!
//! # Responsibility
//! - Compose validation, relation resolution, staging and commit into
//!   single-item operations.
//! - Expose batch forms through the batch executor.
//!
//! # Invariants
//! - A single-item write commits atomically; on failure the session's
//!   pending changes are rejected.
//! - Create always assigns a fresh id and a server timestamp.
//! - Batch forms commit per item.

mod disposer;
mod lookup;
mod models;

pub use disposer::{Disposer, RecordDisposer};
pub use models::{DepotOptions, UpdateInput, UpdateOutput, UpdateStrategy};

use crate::batch::{BatchExecutor, BatchOperationOutput, EntityErrorKind};
use crate::error::{DepotError, DepotResult};
use crate::logging::{sanitize_message, MAX_LOGGED_ERROR_CHARS};
use crate::model::entity::{now_epoch_ms, with_id, Entity, EntityId};
use crate::query::{FilterQueryInput, FilteringBehavior, QueryInput, ViewInput, ViewOutput};
use crate::reconcile::{sanitize_entity, sanitize_update_entity};
use crate::session::Session;
use crate::validation::{self, ValidationMode, ValidationTrigger};
use log::{info, warn};
use std::marker::PhantomData;
use std::time::Instant;

/// Entity-access facade for entity type `E` over a borrowed session.
pub struct Depot<'s, E: Entity> {
    session: &'s mut Session,
    options: DepotOptions,
    disposer: Option<&'s mut dyn Disposer>,
    _entity: PhantomData<fn() -> E>,
}

impl<'s, E: Entity> Depot<'s, E> {
    pub fn new(session: &'s mut Session) -> Self {
        Self {
            session,
            options: DepotOptions::default(),
            disposer: None,
            _entity: PhantomData,
        }
    }

    pub fn with_options(mut self, options: DepotOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_disposer(mut self, disposer: &'s mut dyn Disposer) -> Self {
        self.disposer = Some(disposer);
        self
    }

    pub fn options(&self) -> DepotOptions {
        self.options
    }

    pub fn session(&mut self) -> &mut Session {
        self.session
    }

    /// Filters, orders and pages the set as detached snapshots.
    pub fn view(&mut self, input: QueryInput<E, ViewInput<E>>) -> DepotResult<ViewOutput<E>> {
        let started_at = Instant::now();
        let parameters = &input.parameters;

        let processed = self.session.query_untracked::<E>()?.process(&input, |query| {
            Ok(query
                .order_view(&parameters.orderings)?
                .filter_view(&parameters.filters))
        })?;
        let pagination =
            processed.paginate_view(parameters.page, parameters.range, parameters.export)?;

        info!(
            "event=depot_view module=depot status=ok set={} page={} pages={} count={} duration_ms={}",
            E::SET,
            parameters.page,
            pagination.pages,
            pagination.count,
            started_at.elapsed().as_millis()
        );

        Ok(ViewOutput {
            page: parameters.page,
            pages: pagination.pages,
            count: pagination.count,
            entities: pagination.query.into_vec(),
        })
    }

    /// Persists `entity` with a fresh id and returns the stored result.
    ///
    /// # Errors
    /// - `IntegrityViolation` / `NotFound` from relation resolution.
    /// - `Validation` in strict mode.
    pub fn create(&mut self, entity: E) -> DepotResult<E> {
        let started_at = Instant::now();
        let result = self.create_entity(entity);
        match &result {
            Ok(created) => {
                info!(
                    "event=depot_create module=depot status=ok set={} id={} duration_ms={}",
                    E::SET,
                    created.id(),
                    started_at.elapsed().as_millis()
                );
                if let Some(disposer) = self.disposer.as_deref_mut() {
                    disposer.push(E::SET, created.id());
                }
            }
            Err(err) => log_failure("depot_create", started_at, err),
        }
        result
    }

    pub fn create_many(
        &mut self,
        entities: Vec<E>,
        sync: bool,
    ) -> DepotResult<BatchOperationOutput<E>> {
        BatchExecutor::new(EntityErrorKind::CreateFailed, sync).execute(
            entities,
            |entity| self.create(entity.clone()),
            |entity| entity,
        )
    }

    /// Tracked read by id.
    pub fn read(&mut self, id: EntityId) -> DepotResult<E> {
        let entity = self
            .session
            .find::<E>(id)?
            .ok_or_else(|| DepotError::not_found(E::SET, format!("id = {id}")))?;
        self.evaluate(&entity, ValidationTrigger::Read)?;
        Ok(entity)
    }

    pub fn read_many(&mut self, ids: &[EntityId]) -> DepotResult<BatchOperationOutput<E>> {
        BatchExecutor::isolated(EntityErrorKind::ReadFailed).execute(
            ids.iter().copied(),
            |id| self.read(*id),
            with_id::<E>,
        )
    }

    /// Tracked read of the entities matching the input predicate.
    ///
    /// # Errors
    /// - With `FilteringBehavior::First`, the validation failure of the
    ///   selected entity. Other behaviors aggregate validation failures.
    pub fn read_filter(
        &mut self,
        input: QueryInput<E, FilterQueryInput<E>>,
    ) -> DepotResult<BatchOperationOutput<E>> {
        let parameters = &input.parameters;
        let matches = self
            .session
            .query::<E>()?
            .process(&input, |query| Ok(query.filter(|entity| (parameters.filter)(entity))))?;

        if matches.is_empty() {
            return Ok(BatchOperationOutput::default());
        }

        let selected: Vec<E> = match parameters.behavior {
            FilteringBehavior::First => matches.into_iter().take(1).collect(),
            FilteringBehavior::Last => matches.order_by_id().into_iter().last().into_iter().collect(),
            FilteringBehavior::All => matches.into_vec(),
        };

        let output = BatchExecutor::isolated(EntityErrorKind::ReadValidationFailed).execute(
            selected,
            |entity| {
                self.evaluate(entity, ValidationTrigger::Read)
                    .map(|()| entity.clone())
            },
            |entity| entity,
        )?;

        if parameters.behavior == FilteringBehavior::First && output.failed() {
            let (_, failures) = output.into_parts();
            return match failures.into_iter().next() {
                Some(failure) => Err(failure.cause),
                None => Ok(BatchOperationOutput::default()),
            };
        }
        Ok(output)
    }

    pub fn update(&mut self, input: UpdateInput<E>) -> DepotResult<UpdateOutput<E>> {
        self.update_with(QueryInput::new(input))
    }

    /// Updates one entity. Hooks of `input` shape the snapshot lookup.
    ///
    /// # Errors
    /// - `CreateDisabled` for an unsaved entity without `create`.
    /// - `NotFound` for a missing entity without `create`.
    pub fn update_with(
        &mut self,
        input: QueryInput<E, UpdateInput<E>>,
    ) -> DepotResult<UpdateOutput<E>> {
        let started_at = Instant::now();
        let result = self.apply_update(input);
        match &result {
            Ok(output) => {
                info!(
                    "event=depot_update module=depot status=ok set={} id={} created={} duration_ms={}",
                    E::SET,
                    output.updated.id(),
                    output.was_created(),
                    started_at.elapsed().as_millis()
                );
                // Created entities were pushed by `create`.
                if !output.was_created() {
                    if let Some(disposer) = self.disposer.as_deref_mut() {
                        disposer.push(E::SET, output.updated.id());
                    }
                }
            }
            Err(err) => log_failure("depot_update", started_at, err),
        }
        result
    }

    pub fn update_many(
        &mut self,
        inputs: Vec<UpdateInput<E>>,
    ) -> DepotResult<BatchOperationOutput<UpdateOutput<E>>> {
        BatchExecutor::isolated(EntityErrorKind::UpdateFailed).execute(
            inputs,
            |input| self.update(input.clone()),
            |input| UpdateOutput {
                original: None,
                updated: input.entity,
            },
        )
    }

    /// Deletes the entity stored under `id` and returns its last state.
    pub fn delete(&mut self, id: EntityId) -> DepotResult<E> {
        let started_at = Instant::now();
        let result = self
            .session
            .find_untracked::<E>(id)
            .and_then(|found| {
                found.ok_or_else(|| DepotError::not_found(E::SET, format!("id = {id}")))
            })
            .and_then(|entity| self.remove(entity));
        if let Err(err) = &result {
            log_failure("depot_delete", started_at, err);
        }
        result
    }

    pub fn delete_many(&mut self, ids: &[EntityId]) -> DepotResult<BatchOperationOutput<E>> {
        BatchExecutor::isolated(EntityErrorKind::DeleteFailed).execute(
            ids.iter().copied(),
            |id| self.delete(*id),
            with_id::<E>,
        )
    }

    pub fn delete_entity(&mut self, entity: E) -> DepotResult<E> {
        let started_at = Instant::now();
        let result = self.remove(entity);
        if let Err(err) = &result {
            log_failure("depot_delete", started_at, err);
        }
        result
    }

    pub fn delete_entities(&mut self, entities: Vec<E>) -> DepotResult<BatchOperationOutput<E>> {
        BatchExecutor::isolated(EntityErrorKind::DeleteFailed).execute(
            entities,
            |entity| self.delete_entity(entity.clone()),
            |entity| entity,
        )
    }

    /// Deletes every entity matching the input predicate.
    pub fn delete_filter(
        &mut self,
        input: QueryInput<E, FilterQueryInput<E>>,
    ) -> DepotResult<BatchOperationOutput<E>> {
        let parameters = &input.parameters;
        let matches = self
            .session
            .query_untracked::<E>()?
            .process(&input, |query| Ok(query.filter(|entity| (parameters.filter)(entity))))?;

        BatchExecutor::isolated(EntityErrorKind::DeleteFailed).execute(
            matches,
            |entity| self.delete(entity.id()),
            |entity| entity,
        )
    }

    fn create_entity(&mut self, mut entity: E) -> DepotResult<E> {
        entity.set_id(0);
        entity.set_timestamp(now_epoch_ms());
        self.evaluate(&entity, ValidationTrigger::Write)?;
        sanitize_entity(self.session, &mut entity)?;

        let handle = self.session.add(entity)?;
        self.commit()?;
        self.session.entry::<E>(handle)?.ok_or_else(|| {
            DepotError::InvalidData(format!("{} entry missing after commit", E::SET))
        })
    }

    fn apply_update(
        &mut self,
        input: QueryInput<E, UpdateInput<E>>,
    ) -> DepotResult<UpdateOutput<E>> {
        let id = input.parameters.entity.id();
        if id <= 0 {
            if !input.parameters.create {
                return Err(DepotError::CreateDisabled { set: E::SET });
            }
            return self
                .create(input.parameters.entity)
                .map(UpdateOutput::created);
        }

        let Some(original) = self.snapshot(&input, id)? else {
            if !input.parameters.create {
                return Err(DepotError::not_found(E::SET, format!("id = {id}")));
            }
            return self
                .create(input.parameters.entity)
                .map(UpdateOutput::created);
        };

        let UpdateInput {
            entity, strategy, ..
        } = input.parameters;
        let updated = match strategy {
            UpdateStrategy::Replace => self.replace(entity, &original)?,
            UpdateStrategy::Merge => self.merge(entity)?,
        };
        Ok(UpdateOutput {
            original: Some(original),
            updated,
        })
    }

    /// Read-only lookup of the stored state, through the input hooks when
    /// present.
    fn snapshot(
        &self,
        input: &QueryInput<E, UpdateInput<E>>,
        id: EntityId,
    ) -> DepotResult<Option<E>> {
        if !input.has_hooks() {
            return self.session.find_untracked::<E>(id);
        }
        let candidates = self.session.query_untracked::<E>()?.process(input, Ok)?;
        Ok(candidates.into_iter().find(|entity| entity.id() == id))
    }

    fn replace(&mut self, mut entity: E, original: &E) -> DepotResult<E> {
        entity.set_timestamp(original.timestamp());
        sanitize_entity(self.session, &mut entity)?;
        self.session.update(entity.clone())?;
        self.commit()?;
        Ok(self.session.find::<E>(entity.id())?.unwrap_or(entity))
    }

    fn merge(&mut self, replacement: E) -> DepotResult<E> {
        let id = replacement.id();
        let mut original = self
            .session
            .find::<E>(id)?
            .ok_or_else(|| DepotError::not_found(E::SET, format!("id = {id}")))?;
        if let Err(err) = sanitize_update_entity(self.session, &mut original, replacement) {
            self.session.reject_changes();
            return Err(err);
        }
        self.commit()?;
        Ok(self.session.find::<E>(id)?.unwrap_or(original))
    }

    fn remove(&mut self, entity: E) -> DepotResult<E> {
        let started_at = Instant::now();
        self.session.remove(entity.clone())?;
        self.commit()?;
        info!(
            "event=depot_delete module=depot status=ok set={} id={} duration_ms={}",
            E::SET,
            entity.id(),
            started_at.elapsed().as_millis()
        );
        Ok(entity)
    }

    fn commit(&mut self) -> DepotResult<usize> {
        self.session.save_changes().map_err(|err| {
            self.session.reject_changes();
            err
        })
    }

    fn evaluate(&self, entity: &E, trigger: ValidationTrigger) -> DepotResult<()> {
        let Err(err) = validation::evaluate(entity, trigger) else {
            return Ok(());
        };
        match self.options.validation {
            ValidationMode::Strict => Err(err.into()),
            ValidationMode::BestEffort => {
                warn!(
                    "event=depot_validation module=depot status=skip set={} id={} trigger={} properties={}",
                    E::SET,
                    entity.id(),
                    trigger.as_str(),
                    err.properties().join(",")
                );
                Ok(())
            }
        }
    }
}

fn log_failure(event: &str, started_at: Instant, err: &DepotError) {
    warn!(
        "event={event} module=depot status=error duration_ms={} error_code={} error={}",
        started_at.elapsed().as_millis(),
        err.code(),
        sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
    );
}
