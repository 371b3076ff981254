//! Operation inputs carrying query hooks.

use super::filter::{Predicate, ViewFilterNode};
use super::ordering::ViewOrdering;
use super::Query;
use crate::error::DepotResult;

/// Caller transform applied before or after an operation's core query.
pub type QueryHook<E> = Box<dyn Fn(Query<E>) -> Query<E>>;

/// Operation parameters plus optional pre/post query hooks.
pub struct QueryInput<E, P> {
    pub parameters: P,
    pub pre_processor: Option<QueryHook<E>>,
    pub post_processor: Option<QueryHook<E>>,
}

impl<E, P> QueryInput<E, P> {
    pub fn new(parameters: P) -> Self {
        Self {
            parameters,
            pre_processor: None,
            post_processor: None,
        }
    }

    pub fn with_pre_processor(mut self, hook: impl Fn(Query<E>) -> Query<E> + 'static) -> Self {
        self.pre_processor = Some(Box::new(hook));
        self
    }

    pub fn with_post_processor(
        mut self,
        hook: impl Fn(Query<E>) -> Query<E> + 'static,
    ) -> Self {
        self.post_processor = Some(Box::new(hook));
        self
    }

    pub fn has_hooks(&self) -> bool {
        self.pre_processor.is_some() || self.post_processor.is_some()
    }
}

impl<E> Query<E> {
    /// Runs pre-processor, `core`, then post-processor.
    pub fn process<P>(
        self,
        input: &QueryInput<E, P>,
        core: impl FnOnce(Query<E>) -> DepotResult<Query<E>>,
    ) -> DepotResult<Query<E>> {
        let query = match &input.pre_processor {
            Some(hook) => hook(self),
            None => self,
        };
        let query = core(query)?;
        Ok(match &input.post_processor {
            Some(hook) => hook(query),
            None => query,
        })
    }
}

/// Result cardinality of a filtered read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilteringBehavior {
    First,
    Last,
    #[default]
    All,
}

pub struct FilterQueryInput<E> {
    pub filter: Predicate<E>,
    pub behavior: FilteringBehavior,
}

impl<E> FilterQueryInput<E> {
    pub fn new(filter: impl Fn(&E) -> bool + 'static) -> Self {
        Self {
            filter: Box::new(filter),
            behavior: FilteringBehavior::All,
        }
    }

    pub fn with_behavior(mut self, behavior: FilteringBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

/// Paged view request.
pub struct ViewInput<E> {
    /// 1-based page number.
    pub page: usize,
    pub range: usize,
    /// Return every match as a single page.
    pub export: bool,
    pub filters: Vec<Box<dyn ViewFilterNode<E>>>,
    pub orderings: Vec<ViewOrdering>,
}

impl<E> ViewInput<E> {
    pub fn new(page: usize, range: usize) -> Self {
        Self {
            page,
            range,
            export: false,
            filters: Vec::new(),
            orderings: Vec::new(),
        }
    }

    pub fn exported() -> Self {
        Self {
            export: true,
            ..Self::new(1, 1)
        }
    }

    pub fn with_filter(mut self, filter: impl ViewFilterNode<E> + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn with_ordering(mut self, ordering: ViewOrdering) -> Self {
        self.orderings.push(ordering);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewOutput<E> {
    pub page: usize,
    pub pages: usize,
    pub count: usize,
    pub entities: Vec<E>,
}
