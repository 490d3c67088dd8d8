//! Query context propagation for correlation ids.
//!
//! Every dispatch runs inside a [`QueryContext`]. Log events and analytics
//! calls made while it is active can recover the id with
//! [`current_query_id`], including from blocking worker threads that entered
//! the context explicitly.

use std::cell::RefCell;
use std::future::Future;
use uuid::Uuid;

/// Per-query context with correlation id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryContext {
    query_id: String,
}

impl QueryContext {
    /// Creates a new query context with a time-ordered (UUID v7) id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            query_id: Uuid::now_v7().to_string(),
        }
    }

    /// Creates a query context with an existing id.
    #[must_use]
    pub fn from_id(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
        }
    }

    /// Returns the query id.
    #[must_use]
    pub fn query_id(&self) -> &str {
        &self.query_id
    }
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new()
    }
}

tokio::task_local! {
    static TASK_CONTEXT: QueryContext;
}

thread_local! {
    static THREAD_CONTEXT: RefCell<Option<QueryContext>> = const { RefCell::new(None) };
}

/// Guard that restores the previous thread-local context on drop.
pub struct QueryContextGuard {
    previous: Option<QueryContext>,
}

impl Drop for QueryContextGuard {
    fn drop(&mut self) {
        THREAD_CONTEXT.with(|slot| {
            *slot.borrow_mut() = self.previous.take();
        });
    }
}

/// Enters a query context for synchronous flows.
#[must_use]
pub fn enter_query_context(context: QueryContext) -> QueryContextGuard {
    let previous = THREAD_CONTEXT.with(|slot| slot.borrow_mut().replace(context));
    QueryContextGuard { previous }
}

/// Scopes a query context across an async future.
pub async fn scope_query_context<F, T>(context: QueryContext, fut: F) -> T
where
    F: Future<Output = T>,
{
    TASK_CONTEXT.scope(context, fut).await
}

/// Returns the current query id, if set.
#[must_use]
pub fn current_query_id() -> Option<String> {
    if let Ok(id) = TASK_CONTEXT.try_with(|ctx| ctx.query_id.clone()) {
        return Some(id);
    }

    THREAD_CONTEXT.with(|slot| slot.borrow().as_ref().map(|ctx| ctx.query_id.clone()))
}
