use std::future::Future;
use std::sync::{Arc, Weak};

use futures::future::{ready, BoxFuture, FutureExt};
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::EmitError;

mod merge;
mod unsubscribe;

pub use merge::{merge_subjects, MergedSubject};
pub use unsubscribe::Unsubscribe;

use unsubscribe::Detach;

/// Subscriber callback, receives its own copy of every emitted payload
pub type Handler<T, E> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<(), E>> + Send + Sync>;

/// Anything handlers can be subscribed to.
pub trait Subscribe<T, E> {
    /// Register an already boxed handler
    fn register(&self, handler: Handler<T, E>) -> Unsubscribe;

    /// Subscribe an asynchronous handler
    fn subscribe<F, Fut>(&self, handler: F) -> Unsubscribe
    where
        Self: Sized,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.register(Arc::new(move |payload| handler(payload).boxed()))
    }

    /// Subscribe a synchronous handler
    fn subscribe_sync<F>(&self, handler: F) -> Unsubscribe
    where
        Self: Sized,
        F: Fn(T) -> Result<(), E> + Send + Sync + 'static,
        E: Send + 'static,
    {
        self.register(Arc::new(move |payload| ready(handler(payload)).boxed()))
    }
}

/// Handlers in the order they subscribed.
struct Listeners<T, E> {
    next_id: u64,
    handlers: IndexMap<u64, Handler<T, E>>,
}

impl<T, E> Detach for Mutex<Listeners<T, E>> {
    fn detach(&self, id: u64) {
        self.lock().handlers.shift_remove(&id);
    }
}

/// In-process publish / subscribe channel.
///
/// Handlers run one after another in subscription order. A failing
/// handler never stops the ones after it; failures are collected and
/// returned from [`Subject::emit`] once every handler has finished.
/// Clones share the same set of handlers.
pub struct Subject<T, E> {
    listeners: Arc<Mutex<Listeners<T, E>>>,
}

impl<T, E> Subject<T, E>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                handlers: IndexMap::new(),
            })),
        }
    }

    /// Call every handler with the payload
    ///
    /// Only handlers subscribed at the time of the call are run.
    pub async fn emit(&self, payload: T) -> Result<(), EmitError<E>> {
        let handlers: Vec<Handler<T, E>> =
            self.listeners.lock().handlers.values().cloned().collect();

        let mut errors = Vec::new();
        for handler in &handlers {
            if let Err(error) = handler(payload.clone()).await {
                errors.push(error);
            }
        }

        if !errors.is_empty() {
            debug!("{} of {} handlers failed", errors.len(), handlers.len());
        }

        EmitError::from_errors(errors)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().handlers.len()
    }
}

impl<T, E> Subscribe<T, E> for Subject<T, E>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    fn register(&self, handler: Handler<T, E>) -> Unsubscribe {
        let id = {
            let mut listeners = self.listeners.lock();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.handlers.insert(id, handler);
            id
        };

        let listeners: Weak<dyn Detach> = Arc::downgrade(&self.listeners) as Weak<dyn Detach>;
        Unsubscribe::new(listeners, id)
    }
}

impl<T, E> Clone for Subject<T, E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<T, E> Default for Subject<T, E>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
