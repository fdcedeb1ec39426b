use std::future::Future;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::watch::{channel as watch_channel, Receiver, Sender};

use crate::Error;

type Outcome<T, E> = Result<T, Error<E>>;
type Producer<T, E> = Box<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;
type Validator<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// What the cache currently holds.
enum Slot<T, E> {
    Empty,
    /// A production is in flight, its outcome is published here once it settles
    Pending(Receiver<Option<Outcome<T, E>>>),
    Ready(T),
    /// The last production failed, the next caller tries again
    Failed(Error<E>),
}

enum Step<T, E> {
    Hit(T),
    Wait(Receiver<Option<Outcome<T, E>>>),
    Produce(Sender<Option<Outcome<T, E>>>),
}

/// Lazily produced value backed by an asynchronous producer.
///
/// Any number of callers arriving while the cache is empty, invalid or
/// already refreshing share a single call to the producer and all
/// observe the same outcome, including failures.
pub struct AsyncValueCache<T, E> {
    produce: Producer<T, E>,
    is_valid: Validator<T>,
    slot: Mutex<Slot<T, E>>,
}

impl<T, E> AsyncValueCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new<P, Fut, V>(produce: P, is_valid: V) -> Self
    where
        P: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        V: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            produce: Box::new(move || produce().boxed()),
            is_valid: Box::new(is_valid),
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// Get the cached value, producing a fresh one if there is none or it is no longer valid
    pub async fn get(&self) -> Result<T, Error<E>> {
        loop {
            let step = {
                let mut slot = self.slot.lock();
                match &*slot {
                    Slot::Ready(value) if (self.is_valid)(value) => Step::Hit(value.clone()),
                    Slot::Pending(receiver) => Step::Wait(receiver.clone()),
                    _ => {
                        let (sender, receiver) = watch_channel(None);
                        *slot = Slot::Pending(receiver);
                        Step::Produce(sender)
                    }
                }
            };

            match step {
                Step::Hit(value) => return Ok(value),
                Step::Produce(sender) => return self.refresh(sender).await,
                Step::Wait(receiver) => {
                    trace!("Joining in-flight production");
                    if let Some(outcome) = wait_for(receiver).await {
                        return outcome;
                    }
                }
            }
        }
    }

    async fn refresh(&self, sender: Sender<Option<Outcome<T, E>>>) -> Outcome<T, E> {
        debug!("Producing a fresh value");
        let pending = PendingGuard {
            slot: &self.slot,
            settled: false,
        };

        let outcome = match (self.produce)().await {
            Ok(value) if (self.is_valid)(&value) => Ok(value),
            Ok(_) => Err(Error::InvalidFreshValue),
            Err(error) => Err(Error::Production(error)),
        };

        pending.settle(&outcome);
        sender.send_replace(Some(outcome.clone()));

        outcome
    }
}

/// Wait for the producing caller to publish, `None` if it went away first
async fn wait_for<T: Clone, E: Clone>(
    mut receiver: Receiver<Option<Outcome<T, E>>>,
) -> Option<Outcome<T, E>> {
    let outcome = match receiver.wait_for(Option::is_some).await {
        Ok(outcome) => outcome.clone(),
        Err(_) => None,
    };

    outcome
}

/// Puts the slot back to empty if the producing caller is dropped mid-flight,
/// so waiting callers can take over instead of hanging on a dead channel.
struct PendingGuard<'a, T, E> {
    slot: &'a Mutex<Slot<T, E>>,
    settled: bool,
}

impl<T: Clone, E: Clone> PendingGuard<'_, T, E> {
    fn settle(mut self, outcome: &Outcome<T, E>) {
        *self.slot.lock() = match outcome {
            Ok(value) => Slot::Ready(value.clone()),
            Err(error) => Slot::Failed(error.clone()),
        };

        self.settled = true;
    }
}

impl<T, E> Drop for PendingGuard<'_, T, E> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Production was dropped before it settled, clearing the slot");
            *self.slot.lock() = Slot::Empty;
        }
    }
}
