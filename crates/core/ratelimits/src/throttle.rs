use std::future::Future;

use futures::future::{ready, BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::watch::{channel as watch_channel, Receiver, Sender};
use tokio::time::Instant;

use crate::{sleep, ThrottleConfig};

type Operation<T, E> = Box<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;
type Watcher<T, E> = Receiver<Option<Result<T, E>>>;

/// Throttled wrapper around a zero-argument operation.
///
/// Calls made while an execution is in flight share its outcome. Every
/// execution starts a pacing delay of [`ThrottleConfig::min_delay`] and the
/// next execution will not begin before that delay has elapsed, whether or
/// not the previous one succeeded.
pub struct Throttle<T, E> {
    config: ThrottleConfig,
    operation: Operation<T, E>,
    in_flight: Mutex<Option<Watcher<T, E>>>,
    /// When the pacing delay of the latest execution runs out
    next_start: Mutex<Option<Instant>>,
}

impl<T, E> Throttle<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Throttle an asynchronous operation
    pub fn new<F, Fut>(config: ThrottleConfig, operation: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::from_operation(config, Box::new(move || operation().boxed()))
    }

    /// Throttle a synchronous operation
    pub fn new_sync<F>(config: ThrottleConfig, operation: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self::from_operation(config, Box::new(move || ready(operation()).boxed()))
    }

    fn from_operation(config: ThrottleConfig, operation: Operation<T, E>) -> Self {
        Self {
            config,
            operation,
            in_flight: Mutex::new(None),
            next_start: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Run the operation, or join the execution that is already in flight
    pub async fn call(&self) -> Result<T, E> {
        loop {
            let joined = {
                let mut in_flight = self.in_flight.lock();
                match in_flight.as_ref() {
                    Some(receiver) => Ok(receiver.clone()),
                    None => {
                        let (sender, receiver) = watch_channel(None);
                        *in_flight = Some(receiver);
                        Err(sender)
                    }
                }
            };

            match joined {
                Ok(receiver) => {
                    trace!("Joining in-flight execution");
                    if let Some(outcome) = wait_for(receiver).await {
                        return outcome;
                    }
                }
                Err(sender) => return self.execute(sender).await,
            }
        }
    }

    async fn execute(&self, sender: Sender<Option<Result<T, E>>>) -> Result<T, E> {
        let in_flight = InFlightGuard(&self.in_flight);

        let next_start = *self.next_start.lock();
        if let Some(next_start) = next_start {
            let remaining = next_start.saturating_duration_since(Instant::now());
            if !remaining.is_zero() {
                trace!("Waiting {}ms before executing", remaining.as_millis());
                sleep(remaining).await;
            }
        }

        *self.next_start.lock() = Some(Instant::now() + self.config.min_delay);

        debug!("Executing throttled operation");
        let outcome = (self.operation)().await;

        drop(in_flight);
        sender.send_replace(Some(outcome.clone()));

        outcome
    }
}

/// Wait for the executing caller to publish, `None` if it went away first
async fn wait_for<T: Clone, E: Clone>(mut receiver: Watcher<T, E>) -> Option<Result<T, E>> {
    let outcome = match receiver.wait_for(Option::is_some).await {
        Ok(outcome) => outcome.clone(),
        Err(_) => None,
    };

    outcome
}

/// Frees the in-flight slot once the execution settles or is dropped
struct InFlightGuard<'a, T, E>(&'a Mutex<Option<Watcher<T, E>>>);

impl<T, E> Drop for InFlightGuard<'_, T, E> {
    fn drop(&mut self) {
        self.0.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::{timeout, Instant};

    use crate::{sleep, Throttle, ThrottleConfig};

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (calls.clone(), calls)
    }

    /// Synchronous operation returning a new allocation on every run
    fn fresh_values(min_delay: u64) -> (Arc<AtomicUsize>, Throttle<Arc<usize>, String>) {
        let (executed, calls) = counter();
        let throttle = Throttle::new_sync(ThrottleConfig::from_millis(min_delay), move || {
            Ok(Arc::new(calls.fetch_add(1, Ordering::SeqCst)))
        });

        (executed, throttle)
    }

    #[tokio::test]
    async fn first_call_runs_immediately() {
        let (executed, calls) = counter();
        let throttle = Throttle::new(ThrottleConfig::from_millis(100), move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>("result") }
        });

        let start = Instant::now();
        assert_eq!(throttle.call().await, Ok("result"));
        assert_eq!(executed.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn sequential_calls_are_paced() {
        let (executed, throttle) = fresh_values(105);

        let start = Instant::now();
        let first = throttle.call().await.unwrap();
        let after_first = start.elapsed();
        let second = throttle.call().await.unwrap();
        let after_second = start.elapsed();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(executed.load(Ordering::SeqCst), 2);
        assert!(after_first < Duration::from_millis(100));
        assert!(after_second >= Duration::from_millis(105));
    }

    #[tokio::test]
    async fn every_new_execution_waits_for_the_previous_delay() {
        let (executed, throttle) = fresh_values(105);

        let start = Instant::now();
        throttle.call().await.unwrap();
        throttle.call().await.unwrap();
        let after_second = start.elapsed();
        throttle.call().await.unwrap();
        let after_third = start.elapsed();

        assert_eq!(executed.load(Ordering::SeqCst), 3);
        assert!(after_second >= Duration::from_millis(105));
        assert!(after_third >= Duration::from_millis(210));
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_execution() {
        let (executed, throttle) = fresh_values(100);

        let first = throttle.call().await.unwrap();
        let (second, third) = tokio::join!(throttle.call(), throttle.call());
        let (second, third) = (second.unwrap(), third.unwrap());

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &third));
        assert_eq!(executed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn operation_error_is_returned() {
        let (executed, calls) = counter();
        let throttle: Throttle<(), String> =
            Throttle::new(ThrottleConfig::from_millis(100), move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("test error".to_string()) }
            });

        assert_eq!(throttle.call().await, Err("test error".to_string()));
        assert_eq!(executed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shared_error_arrives_after_the_delay() {
        let (executed, calls) = counter();
        let throttle = Throttle::new_sync(ThrottleConfig::from_millis(105), move || {
            if calls.fetch_add(1, Ordering::SeqCst) == 1 {
                Err("test error".to_string())
            } else {
                Ok("result")
            }
        });

        let start = Instant::now();
        assert_eq!(throttle.call().await, Ok("result"));

        let (second, third) = tokio::join!(throttle.call(), throttle.call());
        assert_eq!(second, Err("test error".to_string()));
        assert_eq!(third, second);
        assert!(start.elapsed() >= Duration::from_millis(105));
        assert_eq!(executed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_still_starts_the_pacing_delay() {
        let (executed, calls) = counter();
        let throttle = Throttle::new_sync(ThrottleConfig::from_millis(105), move || {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("test error".to_string())
            } else {
                Ok(())
            }
        });

        let start = Instant::now();
        assert!(throttle.call().await.is_err());
        assert_eq!(throttle.call().await, Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(105));
        assert_eq!(executed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn waiting_caller_takes_over_when_executor_is_dropped() {
        let (executed, calls) = counter();
        let throttle = Throttle::new(ThrottleConfig::from_millis(10), move || {
            let run = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                sleep(Duration::from_millis(100)).await;
                Ok::<_, String>(run)
            }
        });

        let (abandoned, waited) = tokio::join!(
            timeout(Duration::from_millis(20), throttle.call()),
            async {
                sleep(Duration::from_millis(5)).await;
                throttle.call().await
            }
        );

        assert!(abandoned.is_err());
        assert_eq!(waited, Ok(1));
        assert_eq!(executed.load(Ordering::SeqCst), 2);
    }
}
