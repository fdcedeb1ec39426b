use parking_lot::Mutex;

use crate::Error;

type Producer<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;
type Validator<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Lazily produced value backed by a synchronous producer.
///
/// The cached value is checked with the validity predicate on every
/// [`ValueCache::get`] and produced again once it stops being valid.
/// The slot stays locked while the producer runs, so a producer must
/// not call back into the same cache.
pub struct ValueCache<T, E> {
    produce: Producer<T, E>,
    is_valid: Validator<T>,
    value: Mutex<Option<T>>,
}

impl<T: Clone, E> ValueCache<T, E> {
    pub fn new<P, V>(produce: P, is_valid: V) -> Self
    where
        P: Fn() -> Result<T, E> + Send + Sync + 'static,
        V: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            produce: Box::new(produce),
            is_valid: Box::new(is_valid),
            value: Mutex::new(None),
        }
    }

    /// Get the cached value, producing a fresh one if there is none or it is no longer valid
    ///
    /// A fresh value replaces whatever was cached before it is validated,
    /// even when it then turns out to be invalid.
    pub fn get(&self) -> Result<T, Error<E>> {
        let mut slot = self.value.lock();

        if let Some(value) = slot.as_ref() {
            if (self.is_valid)(value) {
                return Ok(value.clone());
            }
        }

        debug!("Producing a fresh value");
        let fresh = slot.insert((self.produce)().map_err(Error::Production)?);

        if (self.is_valid)(fresh) {
            Ok(fresh.clone())
        } else {
            Err(Error::InvalidFreshValue)
        }
    }
}
