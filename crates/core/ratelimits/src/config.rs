use std::time::Duration;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
/// Config values for [`Throttle`](crate::Throttle).
pub struct ThrottleConfig {
    /// Minimum time between the start of one execution and the start of the next
    pub min_delay: Duration,
}

impl ThrottleConfig {
    pub fn new(min_delay: Duration) -> Self {
        Self { min_delay }
    }

    pub fn from_millis(min_delay: u64) -> Self {
        Self::new(Duration::from_millis(min_delay))
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
        }
    }
}
