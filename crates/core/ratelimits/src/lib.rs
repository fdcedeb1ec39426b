//! Pacing for operations that must not run more often than a given rate.
#[macro_use]
extern crate log;

mod config;
mod sleep;
mod throttle;

pub use config::ThrottleConfig;
pub use sleep::sleep;
pub use throttle::Throttle;
