//! Values that are produced lazily, checked before every use and shared
//! between concurrent callers.
#[macro_use]
extern crate log;

mod async_value_cache;
mod error;
mod value_cache;

pub use async_value_cache::AsyncValueCache;
pub use error::Error;
pub use value_cache::ValueCache;
