//! Dependencies built lazily in a synchronous and an asynchronous phase,
//! with containers that can be layered on top of each other.
#[macro_use]
extern crate log;

mod container;
mod dependencies;

pub use container::DependencyContainer;
pub use dependencies::Dependencies;
