//! In-process event subjects with ordered delivery and collected failures.
#[macro_use]
extern crate log;

mod error;
mod subject;

pub use error::EmitError;
pub use subject::{merge_subjects, Handler, MergedSubject, Subject, Subscribe, Unsubscribe};
