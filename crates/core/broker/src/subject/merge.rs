use super::{Handler, Subject, Subscribe, Unsubscribe};

/// Subscribe-only view over several subjects.
///
/// A handler subscribed here is subscribed to every source subject and
/// receives whatever any of them emits. Only the sources can emit.
pub struct MergedSubject<T, E> {
    subjects: Vec<Subject<T, E>>,
}

/// Merge subjects into a single subscribable view
pub fn merge_subjects<T, E, I>(subjects: I) -> MergedSubject<T, E>
where
    I: IntoIterator<Item = Subject<T, E>>,
{
    MergedSubject {
        subjects: subjects.into_iter().collect(),
    }
}

impl<T, E> Subscribe<T, E> for MergedSubject<T, E>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    fn register(&self, handler: Handler<T, E>) -> Unsubscribe {
        Unsubscribe::all(
            self.subjects
                .iter()
                .map(|subject| subject.register(handler.clone())),
        )
    }
}

impl<T, E> Clone for MergedSubject<T, E> {
    fn clone(&self) -> Self {
        Self {
            subjects: self.subjects.clone(),
        }
    }
}
