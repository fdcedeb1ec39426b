use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use revolt_result::{create_error, Result};

#[derive(Clone)]
struct Entry {
    name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

/// Set of dependencies keyed by their type.
#[derive(Clone, Default)]
pub struct Dependencies {
    entries: HashMap<TypeId, Entry>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency, replacing any existing one of the same type
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.entries.insert(
            TypeId::of::<T>(),
            Entry {
                name: type_name::<T>(),
                value: Arc::new(value),
            },
        );
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.value.downcast_ref())
    }

    /// Shared handle to a dependency, for use beyond the lifetime of the set
    pub fn get_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.value.clone().downcast().ok())
    }

    /// Get a dependency or fail with [`MissingDependency`](revolt_result::ErrorType::MissingDependency)
    pub fn require<T: Any + Send + Sync>(&self) -> Result<&T> {
        self.get().ok_or_else(|| {
            create_error!(MissingDependency {
                name: type_name::<T>().to_string()
            })
        })
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Combine two sets, entries from `other` win
    pub fn merge(mut self, other: Dependencies) -> Self {
        self.entries.extend(other.entries);
        self
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.values().map(|entry| entry.name).collect();
        names.sort_unstable();

        f.debug_set().entries(names).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use revolt_result::ErrorType;

    use crate::Dependencies;

    #[derive(Debug, PartialEq)]
    struct Database(&'static str);

    #[derive(Debug, PartialEq)]
    struct Cache(u32);

    #[test]
    fn stores_one_value_per_type() {
        let dependencies = Dependencies::new()
            .with(Database("primary"))
            .with(Cache(1))
            .with(Database("replica"));

        assert_eq!(dependencies.len(), 2);
        assert_eq!(dependencies.get::<Database>(), Some(&Database("replica")));
        assert_eq!(dependencies.get::<Cache>(), Some(&Cache(1)));
        assert!(dependencies.get::<String>().is_none());
    }

    #[test]
    fn shared_handles_outlive_the_set() {
        let dependencies = Dependencies::new().with(Cache(5));
        let cache: Arc<Cache> = dependencies.get_arc().unwrap();

        drop(dependencies);
        assert_eq!(*cache, Cache(5));
    }

    #[test]
    fn require_names_the_missing_type() {
        let dependencies = Dependencies::new();
        let error = dependencies.require::<Database>().unwrap_err();

        match error.error_type {
            ErrorType::MissingDependency { name } => assert!(name.ends_with("Database")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn merge_prefers_the_other_set() {
        let merged = Dependencies::new()
            .with(Database("old"))
            .with(Cache(1))
            .merge(Dependencies::new().with(Database("new")));

        assert_eq!(merged.get::<Database>(), Some(&Database("new")));
        assert_eq!(merged.get::<Cache>(), Some(&Cache(1)));
        assert!(merged.contains::<Cache>());
    }

    #[test]
    fn debug_lists_type_names() {
        let dependencies = Dependencies::new().with(Cache(1));
        let debug = format!("{dependencies:?}");

        assert!(debug.contains("Cache"));
        assert!(Dependencies::new().is_empty());
    }
}
