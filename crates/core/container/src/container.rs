use std::future::Future;
use std::sync::Arc;

use futures::future::{ready, TryFutureExt};
use revolt_coalesced::{AsyncValueCache, ValueCache};
use revolt_result::{create_error, Error, Result};

use crate::Dependencies;

/// Container of dependencies built in two phases.
///
/// Synchronous dependencies are built on first access to
/// [`DependencyContainer::get_dependencies`], asynchronous ones on first
/// access to [`DependencyContainer::get_async_dependencies`]. Each phase
/// is built exactly once, concurrent callers share the same build.
#[derive(Clone)]
pub struct DependencyContainer {
    dependencies: Arc<ValueCache<Arc<Dependencies>, Error>>,
    async_dependencies: Arc<AsyncValueCache<Arc<Dependencies>, Error>>,
}

fn cache_error(error: revolt_coalesced::Error<Error>) -> Error {
    match error {
        revolt_coalesced::Error::Production(error) => error,
        revolt_coalesced::Error::InvalidFreshValue => create_error!(InvalidFreshValue),
    }
}

fn nothing() -> Result<Dependencies> {
    Ok(Dependencies::new())
}

impl DependencyContainer {
    pub fn new<S, A, Fut>(create_dependencies: S, create_async_dependencies: A) -> Self
    where
        S: Fn() -> Result<Dependencies> + Send + Sync + 'static,
        A: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Dependencies>> + Send + 'static,
    {
        Self {
            dependencies: Arc::new(ValueCache::new(
                move || create_dependencies().map(Arc::new),
                |_| true,
            )),
            async_dependencies: Arc::new(AsyncValueCache::new(
                move || create_async_dependencies().map_ok(Arc::new),
                |_| true,
            )),
        }
    }

    /// Container without any dependencies
    pub fn empty() -> Self {
        Self::new(nothing, || ready(nothing()))
    }

    /// Container with synchronous dependencies only
    pub fn from_sync<S>(create_dependencies: S) -> Self
    where
        S: Fn() -> Result<Dependencies> + Send + Sync + 'static,
    {
        Self::new(create_dependencies, || ready(nothing()))
    }

    /// Container with asynchronous dependencies only
    pub fn from_async<A, Fut>(create_async_dependencies: A) -> Self
    where
        A: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Dependencies>> + Send + 'static,
    {
        Self::new(nothing, create_async_dependencies)
    }

    pub fn get_dependencies(&self) -> Result<Arc<Dependencies>> {
        self.dependencies.get().map_err(cache_error)
    }

    pub async fn get_async_dependencies(&self) -> Result<Arc<Dependencies>> {
        self.async_dependencies.get().await.map_err(cache_error)
    }

    /// Every dependency from both phases, asynchronous ones win on conflict
    pub async fn load_all_dependencies(&self) -> Result<Dependencies> {
        let dependencies = self.get_dependencies()?;
        let async_dependencies = self.get_async_dependencies().await?;

        let all = Dependencies::clone(&dependencies).merge(Dependencies::clone(&async_dependencies));
        debug!("Loaded {} dependencies", all.len());

        Ok(all)
    }

    /// Build a new container on top of this one
    ///
    /// The factories receive this container. New synchronous dependencies
    /// replace inherited ones of the same type, while inherited asynchronous
    /// dependencies are kept over new ones.
    pub fn extend<S, A, Fut>(&self, create_dependencies: S, create_async_dependencies: A) -> Self
    where
        S: Fn(&DependencyContainer) -> Result<Dependencies> + Send + Sync + 'static,
        A: Fn(DependencyContainer) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Dependencies>> + Send + 'static,
    {
        let parent = self.clone();
        let async_parent = self.clone();

        Self::new(
            move || {
                let inherited = parent.get_dependencies()?;
                let added = create_dependencies(&parent)?;

                Ok(Dependencies::clone(&inherited).merge(added))
            },
            move || {
                let parent = async_parent.clone();
                let added = create_async_dependencies(parent.clone());

                async move {
                    let added = added.await?;
                    let inherited = parent.get_async_dependencies().await?;

                    Ok::<_, Error>(added.merge(Dependencies::clone(&inherited)))
                }
            },
        )
    }

    /// Build a new container adding only synchronous dependencies
    pub fn extend_sync<S>(&self, create_dependencies: S) -> Self
    where
        S: Fn(&DependencyContainer) -> Result<Dependencies> + Send + Sync + 'static,
    {
        self.extend(create_dependencies, |_| ready(nothing()))
    }

    /// Build a new container adding only asynchronous dependencies
    pub fn extend_async<A, Fut>(&self, create_async_dependencies: A) -> Self
    where
        A: Fn(DependencyContainer) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Dependencies>> + Send + 'static,
    {
        self.extend(|_: &DependencyContainer| nothing(), create_async_dependencies)
    }
}

impl Default for DependencyContainer {
    fn default() -> Self {
        Self::empty()
    }
}
