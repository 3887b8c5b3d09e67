/// Refresh callbacks, keyed by full key
///
/// A callback is the recipe for recomputing one key: argument-less, callable
/// any number of times, from any task. The store registers whatever the most
/// recent caller supplied so the background refresher can re-run it later.
use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

pub type RefreshFuture = BoxFuture<'static, anyhow::Result<Value>>;

pub type RefreshCallback = Arc<dyn Fn() -> RefreshFuture + Send + Sync>;

/// Wrap an async closure producing JSON into a [`RefreshCallback`]
pub fn refresh_callback<F, Fut>(f: F) -> RefreshCallback
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(move || -> RefreshFuture { Box::pin(f()) })
}

/// Wrap an async closure producing any serializable type
pub fn serialized_callback<F, Fut, T>(f: F) -> RefreshCallback
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize,
{
    Arc::new(move || -> RefreshFuture {
        let fut = f();
        Box::pin(async move {
            let value = fut.await?;
            Ok(serde_json::to_value(value)?)
        })
    })
}

#[derive(Default)]
pub struct RefreshRegistry {
    callbacks: DashMap<String, RefreshCallback>,
}

impl RefreshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins
    pub fn register(&self, full_key: &str, callback: RefreshCallback) {
        self.callbacks.insert(full_key.to_string(), callback);
    }

    pub fn get(&self, full_key: &str) -> Option<RefreshCallback> {
        self.callbacks.get(full_key).map(|cb| Arc::clone(cb.value()))
    }

    pub fn contains(&self, full_key: &str) -> bool {
        self.callbacks.contains_key(full_key)
    }

    pub fn remove(&self, full_key: &str) -> bool {
        self.callbacks.remove(full_key).is_some()
    }

    /// Drop every callback whose key starts with `prefix`
    pub fn remove_prefix(&self, prefix: &str) -> usize {
        let before = self.callbacks.len();
        self.callbacks.retain(|key, _| !key.starts_with(prefix));
        before.saturating_sub(self.callbacks.len())
    }

    pub fn clear(&self) {
        self.callbacks.clear();
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl std::fmt::Debug for RefreshRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshRegistry")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
