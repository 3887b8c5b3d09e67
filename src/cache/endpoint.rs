/// Endpoint adapter: wraps an upstream fetch function with the cache
///
/// ```ignore
/// let prices = CachedEndpoint::new(store, "price", "coin_price", |symbol: String| async move {
///     fetch_price(&symbol).await
/// });
/// let btc: f64 = prices.call("BTC".to_string()).await?;
/// ```
use super::registry::{serialized_callback, RefreshCallback};
use super::store::CacheStore;
use crate::errors::{CacheError, CacheResult};
use crate::logger::{self, LogTag};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

type FetchFn<A, T> = Arc<dyn Fn(A) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// A decoded cached value with its freshness flag
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub is_fresh: bool,
}

/// Deterministic cache key for an endpoint call
///
/// Arguments are rendered as compact JSON through `serde_json::Value`, whose
/// maps are ordered, so struct/map argument order never changes the key. The
/// JSON part is always present (`null` for `()`), so a name containing `:`
/// cannot alias another endpoint's arguments.
pub fn endpoint_cache_key<A: Serialize>(name: &str, args: &A) -> CacheResult<String> {
    let encoded = serde_json::to_value(args).map_err(|source| CacheError::KeyEncoding {
        endpoint: name.to_string(),
        source,
    })?;

    Ok(format!("{}:{}", name, encoded))
}

pub struct CachedEndpoint<A, T> {
    store: Arc<CacheStore>,
    data_type: String,
    name: String,
    fetch: FetchFn<A, T>,
    _marker: PhantomData<fn() -> T>,
}

impl<A, T> CachedEndpoint<A, T>
where
    A: Serialize + Clone + Send + Sync + 'static,
    T: Serialize + DeserializeOwned + Send + 'static,
{
    pub fn new<F, Fut>(store: Arc<CacheStore>, data_type: &str, name: &str, fetch: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            store,
            data_type: data_type.to_string(),
            name: name.to_string(),
            fetch: Arc::new(move |args: A| -> BoxFuture<'static, anyhow::Result<T>> {
                Box::pin(fetch(args))
            }),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn cache_key(&self, args: &A) -> CacheResult<String> {
        endpoint_cache_key(&self.name, args)
    }

    pub async fn call(&self, args: A) -> CacheResult<T> {
        Ok(self.call_with_status(args).await?.value)
    }

    /// Like [`call`](Self::call) but also reports whether the value was fresh
    pub async fn call_with_status(&self, args: A) -> CacheResult<Cached<T>> {
        let key = self.cache_key(&args)?;
        let lookup = self
            .store
            .get(&key, &self.data_type, Some(self.callback_for(args)))
            .await;

        let Some(value) = lookup.value else {
            logger::warning(
                LogTag::Endpoint,
                &format!("No data available for {}:{}", self.data_type, key),
            );
            return Err(CacheError::Unavailable {
                key: format!("{}:{}", self.data_type, key),
            });
        };

        if !lookup.is_fresh {
            logger::debug(
                LogTag::Endpoint,
                &format!("Serving stale {}:{}", self.data_type, key),
            );
        }

        Ok(Cached {
            value: decode_value(&key, &value)?,
            is_fresh: lookup.is_fresh,
        })
    }

    fn callback_for(&self, args: A) -> RefreshCallback {
        let fetch = Arc::clone(&self.fetch);
        serialized_callback(move || fetch(args.clone()))
    }
}

impl<A, T> Clone for CachedEndpoint<A, T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            data_type: self.data_type.clone(),
            name: self.name.clone(),
            fetch: Arc::clone(&self.fetch),
            _marker: PhantomData,
        }
    }
}

impl<A, T> std::fmt::Debug for CachedEndpoint<A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedEndpoint")
            .field("data_type", &self.data_type)
            .field("name", &self.name)
            .finish()
    }
}

/// Decode a raw cached JSON value
pub fn decode_value<T: DeserializeOwned>(key: &str, value: &Value) -> CacheResult<T> {
    T::deserialize(value).map_err(|source| CacheError::Decode {
        key: key.to_string(),
        source,
    })
}
