use crate::application::ports::query_cache::{CachedValue, QueryCache, QueryKey};
use crate::shared::Result;
use std::future::Future;

/// キャッシュを引き、無ければ `fetch` して書き戻す。
///
/// 世代を控えてから `fetch` を呼ぶので、取得中に無効化されたキーには書き戻さない。
/// その場合も取得した値はそのまま返す。
pub async fn read_through<T, Fut>(
    cache: &dyn QueryCache,
    key: QueryKey,
    extract: impl FnOnce(CachedValue) -> Option<T>,
    wrap: impl FnOnce(T) -> CachedValue,
    fetch: impl FnOnce() -> Fut,
) -> Result<T>
where
    T: Clone,
    Fut: Future<Output = Result<T>>,
{
    if let Some(cached) = cache.get(&key).and_then(extract) {
        return Ok(cached);
    }
    let generation = cache.generation(&key);
    let value = fetch().await?;
    cache.set_if_current(key, generation, wrap(value.clone()));
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::QueryScope;
    use crate::infrastructure::cache::LruQueryCache;
    use crate::shared::AppError;
    use std::time::Duration;

    fn cache() -> LruQueryCache {
        LruQueryCache::new(8, Duration::from_secs(60), 4)
    }

    #[tokio::test]
    async fn hit_skips_fetch() {
        let cache = cache();
        cache.set(QueryKey::Profiles, CachedValue::Count(3));

        let value = read_through(
            &cache,
            QueryKey::Profiles,
            CachedValue::into_count,
            CachedValue::Count,
            || async { Err(AppError::Internal("must not fetch".into())) },
        )
        .await
        .expect("hit");
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn invalidation_during_fetch_skips_write_back() {
        let cache = cache();
        let value = read_through(
            &cache,
            QueryKey::Profiles,
            CachedValue::into_count,
            CachedValue::Count,
            || async {
                cache.invalidate_scope(QueryScope::Profiles);
                Ok(1)
            },
        )
        .await
        .expect("fetch");

        assert_eq!(value, 1);
        assert!(cache.get(&QueryKey::Profiles).is_none());
    }

    #[tokio::test]
    async fn failed_fetch_leaves_cache_empty() {
        let cache = cache();
        let err = read_through(
            &cache,
            QueryKey::Profiles,
            CachedValue::into_count,
            CachedValue::Count,
            || async { Err(AppError::Gateway("offline".into())) },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Gateway(_)));
        assert!(cache.get(&QueryKey::Profiles).is_none());
    }
}
