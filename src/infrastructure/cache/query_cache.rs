use crate::application::ports::{
    CacheGeneration, CachedValue, Invalidation, QueryCache, QueryKey, QueryScope,
};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::trace;

struct CacheEntry {
    value: CachedValue,
    expires_at: Instant,
}

/// 書き込み・無効化の世代。キー単位・スコープ単位・全体の最大値がそのキーの世代になる。
struct Generations {
    counter: u64,
    floor: u64,
    scopes: HashMap<QueryScope, u64>,
    keys: HashMap<QueryKey, u64>,
    key_limit: usize,
}

impl Generations {
    fn new(key_limit: usize) -> Self {
        Self {
            counter: 0,
            floor: 0,
            scopes: HashMap::new(),
            keys: HashMap::new(),
            key_limit,
        }
    }

    fn of(&self, key: &QueryKey) -> CacheGeneration {
        let scope = self.scopes.get(&key.scope()).copied().unwrap_or_default();
        let exact = self.keys.get(key).copied().unwrap_or_default();
        CacheGeneration(self.floor.max(scope).max(exact))
    }

    fn bump(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    fn bump_key(&mut self, key: &QueryKey) {
        let next = self.bump();
        self.keys.insert(key.clone(), next);
        if self.keys.len() > self.key_limit {
            // 全キーの世代を進めて記録を捨てる。取得中の書き戻しは捨てられるだけ
            self.bump_all();
        }
    }

    fn bump_scope(&mut self, scope: QueryScope) {
        let next = self.bump();
        self.scopes.insert(scope, next);
        // スコープの世代が上回るので個別キーの記録は不要
        self.keys.retain(|key, _| key.scope() != scope);
    }

    fn bump_all(&mut self) {
        self.floor = self.bump();
        self.scopes.clear();
        self.keys.clear();
    }
}

struct CacheState {
    entries: LruCache<QueryKey, CacheEntry>,
    generations: Generations,
}

/// 容量と TTL で古いエントリを落とすインメモリのクエリキャッシュ。
///
/// 無効化はすべて購読者にブロードキャストされる。購読者がいなくても書き込みは失敗しない。
/// 取得中に `set` か無効化が入ったキーへの `set_if_current` は捨てられる。
pub struct LruQueryCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    invalidations: broadcast::Sender<Invalidation>,
}

impl LruQueryCache {
    pub fn new(capacity: usize, ttl: Duration, channel_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        let (invalidations, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                generations: Generations::new(capacity.get().saturating_mul(2)),
            }),
            ttl,
            invalidations,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry(&self, value: CachedValue) -> CacheEntry {
        CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        }
    }

    fn notify(&self, invalidation: Invalidation) {
        // 受信者ゼロの send はエラーになるが無視してよい
        let _ = self.invalidations.send(invalidation);
    }
}

impl QueryCache for LruQueryCache {
    fn get(&self, key: &QueryKey) -> Option<CachedValue> {
        let mut state = self.lock();
        let expired = match state.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            trace!(%key, "cache entry expired");
            state.entries.pop(key);
        }
        None
    }

    fn set(&self, key: QueryKey, value: CachedValue) {
        let entry = self.entry(value);
        let mut state = self.lock();
        state.generations.bump_key(&key);
        state.entries.put(key, entry);
    }

    fn generation(&self, key: &QueryKey) -> CacheGeneration {
        self.lock().generations.of(key)
    }

    fn set_if_current(
        &self,
        key: QueryKey,
        generation: CacheGeneration,
        value: CachedValue,
    ) -> bool {
        let entry = self.entry(value);
        let mut state = self.lock();
        if state.generations.of(&key) != generation {
            trace!(%key, "dropping result fetched before invalidation");
            return false;
        }
        state.entries.put(key, entry);
        true
    }

    fn invalidate(&self, key: &QueryKey) {
        {
            let mut state = self.lock();
            state.entries.pop(key);
            state.generations.bump_key(key);
        }
        self.notify(Invalidation::Key(key.clone()));
    }

    fn invalidate_scope(&self, scope: QueryScope) {
        {
            let mut state = self.lock();
            let doomed: Vec<QueryKey> = state
                .entries
                .iter()
                .filter(|(key, _)| key.scope() == scope)
                .map(|(key, _)| key.clone())
                .collect();
            for key in doomed {
                state.entries.pop(&key);
            }
            state.generations.bump_scope(scope);
        }
        self.notify(Invalidation::Scope(scope));
    }

    fn clear(&self) {
        {
            let mut state = self.lock();
            state.entries.clear();
            state.generations.bump_all();
        }
        self.notify(Invalidation::All);
    }

    fn subscribe_invalidations(&self) -> broadcast::Receiver<Invalidation> {
        self.invalidations.subscribe()
    }
}
