use crate::application::ports::{CachedValue, QueryCache, QueryKey, RelationRepository};
use crate::application::shared::{Mutation, invalidate_after, read_through};
use crate::domain::value_objects::{RelationCount, RelationKey};
use crate::shared::{AppError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

#[derive(Debug, Default)]
struct ToggleTracker {
    latest_seq: u64,
    in_flight: usize,
}

struct ToggleInner {
    repository: Arc<dyn RelationRepository>,
    cache: Arc<dyn QueryCache>,
    trackers: Mutex<HashMap<RelationKey, ToggleTracker>>,
}

/// フォロー・保存のような真偽リレーションの楽観的トグル。
///
/// 呼び出しごとに単調増加のシーケンス番号を振る。失敗時のロールバックは最新の呼び出しだけが行い、
/// 確定値の再取得は最新の呼び出しか最後に完了した呼び出しが行う。
#[derive(Clone)]
pub struct RelationToggleController {
    inner: Arc<ToggleInner>,
}

/// 実行中のトグル。破棄しても送信済みのリモート操作と後処理は完了まで進む。
pub struct PendingToggle {
    key: RelationKey,
    sequence: u64,
    previous_value: bool,
    optimistic_value: bool,
    handle: JoinHandle<Result<bool>>,
}

impl PendingToggle {
    pub fn key(&self) -> &RelationKey {
        &self.key
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn previous_value(&self) -> bool {
        self.previous_value
    }

    pub fn optimistic_value(&self) -> bool {
        self.optimistic_value
    }

    /// リモート操作の結果。成功時は確定した値を返す。
    pub async fn wait(self) -> Result<bool> {
        self.handle
            .await
            .map_err(|err| AppError::Internal(format!("Toggle task failed: {err}")))?
    }
}

impl RelationToggleController {
    pub fn new(repository: Arc<dyn RelationRepository>, cache: Arc<dyn QueryCache>) -> Self {
        Self {
            inner: Arc::new(ToggleInner {
                repository,
                cache,
                trackers: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn cached_value(&self, key: &RelationKey) -> Option<bool> {
        self.inner
            .cache
            .get(&QueryKey::Relation(key.clone()))
            .and_then(CachedValue::into_flag)
    }

    /// キャッシュ済みの値、無ければリモートの値。
    pub async fn load(&self, key: &RelationKey) -> Result<bool> {
        read_through(
            self.inner.cache.as_ref(),
            QueryKey::Relation(key.clone()),
            CachedValue::into_flag,
            CachedValue::Flag,
            || self.inner.repository.relation_exists(key),
        )
        .await
    }

    pub async fn load_count(&self, count: &RelationCount) -> Result<u64> {
        read_through(
            self.inner.cache.as_ref(),
            QueryKey::RelationCount(count.clone()),
            CachedValue::into_count,
            CachedValue::Count,
            || self.inner.repository.count_relations(count),
        )
        .await
    }

    /// 送信中の呼び出しがあるか。UI は true の間トグル操作を無効にする。
    pub fn is_pending(&self, key: &RelationKey) -> bool {
        self.inner
            .trackers()
            .get(key)
            .map(|tracker| tracker.in_flight > 0)
            .unwrap_or(false)
    }

    /// キャッシュ上の値を即座に反転し、リモート操作をバックグラウンドで開始する。
    ///
    /// 値が未取得の場合は `InvalidInput`。先に `load` しておくこと。
    pub fn begin_toggle(&self, key: &RelationKey) -> Result<PendingToggle> {
        self.begin_toggle_from(key, None)
    }

    /// キャッシュの読み取りから反転・書き込み・採番までを `trackers` のロック下で行う。
    /// キャッシュが空のときだけ `fallback` を直前の値とみなす。
    fn begin_toggle_from(
        &self,
        key: &RelationKey,
        fallback: Option<bool>,
    ) -> Result<PendingToggle> {
        let runtime = Handle::try_current()
            .map_err(|err| AppError::Internal(format!("No async runtime for toggle: {err}")))?;

        let (sequence, previous_value, optimistic_value) = {
            let mut trackers = self.inner.trackers();
            let previous_value = self.cached_value(key).or(fallback).ok_or_else(|| {
                AppError::InvalidInput(format!("Relation state for {key} is not loaded"))
            })?;
            let optimistic_value = !previous_value;
            self.inner.cache.set(
                QueryKey::Relation(key.clone()),
                CachedValue::Flag(optimistic_value),
            );
            let tracker = trackers.entry(key.clone()).or_default();
            tracker.latest_seq += 1;
            tracker.in_flight += 1;
            (tracker.latest_seq, previous_value, optimistic_value)
        };
        debug!(%key, sequence, optimistic_value, "optimistic toggle applied");

        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let handle = runtime.spawn(async move {
            inner
                .settle(task_key, sequence, previous_value, optimistic_value)
                .await
        });

        Ok(PendingToggle {
            key: key.clone(),
            sequence,
            previous_value,
            optimistic_value,
            handle,
        })
    }

    /// 値が未取得なら読み込んでから反転し、完了まで待つ。
    pub async fn toggle(&self, key: &RelationKey) -> Result<bool> {
        let current = self.load(key).await?;
        self.begin_toggle_from(key, Some(current))?.wait().await
    }
}

impl ToggleInner {
    fn trackers(&self) -> MutexGuard<'_, HashMap<RelationKey, ToggleTracker>> {
        self.trackers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn latest_seq(&self, key: &RelationKey) -> Option<u64> {
        self.trackers().get(key).map(|tracker| tracker.latest_seq)
    }

    /// (最新の呼び出しか, 未完了の呼び出しがこれだけか)
    fn settlement_position(&self, key: &RelationKey, sequence: u64) -> (bool, bool) {
        self.trackers()
            .get(key)
            .map(|tracker| (tracker.latest_seq == sequence, tracker.in_flight == 1))
            .unwrap_or((false, false))
    }

    /// `sequence` がまだ最新なら `value` を書き込む。判定と書き込みの間に新しいトグルは始まらない。
    fn write_if_latest(&self, key: &RelationKey, sequence: Option<u64>, value: bool) -> bool {
        let trackers = self.trackers();
        if trackers.get(key).map(|tracker| tracker.latest_seq) != sequence {
            return false;
        }
        self.cache
            .set(QueryKey::Relation(key.clone()), CachedValue::Flag(value));
        true
    }

    fn finish(&self, key: &RelationKey) {
        let mut trackers = self.trackers();
        if let Some(tracker) = trackers.get_mut(key) {
            tracker.in_flight = tracker.in_flight.saturating_sub(1);
            if tracker.in_flight == 0 {
                trackers.remove(key);
            }
        }
    }

    async fn settle(
        &self,
        key: RelationKey,
        sequence: u64,
        previous_value: bool,
        optimistic_value: bool,
    ) -> Result<bool> {
        let outcome = if optimistic_value {
            self.repository.assert_relation(&key).await
        } else {
            self.repository.retract_relation(&key).await
        };

        let (latest, last_outstanding) = self.settlement_position(&key, sequence);
        match &outcome {
            Ok(()) => debug!(%key, sequence, "toggle confirmed"),
            Err(err) => {
                if self.write_if_latest(&key, Some(sequence), previous_value) {
                    warn!(%key, sequence, error = %err, "toggle failed; rolling back");
                } else {
                    warn!(
                        %key,
                        sequence,
                        error = %err,
                        "superseded toggle failed; keeping newer state"
                    );
                }
            }
        }

        invalidate_after(
            self.cache.as_ref(),
            &Mutation::ToggleRelation(key.clone()),
        );
        if latest || last_outstanding {
            self.reconcile(&key).await;
        }
        self.finish(&key);

        outcome.map(|()| optimistic_value)
    }

    /// 取得中に新しいトグルが始まっていれば結果を捨てる。
    async fn reconcile(&self, key: &RelationKey) {
        let observed = self.latest_seq(key);
        match self.repository.relation_exists(key).await {
            Ok(actual) => {
                if self.write_if_latest(key, observed, actual) {
                    debug!(%key, actual, "relation reconciled");
                } else {
                    debug!(%key, "reconciliation superseded by a newer toggle");
                }
            }
            Err(err) => error!(%key, error = %err, "failed to reconcile relation state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Event;
    use crate::domain::value_objects::{EventId, UserId};
    use crate::infrastructure::cache::LruQueryCache;
    use async_trait::async_trait;
    use mockall::mock;
    use std::time::Duration;
    use tokio::sync::oneshot;

    mock! {
        pub Relations {}

        #[async_trait]
        impl RelationRepository for Relations {
            async fn assert_relation(&self, key: &RelationKey) -> Result<()>;
            async fn retract_relation(&self, key: &RelationKey) -> Result<()>;
            async fn relation_exists(&self, key: &RelationKey) -> Result<bool>;
            async fn count_relations(&self, count: &RelationCount) -> Result<u64>;
            async fn list_saved_events(&self, user: &UserId) -> Result<Vec<Event>>;
        }
    }

    /// リモート操作の完了順をテスト側で制御するリポジトリ。
    #[derive(Default)]
    struct GatedRelations {
        exists: Mutex<bool>,
        assert_gate: Mutex<Option<oneshot::Receiver<bool>>>,
        retract_gate: Mutex<Option<oneshot::Receiver<bool>>>,
    }

    impl GatedRelations {
        async fn pass(
            &self,
            gate: &Mutex<Option<oneshot::Receiver<bool>>>,
            value: bool,
        ) -> Result<()> {
            let receiver = gate.lock().unwrap().take();
            let succeed = match receiver {
                Some(receiver) => receiver.await.unwrap_or(false),
                None => true,
            };
            if !succeed {
                return Err(AppError::Gateway("network unreachable".into()));
            }
            *self.exists.lock().unwrap() = value;
            Ok(())
        }
    }

    #[async_trait]
    impl RelationRepository for GatedRelations {
        async fn assert_relation(&self, _key: &RelationKey) -> Result<()> {
            self.pass(&self.assert_gate, true).await
        }

        async fn retract_relation(&self, _key: &RelationKey) -> Result<()> {
            self.pass(&self.retract_gate, false).await
        }

        async fn relation_exists(&self, _key: &RelationKey) -> Result<bool> {
            Ok(*self.exists.lock().unwrap())
        }

        async fn count_relations(&self, _count: &RelationCount) -> Result<u64> {
            Ok(u64::from(*self.exists.lock().unwrap()))
        }

        async fn list_saved_events(&self, _user: &UserId) -> Result<Vec<Event>> {
            Ok(Vec::new())
        }
    }

    /// リモート操作が返ってこないリポジトリ。全トグルが送信中のまま残る。
    struct StalledRelations;

    #[async_trait]
    impl RelationRepository for StalledRelations {
        async fn assert_relation(&self, _key: &RelationKey) -> Result<()> {
            std::future::pending().await
        }

        async fn retract_relation(&self, _key: &RelationKey) -> Result<()> {
            std::future::pending().await
        }

        async fn relation_exists(&self, _key: &RelationKey) -> Result<bool> {
            Ok(false)
        }

        async fn count_relations(&self, _count: &RelationCount) -> Result<u64> {
            Ok(0)
        }

        async fn list_saved_events(&self, _user: &UserId) -> Result<Vec<Event>> {
            Ok(Vec::new())
        }
    }

    fn follow_key() -> RelationKey {
        RelationKey::follow(UserId::new("alice").unwrap(), UserId::new("bob").unwrap())
    }

    fn cache() -> Arc<LruQueryCache> {
        Arc::new(LruQueryCache::new(32, Duration::from_secs(60), 16))
    }

    #[tokio::test]
    async fn toggle_flips_synchronously_before_remote_resolves() {
        let (release, gate) = oneshot::channel();
        let repository = GatedRelations {
            assert_gate: Mutex::new(Some(gate)),
            ..Default::default()
        };
        let controller = RelationToggleController::new(Arc::new(repository), cache());
        let key = follow_key();
        assert!(!controller.load(&key).await.expect("load"));

        let pending = controller.begin_toggle(&key).expect("begin");
        assert!(pending.optimistic_value());
        assert_eq!(controller.cached_value(&key), Some(true));
        assert!(controller.is_pending(&key));

        release.send(true).expect("release");
        assert!(pending.wait().await.expect("settle"));
        assert_eq!(controller.cached_value(&key), Some(true));
        assert!(!controller.is_pending(&key));
    }

    #[tokio::test]
    async fn failed_toggle_rolls_back_and_surfaces_error() {
        let mut repository = MockRelations::new();
        repository
            .expect_assert_relation()
            .returning(|_| Err(AppError::Gateway("offline".into())));
        repository.expect_relation_exists().returning(|_| Ok(false));
        let controller = RelationToggleController::new(Arc::new(repository), cache());
        let key = follow_key();
        controller.load(&key).await.expect("load");

        let pending = controller.begin_toggle(&key).expect("begin");
        assert_eq!(controller.cached_value(&key), Some(true));

        let err = pending.wait().await.unwrap_err();
        assert!(matches!(err, AppError::Gateway(_)));
        assert_eq!(controller.cached_value(&key), Some(false));
    }

    #[tokio::test]
    async fn settlement_invalidates_dependent_counters() {
        let mut repository = MockRelations::new();
        repository.expect_assert_relation().returning(|_| Ok(()));
        repository.expect_relation_exists().returning(|_| Ok(false));
        repository.expect_count_relations().times(2).returning(|_| Ok(4));
        let controller = RelationToggleController::new(Arc::new(repository), cache());
        let key = follow_key();
        let followers = RelationCount::Followers(UserId::new("bob").unwrap());

        assert_eq!(controller.load_count(&followers).await.expect("count"), 4);
        controller.toggle(&key).await.expect("toggle");
        // 再取得でキャッシュが空になっているためもう一度リポジトリを引く
        assert_eq!(controller.load_count(&followers).await.expect("count"), 4);
    }

    #[tokio::test]
    async fn toggle_requires_a_loaded_value() {
        let controller = RelationToggleController::new(Arc::new(MockRelations::new()), cache());
        let err = controller.begin_toggle(&follow_key()).err().expect("unknown state");
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn stale_failure_never_overrides_latest_intent() {
        let (release_assert, assert_gate) = oneshot::channel();
        let (release_retract, retract_gate) = oneshot::channel();
        let repository = GatedRelations {
            assert_gate: Mutex::new(Some(assert_gate)),
            retract_gate: Mutex::new(Some(retract_gate)),
            ..Default::default()
        };
        let controller = RelationToggleController::new(Arc::new(repository), cache());
        let key = follow_key();
        controller.load(&key).await.expect("load");

        let first = controller.begin_toggle(&key).expect("first");
        let second = controller.begin_toggle(&key).expect("second");
        assert!(first.optimistic_value());
        assert!(!second.optimistic_value());
        assert!(second.sequence() > first.sequence());

        release_assert.send(false).expect("fail first");
        assert!(first.wait().await.is_err());
        assert_eq!(controller.cached_value(&key), Some(false));
        assert!(controller.is_pending(&key));

        release_retract.send(true).expect("confirm second");
        assert!(!second.wait().await.expect("second settles"));
        assert_eq!(controller.cached_value(&key), Some(false));
        assert!(!controller.is_pending(&key));
    }

    #[tokio::test]
    async fn last_settlement_reconciles_with_remote_state() {
        let (release_assert, assert_gate) = oneshot::channel();
        let (release_retract, retract_gate) = oneshot::channel();
        let repository = GatedRelations {
            assert_gate: Mutex::new(Some(assert_gate)),
            retract_gate: Mutex::new(Some(retract_gate)),
            ..Default::default()
        };
        let controller = RelationToggleController::new(Arc::new(repository), cache());
        let key =
            RelationKey::saved_event(UserId::new("alice").unwrap(), EventId::new("e1").unwrap());
        controller.load(&key).await.expect("load");

        let first = controller.begin_toggle(&key).expect("first");
        let second = controller.begin_toggle(&key).expect("second");

        release_retract.send(true).expect("second lands first");
        assert!(!second.wait().await.expect("second settles"));
        assert_eq!(controller.cached_value(&key), Some(false));

        release_assert.send(true).expect("first lands late");
        first.wait().await.expect("first settles");

        // リモートでは遅れて届いた assert が残るため、キャッシュもそれに合わせる
        assert_eq!(controller.cached_value(&key), Some(true));
        assert!(!controller.is_pending(&key));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_begins_each_flip_the_latest_value() {
        let controller = RelationToggleController::new(Arc::new(StalledRelations), cache());
        let key = follow_key();
        assert!(!controller.load(&key).await.expect("load"));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let controller = controller.clone();
                let key = key.clone();
                tokio::spawn(async move {
                    let pending = controller.begin_toggle(&key).expect("begin");
                    (
                        pending.sequence(),
                        pending.previous_value(),
                        pending.optimistic_value(),
                    )
                })
            })
            .collect();
        let mut flips = Vec::new();
        for task in tasks {
            flips.push(task.await.expect("join"));
        }
        flips.sort();

        for (index, (sequence, previous, optimistic)) in flips.into_iter().enumerate() {
            assert_eq!(sequence, index as u64 + 1);
            assert_eq!(optimistic, index % 2 == 0, "sequence {sequence}");
            assert_eq!(previous, !optimistic);
        }
        assert_eq!(controller.cached_value(&key), Some(false));
    }

    #[tokio::test]
    async fn count_fetched_across_a_settlement_is_refetched() {
        let cache = cache();
        let racing = cache.clone();
        let key = follow_key();
        let racing_key = key.clone();
        let mut repository = MockRelations::new();
        let mut served = 0;
        repository
            .expect_count_relations()
            .times(2)
            .returning(move |_| {
                // 取得中に別のトグルが確定した
                invalidate_after(
                    racing.as_ref(),
                    &Mutation::ToggleRelation(racing_key.clone()),
                );
                served += 1;
                Ok(served)
            });
        let controller = RelationToggleController::new(Arc::new(repository), cache.clone());
        let followers = RelationCount::Followers(UserId::new("bob").unwrap());

        assert_eq!(controller.load_count(&followers).await.expect("count"), 1);
        assert!(cache
            .get(&QueryKey::RelationCount(followers.clone()))
            .is_none());
        assert_eq!(controller.load_count(&followers).await.expect("count"), 2);
    }
}
