// ==========================================
// 库存分配引擎 - 分配结果缓存
// ==========================================
// 职责: 键值缓存 + 单条过期 + 容量淘汰 + 异步计算包装
// 过期: 读取时惰性判定；后台定时清理
// 淘汰: 满容量插入新键时，淘汰过期时间最近的一条（不是 LRU）
// 并发: 同一未命中键的并发请求只触发一次计算（in-flight 表）
// 失效: 清理时一并移除 in-flight 登记，已在进行的计算完成后不再写入
// ==========================================

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::error::CacheError;
use crate::cache::key::CacheKey;
use crate::config::CacheConfig;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

type InFlight<V> = Shared<BoxFuture<'static, Result<V, CacheError>>>;

// ==========================================
// CacheEntry / CacheStats
// ==========================================

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub payload: V,
    pub expires_at: DateTime<Utc>,
}

/// 缓存统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// 加入已有 in-flight 计算的次数
    pub coalesced: u64,
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    stats: CacheStats,
}

struct CacheInner<V> {
    state: Mutex<CacheState<V>>,
    /// 键 → (计算编号, 进行中的计算)
    in_flight: Mutex<HashMap<String, (u64, InFlight<V>)>>,
    next_flight_id: AtomicU64,
    clock: Arc<dyn Clock>,
    max_entries: usize,
    default_ttl: Duration,
}

// ==========================================
// AssignmentCache
// ==========================================

/// 显式构造、可克隆共享的缓存服务（克隆共享同一份存储）
pub struct AssignmentCache<V> {
    inner: Arc<CacheInner<V>>,
}

impl<V> Clone for AssignmentCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for AssignmentCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssignmentCache")
            .field("max_entries", &self.inner.max_entries)
            .field("default_ttl", &self.inner.default_ttl)
            .finish()
    }
}

impl<V> AssignmentCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// 按配置创建（系统时钟）
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(
            config.max_entries,
            config.default_ttl(),
            Arc::new(SystemClock),
        )
    }

    /// 指定容量、默认TTL与时钟
    pub fn with_clock(max_entries: usize, default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                state: Mutex::new(CacheState {
                    entries: HashMap::new(),
                    stats: CacheStats::default(),
                }),
                in_flight: Mutex::new(HashMap::new()),
                next_flight_id: AtomicU64::new(0),
                clock,
                max_entries: max_entries.max(1),
                default_ttl,
            }),
        }
    }

    // ==========================================
    // 基本读写
    // ==========================================

    /// 读取；过期条目在此删除并视为未命中
    pub fn get(&self, key: &CacheKey) -> Result<Option<V>, CacheError> {
        self.inner.lookup(&key.to_string())
    }

    /// 写入；ttl 为 None 时使用默认TTL
    pub fn set(&self, key: &CacheKey, payload: V, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.inner
            .insert(key.to_string(), payload, ttl.unwrap_or(self.inner.default_ttl))
    }

    // ==========================================
    // 计算包装
    // ==========================================

    /// 命中直接返回；未命中时执行 compute 并按 ttl 写入
    ///
    /// 同一键已有计算在进行时，加入该计算而不是重新计算。
    /// 计算失败不写缓存，所有等待者得到同一个 ComputeFailed。
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<V, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: fmt::Display,
    {
        let key_str = key.to_string();
        if let Some(hit) = self.inner.lookup(&key_str)? {
            return Ok(hit);
        }

        let shared = {
            let mut in_flight = self
                .inner
                .in_flight
                .lock()
                .map_err(|e| CacheError::lock("in_flight", e))?;

            if let Some((_, existing)) = in_flight.get(&key_str) {
                debug!(key = %key_str, "加入进行中的计算");
                self.inner.record(|s| s.coalesced += 1);
                existing.clone()
            } else if let Some(hit) = self.inner.peek(&key_str)? {
                // 在两次加锁之间已有计算完成
                return Ok(hit);
            } else {
                let ttl = ttl.unwrap_or(self.inner.default_ttl);
                let weak: Weak<CacheInner<V>> = Arc::downgrade(&self.inner);
                let task_key = key_str.clone();
                let flight_id = self.inner.next_flight_id.fetch_add(1, Ordering::Relaxed);
                let fut = compute();

                let task = async move {
                    let outcome = fut.await.map_err(|e| CacheError::ComputeFailed {
                        key: task_key.clone(),
                        message: e.to_string(),
                    });
                    if let Some(inner) = weak.upgrade() {
                        inner.complete(&task_key, flight_id, &outcome, ttl);
                    }
                    outcome
                }
                .boxed()
                .shared();

                in_flight.insert(key_str.clone(), (flight_id, task.clone()));
                task
            }
        };

        shared.await
    }

    /// 把异步计算包装成带缓存的函数
    ///
    /// 参数整体作为键参数 "args"，命名空间区分不同计算
    pub fn wrap<A, F, Fut, E>(
        &self,
        namespace: impl AsRef<str>,
        ttl: Option<Duration>,
        compute: F,
    ) -> impl Fn(A) -> BoxFuture<'static, Result<V, CacheError>>
    where
        A: Serialize + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: fmt::Display + 'static,
    {
        let cache = self.clone();
        let namespace = namespace.as_ref().to_string();
        let compute = Arc::new(compute);

        move |args: A| {
            let cache = cache.clone();
            let namespace = namespace.clone();
            let compute = Arc::clone(&compute);
            async move {
                let key = CacheKey::new(&namespace).param("args", &args)?;
                cache.get_or_compute(&key, ttl, move || compute(args)).await
            }
            .boxed()
        }
    }

    // ==========================================
    // 清理
    // ==========================================

    /// 删除所有已过期条目，返回删除数量
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        self.inner.purge_expired()
    }

    /// 清空缓存（含进行中的计算登记）
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut in_flight = self.inner.lock_in_flight()?;
        let abandoned = in_flight.len();
        in_flight.clear();

        let mut state = self.inner.lock_state()?;
        let removed = state.entries.len();
        state.entries.clear();
        debug!(removed, abandoned, "缓存已清空");
        Ok(removed)
    }

    /// 清理某一命名空间下的所有条目
    pub fn clear_namespace(&self, namespace: impl AsRef<str>) -> Result<usize, CacheError> {
        let prefix = CacheKey::namespace_prefix(namespace.as_ref());
        let mut in_flight = self.inner.lock_in_flight()?;
        let flights_before = in_flight.len();
        in_flight.retain(|key, _| !key.starts_with(&prefix));
        let abandoned = flights_before - in_flight.len();

        let mut state = self.inner.lock_state()?;
        let before = state.entries.len();
        state.entries.retain(|key, _| !key.starts_with(&prefix));
        let removed = before - state.entries.len();
        debug!(namespace = namespace.as_ref(), removed, abandoned, "按命名空间清理缓存");
        Ok(removed)
    }

    /// 启动后台定时清理；缓存被释放后任务自行退出
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let period = interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 第一次 tick 立即返回
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    debug!("缓存已释放，清理任务退出");
                    break;
                };
                match inner.purge_expired() {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed, "后台清理过期缓存"),
                    Err(e) => warn!(error = %e, "后台清理缓存失败"),
                }
            }
        })
    }

    // ==========================================
    // 观测
    // ==========================================

    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.inner.lock_state()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let state = self.inner.lock_state()?;
        Ok(CacheStats {
            entries: state.entries.len(),
            ..state.stats
        })
    }

    /// 当前 in-flight 计算数
    pub fn in_flight_count(&self) -> Result<usize, CacheError> {
        Ok(self.inner.lock_in_flight()?.len())
    }
}

impl<V> CacheInner<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, CacheState<V>>, CacheError> {
        self.state.lock().map_err(|e| CacheError::lock("state", e))
    }

    /// 加锁顺序: in_flight → state
    fn lock_in_flight(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, (u64, InFlight<V>)>>, CacheError> {
        self.in_flight.lock().map_err(|e| CacheError::lock("in_flight", e))
    }

    fn record(&self, f: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state.stats);
        }
    }

    /// 读取并统计命中/未命中
    fn lookup(&self, key: &str) -> Result<Option<V>, CacheError> {
        let now = self.clock.now();
        let mut guard = self.lock_state()?;
        let state = &mut *guard;

        match state.entries.get(key) {
            None => {
                state.stats.misses += 1;
                Ok(None)
            }
            Some(entry) if now < entry.expires_at => {
                state.stats.hits += 1;
                Ok(Some(entry.payload.clone()))
            }
            Some(_) => {
                state.entries.remove(key);
                state.stats.expirations += 1;
                state.stats.misses += 1;
                debug!(key, "缓存条目已过期");
                Ok(None)
            }
        }
    }

    /// 读取但不计入统计（用于加锁后的二次检查）
    fn peek(&self, key: &str) -> Result<Option<V>, CacheError> {
        let now = self.clock.now();
        let state = self.lock_state()?;
        Ok(state
            .entries
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.payload.clone()))
    }

    fn insert(&self, key: String, payload: V, ttl: Duration) -> Result<(), CacheError> {
        let delta = chrono::Duration::from_std(ttl).map_err(|_| CacheError::InvalidTtl(ttl))?;
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(delta)
            .ok_or(CacheError::InvalidTtl(ttl))?;

        let mut state = self.lock_state()?;

        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_entries {
            // 淘汰过期时间最近的一条；同时刻按键排序保证确定性
            let victim = state
                .entries
                .values()
                .min_by(|a, b| {
                    a.expires_at
                        .cmp(&b.expires_at)
                        .then_with(|| a.key.cmp(&b.key))
                })
                .map(|entry| entry.key.clone());

            if let Some(victim) = victim {
                state.entries.remove(&victim);
                state.stats.evictions += 1;
                debug!(evicted = %victim, "缓存已满，淘汰最近过期条目");
            }
        }

        state.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                payload,
                expires_at,
            },
        );
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = self.clock.now();
        let mut state = self.lock_state()?;
        let before = state.entries.len();
        state.entries.retain(|_, entry| now < entry.expires_at);
        let removed = before - state.entries.len();
        state.stats.expirations += removed as u64;
        Ok(removed)
    }

    /// in-flight 计算完成: 登记仍有效且成功时写缓存，随后移出 in-flight 表
    ///
    /// 计算期间该键已被清理（登记被移除或被新计算替换）时，结果只返回给等待者
    fn complete(&self, key: &str, flight_id: u64, outcome: &Result<V, CacheError>, ttl: Duration) {
        let mut in_flight = match self.lock_in_flight() {
            Ok(guard) => guard,
            Err(e) => {
                warn!(key, error = %e, "in_flight 锁获取失败");
                return;
            }
        };

        if in_flight.get(key).map(|(id, _)| *id) != Some(flight_id) {
            debug!(key, "计算期间缓存已失效，结果不写入");
            return;
        }

        if let Ok(payload) = outcome {
            if let Err(e) = self.insert(key.to_string(), payload.clone(), ttl) {
                warn!(key, error = %e, "计算结果写入缓存失败");
            }
        }
        in_flight.remove(key);
    }
}
