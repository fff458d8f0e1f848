// ==========================================
// 库存分配引擎 - 分配编排器
// ==========================================
// 职责: 取数 → 解析分配对象 → 执行分配 → 结果缓存
// 流程:
//   按预约: 组织结构 → 对象解析 → 三来源并发取数 → 去重排序 → 逐台分配
//   按比例: 组织结构 → 对象解析（级联） → 打分 → 整数拆分
// 红线: 数据源失败按空数据降级并告警，不中断分配
// ==========================================

use crate::cache::{AssignmentCache, CacheError, CacheKey, CacheKind, Clock, SystemClock};
use crate::config::engine_config::CacheConfig;
use crate::config::settings::AssignmentSettings;
use crate::domain::agent::{Agent, OrgHierarchy};
use crate::domain::assignment::AssignmentResult;
use crate::domain::metrics::{AgentSkuMetrics, MetricsTable};
use crate::domain::sku::SkuKey;
use crate::domain::types::{AssignmentMode, ReservationSource};
use crate::engine::dedup::{ReservationDeduplicator, ReservationFeeds};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::proportional::ProportionalAllocator;
use crate::engine::score::ScoreEngine;
use crate::engine::target_resolver::TargetResolver;
use crate::engine::validation::validate_run_preconditions;
use crate::engine::waterfall::WaterfallAllocator;
use crate::feeds::{DataFeed, FeedError, FeedResult};
use crate::perf::PerfGuard;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

// ==========================================
// AvailableModel - 预约数据中出现过的机型
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableModel {
    pub model: String,
    pub color: String,

    /// 来源键 → 记录数
    pub counts_by_source: BTreeMap<String, usize>,

    pub total: usize,
}

/// 缓存中保存的内容
#[derive(Debug, Clone)]
pub enum CachedPayload {
    Hierarchy(Arc<OrgHierarchy>),
    Models(Arc<Vec<AvailableModel>>),
    Result(Arc<AssignmentResult>),
}

// ==========================================
// AssignmentOrchestrator - 分配编排器
// ==========================================
#[derive(Clone)]
pub struct AssignmentOrchestrator {
    feed: Arc<dyn DataFeed>,
    cache: AssignmentCache<CachedPayload>,
    cache_config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl AssignmentOrchestrator {
    /// 创建编排器（系统时钟）
    pub fn new(feed: Arc<dyn DataFeed>, cache_config: CacheConfig) -> Self {
        Self::with_clock(feed, cache_config, Arc::new(SystemClock))
    }

    /// 指定时钟（缓存过期与分配时间戳共用同一时钟）
    pub fn with_clock(feed: Arc<dyn DataFeed>, cache_config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let cache = AssignmentCache::with_clock(
            cache_config.max_entries,
            cache_config.default_ttl(),
            Arc::clone(&clock),
        );
        Self {
            feed,
            cache,
            cache_config,
            clock,
        }
    }

    pub fn cache(&self) -> &AssignmentCache<CachedPayload> {
        &self.cache
    }

    /// 启动缓存后台清理
    pub fn start_sweeper(&self) -> JoinHandle<()> {
        self.cache.spawn_sweeper(self.cache_config.sweep_interval())
    }

    // ==========================================
    // 组织结构 / 机型列表
    // ==========================================

    /// 组织结构（花名册 + 门店）
    ///
    /// 花名册取数失败时返回空结构且不写缓存；门店失败按空列表处理
    #[instrument(skip(self))]
    pub async fn hierarchical_structure(&self) -> EngineResult<Arc<OrgHierarchy>> {
        let kind = CacheKind::HierarchicalStructure;
        let key = CacheKey::new(kind);
        let feed = Arc::clone(&self.feed);

        let outcome = self
            .cache
            .get_or_compute(&key, Some(self.cache_config.ttl_for(kind)), move || async move {
                let (agents, stores) = futures::join!(feed.fetch_agents(), feed.fetch_stores());
                let agents = agents?;
                let stores = or_empty(stores, "stores");
                Ok::<_, FeedError>(CachedPayload::Hierarchy(Arc::new(OrgHierarchy::from_roster(
                    agents, stores,
                ))))
            })
            .await;

        match outcome {
            Ok(CachedPayload::Hierarchy(hierarchy)) => Ok(hierarchy),
            Ok(_) => Err(EngineError::UnexpectedPayload(kind.as_str())),
            Err(CacheError::ComputeFailed { message, .. }) => {
                warn!(feed = "agents", error = %message, "数据源读取失败，按空数据处理");
                Ok(Arc::new(OrgHierarchy::default()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 三个预约来源中出现过的机型/颜色及各来源记录数
    #[instrument(skip(self))]
    pub async fn available_models(&self) -> EngineResult<Arc<Vec<AvailableModel>>> {
        let kind = CacheKind::AvailableModels;
        let key = CacheKey::new(kind);
        let feed = Arc::clone(&self.feed);

        let payload = self
            .cache
            .get_or_compute(&key, Some(self.cache_config.ttl_for(kind)), move || async move {
                let feeds = fetch_reservation_feeds(feed.as_ref()).await;
                Ok::<_, Infallible>(CachedPayload::Models(Arc::new(collect_models(&feeds))))
            })
            .await?;

        match payload {
            CachedPayload::Models(models) => Ok(models),
            _ => Err(EngineError::UnexpectedPayload(kind.as_str())),
        }
    }

    // ==========================================
    // 分配计算
    // ==========================================

    /// 按预约优先级逐台分配
    ///
    /// # 错误
    /// - NoConfiguredSkus / NoEligibleAgents: 计算前校验失败
    /// - Cache: 缓存键无法生成或锁失败
    #[instrument(skip_all)]
    pub async fn calculate_waterfall(
        &self,
        settings: &AssignmentSettings,
    ) -> EngineResult<Arc<AssignmentResult>> {
        let mut perf = PerfGuard::new("calculate_waterfall");

        let catalog = settings.sku_catalog();
        let hierarchy = self.hierarchical_structure().await?;
        let agents = TargetResolver::new().resolve_reservation_targets(&settings.targets, &hierarchy);
        validate_run_preconditions(&agents, &catalog)?;

        let kind = CacheKind::AssignmentCalculation;
        let key = CacheKey::new(kind)
            .param("settings", settings)?
            .param("agents", &agent_ids(&agents))?;

        let feed = Arc::clone(&self.feed);
        let clock = Arc::clone(&self.clock);
        let priorities = settings.priorities.clone();

        let payload = self
            .cache
            .get_or_compute(&key, Some(self.cache_config.ttl_for(kind)), move || async move {
                let feeds = fetch_reservation_feeds(feed.as_ref()).await;
                let queue = ReservationDeduplicator::new().build_queue(&feeds, &catalog, &priorities);
                let now = clock.now();
                let outcome = WaterfallAllocator::new().allocate(&queue, &agents, &catalog, now);

                info!(
                    queue = queue.len(),
                    assigned = outcome.assignments.len(),
                    skipped = outcome.skipped.len(),
                    "按预约分配计算完成"
                );
                Ok::<_, Infallible>(CachedPayload::Result(Arc::new(AssignmentResult::new(
                    AssignmentMode::Waterfall,
                    outcome.assignments,
                    outcome.skipped,
                    now,
                ))))
            })
            .await?;

        match payload {
            CachedPayload::Result(result) => {
                perf.set_items(result.assignments.len());
                Ok(result)
            }
            _ => Err(EngineError::UnexpectedPayload(kind.as_str())),
        }
    }

    /// 按比例分配
    ///
    /// # 错误
    /// - Settings: 未配置比例或比例之和不为 100
    /// - NoConfiguredSkus / NoEligibleAgents: 计算前校验失败
    #[instrument(skip_all, fields(metrics = metrics.len()))]
    pub async fn calculate_ratio(
        &self,
        settings: &AssignmentSettings,
        metrics: &[AgentSkuMetrics],
    ) -> EngineResult<Arc<AssignmentResult>> {
        let mut perf = PerfGuard::new("calculate_ratio");

        let weights = settings.validated_ratios()?;
        let catalog = settings.sku_catalog();
        let hierarchy = self.hierarchical_structure().await?;
        let agents = TargetResolver::new().resolve_ratio_targets(&settings.targets, &hierarchy);
        validate_run_preconditions(&agents, &catalog)?;

        let kind = CacheKind::RatioCalculation;
        let key = CacheKey::new(kind)
            .param("settings", settings)?
            .param("agents", &agent_ids(&agents))?
            .param("metrics", metrics)?;

        let table = MetricsTable::from_rows(metrics);
        let clock = Arc::clone(&self.clock);

        let payload = self
            .cache
            .get_or_compute(&key, Some(self.cache_config.ttl_for(kind)), move || async move {
                let now = clock.now();
                let engine = ScoreEngine::new(weights);
                let records = ProportionalAllocator::new()
                    .allocate_catalog(&engine, &agents, &catalog, &table, now);
                Ok::<_, Infallible>(CachedPayload::Result(Arc::new(AssignmentResult::new(
                    AssignmentMode::Ratio,
                    records,
                    Vec::new(),
                    now,
                ))))
            })
            .await?;

        match payload {
            CachedPayload::Result(result) => {
                perf.set_items(result.assignments.len());
                Ok(result)
            }
            _ => Err(EngineError::UnexpectedPayload(kind.as_str())),
        }
    }

    // ==========================================
    // 缓存失效
    // ==========================================

    /// 清理某一类缓存，返回删除条数
    pub fn invalidate(&self, kind: CacheKind) -> EngineResult<usize> {
        let removed = self.cache.clear_namespace(kind)?;
        info!(kind = %kind, removed, "缓存已失效");
        Ok(removed)
    }

    /// 清空全部缓存
    pub fn invalidate_all(&self) -> EngineResult<usize> {
        Ok(self.cache.clear()?)
    }
}

// ==========================================
// 辅助函数
// ==========================================

/// 三个预约来源并发取数；失败的来源按空列表处理
async fn fetch_reservation_feeds(feed: &dyn DataFeed) -> ReservationFeeds {
    let (on_sale, yard, site) = futures::join!(
        feed.fetch_reservations(ReservationSource::OnSaleReceipt),
        feed.fetch_reservations(ReservationSource::YardReceipt),
        feed.fetch_reservations(ReservationSource::ReservationSite),
    );

    ReservationFeeds {
        on_sale: or_empty(on_sale, ReservationSource::OnSaleReceipt.as_str()),
        yard: or_empty(yard, ReservationSource::YardReceipt.as_str()),
        site: or_empty(site, ReservationSource::ReservationSite.as_str()),
    }
}

fn or_empty<T>(result: FeedResult<Vec<T>>, feed_name: &str) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            warn!(feed = feed_name, error = %e, "数据源读取失败，按空数据处理");
            Vec::new()
        }
    }
}

fn agent_ids(agents: &[Agent]) -> Vec<&str> {
    agents.iter().map(|a| a.id.as_str()).collect()
}

fn collect_models(feeds: &ReservationFeeds) -> Vec<AvailableModel> {
    let mut grouped: BTreeMap<SkuKey, BTreeMap<String, usize>> = BTreeMap::new();
    for source in ReservationSource::ALL {
        for item in feeds.items(source) {
            *grouped
                .entry(item.sku_key())
                .or_default()
                .entry(source.as_str().to_string())
                .or_insert(0) += 1;
        }
    }

    grouped
        .into_iter()
        .map(|(sku, counts_by_source)| AvailableModel {
            total: counts_by_source.values().sum(),
            model: sku.model,
            color: sku.color,
            counts_by_source,
        })
        .collect()
}
