// ==========================================
// 库存分配引擎 - 核心库
// ==========================================
// 职责: 机型/颜色库存在销售组织中的分配
//   按比例: 四项业务指标加权打分后整数拆分
//   按预约: 三来源预约去重排序后逐台分配给分配量最少的人员
// 所有对外计算经由带过期的结果缓存
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 配置层 - 引擎配置与分配设置
pub mod config;

// 缓存层 - 带过期/容量淘汰的结果缓存
pub mod cache;

// 数据源层 - 预约/花名册/门店/指标
pub mod feeds;

// 引擎层 - 分配算法与编排
pub mod engine;

// API 层 - 业务接口
pub mod api;

// 日志系统
pub mod logging;

// 性能统计
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AssignmentMode, ReservationSource, SelectionLevel, SkipReason};

// 领域实体
pub use domain::{
    Agent, AgentSkuMetrics, AssignmentRecord, AssignmentResult, AssignmentSummary, OrgHierarchy,
    ReservationItem, SkippedItem, SkuCatalog, SkuKey, Store, TargetSelection,
};

// 配置
pub use config::{AssignmentSettings, CacheConfig, EngineConfig, PrioritySettings, RatioWeights};

// 缓存
pub use cache::{AssignmentCache, CacheKey, CacheKind};

// 引擎
pub use engine::{
    AssignmentOrchestrator, ProportionalAllocator, ReservationDeduplicator, ScoreEngine,
    TargetResolver, WaterfallAllocator,
};

// API
pub use api::{ApiResponse, AssignmentApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "库存分配引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
