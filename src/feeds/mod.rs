// ==========================================
// 库存分配引擎 - 数据源层
// ==========================================
// 职责: 只读的外部数据源（预约三来源 / 人员花名册 / 门店列表 / 业务指标）
// 红线: 数据源只负责取数，不做过滤、去重、排序
// ==========================================

pub mod error;
pub mod json_file;
pub mod memory;
pub mod metrics_csv;
pub mod payload;

use crate::domain::agent::{Agent, Store};
use crate::domain::reservation::ReservationItem;
use crate::domain::types::ReservationSource;
use async_trait::async_trait;

pub use error::{FeedError, FeedResult};
pub use json_file::JsonFileFeed;
pub use memory::{FeedSlot, StaticFeed};
pub use metrics_csv::load_metrics_csv;
pub use payload::{ReservationEnvelope, StoresPayload};

// ==========================================
// DataFeed Trait
// ==========================================
// 用途: 分配编排器的取数接口
// 实现者: JsonFileFeed（本地文件）、StaticFeed（内存数据）
#[async_trait]
pub trait DataFeed: Send + Sync {
    /// 读取某一来源的预约记录
    ///
    /// # 返回
    /// 记录的 source 字段已标记为对应来源
    async fn fetch_reservations(&self, source: ReservationSource) -> FeedResult<Vec<ReservationItem>>;

    /// 读取人员花名册（顺序即选择顺序）
    async fn fetch_agents(&self) -> FeedResult<Vec<Agent>>;

    /// 读取门店列表
    async fn fetch_stores(&self) -> FeedResult<Vec<Store>>;
}
