// ==========================================
// 库存分配引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据获取逻辑,不含分配算法
// ==========================================

pub mod agent;
pub mod assignment;
pub mod metrics;
pub mod reservation;
pub mod selection;
pub mod sku;
pub mod types;

// 重导出核心类型
pub use agent::{department_key, Agent, OrgHierarchy, OrgNode, Store};
pub use assignment::{AssignmentRecord, AssignmentResult, AssignmentSummary, SkippedItem};
pub use metrics::{AgentSkuMetrics, MetricsTable};
pub use reservation::{parse_receipt_time, ReservationItem, RECEIPT_TIME_FALLBACK};
pub use selection::TargetSelection;
pub use sku::{ModelSetting, SkuCatalog, SkuKey};
pub use types::{AssignmentMode, ReservationSource, SelectionLevel, SkipReason};
