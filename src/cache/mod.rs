// ==========================================
// 库存分配引擎 - 缓存层
// ==========================================
// 职责: 避免界面每次交互都重算组织结构/机型列表/分配结果
// 说明: 显式构造并注入，不使用全局单例
// ==========================================

pub mod clock;
pub mod error;
pub mod key;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CacheError;
pub use key::{CacheKey, CacheKind};
pub use store::{AssignmentCache, CacheEntry, CacheStats};
