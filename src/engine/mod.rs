// ==========================================
// 库存分配引擎 - 引擎层
// ==========================================
// 职责: 分配对象解析、打分、按比例拆分、预约去重、逐台分配、编排
// 红线: 算法模块不取数、不读时钟；时间戳由编排器传入
// ==========================================

pub mod dedup;
pub mod error;
pub mod orchestrator;
pub mod proportional;
pub mod score;
pub mod target_resolver;
pub mod validation;
pub mod waterfall;

// 重导出核心引擎
pub use dedup::{RankedReservation, ReservationDeduplicator, ReservationFeeds};
pub use error::{EngineError, EngineResult};
pub use orchestrator::{AssignmentOrchestrator, AvailableModel, CachedPayload};
pub use proportional::ProportionalAllocator;
pub use score::{AgentScore, ScoreEngine};
pub use target_resolver::TargetResolver;
pub use validation::{validate_assignment_result, validate_run_preconditions, ValidationOutcome};
pub use waterfall::{WaterfallAllocator, WaterfallOutcome};
