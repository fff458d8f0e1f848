// ==========================================
// 库存分配引擎 - API 层
// ==========================================
// 职责: 提供分配业务接口，供命令行或上层界面调用
// ==========================================

pub mod assignment_api;
pub mod error;
pub mod response;

// 重导出核心类型
pub use assignment_api::{AssignmentApi, AssignmentOutput};
pub use error::{ApiError, ApiResult};
pub use response::ApiResponse;
