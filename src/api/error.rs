// ==========================================
// 库存分配引擎 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把引擎/缓存/数据源错误转换为可直接展示的消息
// ==========================================

use crate::cache::CacheError;
use crate::engine::EngineError;
use crate::feeds::FeedError;
use thiserror::Error;

/// API层错误类型
/// 错误信息由调用方原样展示，必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入与校验错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 计算与依赖错误
    // ==========================================
    #[error("分配计算失败: {0}")]
    CalculationFailed(String),

    #[error("缓存错误: {0}")]
    CacheError(String),

    #[error("数据源错误: {0}")]
    FeedError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 错误代码（响应中的 code 字段）
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::CalculationFailed(_) => "CALCULATION_FAILED",
            ApiError::CacheError(_) => "CACHE_ERROR",
            ApiError::FeedError(_) => "FEED_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "UNKNOWN_ERROR",
        }
    }
}

// ==========================================
// 从 EngineError 转换
// 前置条件错误 → 校验错误；计算内部失败 → 计算失败
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NoEligibleAgents
            | EngineError::NoConfiguredSkus
            | EngineError::Settings(_) => ApiError::ValidationError(err.to_string()),
            EngineError::Cache(cache_err) => cache_err.into(),
            EngineError::UnexpectedPayload(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::ComputeFailed { message, .. } => ApiError::CalculationFailed(message),
            other => ApiError::CacheError(other.to_string()),
        }
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        ApiError::FeedError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
