// ==========================================
// 库存分配引擎 - 引擎层错误类型
// ==========================================
// 职责: 分配运行前的前置条件错误 + 下层错误透传
// ==========================================

use crate::cache::CacheError;
use crate::config::settings::SettingsError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("没有可分配的销售人员，请先选择分配对象")]
    NoEligibleAgents,

    #[error("没有已启用的机型配置，请先设置机型数量")]
    NoConfiguredSkus,

    #[error("分配设置无效: {0}")]
    Settings(#[from] SettingsError),

    #[error("缓存错误: {0}")]
    Cache(#[from] CacheError),

    #[error("缓存内容类型不匹配: kind={0}")]
    UnexpectedPayload(&'static str),
}

pub type EngineResult<T> = Result<T, EngineError>;
