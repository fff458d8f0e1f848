// ==========================================
// 库存分配引擎 - 缓存错误类型
// ==========================================
// 红线: 缓存错误只让当次 get/set 失败，不影响引擎其他部分
// ==========================================

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("缓存键序列化失败: param={param}, {message}")]
    KeySerialization { param: String, message: String },

    #[error("缓存锁获取失败: {0}")]
    LockPoisoned(String),

    #[error("缓存TTL无效: {0:?}")]
    InvalidTtl(Duration),

    #[error("缓存计算失败: key={key}, {message}")]
    ComputeFailed { key: String, message: String },
}

impl CacheError {
    pub(crate) fn lock<E: std::fmt::Display>(what: &str, err: E) -> Self {
        CacheError::LockPoisoned(format!("{}: {}", what, err))
    }
}
