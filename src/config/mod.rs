// ==========================================
// 库存分配引擎 - 配置层
// ==========================================
// 职责: 引擎配置（缓存/数据源）+ 调用方提交的分配设置
// ==========================================

pub mod engine_config;
pub mod settings;

pub use engine_config::{default_config_path, CacheConfig, ConfigError, EngineConfig, FeedConfig};
pub use settings::{AssignmentSettings, PrioritySettings, RatioWeights, SettingsError};
