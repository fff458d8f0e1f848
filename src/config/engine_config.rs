// ==========================================
// 库存分配引擎 - 引擎配置
// ==========================================
// 职责: 缓存容量/TTL、数据源位置
// 加载顺序: 默认值 → JSON 配置文件 → 环境变量（INVENTORY_ASSIGN_*）
// ==========================================

use crate::cache::CacheKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "INVENTORY_ASSIGN_";

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: path={path}, {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("配置文件解析失败: path={path}, {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("环境变量格式错误: {key}={value}")]
    InvalidEnv { key: String, value: String },

    #[error("配置项无效: {0}")]
    Invalid(String),
}

// ==========================================
// CacheConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 最大条目数
    pub max_entries: usize,

    /// 默认TTL（秒）
    pub default_ttl_secs: u64,

    /// 后台清理间隔（秒）
    pub sweep_interval_secs: u64,

    /// 组织结构TTL（秒）
    pub hierarchy_ttl_secs: u64,

    /// 可选机型列表TTL（秒）
    pub models_ttl_secs: u64,

    /// 分配结果TTL（秒，逐台与按比例共用）
    pub assignment_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            default_ttl_secs: 300,
            sweep_interval_secs: 60,
            hierarchy_ttl_secs: 1800,
            models_ttl_secs: 600,
            assignment_ttl_secs: 300,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// 各类缓存的TTL
    pub fn ttl_for(&self, kind: CacheKind) -> Duration {
        let secs = match kind {
            CacheKind::HierarchicalStructure => self.hierarchy_ttl_secs,
            CacheKind::AvailableModels => self.models_ttl_secs,
            CacheKind::AssignmentCalculation | CacheKind::RatioCalculation => {
                self.assignment_ttl_secs
            }
        };
        Duration::from_secs(secs)
    }
}

// ==========================================
// FeedConfig
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// 数据源 JSON 文件所在目录
    pub data_dir: Option<PathBuf>,
}

// ==========================================
// EngineConfig
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub feeds: FeedConfig,
}

impl EngineConfig {
    /// 加载配置
    ///
    /// # 参数
    /// - path: 配置文件路径；None 时尝试默认路径，默认路径不存在则只用默认值
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        tracing::debug!(?config, "引擎配置已加载");
        Ok(config)
    }

    /// 从 JSON 文件读取（缺省字段取默认值）
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 用环境变量覆写
    ///
    /// 支持: CACHE_MAX_ENTRIES / CACHE_DEFAULT_TTL_SECS / CACHE_SWEEP_INTERVAL_SECS /
    /// CACHE_HIERARCHY_TTL_SECS / CACHE_MODELS_TTL_SECS / CACHE_ASSIGNMENT_TTL_SECS / DATA_DIR
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| -> Option<(String, String)> {
            let key = format!("{}{}", ENV_PREFIX, name);
            lookup(&key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        };

        let parse_u64 = |name: &str| -> Result<Option<u64>, ConfigError> {
            match read(name) {
                None => Ok(None),
                Some((key, value)) => value
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidEnv { key, value }),
            }
        };

        if let Some(v) = parse_u64("CACHE_MAX_ENTRIES")? {
            self.cache.max_entries = v as usize;
        }
        if let Some(v) = parse_u64("CACHE_DEFAULT_TTL_SECS")? {
            self.cache.default_ttl_secs = v;
        }
        if let Some(v) = parse_u64("CACHE_SWEEP_INTERVAL_SECS")? {
            self.cache.sweep_interval_secs = v;
        }
        if let Some(v) = parse_u64("CACHE_HIERARCHY_TTL_SECS")? {
            self.cache.hierarchy_ttl_secs = v;
        }
        if let Some(v) = parse_u64("CACHE_MODELS_TTL_SECS")? {
            self.cache.models_ttl_secs = v;
        }
        if let Some(v) = parse_u64("CACHE_ASSIGNMENT_TTL_SECS")? {
            self.cache.assignment_ttl_secs = v;
        }
        if let Some((_, dir)) = read("DATA_DIR") {
            self.feeds.data_dir = Some(PathBuf::from(dir));
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid("cache.max_entries 必须大于0".to_string()));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.sweep_interval_secs 必须大于0".to_string(),
            ));
        }
        Ok(())
    }
}

/// 默认配置文件路径: {config_dir}/inventory-assign/config.json
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(format!("{}CONFIG", ENV_PREFIX)) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::config_dir().map(|dir| dir.join("inventory-assign").join("config.json"))
}
