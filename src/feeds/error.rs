// ==========================================
// 库存分配引擎 - 数据源错误类型
// ==========================================

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("数据源读取失败: path={path}, {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("数据源格式错误: path={path}, {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("指标文件解析失败: path={path}, 行={row}, {message}")]
    Csv {
        path: PathBuf,
        row: usize,
        message: String,
    },

    #[error("数据源不可用: {0}")]
    Unavailable(String),
}

pub type FeedResult<T> = Result<T, FeedError>;
