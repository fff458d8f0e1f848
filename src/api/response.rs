// ==========================================
// 库存分配引擎 - 统一响应结构
// ==========================================
// 成功: { success: true, data: {...} }
// 失败: { success: false, error: "...", code: "..." }
// 调用方按 success 分支，不依赖错误跨边界抛出
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn fail(err: &ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            code: Some(err.code().to_string()),
        }
    }
}

impl<T> From<ApiResult<T>> for ApiResponse<T> {
    fn from(result: ApiResult<T>) -> Self {
        match result {
            Ok(data) => ApiResponse::ok(data),
            Err(err) => ApiResponse::fail(&err),
        }
    }
}
