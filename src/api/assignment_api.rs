// ==========================================
// 库存分配引擎 - 分配 API
// ==========================================
// 职责: 设置解析、两种分配计算、结果校验、组织结构/机型查询、缓存失效
// 输出: ApiResult<T>，或统一响应 ApiResponse<T>
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::response::ApiResponse;
use crate::cache::{CacheKind, CacheStats};
use crate::config::settings::AssignmentSettings;
use crate::domain::agent::OrgHierarchy;
use crate::domain::assignment::{AssignmentRecord, AssignmentResult, AssignmentSummary, SkippedItem};
use crate::domain::metrics::AgentSkuMetrics;
use crate::domain::types::AssignmentMode;
use crate::engine::{validate_assignment_result, AssignmentOrchestrator, AvailableModel, ValidationOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

// ==========================================
// AssignmentOutput - 分配响应数据
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOutput {
    pub run_id: String,
    pub mode: AssignmentMode,
    pub assignments: Vec<AssignmentRecord>,
    pub skipped_items: Vec<SkippedItem>,
    pub summary: AssignmentSummary,

    /// 本次计算使用的设置（原样回传）
    pub settings: AssignmentSettings,

    /// 结果校验结论
    pub validation: ValidationOutcome,

    pub timestamp: DateTime<Utc>,
}

impl AssignmentOutput {
    fn from_result(result: &AssignmentResult, settings: &AssignmentSettings) -> Self {
        Self {
            run_id: result.run_id.clone(),
            mode: result.mode,
            assignments: result.assignments.clone(),
            skipped_items: result.skipped_items.clone(),
            summary: result.summary.clone(),
            settings: settings.clone(),
            validation: validate_assignment_result(result),
            timestamp: result.generated_at,
        }
    }
}

// ==========================================
// AssignmentApi
// ==========================================

/// 分配API
///
/// 职责：
/// 1. 解析调用方提交的设置
/// 2. 执行按预约/按比例分配
/// 3. 查询组织结构、可选机型
/// 4. 缓存失效与统计
#[derive(Clone)]
pub struct AssignmentApi {
    orchestrator: AssignmentOrchestrator,
}

impl AssignmentApi {
    pub fn new(orchestrator: AssignmentOrchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &AssignmentOrchestrator {
        &self.orchestrator
    }

    /// 解析设置 JSON
    pub fn parse_settings(json: &str) -> ApiResult<AssignmentSettings> {
        serde_json::from_str(json).map_err(|e| ApiError::InvalidInput(format!("设置格式错误: {}", e)))
    }

    // ==========================================
    // 分配计算
    // ==========================================

    /// 按预约优先级逐台分配
    #[instrument(skip_all)]
    pub async fn run_waterfall(&self, settings: &AssignmentSettings) -> ApiResult<AssignmentOutput> {
        let result = self.orchestrator.calculate_waterfall(settings).await?;
        let output = AssignmentOutput::from_result(&result, settings);
        Self::log_output(&output);
        Ok(output)
    }

    /// 按比例分配
    #[instrument(skip_all)]
    pub async fn run_ratio(
        &self,
        settings: &AssignmentSettings,
        metrics: &[AgentSkuMetrics],
    ) -> ApiResult<AssignmentOutput> {
        let result = self.orchestrator.calculate_ratio(settings, metrics).await?;
        let output = AssignmentOutput::from_result(&result, settings);
        Self::log_output(&output);
        Ok(output)
    }

    /// 按预约分配（统一响应）
    pub async fn calculate_waterfall(&self, settings: &AssignmentSettings) -> ApiResponse<AssignmentOutput> {
        self.run_waterfall(settings).await.into()
    }

    /// 按比例分配（统一响应）
    pub async fn calculate_ratio(
        &self,
        settings: &AssignmentSettings,
        metrics: &[AgentSkuMetrics],
    ) -> ApiResponse<AssignmentOutput> {
        self.run_ratio(settings, metrics).await.into()
    }

    // ==========================================
    // 查询
    // ==========================================

    pub async fn hierarchical_structure(&self) -> ApiResult<OrgHierarchy> {
        let hierarchy = self.orchestrator.hierarchical_structure().await?;
        Ok(hierarchy.as_ref().clone())
    }

    pub async fn available_models(&self) -> ApiResult<Vec<AvailableModel>> {
        let models = self.orchestrator.available_models().await?;
        Ok(models.as_ref().clone())
    }

    // ==========================================
    // 缓存
    // ==========================================

    /// 缓存失效；kind 为 None 时清空全部
    pub fn invalidate_cache(&self, kind: Option<CacheKind>) -> ApiResult<usize> {
        let removed = match kind {
            Some(kind) => self.orchestrator.invalidate(kind)?,
            None => self.orchestrator.invalidate_all()?,
        };
        Ok(removed)
    }

    pub fn cache_stats(&self) -> ApiResult<CacheStats> {
        Ok(self.orchestrator.cache().stats()?)
    }

    fn log_output(output: &AssignmentOutput) {
        if !output.validation.valid {
            warn!(
                run_id = %output.run_id,
                error = output.validation.error.as_deref().unwrap_or(""),
                "分配结果校验未通过"
            );
        }
        info!(
            run_id = %output.run_id,
            mode = %output.mode,
            assigned = output.summary.total_assigned,
            skipped = output.summary.total_skipped,
            "分配完成"
        );
    }
}
