// ==========================================
// 库存分配引擎 - 分配结果
// ==========================================
// 职责: 分配记录、跳过记录、汇总统计
// 红线: 结果为一次运行的只读快照，返回后不再修改
// ==========================================

use crate::domain::agent::Agent;
use crate::domain::reservation::ReservationItem;
use crate::domain::sku::SkuKey;
use crate::domain::types::{AssignmentMode, ReservationSource, SkipReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// 按比例分配记录在汇总中使用的优先级键
pub const RATIO_PRIORITY_KEY: &str = "ratio";

// ==========================================
// AssignmentRecord - 分配记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    pub agent_id: String,
    pub agent_name: String,
    pub model: String,
    pub color: String,

    /// 分配数量（逐台分配恒为 1）
    pub quantity: u32,

    pub mode: AssignmentMode,

    // ===== 预约来源（仅逐台分配） =====
    pub source: Option<ReservationSource>,
    pub priority: Option<u8>,
    pub customer_name: Option<String>,
    pub store_code: Option<String>,
    pub reservation_number: Option<String>,

    /// 参与排序的有效时间（逐台分配）
    pub effective_time: Option<DateTime<Utc>>,

    pub assigned_at: DateTime<Utc>,
}

impl AssignmentRecord {
    /// 逐台分配记录
    pub fn from_reservation(
        agent: &Agent,
        item: &ReservationItem,
        effective_time: DateTime<Utc>,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            model: item.model.clone(),
            color: item.color.clone(),
            quantity: 1,
            mode: AssignmentMode::Waterfall,
            source: Some(item.source),
            priority: Some(item.source.tier()),
            customer_name: Some(item.customer_name.clone()),
            store_code: Some(item.store_code.clone()),
            reservation_number: Some(item.reservation_number.clone()),
            effective_time: Some(effective_time),
            assigned_at,
        }
    }

    /// 按比例分配记录
    pub fn from_ratio(agent: &Agent, sku: &SkuKey, quantity: u32, assigned_at: DateTime<Utc>) -> Self {
        Self {
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            model: sku.model.clone(),
            color: sku.color.clone(),
            quantity,
            mode: AssignmentMode::Ratio,
            source: None,
            priority: None,
            customer_name: None,
            store_code: None,
            reservation_number: None,
            effective_time: None,
            assigned_at,
        }
    }

    pub fn sku_key(&self) -> SkuKey {
        SkuKey::new(&self.model, &self.color)
    }

    fn priority_key(&self) -> String {
        match self.source {
            Some(source) => source.as_str().to_string(),
            None => RATIO_PRIORITY_KEY.to_string(),
        }
    }
}

// ==========================================
// SkippedItem - 未分配的预约
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedItem {
    pub item: ReservationItem,
    pub reason: SkipReason,
}

// ==========================================
// AssignmentSummary - 汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSummary {
    pub total_assigned: u64,
    pub total_skipped: usize,

    /// 来源键（onSaleReceipt / yardReceipt / reservationSite / ratio） → 数量
    pub by_priority: BTreeMap<String, u64>,

    /// 人员ID → 数量
    pub by_agent: BTreeMap<String, u64>,

    /// "机型/颜色" → 数量
    pub by_sku: BTreeMap<String, u64>,
}

impl AssignmentSummary {
    pub fn from_records(records: &[AssignmentRecord], skipped: &[SkippedItem]) -> Self {
        let mut summary = AssignmentSummary {
            total_skipped: skipped.len(),
            ..Default::default()
        };

        for record in records {
            let qty = record.quantity as u64;
            summary.total_assigned += qty;
            *summary.by_priority.entry(record.priority_key()).or_insert(0) += qty;
            *summary.by_agent.entry(record.agent_id.clone()).or_insert(0) += qty;
            *summary.by_sku.entry(record.sku_key().to_string()).or_insert(0) += qty;
        }

        summary
    }
}

// ==========================================
// AssignmentResult - 一次分配运行的结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResult {
    pub run_id: String,
    pub mode: AssignmentMode,
    pub assignments: Vec<AssignmentRecord>,
    pub skipped_items: Vec<SkippedItem>,
    pub summary: AssignmentSummary,
    pub generated_at: DateTime<Utc>,
}

impl AssignmentResult {
    pub fn new(
        mode: AssignmentMode,
        assignments: Vec<AssignmentRecord>,
        skipped_items: Vec<SkippedItem>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let summary = AssignmentSummary::from_records(&assignments, &skipped_items);
        Self {
            run_id: Uuid::new_v4().to_string(),
            mode,
            assignments,
            skipped_items,
            summary,
            generated_at,
        }
    }

    /// 指定 SKU 的已分配总量
    pub fn total_for_sku(&self, sku: &SkuKey) -> u64 {
        self.assignments
            .iter()
            .filter(|r| r.model == sku.model && r.color == sku.color)
            .map(|r| r.quantity as u64)
            .sum()
    }

    /// 指定人员的已分配总量
    pub fn total_for_agent(&self, agent_id: &str) -> u64 {
        self.summary.by_agent.get(agent_id).copied().unwrap_or(0)
    }
}
