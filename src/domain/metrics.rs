// ==========================================
// 库存分配引擎 - 业务指标
// ==========================================
// 职责: 每个 (人员, SKU) 的四项原始指标，供按比例分配打分
// ==========================================

use crate::domain::sku::SkuKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// AgentSkuMetrics - 原始指标
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkuMetrics {
    pub agent_id: String,
    pub model: String,
    pub color: String,

    /// 周转率
    #[serde(default)]
    pub turnover_rate: f64,

    /// 门店数
    #[serde(default)]
    pub store_count: f64,

    /// 销量
    #[serde(default)]
    pub sales_volume: f64,

    /// 当前库存
    #[serde(default)]
    pub current_stock: f64,
}

impl AgentSkuMetrics {
    /// 剩余库存指标 = 销量 − 当前库存（越接近断货/超卖越大）
    pub fn remaining_inventory(&self) -> f64 {
        self.sales_volume - self.current_stock
    }

    pub fn sku_key(&self) -> SkuKey {
        SkuKey::new(&self.model, &self.color)
    }
}

// ==========================================
// MetricsTable - 按 (人员, SKU) 索引
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct MetricsTable {
    rows: HashMap<(String, SkuKey), AgentSkuMetrics>,
}

impl MetricsTable {
    /// 构建索引；同一 (人员, SKU) 重复时后者覆盖前者
    pub fn from_rows(rows: &[AgentSkuMetrics]) -> Self {
        let rows = rows
            .iter()
            .map(|m| ((m.agent_id.clone(), m.sku_key()), m.clone()))
            .collect();
        Self { rows }
    }

    pub fn get(&self, agent_id: &str, sku: &SkuKey) -> Option<&AgentSkuMetrics> {
        self.rows.get(&(agent_id.to_string(), sku.clone()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
