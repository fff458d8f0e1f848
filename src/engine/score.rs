// ==========================================
// 库存分配引擎 - 比例打分引擎
// ==========================================
// 职责: 对同一 SKU 的可分配人员，按四项指标计算加权得分
// 输入: 可分配人员 + 指标表 + 比例权重（百分比，总和100）
// 输出: 每人一个得分（与人员顺序一致）
// ==========================================

use crate::config::settings::RatioWeights;
use crate::domain::agent::Agent;
use crate::domain::metrics::MetricsTable;
use crate::domain::sku::SkuKey;
use serde::{Deserialize, Serialize};
use tracing::instrument;

// ==========================================
// AgentScore - 单人得分
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentScore {
    pub agent_id: String,

    /// 加权得分 Σ weight_i × normalized_i
    pub score: f64,

    // 余数分配时的次级排序键（原始值）
    pub sales_volume: f64,
    pub store_count: f64,
}

/// 四项原始指标（缺失/非有限值按 0 处理）
#[derive(Debug, Clone, Copy, Default)]
struct RawMetrics {
    turnover_rate: f64,
    store_count: f64,
    remaining_inventory: f64,
    sales_volume: f64,
}

// ==========================================
// ScoreEngine - 打分引擎
// ==========================================
pub struct ScoreEngine {
    weights: RatioWeights,
}

impl ScoreEngine {
    pub fn new(weights: RatioWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &RatioWeights {
        &self.weights
    }

    /// 计算某一 SKU 下每个人员的得分
    ///
    /// 每项指标在可分配人员范围内做 min-max 归一化（最差 0，最好 1），
    /// 四项指标都是越大越好。剩余库存 = 销量 − 当前库存，越接近断货越优先补货。
    #[instrument(skip(self, agents, metrics), fields(sku = %sku, agents = agents.len()))]
    pub fn score_sku(&self, sku: &SkuKey, agents: &[Agent], metrics: &MetricsTable) -> Vec<AgentScore> {
        let raw: Vec<RawMetrics> = agents
            .iter()
            .map(|agent| match metrics.get(&agent.id, sku) {
                Some(m) => RawMetrics {
                    turnover_rate: finite_or_zero(m.turnover_rate),
                    store_count: finite_or_zero(m.store_count),
                    remaining_inventory: finite_or_zero(m.remaining_inventory()),
                    sales_volume: finite_or_zero(m.sales_volume),
                },
                None => RawMetrics::default(),
            })
            .collect();

        let turnover = normalize(&raw.iter().map(|r| r.turnover_rate).collect::<Vec<_>>());
        let stores = normalize(&raw.iter().map(|r| r.store_count).collect::<Vec<_>>());
        let remaining = normalize(&raw.iter().map(|r| r.remaining_inventory).collect::<Vec<_>>());
        let sales = normalize(&raw.iter().map(|r| r.sales_volume).collect::<Vec<_>>());

        agents
            .iter()
            .enumerate()
            .map(|(i, agent)| AgentScore {
                agent_id: agent.id.clone(),
                score: self.weights.turnover_rate * turnover[i]
                    + self.weights.store_count * stores[i]
                    + self.weights.remaining_inventory * remaining[i]
                    + self.weights.sales_volume * sales[i],
                sales_volume: raw[i].sales_volume,
                store_count: raw[i].store_count,
            })
            .collect()
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// min-max 归一化
///
/// 所有值相同时无法区分：值为正则全部记 1，否则全部记 0
fn normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if values.is_empty() {
        return Vec::new();
    }

    let range = max - min;
    if range <= 0.0 {
        let v = if max > 0.0 { 1.0 } else { 0.0 };
        return vec![v; values.len()];
    }

    values.iter().map(|v| (v - min) / range).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::AgentSkuMetrics;

    fn weights(t: f64, s: f64, r: f64, v: f64) -> RatioWeights {
        RatioWeights {
            turnover_rate: t,
            store_count: s,
            remaining_inventory: r,
            sales_volume: v,
        }
    }

    fn metric(agent: &str, turnover: f64, stores: f64, sales: f64, stock: f64) -> AgentSkuMetrics {
        AgentSkuMetrics {
            agent_id: agent.to_string(),
            model: "X".to_string(),
            color: "Blue".to_string(),
            turnover_rate: turnover,
            store_count: stores,
            sales_volume: sales,
            current_stock: stock,
        }
    }

    fn agents() -> Vec<Agent> {
        vec![
            Agent::new("a", "A", "O", "D", None),
            Agent::new("b", "B", "O", "D", None),
            Agent::new("c", "C", "O", "D", None),
        ]
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(&[1.0, 3.0, 2.0]), vec![0.0, 1.0, 0.5]);
        assert_eq!(normalize(&[4.0, 4.0]), vec![1.0, 1.0]);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert_eq!(normalize(&[-2.0, -2.0]), vec![0.0, 0.0]);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_sales_volume_only() {
        let table = MetricsTable::from_rows(&[
            metric("a", 0.0, 0.0, 10.0, 0.0),
            metric("b", 0.0, 0.0, 30.0, 0.0),
            metric("c", 0.0, 0.0, 20.0, 0.0),
        ]);
        let engine = ScoreEngine::new(weights(0.0, 0.0, 0.0, 100.0));

        let scores = engine.score_sku(&SkuKey::new("X", "Blue"), &agents(), &table);

        let values: Vec<f64> = scores.iter().map(|s| s.score).collect();
        assert_eq!(values, vec![0.0, 100.0, 50.0]);
    }

    #[test]
    fn test_remaining_inventory_rewards_low_stock() {
        // 销量相同，库存越少剩余库存指标越大
        let table = MetricsTable::from_rows(&[
            metric("a", 0.0, 0.0, 10.0, 12.0), // -2
            metric("b", 0.0, 0.0, 10.0, 2.0),  // 8
            metric("c", 0.0, 0.0, 10.0, 5.0),  // 5
        ]);
        let engine = ScoreEngine::new(weights(0.0, 0.0, 100.0, 0.0));

        let scores = engine.score_sku(&SkuKey::new("X", "Blue"), &agents(), &table);

        assert_eq!(scores[0].score, 0.0);
        assert_eq!(scores[1].score, 100.0);
        assert!((scores[2].score - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_metrics_score_as_zero() {
        let table = MetricsTable::from_rows(&[metric("a", 1.0, 2.0, 3.0, 0.0)]);
        let engine = ScoreEngine::new(weights(25.0, 25.0, 25.0, 25.0));

        let scores = engine.score_sku(&SkuKey::new("X", "Blue"), &agents(), &table);

        assert_eq!(scores[0].score, 100.0);
        assert_eq!(scores[1].score, 0.0);
        assert_eq!(scores[2].score, 0.0);
        assert_eq!(scores[0].store_count, 2.0);
    }
}
