// ==========================================
// 库存分配引擎 - 按比例分配
// ==========================================
// 职责: 将 SKU 配置数量按得分拆分为每人的整数数量
// 红线: 每个 SKU 的分配总量必须严格等于配置数量
// 余数规则: 小数部分降序 → 销量降序 → 门店数降序 → 选择顺序
// ==========================================

use crate::domain::agent::Agent;
use crate::domain::assignment::AssignmentRecord;
use crate::domain::metrics::MetricsTable;
use crate::domain::sku::SkuCatalog;
use crate::engine::score::{AgentScore, ScoreEngine};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

/// 份额比较精度；差值在此范围内的小数部分视为相等
const FRACTION_EPSILON: f64 = 1e-9;

// ==========================================
// ProportionalAllocator - 按比例分配器
// ==========================================
pub struct ProportionalAllocator {
    // 无状态引擎，不需要注入依赖
}

impl ProportionalAllocator {
    pub fn new() -> Self {
        Self {}
    }

    /// 单个 SKU 的整数拆分
    ///
    /// 返回值与 scores 一一对应，总和恒等于 total
    pub fn allocate(&self, scores: &[AgentScore], total: u32) -> Vec<u32> {
        if scores.is_empty() {
            return Vec::new();
        }

        let weights: Vec<f64> = scores
            .iter()
            .map(|s| if s.score.is_finite() && s.score > 0.0 { s.score } else { 0.0 })
            .collect();
        let score_sum: f64 = weights.iter().sum();

        if score_sum <= 0.0 {
            return Self::split_evenly(scores.len(), total);
        }

        // 1. 向下取整
        let exact: Vec<f64> = weights
            .iter()
            .map(|w| Self::snap(w * total as f64 / score_sum))
            .collect();
        let mut quantities: Vec<u32> = exact.iter().map(|e| e.floor() as u32).collect();
        let fractions: Vec<i64> = exact
            .iter()
            .zip(&quantities)
            .map(|(e, q)| Self::quantize(e - *q as f64))
            .collect();

        // 浮点误差可能使取整后总量超出，先从小数部分最小者回收
        let mut assigned: u64 = quantities.iter().map(|q| *q as u64).sum();
        if assigned > total as u64 {
            let mut ascending: Vec<usize> = (0..scores.len()).collect();
            ascending.sort_by(|&a, &b| fractions[a].cmp(&fractions[b]).then(b.cmp(&a)));
            let mut cursor = 0;
            while assigned > total as u64 {
                let idx = ascending[cursor % ascending.len()];
                if quantities[idx] > 0 {
                    quantities[idx] -= 1;
                    assigned -= 1;
                }
                cursor += 1;
            }
        }

        // 2. 余数逐台分配
        let leftover = (total as u64 - assigned) as usize;
        if leftover > 0 {
            let order = Self::remainder_order(scores, &fractions);
            for step in 0..leftover {
                quantities[order[step % order.len()]] += 1;
            }
        }

        quantities
    }

    /// 全部 SKU 的按比例分配
    ///
    /// 记录顺序: SKU 排序顺序 → 人员选择顺序；数量为 0 的不产生记录
    #[instrument(skip_all, fields(skus = catalog.len(), agents = agents.len()))]
    pub fn allocate_catalog(
        &self,
        engine: &ScoreEngine,
        agents: &[Agent],
        catalog: &SkuCatalog,
        metrics: &MetricsTable,
        assigned_at: DateTime<Utc>,
    ) -> Vec<AssignmentRecord> {
        let mut records = Vec::new();
        if agents.is_empty() {
            return records;
        }

        for (sku, total) in catalog.iter() {
            let scores = engine.score_sku(sku, agents, metrics);
            let quantities = self.allocate(&scores, total);

            for (agent, qty) in agents.iter().zip(quantities) {
                if qty == 0 {
                    continue;
                }
                records.push(AssignmentRecord::from_ratio(agent, sku, qty, assigned_at));
            }
            debug!(sku = %sku, total = total, "SKU 按比例分配完成");
        }

        info!(records = records.len(), "按比例分配完成");
        records
    }

    fn split_evenly(count: usize, total: u32) -> Vec<u32> {
        let base = total / count as u32;
        let extra = (total % count as u32) as usize;
        (0..count)
            .map(|i| if i < extra { base + 1 } else { base })
            .collect()
    }

    /// 贴近整数的份额按整数处理
    fn snap(share: f64) -> f64 {
        let rounded = share.round();
        if (share - rounded).abs() < FRACTION_EPSILON {
            rounded
        } else {
            share
        }
    }

    /// 小数部分按精度量化为整数，消除浮点噪声后再比较
    fn quantize(fraction: f64) -> i64 {
        (fraction / FRACTION_EPSILON).round() as i64
    }

    fn remainder_order(scores: &[AgentScore], fractions: &[i64]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| {
            fractions[b]
                .cmp(&fractions[a])
                .then_with(|| scores[b].sales_volume.total_cmp(&scores[a].sales_volume))
                .then_with(|| scores[b].store_count.total_cmp(&scores[a].store_count))
                .then_with(|| a.cmp(&b))
        });
        order
    }
}

impl Default for ProportionalAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::RatioWeights;
    use crate::domain::metrics::AgentSkuMetrics;
    use crate::domain::sku::{ModelSetting, SkuKey};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn score(id: &str, score: f64, sales: f64, stores: f64) -> AgentScore {
        AgentScore {
            agent_id: id.to_string(),
            score,
            sales_volume: sales,
            store_count: stores,
        }
    }

    #[test]
    fn test_floor_then_remainder_by_fraction() {
        // 精确份额: 3.33 / 3.33 / 3.33 → 余 1 台
        let scores = vec![
            score("a", 10.0, 0.0, 0.0),
            score("b", 10.0, 0.0, 0.0),
            score("c", 10.0, 0.0, 0.0),
        ];
        let q = ProportionalAllocator::new().allocate(&scores, 10);
        assert_eq!(q, vec![4, 3, 3]);
    }

    #[test]
    fn test_remainder_tie_broken_by_sales_then_store_count() {
        let scores = vec![
            score("a", 50.0, 5.0, 9.0),
            score("b", 50.0, 8.0, 1.0),
        ];
        assert_eq!(ProportionalAllocator::new().allocate(&scores, 3), vec![1, 2]);

        let scores = vec![
            score("a", 50.0, 5.0, 2.0),
            score("b", 50.0, 5.0, 7.0),
        ];
        assert_eq!(ProportionalAllocator::new().allocate(&scores, 3), vec![1, 2]);
    }

    #[test]
    fn test_equal_fractions_with_float_noise_fall_through_to_sales() {
        // 精确份额: 7/22×11=3.5, 15/22×11=7.5 → 小数部分相等，销量高者得余数
        let scores = vec![score("a", 7.0, 1.0, 0.0), score("b", 15.0, 2.0, 0.0)];
        assert_eq!(ProportionalAllocator::new().allocate(&scores, 11), vec![3, 8]);

        let scores = vec![score("a", 7.0, 2.0, 0.0), score("b", 15.0, 1.0, 0.0)];
        assert_eq!(ProportionalAllocator::new().allocate(&scores, 11), vec![4, 7]);
    }

    #[test]
    fn test_larger_fraction_wins_remainder() {
        // 精确份额: 0.8×4=3.2, 0.2×4=0.8 → b 小数部分更大
        let scores = vec![score("a", 80.0, 100.0, 0.0), score("b", 20.0, 0.0, 0.0)];
        assert_eq!(ProportionalAllocator::new().allocate(&scores, 4), vec![3, 1]);
    }

    #[test]
    fn test_zero_scores_split_evenly() {
        let scores = vec![
            score("a", 0.0, 0.0, 0.0),
            score("b", 0.0, 0.0, 0.0),
            score("c", 0.0, 0.0, 0.0),
        ];
        assert_eq!(ProportionalAllocator::new().allocate(&scores, 7), vec![3, 2, 2]);
    }

    #[test]
    fn test_empty_and_zero_total() {
        let allocator = ProportionalAllocator::new();
        assert!(allocator.allocate(&[], 5).is_empty());
        assert_eq!(allocator.allocate(&[score("a", 10.0, 0.0, 0.0)], 0), vec![0]);
    }

    #[test]
    fn test_total_invariant_holds_for_awkward_scores() {
        let allocator = ProportionalAllocator::new();
        let scores = vec![
            score("a", 33.333333, 1.0, 1.0),
            score("b", 0.000001, 0.0, 0.0),
            score("c", 66.666666, 2.0, 2.0),
            score("d", 12.5, 0.0, 3.0),
        ];
        for total in [0u32, 1, 2, 3, 7, 11, 97, 1000] {
            let q = allocator.allocate(&scores, total);
            assert_eq!(q.iter().sum::<u32>(), total, "total={}", total);
        }
    }

    #[test]
    fn test_allocate_catalog_emits_positive_records() {
        let agents = vec![
            Agent::new("a", "A", "O", "D", None),
            Agent::new("b", "B", "O", "D", None),
        ];
        let mut models = BTreeMap::new();
        models.insert(
            "x_blue".to_string(),
            ModelSetting {
                name: "X".to_string(),
                color: "Blue".to_string(),
                capacity: None,
                enabled: true,
                quantity: 2,
            },
        );
        let catalog = SkuCatalog::from_models(&models);
        let metrics = MetricsTable::from_rows(&[AgentSkuMetrics {
            agent_id: "b".to_string(),
            model: "X".to_string(),
            color: "Blue".to_string(),
            sales_volume: 10.0,
            ..Default::default()
        }]);
        let engine = ScoreEngine::new(RatioWeights {
            turnover_rate: 0.0,
            store_count: 0.0,
            remaining_inventory: 0.0,
            sales_volume: 100.0,
        });
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let records =
            ProportionalAllocator::new().allocate_catalog(&engine, &agents, &catalog, &metrics, now);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent_id, "b");
        assert_eq!(records[0].quantity, 2);
        assert_eq!(records[0].sku_key(), SkuKey::new("X", "Blue"));
    }
}
