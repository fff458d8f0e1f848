// ==========================================
// 库存分配引擎 - 逐台分配（瀑布式）
// ==========================================
// 职责: 按队列顺序逐台分配给当前分配量最少的人员
// 状态: 每人累计量（按选择顺序）+ 每 SKU 累计量
// 红线: 任一 SKU 的累计量不得超过配置数量
// ==========================================

use crate::domain::agent::Agent;
use crate::domain::assignment::{AssignmentRecord, SkippedItem};
use crate::domain::sku::{SkuCatalog, SkuKey};
use crate::domain::types::SkipReason;
use crate::engine::dedup::RankedReservation;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

// ==========================================
// WaterfallOutcome - 分配产出
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaterfallOutcome {
    pub assignments: Vec<AssignmentRecord>,
    pub skipped: Vec<SkippedItem>,
}

// ==========================================
// WaterfallAllocator - 逐台分配器
// ==========================================
pub struct WaterfallAllocator {
    // 无状态引擎，不需要注入依赖
}

impl WaterfallAllocator {
    pub fn new() -> Self {
        Self {}
    }

    /// 逐台分配
    ///
    /// # 规则
    /// - 无可分配人员: 全部跳过
    /// - SKU 未配置: 跳过
    /// - SKU 已满: 跳过
    /// - 否则分配给累计量最少的人员（相同时取选择顺序靠前者），数量 1
    #[instrument(skip_all, fields(queue = queue.len(), agents = agents.len()))]
    pub fn allocate(
        &self,
        queue: &[RankedReservation],
        agents: &[Agent],
        catalog: &SkuCatalog,
        assigned_at: DateTime<Utc>,
    ) -> WaterfallOutcome {
        let mut outcome = WaterfallOutcome::default();

        if agents.is_empty() {
            outcome.skipped = queue
                .iter()
                .map(|r| SkippedItem {
                    item: r.item.clone(),
                    reason: SkipReason::NoEligibleAgents,
                })
                .collect();
            info!(skipped = outcome.skipped.len(), "无可分配人员，全部跳过");
            return outcome;
        }

        let mut agent_totals: Vec<u32> = vec![0; agents.len()];
        let mut sku_totals: HashMap<SkuKey, u32> = HashMap::new();

        for ranked in queue {
            let sku = ranked.item.sku_key();

            let cap = match catalog.quantity(&sku) {
                Some(cap) => cap,
                None => {
                    debug!(sku = %sku, customer = %ranked.item.customer_name, "SKU 未配置，跳过");
                    outcome.skipped.push(SkippedItem {
                        item: ranked.item.clone(),
                        reason: SkipReason::SkuNotConfigured,
                    });
                    continue;
                }
            };

            let sku_total = sku_totals.entry(sku).or_insert(0);
            if *sku_total >= cap {
                debug!(customer = %ranked.item.customer_name, cap = cap, "SKU 已分配满，跳过");
                outcome.skipped.push(SkippedItem {
                    item: ranked.item.clone(),
                    reason: SkipReason::SkuCapReached,
                });
                continue;
            }

            let Some(idx) = Self::least_loaded(&agent_totals) else {
                continue;
            };

            agent_totals[idx] += 1;
            *sku_total += 1;

            let agent = &agents[idx];
            debug!(
                agent = %agent.id,
                customer = %ranked.item.customer_name,
                source = %ranked.item.source,
                "分配 1 台"
            );
            outcome.assignments.push(AssignmentRecord::from_reservation(
                agent,
                &ranked.item,
                ranked.effective_time,
                assigned_at,
            ));
        }

        info!(
            assigned = outcome.assignments.len(),
            skipped = outcome.skipped.len(),
            "逐台分配完成"
        );
        outcome
    }

    /// 累计量最少的人员下标（相同时取下标最小者）
    fn least_loaded(totals: &[u32]) -> Option<usize> {
        totals
            .iter()
            .enumerate()
            .min_by_key(|(idx, total)| (**total, *idx))
            .map(|(idx, _)| idx)
    }
}

impl Default for WaterfallAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::ReservationItem;
    use crate::domain::sku::ModelSetting;
    use crate::domain::types::ReservationSource;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn ranked(customer: &str, model: &str) -> RankedReservation {
        RankedReservation {
            item: ReservationItem {
                customer_name: customer.to_string(),
                store_code: "S1".to_string(),
                model: model.to_string(),
                color: "Blue".to_string(),
                receipt_time: String::new(),
                reservation_number: format!("R-{}", customer),
                source: ReservationSource::OnSaleReceipt,
            },
            effective_time: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            time_fallback: false,
        }
    }

    fn catalog(quantity: u32) -> SkuCatalog {
        let mut models = BTreeMap::new();
        models.insert(
            "x".to_string(),
            ModelSetting {
                name: "X".to_string(),
                color: "Blue".to_string(),
                capacity: None,
                enabled: true,
                quantity,
            },
        );
        SkuCatalog::from_models(&models)
    }

    fn agents() -> Vec<Agent> {
        vec![
            Agent::new("A", "A", "O", "D", None),
            Agent::new("B", "B", "O", "D", None),
        ]
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_least_loaded_round_robin_with_cap() {
        let queue = vec![ranked("C1", "X"), ranked("C2", "X"), ranked("C3", "X"), ranked("C4", "X")];

        let outcome = WaterfallAllocator::new().allocate(&queue, &agents(), &catalog(3), now());

        let pairs: Vec<(&str, &str)> = outcome
            .assignments
            .iter()
            .map(|r| (r.customer_name.as_deref().unwrap_or(""), r.agent_id.as_str()))
            .collect();
        assert_eq!(pairs, vec![("C1", "A"), ("C2", "B"), ("C3", "A")]);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].item.customer_name, "C4");
        assert_eq!(outcome.skipped[0].reason, SkipReason::SkuCapReached);
    }

    #[test]
    fn test_unconfigured_sku_skipped_without_state_change() {
        let queue = vec![ranked("C1", "Y"), ranked("C2", "X")];

        let outcome = WaterfallAllocator::new().allocate(&queue, &agents(), &catalog(5), now());

        assert_eq!(outcome.assignments.len(), 1);
        assert_eq!(outcome.assignments[0].agent_id, "A");
        assert_eq!(outcome.skipped[0].reason, SkipReason::SkuNotConfigured);
    }

    #[test]
    fn test_no_agents_skips_everything() {
        let queue = vec![ranked("C1", "X")];

        let outcome = WaterfallAllocator::new().allocate(&queue, &[], &catalog(5), now());

        assert!(outcome.assignments.is_empty());
        assert_eq!(outcome.skipped[0].reason, SkipReason::NoEligibleAgents);
    }

    #[test]
    fn test_zero_quantity_sku_never_assigned() {
        let queue = vec![ranked("C1", "X")];

        let outcome = WaterfallAllocator::new().allocate(&queue, &agents(), &catalog(0), now());

        assert!(outcome.assignments.is_empty());
        assert_eq!(outcome.skipped[0].reason, SkipReason::SkuCapReached);
    }
}
