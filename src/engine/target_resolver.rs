// ==========================================
// 库存分配引擎 - 分配对象解析
// ==========================================
// 职责: 勾选状态 + 组织树 → 去重后的可分配人员列表
// 输入: TargetSelection + OrgHierarchy
// 输出: Vec<Agent>（顺序即后续分配时的选择顺序）
// ==========================================

use crate::domain::agent::{Agent, OrgHierarchy};
use crate::domain::selection::TargetSelection;
use std::collections::HashSet;
use tracing::{debug, instrument};

// ==========================================
// TargetResolver - 分配对象解析器
// ==========================================
pub struct TargetResolver {
    // 无状态引擎，不需要注入依赖
}

impl TargetResolver {
    pub fn new() -> Self {
        Self {}
    }

    /// 预约分配模式的对象解析（门店优先）
    ///
    /// 解析优先级:
    /// 1) 勾选门店下的人员
    /// 2) 直接勾选的人员
    /// 3) 勾选部门下的人员
    /// 4) 勾选办公室下的人员
    ///
    /// 每一层只追加前面各层尚未加入的人员；层内按花名册顺序
    #[instrument(skip_all, fields(roster = hierarchy.agents.len()))]
    pub fn resolve_reservation_targets(
        &self,
        selection: &TargetSelection,
        hierarchy: &OrgHierarchy,
    ) -> Vec<Agent> {
        let selected_stores: Vec<&str> = selection.selected_stores().collect();

        let mut added: HashSet<&str> = HashSet::new();
        let mut resolved: Vec<Agent> = Vec::new();

        let tiers: [(&str, Box<dyn Fn(&Agent) -> bool + '_>); 4] = [
            (
                "store",
                Box::new(|agent: &Agent| {
                    selected_stores
                        .iter()
                        .any(|store| Self::agent_at_store(agent, store, hierarchy))
                }),
            ),
            (
                "agent",
                Box::new(|agent: &Agent| selection.is_agent_selected(&agent.id)),
            ),
            (
                "department",
                Box::new(|agent: &Agent| {
                    !agent.department.is_empty()
                        && selection.is_department_selected(&agent.office, &agent.department)
                }),
            ),
            (
                "office",
                Box::new(|agent: &Agent| {
                    !agent.office.is_empty() && selection.is_office_selected(&agent.office)
                }),
            ),
        ];

        for (tier, reachable) in tiers.iter() {
            let before = resolved.len();
            for agent in &hierarchy.agents {
                if added.contains(agent.id.as_str()) || !reachable(agent) {
                    continue;
                }
                added.insert(agent.id.as_str());
                resolved.push(agent.clone());
            }
            debug!(tier = *tier, added = resolved.len() - before, "分配对象解析");
        }

        resolved
    }

    /// 按比例分配模式的对象解析
    ///
    /// 以级联后的人员勾选为准；人员无显式记录时继承部门、办公室
    #[instrument(skip_all, fields(roster = hierarchy.agents.len()))]
    pub fn resolve_ratio_targets(
        &self,
        selection: &TargetSelection,
        hierarchy: &OrgHierarchy,
    ) -> Vec<Agent> {
        let resolved: Vec<Agent> = hierarchy
            .agents
            .iter()
            .filter(|agent| {
                selection.effective_agent_selection(&agent.id, &agent.department, &agent.office)
            })
            .cloned()
            .collect();

        debug!(resolved = resolved.len(), "分配对象解析完成");
        resolved
    }

    fn agent_at_store(agent: &Agent, store_key: &str, hierarchy: &OrgHierarchy) -> bool {
        match hierarchy.store(store_key) {
            Some(store) => agent.belongs_to_store(store),
            None => agent.store.as_deref() == Some(store_key),
        }
    }
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::new()
    }
}
