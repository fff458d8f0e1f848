// ==========================================
// 库存分配引擎 - 分配对象选择
// ==========================================
// 职责: 办公室 / 部门 / 人员 / 门店 四组勾选状态 + 向下级联
// 红线: 上级勾选向下级联；下级勾选不向上传播；同一人员以最后一次写入为准
// 部门键: 办公室/部门；单独的部门名表示所有办公室下的同名部门
// ==========================================

use crate::domain::agent::{department_key, OrgHierarchy};
use crate::domain::types::SelectionLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// TargetSelection - 分配对象勾选状态
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSelection {
    #[serde(default)]
    pub offices: BTreeMap<String, bool>,

    #[serde(default)]
    pub departments: BTreeMap<String, bool>,

    #[serde(default)]
    pub agents: BTreeMap<String, bool>,

    #[serde(default)]
    pub stores: BTreeMap<String, bool>,
}

impl TargetSelection {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================
    // 级联勾选
    // ==========================================

    /// 勾选/取消办公室，级联到其下所有部门与人员
    pub fn set_office(&mut self, name: &str, selected: bool, hierarchy: &OrgHierarchy) {
        self.offices.insert(name.to_string(), selected);

        if let Some(office) = hierarchy.office(name) {
            for department in &office.department_names {
                self.departments
                    .insert(department_key(name, department), selected);
            }
            for agent_id in &office.agent_ids {
                self.agents.insert(agent_id.clone(), selected);
            }
        }
    }

    /// 勾选/取消部门，级联到其下所有人员
    ///
    /// key 为 办公室/部门 时只影响该办公室下的部门
    pub fn set_department(&mut self, key: &str, selected: bool, hierarchy: &OrgHierarchy) {
        self.departments.insert(key.to_string(), selected);

        for department in hierarchy.departments_by_key(key) {
            for agent_id in &department.agent_ids {
                self.agents.insert(agent_id.clone(), selected);
            }
        }
    }

    /// 勾选/取消单个人员（不影响上级）
    pub fn set_agent(&mut self, agent_id: &str, selected: bool) {
        self.agents.insert(agent_id.to_string(), selected);
    }

    /// 勾选/取消门店（门店轴独立，不级联）
    pub fn set_store(&mut self, store: &str, selected: bool) {
        self.stores.insert(store.to_string(), selected);
    }

    /// 在指定层级全选/全不选，向下级联
    pub fn set_all(&mut self, level: SelectionLevel, selected: bool, hierarchy: &OrgHierarchy) {
        match level {
            SelectionLevel::Office => {
                for office in &hierarchy.offices {
                    self.set_office(&office.name, selected, hierarchy);
                }
            }
            SelectionLevel::Department => {
                for department in &hierarchy.departments {
                    self.set_department(&department.key(), selected, hierarchy);
                }
            }
            SelectionLevel::Agent => {
                for agent in &hierarchy.agents {
                    self.set_agent(&agent.id, selected);
                }
            }
            SelectionLevel::Store => {
                for store in &hierarchy.stores {
                    self.set_store(&store.code, selected);
                }
            }
        }
    }

    /// 重置指定层级（等价于全不选）
    pub fn reset(&mut self, level: SelectionLevel, hierarchy: &OrgHierarchy) {
        self.set_all(level, false, hierarchy);
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn is_office_selected(&self, name: &str) -> bool {
        self.offices.get(name).copied().unwrap_or(false)
    }

    /// 部门勾选状态: 办公室/部门 的记录优先，其次是单独的部门名
    pub fn department_selection(&self, office: &str, department: &str) -> Option<bool> {
        self.departments
            .get(&department_key(office, department))
            .or_else(|| self.departments.get(department))
            .copied()
    }

    pub fn is_department_selected(&self, office: &str, department: &str) -> bool {
        self.department_selection(office, department).unwrap_or(false)
    }

    pub fn is_agent_selected(&self, agent_id: &str) -> bool {
        self.agents.get(agent_id).copied().unwrap_or(false)
    }

    pub fn is_store_selected(&self, store: &str) -> bool {
        self.stores.get(store).copied().unwrap_or(false)
    }

    /// 人员的有效勾选状态
    ///
    /// 人员有显式记录时以其为准；否则依次继承部门、办公室的状态
    pub fn effective_agent_selection(
        &self,
        agent_id: &str,
        department: &str,
        office: &str,
    ) -> bool {
        if let Some(selected) = self.agents.get(agent_id) {
            return *selected;
        }
        if let Some(selected) = self.department_selection(office, department) {
            return selected;
        }
        self.is_office_selected(office)
    }

    pub fn selected_stores(&self) -> impl Iterator<Item = &str> {
        self.stores
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(store, _)| store.as_str())
    }

    /// 是否没有任何勾选
    pub fn is_empty(&self) -> bool {
        !self.offices.values().any(|v| *v)
            && !self.departments.values().any(|v| *v)
            && !self.agents.values().any(|v| *v)
            && !self.stores.values().any(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::Agent;

    fn hierarchy() -> OrgHierarchy {
        OrgHierarchy::from_roster(
            vec![
                Agent::new("a1", "A1", "East", "D1", None),
                Agent::new("a2", "A2", "East", "D1", None),
                Agent::new("a3", "A3", "East", "D2", None),
                Agent::new("a4", "A4", "West", "D3", None),
            ],
            vec![],
        )
    }

    #[test]
    fn test_office_cascades_to_departments_and_agents() {
        let h = hierarchy();
        let mut sel = TargetSelection::new();

        sel.set_office("East", true, &h);

        assert!(sel.is_department_selected("East", "D1"));
        assert!(sel.is_department_selected("East", "D2"));
        assert!(sel.is_agent_selected("a1"));
        assert!(sel.is_agent_selected("a3"));
        assert!(!sel.is_agent_selected("a4"));
    }

    #[test]
    fn test_agent_toggle_does_not_propagate_upward() {
        let h = hierarchy();
        let mut sel = TargetSelection::new();

        sel.set_office("East", true, &h);
        sel.set_agent("a1", false);

        assert!(sel.is_office_selected("East"));
        assert!(sel.is_department_selected("East", "D1"));
        assert!(!sel.is_agent_selected("a1"));
        assert!(sel.is_agent_selected("a2"));
    }

    #[test]
    fn test_last_write_wins_for_agent() {
        let h = hierarchy();
        let mut sel = TargetSelection::new();

        sel.set_agent("a1", false);
        sel.set_department("D1", true, &h);
        assert!(sel.is_agent_selected("a1"));

        sel.set_department("D1", false, &h);
        sel.set_agent("a2", true);
        assert!(!sel.is_agent_selected("a1"));
        assert!(sel.is_agent_selected("a2"));
    }

    #[test]
    fn test_select_all_and_reset_cascade_downward_only() {
        let h = hierarchy();
        let mut sel = TargetSelection::new();

        sel.set_all(SelectionLevel::Department, true, &h);
        assert!(h.agents.iter().all(|a| sel.is_agent_selected(&a.id)));
        assert!(!sel.is_office_selected("East"));

        sel.reset(SelectionLevel::Agent, &h);
        assert!(h.agents.iter().all(|a| !sel.is_agent_selected(&a.id)));
        assert!(sel.is_department_selected("East", "D1"));
    }

    #[test]
    fn test_office_cascade_does_not_leak_into_same_named_department() {
        let h = OrgHierarchy::from_roster(
            vec![
                Agent::new("e1", "E1", "East", "D", None),
                Agent::new("w1", "W1", "West", "D", None),
            ],
            vec![],
        );
        let mut sel = TargetSelection::new();

        sel.set_office("East", true, &h);

        assert!(sel.is_department_selected("East", "D"));
        assert!(!sel.is_department_selected("West", "D"));
        assert!(!sel.effective_agent_selection("w1", "D", "West"));

        // 单独的部门名覆盖所有办公室
        sel.set_department("D", true, &h);
        assert!(sel.is_agent_selected("w1"));
    }

    #[test]
    fn test_effective_selection_inherits_when_agent_absent() {
        let mut sel = TargetSelection::new();
        sel.offices.insert("East".to_string(), true);
        sel.departments.insert("D2".to_string(), false);

        assert!(sel.effective_agent_selection("a1", "D1", "East"));
        assert!(!sel.effective_agent_selection("a3", "D2", "East"));

        sel.agents.insert("a3".to_string(), true);
        assert!(sel.effective_agent_selection("a3", "D2", "East"));
    }
}
