// ==========================================
// 库存分配引擎 - 销售人员与组织结构
// ==========================================
// 职责: Agent / Store 实体 + 办公室→部门→人员 组织树
// 红线: 组织树每次运行由调用方提供，引擎只读
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Agent - 销售人员
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// 唯一联系标识（数据源字段 contact）
    #[serde(rename = "contact", alias = "id")]
    pub id: String,

    /// 显示名称
    pub name: String,

    /// 所属办公室
    #[serde(default)]
    pub office: String,

    /// 所属部门
    #[serde(default)]
    pub department: String,

    /// 所属门店（可选）
    #[serde(default)]
    pub store: Option<String>,
}

impl Agent {
    pub fn new(id: &str, name: &str, office: &str, department: &str, store: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            office: office.to_string(),
            department: department.to_string(),
            store: store.map(|s| s.to_string()),
        }
    }

    /// 是否隶属于指定门店（按门店代码或名称匹配）
    pub fn belongs_to_store(&self, store: &Store) -> bool {
        match self.store.as_deref() {
            Some(s) => s == store.code || s == store.name,
            None => false,
        }
    }
}

// ==========================================
// Store - 门店
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    #[serde(alias = "storeCode")]
    pub code: String,

    #[serde(default, alias = "storeName")]
    pub name: String,
}

/// 部门勾选键中办公室与部门的分隔符
pub const DEPARTMENT_KEY_SEPARATOR: char = '/';

/// 部门勾选键: 办公室/部门；无办公室时为部门名
pub fn department_key(office: &str, department: &str) -> String {
    if office.is_empty() {
        department.to_string()
    } else {
        format!("{}{}{}", office, DEPARTMENT_KEY_SEPARATOR, department)
    }
}

// ==========================================
// OrgNode - 组织节点（办公室 / 部门）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgNode {
    pub name: String,

    /// 所属办公室（仅部门节点使用；不同办公室下的同名部门是不同节点）
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub office: String,

    /// 直属人员ID（按花名册顺序）
    pub agent_ids: Vec<String>,

    /// 下属部门名称（仅办公室节点使用）
    pub department_names: Vec<String>,
}

impl OrgNode {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn department(office: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            office: office.to_string(),
            ..Default::default()
        }
    }

    /// 勾选状态使用的键（部门节点为 办公室/部门）
    pub fn key(&self) -> String {
        department_key(&self.office, &self.name)
    }

    fn push_agent(&mut self, agent_id: &str) {
        if !self.agent_ids.iter().any(|a| a == agent_id) {
            self.agent_ids.push(agent_id.to_string());
        }
    }

    fn push_department(&mut self, department: &str) {
        if !self.department_names.iter().any(|d| d == department) {
            self.department_names.push(department.to_string());
        }
    }
}

// ==========================================
// OrgHierarchy - 组织树
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgHierarchy {
    pub offices: Vec<OrgNode>,
    pub departments: Vec<OrgNode>,

    /// 花名册（保持数据源顺序，作为选择顺序的基准）
    pub agents: Vec<Agent>,
    pub stores: Vec<Store>,
}

impl OrgHierarchy {
    /// 由花名册构建组织树
    ///
    /// # 说明
    /// - 办公室、部门按首次出现的顺序排列
    /// - 重复的人员ID只保留第一条
    pub fn from_roster(agents: Vec<Agent>, stores: Vec<Store>) -> Self {
        let mut hierarchy = OrgHierarchy {
            stores,
            ..Default::default()
        };

        for agent in agents {
            if hierarchy.agents.iter().any(|a| a.id == agent.id) {
                tracing::debug!(agent_id = %agent.id, "重复的人员ID，忽略后续记录");
                continue;
            }

            if !agent.office.is_empty() {
                let office = match hierarchy.offices.iter().position(|o| o.name == agent.office) {
                    Some(idx) => &mut hierarchy.offices[idx],
                    None => {
                        hierarchy.offices.push(OrgNode::named(&agent.office));
                        let last = hierarchy.offices.len() - 1;
                        &mut hierarchy.offices[last]
                    }
                };
                office.push_agent(&agent.id);
                if !agent.department.is_empty() {
                    office.push_department(&agent.department);
                }
            }

            if !agent.department.is_empty() {
                let department = match hierarchy
                    .departments
                    .iter()
                    .position(|d| d.name == agent.department && d.office == agent.office)
                {
                    Some(idx) => &mut hierarchy.departments[idx],
                    None => {
                        hierarchy
                            .departments
                            .push(OrgNode::department(&agent.office, &agent.department));
                        let last = hierarchy.departments.len() - 1;
                        &mut hierarchy.departments[last]
                    }
                };
                department.push_agent(&agent.id);
            }

            hierarchy.agents.push(agent);
        }

        hierarchy
    }

    pub fn office(&self, name: &str) -> Option<&OrgNode> {
        self.offices.iter().find(|o| o.name == name)
    }

    pub fn department(&self, office: &str, name: &str) -> Option<&OrgNode> {
        self.departments
            .iter()
            .find(|d| d.office == office && d.name == name)
    }

    /// 按勾选键查找部门: 办公室/部门 精确匹配，单独的部门名匹配所有同名部门
    pub fn departments_by_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a OrgNode> + 'a {
        self.departments
            .iter()
            .filter(move |d| d.key() == key || (!key.contains(DEPARTMENT_KEY_SEPARATOR) && d.name == key))
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// 查找门店（按代码或名称）
    pub fn store(&self, key: &str) -> Option<&Store> {
        self.stores.iter().find(|s| s.code == key || s.name == key)
    }

    /// 门店下的人员（花名册顺序）
    ///
    /// 门店不在门店列表中时，按代码直接匹配人员的门店字段
    pub fn agents_at_store<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Agent> + 'a {
        let store = self.store(key).cloned();
        self.agents.iter().filter(move |a| match &store {
            Some(s) => a.belongs_to_store(s),
            None => a.store.as_deref() == Some(key),
        })
    }
}
