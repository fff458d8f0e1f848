// ==========================================
// 库存分配引擎 - SKU（机型 + 颜色）
// ==========================================
// 职责: SKU 键、机型配置项、已配置 SKU 目录
// 红线: 目录外的 SKU 不参与任何分配
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// SkuKey - (机型, 颜色)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SkuKey {
    pub model: String,
    pub color: String,
}

impl SkuKey {
    pub fn new(model: &str, color: &str) -> Self {
        Self {
            model: model.to_string(),
            color: color.to_string(),
        }
    }
}

impl fmt::Display for SkuKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model, self.color)
    }
}

// ==========================================
// ModelSetting - 机型配置项（设置对象 models.* 的值）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSetting {
    /// 机型名称
    pub name: String,

    /// 颜色
    pub color: String,

    /// 存储容量（仅展示，不参与匹配）
    #[serde(default)]
    pub capacity: Option<String>,

    /// 是否启用
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// 目标分配数量
    #[serde(default)]
    pub quantity: u32,
}

fn default_enabled() -> bool {
    true
}

impl ModelSetting {
    pub fn sku_key(&self) -> SkuKey {
        SkuKey::new(&self.name, &self.color)
    }
}

// ==========================================
// SkuCatalog - 已配置 SKU 目录
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkuCatalog {
    quantities: BTreeMap<SkuKey, u32>,
}

impl SkuCatalog {
    /// 由设置中的 models 构建目录
    ///
    /// # 说明
    /// - 未启用的机型不进入目录
    /// - 同一 (机型, 颜色) 出现多次（不同容量）时数量累加
    pub fn from_models(models: &BTreeMap<String, ModelSetting>) -> Self {
        let mut quantities: BTreeMap<SkuKey, u32> = BTreeMap::new();
        for setting in models.values().filter(|m| m.enabled) {
            let entry = quantities.entry(setting.sku_key()).or_insert(0);
            *entry = entry.saturating_add(setting.quantity);
        }
        Self { quantities }
    }

    /// 配置数量；未配置返回 None
    pub fn quantity(&self, key: &SkuKey) -> Option<u32> {
        self.quantities.get(key).copied()
    }

    pub fn quantity_of(&self, model: &str, color: &str) -> Option<u32> {
        self.quantity(&SkuKey::new(model, color))
    }

    pub fn contains(&self, model: &str, color: &str) -> bool {
        self.quantity_of(model, color).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SkuKey, u32)> {
        self.quantities.iter().map(|(k, q)| (k, *q))
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// 所有 SKU 目标数量之和
    pub fn total_quantity(&self) -> u64 {
        self.quantities.values().map(|q| *q as u64).sum()
    }
}
