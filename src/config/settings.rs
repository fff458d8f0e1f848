// ==========================================
// 库存分配引擎 - 分配设置
// ==========================================
// 职责: 调用方（设置界面）提交的设置对象
// 结构: { priorities, models, targets, ratios }
// ==========================================

use crate::domain::selection::TargetSelection;
use crate::domain::sku::{ModelSetting, SkuCatalog};
use crate::domain::types::ReservationSource;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// 比例总和的容差
const RATIO_SUM_EPSILON: f64 = 1e-6;

/// 设置校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("未配置分配比例")]
    MissingRatios,

    #[error("分配比例之和必须为100: 当前={sum}")]
    RatioSumInvalid { sum: f64 },

    #[error("分配比例无效: {name}={value}")]
    RatioValueInvalid { name: &'static str, value: f64 },
}

// ==========================================
// PrioritySettings - 预约来源开关
// ==========================================
// 界面可能提交开关（true/false）或优先级序号（1/2/3）
// 序号只表示该来源启用；层级顺序固定为 开售接收 → 卖场接收 → 预约网站
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritySettings {
    #[serde(default = "enabled", deserialize_with = "priority_flag")]
    pub on_sale_receipt: bool,

    #[serde(default = "enabled", deserialize_with = "priority_flag")]
    pub yard_receipt: bool,

    #[serde(default = "enabled", deserialize_with = "priority_flag")]
    pub reservation_site: bool,
}

fn enabled() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PriorityValue {
    Flag(bool),
    Rank(f64),
    Missing(()),
}

fn priority_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match PriorityValue::deserialize(deserializer)? {
        PriorityValue::Flag(flag) => flag,
        PriorityValue::Rank(_) => true,
        PriorityValue::Missing(()) => enabled(),
    })
}

impl Default for PrioritySettings {
    fn default() -> Self {
        Self {
            on_sale_receipt: true,
            yard_receipt: true,
            reservation_site: true,
        }
    }
}

impl PrioritySettings {
    pub fn is_enabled(&self, source: ReservationSource) -> bool {
        match source {
            ReservationSource::OnSaleReceipt => self.on_sale_receipt,
            ReservationSource::YardReceipt => self.yard_receipt,
            ReservationSource::ReservationSite => self.reservation_site,
        }
    }
}

// ==========================================
// RatioWeights - 按比例分配的四项权重（百分比）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatioWeights {
    pub turnover_rate: f64,
    pub store_count: f64,
    pub remaining_inventory: f64,
    pub sales_volume: f64,
}

impl RatioWeights {
    pub fn total(&self) -> f64 {
        self.turnover_rate + self.store_count + self.remaining_inventory + self.sales_volume
    }

    /// 校验: 每项非负有限，总和为 100
    pub fn validate(&self) -> Result<(), SettingsError> {
        let named = [
            ("turnoverRate", self.turnover_rate),
            ("storeCount", self.store_count),
            ("remainingInventory", self.remaining_inventory),
            ("salesVolume", self.sales_volume),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError::RatioValueInvalid { name, value });
            }
        }

        let sum = self.total();
        if (sum - 100.0).abs() > RATIO_SUM_EPSILON {
            return Err(SettingsError::RatioSumInvalid { sum });
        }
        Ok(())
    }
}

// ==========================================
// AssignmentSettings - 设置对象
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSettings {
    #[serde(default)]
    pub priorities: PrioritySettings,

    /// skuKey → 机型配置
    #[serde(default)]
    pub models: BTreeMap<String, ModelSetting>,

    #[serde(default)]
    pub targets: TargetSelection,

    /// 按比例分配时必填
    #[serde(default)]
    pub ratios: Option<RatioWeights>,
}

impl AssignmentSettings {
    pub fn sku_catalog(&self) -> SkuCatalog {
        SkuCatalog::from_models(&self.models)
    }

    /// 获取并校验比例
    pub fn validated_ratios(&self) -> Result<RatioWeights, SettingsError> {
        let ratios = self.ratios.ok_or(SettingsError::MissingRatios)?;
        ratios.validate()?;
        Ok(ratios)
    }
}
