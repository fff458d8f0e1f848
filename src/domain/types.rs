// ==========================================
// 库存分配引擎 - 领域类型定义
// ==========================================
// 职责: 预约来源层级、分配方式、跳过原因等枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 预约来源层级 (Reservation Source Tier)
// ==========================================
// 数字越小优先级越高
// 未标记来源时按最低层级处理
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReservationSource {
    OnSaleReceipt,   // 1: 开售接收
    YardReceipt,     // 2: 卖场接收
    #[default]
    ReservationSite, // 3: 预约网站
}

impl ReservationSource {
    /// 全部来源（按优先级从高到低）
    pub const ALL: [ReservationSource; 3] = [
        ReservationSource::OnSaleReceipt,
        ReservationSource::YardReceipt,
        ReservationSource::ReservationSite,
    ];

    /// 层级编号（1 最高）
    pub fn tier(&self) -> u8 {
        match self {
            ReservationSource::OnSaleReceipt => 1,
            ReservationSource::YardReceipt => 2,
            ReservationSource::ReservationSite => 3,
        }
    }

    /// 配置/汇总中使用的键名
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationSource::OnSaleReceipt => "onSaleReceipt",
            ReservationSource::YardReceipt => "yardReceipt",
            ReservationSource::ReservationSite => "reservationSite",
        }
    }

    /// 数据源路径（相对 API 根）
    pub fn feed_path(&self) -> &'static str {
        match self {
            ReservationSource::OnSaleReceipt => "reservation-data/on-sale-receipt",
            ReservationSource::YardReceipt => "reservation-data/yard-receipt",
            ReservationSource::ReservationSite => "reservation-data/reservation-site",
        }
    }
}

impl fmt::Display for ReservationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 分配方式 (Assignment Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssignmentMode {
    Ratio,     // 按比例分配
    Waterfall, // 按预约优先级逐台分配
}

impl fmt::Display for AssignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentMode::Ratio => write!(f, "ratio"),
            AssignmentMode::Waterfall => write!(f, "waterfall"),
        }
    }
}

// ==========================================
// 跳过原因 (Skip Reason)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    SkuNotConfigured, // 机型/颜色未配置或未启用
    SkuCapReached,    // 该 SKU 已分配满
    NoEligibleAgents, // 没有可分配的销售人员
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SkuNotConfigured => write!(f, "SKU_NOT_CONFIGURED"),
            SkipReason::SkuCapReached => write!(f, "SKU_CAP_REACHED"),
            SkipReason::NoEligibleAgents => write!(f, "NO_ELIGIBLE_AGENTS"),
        }
    }
}

// ==========================================
// 选择层级 (Selection Level)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionLevel {
    Office,
    Department,
    Agent,
    Store,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_tier_order() {
        let tiers: Vec<u8> = ReservationSource::ALL.iter().map(|s| s.tier()).collect();
        assert_eq!(tiers, vec![1, 2, 3]);
        assert!(ReservationSource::OnSaleReceipt < ReservationSource::ReservationSite);
    }

    #[test]
    fn test_source_serde_name() {
        let json = serde_json::to_string(&ReservationSource::YardReceipt).unwrap();
        assert_eq!(json, "\"yardReceipt\"");
    }
}
