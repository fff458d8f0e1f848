// ==========================================
// 库存分配引擎 - 分配校验
// ==========================================
// 职责: 运行前前置条件校验 + 运行后结果校验
// 红线: 结果校验不抛错，返回 { valid, error? }
// ==========================================

use crate::domain::agent::Agent;
use crate::domain::assignment::AssignmentResult;
use crate::domain::sku::SkuCatalog;
use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==========================================
// ValidationOutcome - 结果校验结论
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// 运行前校验: 至少一名可分配人员、至少一个已配置 SKU
pub fn validate_run_preconditions(agents: &[Agent], catalog: &SkuCatalog) -> EngineResult<()> {
    if catalog.is_empty() {
        return Err(EngineError::NoConfiguredSkus);
    }
    if agents.is_empty() {
        return Err(EngineError::NoEligibleAgents);
    }
    Ok(())
}

/// 运行后校验
///
/// - 分配列表不能为空
/// - (人员, 机型, 颜色, 预约号) 不能重复；按比例分配记录无预约号，按 (人员, 机型, 颜色) 判重
pub fn validate_assignment_result(result: &AssignmentResult) -> ValidationOutcome {
    if result.assignments.is_empty() {
        return ValidationOutcome::invalid("分配结果为空");
    }

    let mut seen: HashSet<(&str, &str, &str, &str)> = HashSet::new();
    for record in &result.assignments {
        let tuple = (
            record.agent_id.as_str(),
            record.model.as_str(),
            record.color.as_str(),
            record.reservation_number.as_deref().unwrap_or(""),
        );
        if !seen.insert(tuple) {
            return ValidationOutcome::invalid(format!(
                "存在重复分配: agent={}, sku={}/{}, reservation={}",
                tuple.0, tuple.1, tuple.2, tuple.3
            ));
        }
    }

    ValidationOutcome::ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assignment::AssignmentRecord;
    use crate::domain::sku::{ModelSetting, SkuKey};
    use crate::domain::types::AssignmentMode;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_preconditions() {
        let agent = Agent::new("a", "A", "O", "D", None);
        let mut models = BTreeMap::new();
        models.insert(
            "x".to_string(),
            ModelSetting {
                name: "X".to_string(),
                color: "Blue".to_string(),
                capacity: None,
                enabled: true,
                quantity: 1,
            },
        );
        let catalog = SkuCatalog::from_models(&models);

        assert_eq!(
            validate_run_preconditions(&[agent.clone()], &SkuCatalog::default()),
            Err(EngineError::NoConfiguredSkus)
        );
        assert_eq!(
            validate_run_preconditions(&[], &catalog),
            Err(EngineError::NoEligibleAgents)
        );
        assert!(validate_run_preconditions(&[agent], &catalog).is_ok());
    }

    #[test]
    fn test_empty_result_invalid() {
        let result = AssignmentResult::new(AssignmentMode::Waterfall, vec![], vec![], now());
        let outcome = validate_assignment_result(&result);
        assert!(!outcome.valid);
        assert!(outcome.error.is_some());
    }

    #[test]
    fn test_duplicate_tuple_invalid() {
        let agent = Agent::new("a", "A", "O", "D", None);
        let sku = SkuKey::new("X", "Blue");
        let record = AssignmentRecord::from_ratio(&agent, &sku, 2, now());
        let result = AssignmentResult::new(
            AssignmentMode::Ratio,
            vec![record.clone(), record],
            vec![],
            now(),
        );

        let outcome = validate_assignment_result(&result);
        assert!(!outcome.valid);

        let single = AssignmentResult::new(
            AssignmentMode::Ratio,
            vec![AssignmentRecord::from_ratio(&agent, &sku, 2, now())],
            vec![],
            now(),
        );
        assert_eq!(validate_assignment_result(&single), ValidationOutcome::ok());
    }
}
