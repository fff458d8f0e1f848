// ==========================================
// AssignmentApi 集成测试
// ==========================================
// 测试目标: 本地 JSON 数据源 → API → 统一响应
// 覆盖范围: 成功/失败响应、设置解析、数据源降级、缓存失效
// ==========================================


use inventory_assign::api::{ApiError, AssignmentApi};
use inventory_assign::config::CacheConfig;
use inventory_assign::domain::Store;
use inventory_assign::engine::AssignmentOrchestrator;
use inventory_assign::feeds::JsonFileFeed;
use std::sync::Arc;
use test_helpers::*;

// ==========================================
// 测试辅助函数
// ==========================================

fn api_for(dir: &std::path::Path) -> AssignmentApi {
    let feed = Arc::new(JsonFileFeed::new(dir));
    let orchestrator = AssignmentOrchestrator::with_clock(feed, CacheConfig::default(), manual_clock());
    AssignmentApi::new(orchestrator)
}

const SETTINGS_JSON: &str = r#"{
    "priorities": { "onSaleReceipt": true, "yardReceipt": true, "reservationSite": true },
    "models": {
        "x_blue_256": { "name": "X", "color": "Blue", "capacity": "256GB", "enabled": true, "quantity": 2 },
        "x_blue_512": { "name": "X", "color": "Blue", "capacity": "512GB", "enabled": true, "quantity": 1 }
    },
    "targets": {
        "offices": {},
        "departments": {},
        "agents": { "A": true, "B": true },
        "stores": {}
    }
}"#;

// ==========================================
// 测试用例
// ==========================================

#[tokio::test]
async fn test_waterfall_from_json_files() {
    let dir = create_data_dir(
        &[
            reservation("C1", "S1", "X", "Blue", "2026-03-01 10:00"),
            reservation("C2", "S2", "X", "Blue", "2026-03-01 10:05"),
        ],
        &[reservation("C3", "S3", "X", "Blue", "2026-03-01 09:00")],
        &[reservation("C4", "S4", "X", "Blue", "2026-03-01 08:00")],
        &[agent("A", "East", "D1", None), agent("B", "East", "D1", None)],
        &[Store {
            code: "S1".to_string(),
            name: "一号店".to_string(),
        }],
    )
    .unwrap();
    let api = api_for(dir.path());
    let settings = AssignmentApi::parse_settings(SETTINGS_JSON).unwrap();

    let response = api.calculate_waterfall(&settings).await;

    assert!(response.success);
    let data = response.data.unwrap();
    // 同一机型颜色不同容量的数量累加为 3
    assert_eq!(data.assignments.len(), 3);
    assert_eq!(data.skipped_items.len(), 1);
    assert!(data.validation.valid);
    assert_eq!(data.settings, settings);
    assert_eq!(data.timestamp, fixed_now());

    let json = serde_json::to_value(&data).unwrap();
    assert!(json.get("skippedItems").is_some());
    assert_eq!(json["assignments"][0]["agentId"], "A");
    assert_eq!(json["assignments"][0]["source"], "onSaleReceipt");
    assert_eq!(json["skippedItems"][0]["reason"], "SKU_CAP_REACHED");
}

#[tokio::test]
async fn test_missing_feed_file_degrades() {
    let dir = create_data_dir(
        &[reservation("C1", "S1", "X", "Blue", "2026-03-01 10:00")],
        &[],
        &[],
        &[agent("A", "East", "D1", None)],
        &[],
    )
    .unwrap();
    std::fs::remove_file(dir.path().join("reservation-data/yard-receipt.json")).unwrap();
    std::fs::remove_file(dir.path().join("stores.json")).unwrap();
    let api = api_for(dir.path());
    let settings = AssignmentApi::parse_settings(SETTINGS_JSON).unwrap();

    let output = api.run_waterfall(&settings).await.unwrap();

    assert_eq!(output.assignments.len(), 1);
    assert_eq!(output.assignments[0].agent_id, "A");
}

#[tokio::test]
async fn test_failure_envelope_carries_message() {
    let dir = create_data_dir(&[], &[], &[], &[agent("A", "East", "D1", None)], &[]).unwrap();
    let api = api_for(dir.path());
    let mut settings = AssignmentApi::parse_settings(SETTINGS_JSON).unwrap();
    settings.targets.agents.clear();

    let response = api.calculate_waterfall(&settings).await;

    assert!(!response.success);
    assert!(response.data.is_none());
    assert_eq!(response.code.as_deref(), Some("VALIDATION_ERROR"));
    assert!(response.error.unwrap().contains("没有可分配的销售人员"));
}

#[tokio::test]
async fn test_empty_queue_reports_invalid_result() {
    let dir = create_data_dir(&[], &[], &[], &[agent("A", "East", "D1", None)], &[]).unwrap();
    let api = api_for(dir.path());
    let settings = AssignmentApi::parse_settings(SETTINGS_JSON).unwrap();

    let output = api.run_waterfall(&settings).await.unwrap();

    assert!(output.assignments.is_empty());
    assert!(!output.validation.valid);
}

#[tokio::test]
async fn test_ratio_without_weights_is_rejected() {
    let dir = create_data_dir(&[], &[], &[], &[agent("A", "East", "D1", None)], &[]).unwrap();
    let api = api_for(dir.path());
    let settings = AssignmentApi::parse_settings(SETTINGS_JSON).unwrap();

    let err = api.run_ratio(&settings, &[]).await.unwrap_err();

    assert!(matches!(err, ApiError::ValidationError(_)));
}

#[test]
fn test_parse_settings_rejects_malformed_json() {
    let err = AssignmentApi::parse_settings("{ not json").unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[tokio::test]
async fn test_structure_and_cache_invalidation() {
    let dir = create_data_dir(
        &[],
        &[],
        &[],
        &[agent("A", "East", "D1", None), agent("B", "West", "D2", Some("S1"))],
        &[Store {
            code: "S1".to_string(),
            name: "一号店".to_string(),
        }],
    )
    .unwrap();
    let api = api_for(dir.path());

    let hierarchy = api.hierarchical_structure().await.unwrap();
    assert_eq!(hierarchy.offices.len(), 2);
    assert_eq!(hierarchy.agents_at_store("一号店").count(), 1);

    assert_eq!(api.cache_stats().unwrap().entries, 1);
    assert_eq!(api.invalidate_cache(None).unwrap(), 1);
    assert_eq!(api.cache_stats().unwrap().entries, 0);
}
