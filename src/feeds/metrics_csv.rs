// ==========================================
// 库存分配引擎 - 业务指标 CSV 导入
// ==========================================
// 表头（按名称匹配，大小写不敏感，支持中文表头）:
//   agentId/人员ID, model/机型, color/颜色,
//   turnoverRate/周转率, storeCount/门店数,
//   salesVolume/销量, currentStock/当前库存
// 数值列为空或非法时按 0 处理
// ==========================================

use crate::domain::metrics::AgentSkuMetrics;
use crate::feeds::error::{FeedError, FeedResult};
use std::path::Path;
use tracing::{info, warn};

const AGENT_ID: &[&str] = &["agentid", "agent_id", "contact", "人员id"];
const MODEL: &[&str] = &["model", "机型"];
const COLOR: &[&str] = &["color", "颜色"];
const TURNOVER_RATE: &[&str] = &["turnoverrate", "turnover_rate", "周转率"];
const STORE_COUNT: &[&str] = &["storecount", "store_count", "门店数"];
const SALES_VOLUME: &[&str] = &["salesvolume", "sales_volume", "销量"];
const CURRENT_STOCK: &[&str] = &["currentstock", "current_stock", "当前库存"];

struct Columns {
    agent_id: usize,
    model: usize,
    color: usize,
    turnover_rate: Option<usize>,
    store_count: Option<usize>,
    sales_volume: Option<usize>,
    current_stock: Option<usize>,
}

/// 读取指标 CSV
///
/// # 错误
/// - 文件无法打开/读取
/// - 缺少 人员ID / 机型 / 颜色 列
pub fn load_metrics_csv(path: &Path) -> FeedResult<Vec<AgentSkuMetrics>> {
    let csv_error = |row: usize, message: String| FeedError::Csv {
        path: path.to_path_buf(),
        row,
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(0, e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| csv_error(1, e.to_string()))?
        .clone();
    let columns = resolve_columns(&headers).map_err(|missing| csv_error(1, missing))?;

    let mut rows = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let row_number = row_idx + 2; // 跳过表头
        let record = result.map_err(|e| csv_error(row_number, e.to_string()))?;

        let agent_id = get_string_field(&record, columns.agent_id);
        let model = get_string_field(&record, columns.model);
        let color = get_string_field(&record, columns.color);
        let (Some(agent_id), Some(model), Some(color)) = (agent_id, model, color) else {
            warn!(row = row_number, "指标行缺少人员/机型/颜色，已忽略");
            continue;
        };

        rows.push(AgentSkuMetrics {
            agent_id,
            model,
            color,
            turnover_rate: get_f64_field(&record, columns.turnover_rate),
            store_count: get_f64_field(&record, columns.store_count),
            sales_volume: get_f64_field(&record, columns.sales_volume),
            current_stock: get_f64_field(&record, columns.current_stock),
        });
    }

    info!(path = %path.display(), rows = rows.len(), "指标导入完成");
    Ok(rows)
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<Columns, String> {
    let find = |aliases: &[&str]| {
        headers
            .iter()
            .position(|h| aliases.contains(&h.trim().to_lowercase().as_str()))
    };
    let require = |aliases: &[&str]| find(aliases).ok_or_else(|| format!("缺少列: {}", aliases[0]));

    Ok(Columns {
        agent_id: require(AGENT_ID)?,
        model: require(MODEL)?,
        color: require(COLOR)?,
        turnover_rate: find(TURNOVER_RATE),
        store_count: find(STORE_COUNT),
        sales_volume: find(SALES_VOLUME),
        current_stock: find(CURRENT_STOCK),
    })
}

fn get_string_field(record: &csv::StringRecord, index: usize) -> Option<String> {
    record
        .get(index)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn get_f64_field(record: &csv::StringRecord, index: Option<usize>) -> f64 {
    index
        .and_then(|i| record.get(i))
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_english_headers() {
        let file = write_csv(
            "agentId,model,color,turnoverRate,storeCount,salesVolume,currentStock\n\
             a1,X,Blue,1.5,3,20,4\n\
             a2,X,Blue,,abc,10,\n",
        );

        let rows = load_metrics_csv(file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].agent_id, "a1");
        assert_eq!(rows[0].remaining_inventory(), 16.0);
        assert_eq!(rows[1].turnover_rate, 0.0);
        assert_eq!(rows[1].store_count, 0.0);
        assert_eq!(rows[1].sales_volume, 10.0);
    }

    #[test]
    fn test_load_chinese_headers_and_skip_incomplete_rows() {
        let file = write_csv("人员ID,机型,颜色,销量\na1,X,Blue,5\n,X,Blue,9\n");

        let rows = load_metrics_csv(file.path()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sales_volume, 5.0);
    }

    #[test]
    fn test_missing_required_column() {
        let file = write_csv("agentId,model\na1,X\n");
        let err = load_metrics_csv(file.path()).unwrap_err();
        assert!(matches!(err, FeedError::Csv { row: 1, .. }));
    }
}
