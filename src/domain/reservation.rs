// ==========================================
// 库存分配引擎 - 预约记录
// ==========================================
// 职责: 三个预约数据源的统一记录结构 + 接收时间解析
// ==========================================

use crate::domain::sku::SkuKey;
use crate::domain::types::ReservationSource;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// 接收时间无法解析时使用的哨兵值（UNIX 纪元，在同层级内排最前）
pub const RECEIPT_TIME_FALLBACK: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// 无时区的时间格式，按 UTC 解释
const NAIVE_DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

// ==========================================
// ReservationItem - 预约记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationItem {
    pub customer_name: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub store_code: String,

    pub model: String,
    pub color: String,

    /// 原始接收时间（数据源原样保留）
    #[serde(default, deserialize_with = "lenient_string")]
    pub receipt_time: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub reservation_number: String,

    /// 来源层级，由读取的数据源写入
    #[serde(default)]
    pub source: ReservationSource,
}

impl ReservationItem {
    /// 标记来源层级
    pub fn with_source(mut self, source: ReservationSource) -> Self {
        self.source = source;
        self
    }

    /// 去重键: customerName + "_" + storeCode
    pub fn dedup_key(&self) -> String {
        format!("{}_{}", self.customer_name, self.store_code)
    }

    pub fn sku_key(&self) -> SkuKey {
        SkuKey::new(&self.model, &self.color)
    }

    /// 解析接收时间
    pub fn parsed_receipt_time(&self) -> Option<DateTime<Utc>> {
        parse_receipt_time(&self.receipt_time)
    }
}

/// 解析接收时间
///
/// 支持 RFC3339 及常见的 "YYYY-MM-DD HH:MM[:SS]" 格式，纯日期按零点处理
pub fn parse_receipt_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// 数字或字符串均按字符串读取，null 视为空
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_receipt_time_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 1, 10, 5, 0).unwrap();

        assert_eq!(parse_receipt_time("2026-03-01T10:05:00Z"), Some(expected));
        assert_eq!(parse_receipt_time("2026-03-01T19:05:00+09:00"), Some(expected));
        assert_eq!(parse_receipt_time("2026-03-01 10:05:00"), Some(expected));
        assert_eq!(parse_receipt_time("2026-03-01 10:05"), Some(expected));
        assert_eq!(parse_receipt_time("2026/03/01 10:05:00"), Some(expected));
        assert_eq!(
            parse_receipt_time("2026-03-01"),
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_receipt_time_invalid() {
        assert_eq!(parse_receipt_time(""), None);
        assert_eq!(parse_receipt_time("yesterday"), None);
    }

    #[test]
    fn test_deserialize_lenient_fields() {
        let json = r#"{
            "customerName": "C1",
            "storeCode": 1001,
            "model": "X",
            "color": "Blue",
            "receiptTime": null,
            "reservationNumber": 42
        }"#;
        let item: ReservationItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.store_code, "1001");
        assert_eq!(item.receipt_time, "");
        assert_eq!(item.reservation_number, "42");
        assert_eq!(item.source, ReservationSource::ReservationSite);
        assert_eq!(item.dedup_key(), "C1_1001");
    }
}
