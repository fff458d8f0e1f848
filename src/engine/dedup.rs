// ==========================================
// 库存分配引擎 - 预约去重与排序
// ==========================================
// 职责: 三个预约来源 → 一个按优先级/时间排序、去重后的队列
// 去重键: customerName + "_" + storeCode（高优先级来源先写入）
// 排序: 层级严格优先于时间；层1/层2 优先采用预约网站记录的时间
// ==========================================

use crate::config::settings::PrioritySettings;
use crate::domain::reservation::{ReservationItem, RECEIPT_TIME_FALLBACK};
use crate::domain::sku::SkuCatalog;
use crate::domain::types::ReservationSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, warn};

// ==========================================
// ReservationFeeds - 三个来源的原始数据
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservationFeeds {
    pub on_sale: Vec<ReservationItem>,
    pub yard: Vec<ReservationItem>,
    pub site: Vec<ReservationItem>,
}

impl ReservationFeeds {
    pub fn items(&self, source: ReservationSource) -> &[ReservationItem] {
        match source {
            ReservationSource::OnSaleReceipt => &self.on_sale,
            ReservationSource::YardReceipt => &self.yard,
            ReservationSource::ReservationSite => &self.site,
        }
    }

    pub fn total_len(&self) -> usize {
        self.on_sale.len() + self.yard.len() + self.site.len()
    }
}

// ==========================================
// RankedReservation - 队列元素
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedReservation {
    pub item: ReservationItem,

    /// 参与排序的时间
    pub effective_time: DateTime<Utc>,

    /// 是否使用了哨兵时间
    pub time_fallback: bool,
}

// ==========================================
// ReservationDeduplicator - 去重排序器
// ==========================================
pub struct ReservationDeduplicator {
    // 无状态引擎，不需要注入依赖
}

impl ReservationDeduplicator {
    pub fn new() -> Self {
        Self {}
    }

    /// 构建分配队列
    ///
    /// # 参数
    /// - feeds: 三个来源的原始记录
    /// - catalog: 已配置的 SKU（未配置的记录直接过滤）
    /// - priorities: 来源开关，关闭的来源不进入队列
    ///
    /// # 返回
    /// 层1 → 层2 → 层3，层内按有效时间升序（稳定排序）
    #[instrument(skip_all, fields(input = feeds.total_len(), skus = catalog.len()))]
    pub fn build_queue(
        &self,
        feeds: &ReservationFeeds,
        catalog: &SkuCatalog,
        priorities: &PrioritySettings,
    ) -> Vec<RankedReservation> {
        let site_times = Self::site_time_index(&feeds.site);

        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: Vec<RankedReservation> = Vec::new();

        for source in ReservationSource::ALL {
            if !priorities.is_enabled(source) {
                debug!(source = %source, "来源已关闭，跳过");
                continue;
            }

            let mut tier: Vec<RankedReservation> = Vec::new();
            let mut duplicates = 0usize;

            for raw in feeds.items(source) {
                if !catalog.contains(&raw.model, &raw.color) {
                    continue;
                }
                let key = raw.dedup_key();
                if !seen.insert(key.clone()) {
                    duplicates += 1;
                    continue;
                }

                let item = raw.clone().with_source(source);
                let site_time = match source {
                    ReservationSource::ReservationSite => None,
                    _ => site_times.get(&key).copied(),
                };
                let (effective_time, time_fallback) =
                    match site_time.or_else(|| item.parsed_receipt_time()) {
                        Some(t) => (t, false),
                        None => {
                            warn!(
                                source = %source,
                                key = %key,
                                receipt_time = %item.receipt_time,
                                "接收时间无法解析，使用哨兵时间"
                            );
                            (RECEIPT_TIME_FALLBACK, true)
                        }
                    };

                tier.push(RankedReservation {
                    item,
                    effective_time,
                    time_fallback,
                });
            }

            tier.sort_by_key(|r| r.effective_time);
            debug!(
                source = %source,
                accepted = tier.len(),
                duplicates = duplicates,
                "来源去重完成"
            );
            queue.extend(tier);
        }

        queue
    }

    /// 预约网站记录的时间索引（同一键取第一条可解析的时间）
    fn site_time_index(site: &[ReservationItem]) -> HashMap<String, DateTime<Utc>> {
        let mut index = HashMap::new();
        for item in site {
            if let Some(t) = item.parsed_receipt_time() {
                index.entry(item.dedup_key()).or_insert(t);
            }
        }
        index
    }
}

impl Default for ReservationDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::parse_receipt_time;
    use crate::domain::sku::ModelSetting;
    use std::collections::BTreeMap;

    fn item(customer: &str, store: &str, model: &str, time: &str) -> ReservationItem {
        ReservationItem {
            customer_name: customer.to_string(),
            store_code: store.to_string(),
            model: model.to_string(),
            color: "Blue".to_string(),
            receipt_time: time.to_string(),
            reservation_number: format!("R-{}", customer),
            source: ReservationSource::default(),
        }
    }

    fn catalog() -> SkuCatalog {
        let mut models = BTreeMap::new();
        models.insert(
            "x".to_string(),
            ModelSetting {
                name: "X".to_string(),
                color: "Blue".to_string(),
                capacity: None,
                enabled: true,
                quantity: 10,
            },
        );
        SkuCatalog::from_models(&models)
    }

    fn customers(queue: &[RankedReservation]) -> Vec<&str> {
        queue.iter().map(|r| r.item.customer_name.as_str()).collect()
    }

    #[test]
    fn test_highest_tier_wins_duplicate_key() {
        let feeds = ReservationFeeds {
            on_sale: vec![],
            yard: vec![item("C1", "S1", "X", "2026-03-01 10:00")],
            site: vec![
                item("C1", "S1", "X", "2026-03-01 08:00"),
                item("C2", "S1", "X", "2026-03-01 09:00"),
            ],
        };

        let queue = ReservationDeduplicator::new().build_queue(
            &feeds,
            &catalog(),
            &PrioritySettings::default(),
        );

        assert_eq!(customers(&queue), vec!["C1", "C2"]);
        assert_eq!(queue[0].item.source, ReservationSource::YardReceipt);
        assert_eq!(queue[1].item.source, ReservationSource::ReservationSite);
    }

    #[test]
    fn test_site_time_governs_higher_tier_ordering() {
        let feeds = ReservationFeeds {
            on_sale: vec![
                item("C1", "S1", "X", "2026-03-01 08:00"),
                item("C2", "S1", "X", "2026-03-01 09:00"),
            ],
            yard: vec![],
            // C1 的网站预约时间晚于 C2
            site: vec![item("C1", "S1", "X", "2026-03-01 11:00")],
        };

        let queue = ReservationDeduplicator::new().build_queue(
            &feeds,
            &catalog(),
            &PrioritySettings::default(),
        );

        assert_eq!(customers(&queue), vec!["C2", "C1"]);
        assert_eq!(queue[1].item.source, ReservationSource::OnSaleReceipt);
    }

    #[test]
    fn test_site_time_governs_yard_tier_ordering() {
        let feeds = ReservationFeeds {
            on_sale: vec![],
            // 按卖场接收时间 C1 在前
            yard: vec![
                item("C1", "S1", "X", "2026-03-01 08:00"),
                item("C2", "S1", "X", "2026-03-01 09:00"),
            ],
            // 按网站预约时间 C2 在前
            site: vec![
                item("C1", "S1", "X", "2026-03-01 11:00"),
                item("C2", "S1", "X", "2026-03-01 07:00"),
                item("C3", "S1", "X", "2026-03-01 06:00"),
            ],
        };

        let queue = ReservationDeduplicator::new().build_queue(
            &feeds,
            &catalog(),
            &PrioritySettings::default(),
        );

        assert_eq!(customers(&queue), vec!["C2", "C1", "C3"]);
        assert_eq!(queue[0].item.source, ReservationSource::YardReceipt);
        assert_eq!(queue[0].item.receipt_time, "2026-03-01 09:00");
        assert_eq!(
            queue[0].effective_time,
            parse_receipt_time("2026-03-01 07:00").unwrap()
        );
        assert_eq!(queue[2].item.source, ReservationSource::ReservationSite);
    }

    #[test]
    fn test_tier_dominates_time() {
        let feeds = ReservationFeeds {
            on_sale: vec![item("C1", "S1", "X", "2026-03-05 10:00")],
            yard: vec![item("C2", "S2", "X", "2026-03-03 10:00")],
            site: vec![item("C3", "S3", "X", "2026-03-01 10:00")],
        };

        let queue = ReservationDeduplicator::new().build_queue(
            &feeds,
            &catalog(),
            &PrioritySettings::default(),
        );

        assert_eq!(customers(&queue), vec!["C1", "C2", "C3"]);
    }

    #[test]
    fn test_unparsable_time_sorts_first_within_tier() {
        let feeds = ReservationFeeds {
            on_sale: vec![],
            yard: vec![],
            site: vec![
                item("C1", "S1", "X", "2026-03-01 10:00"),
                item("C2", "S1", "X", "not a time"),
            ],
        };

        let queue = ReservationDeduplicator::new().build_queue(
            &feeds,
            &catalog(),
            &PrioritySettings::default(),
        );

        assert_eq!(customers(&queue), vec!["C2", "C1"]);
        assert!(queue[0].time_fallback);
        assert_eq!(queue[0].effective_time, RECEIPT_TIME_FALLBACK);
    }

    #[test]
    fn test_unconfigured_sku_and_disabled_source_filtered() {
        let feeds = ReservationFeeds {
            on_sale: vec![item("C1", "S1", "Y", "2026-03-01 10:00")],
            yard: vec![item("C2", "S1", "X", "2026-03-01 10:00")],
            site: vec![item("C3", "S1", "X", "2026-03-01 10:00")],
        };
        let priorities = PrioritySettings {
            yard_receipt: false,
            ..PrioritySettings::default()
        };

        let queue = ReservationDeduplicator::new().build_queue(&feeds, &catalog(), &priorities);

        assert_eq!(customers(&queue), vec!["C3"]);
    }
}
