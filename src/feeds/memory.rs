// ==========================================
// 库存分配引擎 - 内存数据源
// ==========================================
// 用途: 调用方已持有数据时直接注入；测试中可指定某一数据源失败
// ==========================================

use crate::domain::agent::{Agent, Store};
use crate::domain::reservation::ReservationItem;
use crate::domain::types::ReservationSource;
use crate::feeds::error::{FeedError, FeedResult};
use crate::feeds::DataFeed;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// 可单独置为失败的数据源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedSlot {
    Reservations(ReservationSource),
    Agents,
    Stores,
}

#[derive(Debug, Default)]
pub struct StaticFeed {
    reservations: HashMap<ReservationSource, Vec<ReservationItem>>,
    agents: Vec<Agent>,
    stores: Vec<Store>,
    failing: HashSet<FeedSlot>,
    fetches: AtomicUsize,
}

impl StaticFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reservations(mut self, source: ReservationSource, items: Vec<ReservationItem>) -> Self {
        self.reservations.insert(source, items);
        self
    }

    pub fn with_agents(mut self, agents: Vec<Agent>) -> Self {
        self.agents = agents;
        self
    }

    pub fn with_stores(mut self, stores: Vec<Store>) -> Self {
        self.stores = stores;
        self
    }

    /// 指定数据源返回错误
    pub fn failing(mut self, slot: FeedSlot) -> Self {
        self.failing.insert(slot);
        self
    }

    /// 累计取数次数（用于确认缓存命中）
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check(&self, slot: FeedSlot) -> FeedResult<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&slot) {
            return Err(FeedError::Unavailable(format!("{:?}", slot)));
        }
        Ok(())
    }
}

#[async_trait]
impl DataFeed for StaticFeed {
    async fn fetch_reservations(&self, source: ReservationSource) -> FeedResult<Vec<ReservationItem>> {
        self.check(FeedSlot::Reservations(source))?;
        Ok(self
            .reservations
            .get(&source)
            .map(|items| {
                items
                    .iter()
                    .cloned()
                    .map(|item| item.with_source(source))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_agents(&self) -> FeedResult<Vec<Agent>> {
        self.check(FeedSlot::Agents)?;
        Ok(self.agents.clone())
    }

    async fn fetch_stores(&self) -> FeedResult<Vec<Store>> {
        self.check(FeedSlot::Stores)?;
        Ok(self.stores.clone())
    }
}
