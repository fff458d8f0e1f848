// ==========================================
// 库存分配引擎 - 本地 JSON 文件数据源
// ==========================================
// 文件布局（与接口路径一致）:
//   {data_dir}/reservation-data/on-sale-receipt.json
//   {data_dir}/reservation-data/yard-receipt.json
//   {data_dir}/reservation-data/reservation-site.json
//   {data_dir}/agents.json
//   {data_dir}/stores.json
// ==========================================

use crate::domain::agent::{Agent, Store};
use crate::domain::reservation::ReservationItem;
use crate::domain::types::ReservationSource;
use crate::feeds::error::{FeedError, FeedResult};
use crate::feeds::payload::{ReservationEnvelope, StoresPayload};
use crate::feeds::DataFeed;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

pub const AGENTS_FILE: &str = "agents.json";
pub const STORES_FILE: &str = "stores.json";

#[derive(Debug, Clone)]
pub struct JsonFileFeed {
    data_dir: PathBuf,
}

impl JsonFileFeed {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// 某一来源的文件路径
    pub fn reservation_path(&self, source: ReservationSource) -> PathBuf {
        self.data_dir.join(format!("{}.json", source.feed_path()))
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> FeedResult<T> {
        let bytes = tokio::fs::read(path).await.map_err(|source| FeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| FeedError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[async_trait]
impl DataFeed for JsonFileFeed {
    #[instrument(skip(self), fields(dir = %self.data_dir.display()))]
    async fn fetch_reservations(&self, source: ReservationSource) -> FeedResult<Vec<ReservationItem>> {
        let path = self.reservation_path(source);
        let envelope: ReservationEnvelope = Self::read_json(&path).await?;
        debug!(source = %source, count = envelope.data.len(), "读取预约数据");

        Ok(envelope
            .data
            .into_iter()
            .map(|item| item.with_source(source))
            .collect())
    }

    #[instrument(skip(self), fields(dir = %self.data_dir.display()))]
    async fn fetch_agents(&self) -> FeedResult<Vec<Agent>> {
        let agents: Vec<Agent> = Self::read_json(&self.data_dir.join(AGENTS_FILE)).await?;
        debug!(count = agents.len(), "读取人员花名册");
        Ok(agents)
    }

    #[instrument(skip(self), fields(dir = %self.data_dir.display()))]
    async fn fetch_stores(&self) -> FeedResult<Vec<Store>> {
        let payload: StoresPayload = Self::read_json(&self.data_dir.join(STORES_FILE)).await?;
        let stores = payload.into_stores();
        debug!(count = stores.len(), "读取门店列表");
        Ok(stores)
    }
}
