// ==========================================
// 库存分配引擎 - 数据源报文结构
// ==========================================
// 预约:  { data: ReservationItem[] }
// 门店:  { stores: Store[] } 或 Store[]
// 人员:  Agent[]
// ==========================================

use crate::domain::agent::Store;
use crate::domain::reservation::ReservationItem;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationEnvelope {
    #[serde(default)]
    pub data: Vec<ReservationItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoresPayload {
    Wrapped { stores: Vec<Store> },
    Bare(Vec<Store>),
}

impl StoresPayload {
    pub fn into_stores(self) -> Vec<Store> {
        match self {
            StoresPayload::Wrapped { stores } => stores,
            StoresPayload::Bare(stores) => stores,
        }
    }
}
