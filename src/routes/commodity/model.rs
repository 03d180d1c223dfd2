use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::barter::EquivalencyTable;

#[derive(Debug, Serialize, Deserialize)]
pub struct CommodityListResponse {
    pub commodities: Vec<String>,
    pub rates: EquivalencyTable,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommodityRatesResponse {
    pub commodity: String,
    /// 直接登记的兑换率
    pub rates: BTreeMap<String, f64>,
}
