mod handler;
mod model;

pub use handler::{commodity_rates, list_commodities};
pub use model::{CommodityListResponse, CommodityRatesResponse};
