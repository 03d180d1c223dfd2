mod handler;
mod model;

pub use handler::{exchange, fairness, upload_rates};
pub use model::{ExchangeResponse, FairnessResponse, UploadRatesResponse};
