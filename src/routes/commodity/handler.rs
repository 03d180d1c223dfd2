use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::Value;

use super::model::{CommodityListResponse, CommodityRatesResponse};
use crate::{
    AppState,
    cache::keys::{commodity_list_key, commodity_rates_key},
    error::AppError,
    utils::{ApiResponse, success_to_api_response},
};

fn to_value<T: serde::Serialize>(data: &T) -> Result<Value, AppError> {
    serde_json::to_value(data).map_err(|e| {
        tracing::error!("Failed to serialize commodity response: {}", e);
        AppError::InternalServerError
    })
}

#[axum::debug_handler]
pub async fn list_commodities(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let data = state.cached_with_calculator(&commodity_list_key(), |calculator| {
        to_value(&CommodityListResponse {
            commodities: calculator.commodities().into_iter().map(String::from).collect(),
            rates: calculator.table().clone(),
        })
    })?;

    Ok(success_to_api_response(data))
}

#[axum::debug_handler]
pub async fn commodity_rates(
    State(state): State<AppState>,
    Path(commodity): Path<String>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let data = state.cached_with_calculator(&commodity_rates_key(&commodity), |calculator| {
        let rates = calculator
            .table()
            .rates_from(&commodity)
            .ok_or_else(|| AppError::UnknownCommodity(commodity.clone()))?;

        to_value(&CommodityRatesResponse {
            commodity: commodity.clone(),
            rates: rates
                .into_iter()
                .map(|(name, rate)| (name.to_string(), rate))
                .collect(),
        })
    })?;

    Ok(success_to_api_response(data))
}
