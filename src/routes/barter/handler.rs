use axum::{Json, extract::State};

use super::model::{
    ExchangeRequest, ExchangeResponse, FairnessRequest, FairnessResponse, UploadRatesResponse,
    validate_commodity, validate_quantity,
};
use crate::{
    AppState,
    barter::{BarterCalculator, EquivalencyTable},
    error::AppError,
    utils::{ApiResponse, success_to_api_response},
};

#[axum::debug_handler]
pub async fn exchange(
    State(state): State<AppState>,
    Json(req): Json<ExchangeRequest>,
) -> Result<Json<ApiResponse<ExchangeResponse>>, AppError> {
    let from = validate_commodity("from", &req.from)?;
    let to = validate_commodity("to", &req.to)?;
    let quantity = validate_quantity("quantity", req.quantity)?;

    let equivalent = state
        .calculator()
        .calculate_exchange(from, quantity, to)
        .ok_or_else(|| AppError::UnknownPair {
            from: from.to_string(),
            to: to.to_string(),
        })?;

    Ok(success_to_api_response(ExchangeResponse {
        from: from.to_string(),
        to: to.to_string(),
        quantity,
        equivalent,
    }))
}

#[axum::debug_handler]
pub async fn fairness(
    State(state): State<AppState>,
    Json(req): Json<FairnessRequest>,
) -> Result<Json<ApiResponse<FairnessResponse>>, AppError> {
    let from = validate_commodity("from", &req.from)?;
    let to = validate_commodity("to", &req.to)?;
    let quantity_from = validate_quantity("quantity_from", req.quantity_from)?;
    let quantity_to = validate_quantity("quantity_to", req.quantity_to)?;

    let calculator = state.calculator();
    let expected = calculator.calculate_exchange(from, quantity_from, to);
    let accepted_range = calculator
        .fair_range(from, quantity_from, to)
        .map(|(low, high)| [low, high]);

    Ok(success_to_api_response(FairnessResponse {
        fair: calculator.is_fair(from, quantity_from, to, quantity_to),
        expected,
        accepted_range,
    }))
}

/// 上传新的兑换率表，替换当前表并清除商品相关缓存
#[axum::debug_handler]
pub async fn upload_rates(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ApiResponse<UploadRatesResponse>>, AppError> {
    let table = EquivalencyTable::from_json_str(&body).map_err(|e| {
        tracing::debug!("Rejected rate table upload: {}", e);
        AppError::Validation(e.to_string())
    })?;
    if table.is_empty() {
        return Err(AppError::Validation("兑换率表不能为空".to_string()));
    }

    let (commodities, invalidated) = state.replace_calculator(BarterCalculator::new(table));
    tracing::info!(
        "Replaced barter rate table with {} commodities, invalidated {} cache entries",
        commodities,
        invalidated
    );

    Ok(success_to_api_response(UploadRatesResponse {
        commodities,
        invalidated,
    }))
}
