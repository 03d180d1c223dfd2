use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub from: String,
    pub quantity: f64,
    pub to: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExchangeResponse {
    pub from: String,
    pub to: String,
    pub quantity: f64,
    pub equivalent: f64,
}

#[derive(Debug, Deserialize)]
pub struct FairnessRequest {
    pub from: String,
    pub quantity_from: f64,
    pub to: String,
    pub quantity_to: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FairnessResponse {
    pub fair: bool,
    /// 按兑换率计算出的期望数量，无法计算时为空
    pub expected: Option<f64>,
    /// 可接受的数量区间 `[min, max]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_range: Option<[f64; 2]>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadRatesResponse {
    pub commodities: usize,
    /// 被清除的缓存条目数
    pub invalidated: usize,
}

/// 数量必须是非负有限数
pub(crate) fn validate_quantity(field: &str, quantity: f64) -> Result<f64, AppError> {
    if quantity.is_finite() && quantity >= 0.0 {
        Ok(quantity)
    } else {
        Err(AppError::Validation(format!("{} 必须是非负数", field)))
    }
}

pub(crate) fn validate_commodity<'a>(field: &str, name: &'a str) -> Result<&'a str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        Err(AppError::Validation(format!("{} 不能为空", field)))
    } else {
        Ok(name)
    }
}
