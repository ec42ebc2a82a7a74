use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::bicycles::repo_types::Bicycle;
use crate::error::ApiError;

const MAX_MODEL_LEN: usize = 100;

#[derive(Debug, Serialize)]
pub struct BicycleView {
    pub id: i64,
    pub model: String,
    pub price: Decimal,
    pub in_rent: bool,
}

impl From<Bicycle> for BicycleView {
    fn from(b: Bicycle) -> Self {
        Self {
            id: b.id,
            model: b.model,
            price: b.price,
            in_rent: b.in_rent,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBicycleRequest {
    pub model: String,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePriceRequest {
    pub price: Decimal,
}

/// Bulk availability override.
#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub ids: Vec<i64>,
    pub in_rent: bool,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub updated: u64,
}

#[derive(Debug, Deserialize)]
pub struct AdminBicycleQuery {
    pub in_rent: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub fn validate_model(raw: &str) -> Result<String, ApiError> {
    let model = raw.trim();
    if model.is_empty() {
        return Err(ApiError::validation("model", "This field may not be blank."));
    }
    if model.chars().count() > MAX_MODEL_LEN {
        return Err(ApiError::validation(
            "model",
            format!("Ensure this field has no more than {MAX_MODEL_LEN} characters."),
        ));
    }
    Ok(model.to_string())
}

/// Hourly price: at least 0.01, at most two decimal places, fits numeric(8,2).
pub fn validate_price(price: Decimal) -> Result<Decimal, ApiError> {
    let min = Decimal::new(1, 2);
    // numeric(8,2) upper bound
    let max = Decimal::new(99_999_999, 2);
    if price < min {
        return Err(ApiError::validation(
            "price",
            "Ensure this value is greater than or equal to 0.01.",
        ));
    }
    if price.normalize().scale() > 2 {
        return Err(ApiError::validation(
            "price",
            "Ensure that there are no more than 2 decimal places.",
        ));
    }
    if price > max {
        return Err(ApiError::validation(
            "price",
            "Ensure that there are no more than 8 digits in total.",
        ));
    }
    let mut price = price;
    price.rescale(2);
    Ok(price)
}
