use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Bicycle record in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Bicycle {
    pub id: i64,
    pub model: String,
    pub price: Decimal, // hourly rate, numeric(8,2)
    pub in_rent: bool,
}

/// Admin listing filter.
#[derive(Debug, Clone, Default)]
pub struct BicycleFilter {
    pub in_rent: Option<bool>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}
