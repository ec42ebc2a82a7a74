use rust_decimal::Decimal;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Rental record in the database.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Rental {
    pub id: i64,
    pub bicycle_id: i64,
    pub renter_id: Uuid,
    pub start_time: OffsetDateTime,
    pub end_time: Option<OffsetDateTime>, // null while open
    pub total_cost: Decimal,
    pub is_returned: bool,
}

/// Admin listing filter.
#[derive(Debug, Clone, Default)]
pub struct RentalFilter {
    pub bicycle_id: Option<i64>,
    pub renter_id: Option<Uuid>,
    pub is_returned: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}
