use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::rentals::repo_types::Rental;

#[derive(Debug, Deserialize)]
pub struct CreateRentalRequest {
    pub bicycle: i64,
}

/// Close payload. An absent `end_time` means "now".
#[derive(Debug, Default, Deserialize)]
pub struct CloseRentalRequest {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalView {
    pub bicycle: i64,
    pub renter: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub total_cost: Decimal,
}

impl From<Rental> for RentalView {
    fn from(r: Rental) -> Self {
        Self {
            bicycle: r.bicycle_id,
            renter: r.renter_id,
            start_time: r.start_time,
            end_time: r.end_time,
            total_cost: r.total_cost,
        }
    }
}

/// Admin listing row; carries the id and state the public view leaves out.
#[derive(Debug, Serialize)]
pub struct AdminRentalView {
    pub id: i64,
    #[serde(flatten)]
    pub rental: RentalView,
    pub is_returned: bool,
}

impl From<Rental> for AdminRentalView {
    fn from(r: Rental) -> Self {
        Self {
            id: r.id,
            is_returned: r.is_returned,
            rental: r.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminRentalQuery {
    pub bicycle: Option<i64>,
    pub renter: Option<Uuid>,
    pub is_returned: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
