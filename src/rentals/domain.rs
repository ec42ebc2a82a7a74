//! Rental state machine and cost calculation.
//!
//! Everything here is pure: repositories lock rows, call into these functions and
//! persist the result inside the same transaction.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use time::OffsetDateTime;

use crate::bicycles::repo_types::Bicycle;
use crate::rentals::repo_types::Rental;

const SECONDS_PER_HOUR: i64 = 3600;
const MICROS_PER_SECOND: i64 = 1_000_000;

/// Largest value `rentals.total_cost` (numeric(10,2)) can hold.
pub fn max_total_cost() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RentalError {
    #[error("This bicycle is already rented.")]
    BicycleInRent,
    #[error("Cannot finish a returned rental.")]
    AlreadyReturned,
    #[error("End time must be greater than start time.")]
    EndNotAfterStart,
    #[error("Rental cost would exceed 99999999.99; choose an earlier end time.")]
    CostOutOfRange,
}

/// Current time truncated to microseconds, the precision Postgres keeps.
pub fn now_micros() -> OffsetDateTime {
    truncate_micros(OffsetDateTime::now_utc())
}

pub fn truncate_micros(t: OffsetDateTime) -> OffsetDateTime {
    let micros = t.microsecond();
    t.replace_microsecond(micros).unwrap_or(t)
}

/// Cost of riding `bicycle_price` per hour from `start` to `end`.
///
/// Elapsed time is billed per microsecond and the result is rounded to cents,
/// half away from zero. A non-positive interval costs nothing. Costs above
/// [`max_total_cost`] are refused.
pub fn compute_cost(
    price: Decimal,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<Decimal, RentalError> {
    let elapsed = end - start;
    if elapsed.is_negative() || elapsed.is_zero() {
        return Ok(to_cents(Decimal::ZERO));
    }
    let micros = Decimal::from_i128_with_scale(elapsed.whole_microseconds(), 0);
    let per_hour = Decimal::from(SECONDS_PER_HOUR * MICROS_PER_SECOND);
    let cost = micros
        .checked_mul(price)
        .and_then(|v| v.checked_div(per_hour))
        .map(to_cents)
        .ok_or(RentalError::CostOutOfRange)?;
    if cost > max_total_cost() {
        return Err(RentalError::CostOutOfRange);
    }
    Ok(cost)
}

/// Rounds half away from zero and pins the scale to two places.
pub fn to_cents(value: Decimal) -> Decimal {
    let mut cents = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    cents.rescale(2);
    cents
}

pub fn ensure_available(bicycle: &Bicycle) -> Result<(), RentalError> {
    if bicycle.in_rent {
        return Err(RentalError::BicycleInRent);
    }
    Ok(())
}

/// Moves an open rental to CLOSED and releases its bicycle.
///
/// `end` defaults to now. Both values are modified only when every check passes.
pub fn close(
    rental: &mut Rental,
    bicycle: &mut Bicycle,
    end: Option<OffsetDateTime>,
) -> Result<(), RentalError> {
    if rental.is_returned {
        return Err(RentalError::AlreadyReturned);
    }
    let end = truncate_micros(end.unwrap_or_else(now_micros));
    if end <= rental.start_time {
        return Err(RentalError::EndNotAfterStart);
    }

    let cost = compute_cost(bicycle.price, rental.start_time, end)?;

    rental.end_time = Some(end);
    rental.total_cost = cost;
    rental.is_returned = true;
    bicycle.in_rent = false;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;
    use uuid::Uuid;

    fn price(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn cost_of(p: Decimal, start: OffsetDateTime, end: OffsetDateTime) -> Decimal {
        compute_cost(p, start, end).unwrap()
    }

    fn bicycle(p: &str, in_rent: bool) -> Bicycle {
        Bicycle {
            id: 1,
            model: "Trek FX 3".into(),
            price: price(p),
            in_rent,
        }
    }

    fn open_rental(start: OffsetDateTime) -> Rental {
        Rental {
            id: 1,
            bicycle_id: 1,
            renter_id: Uuid::new_v4(),
            start_time: start,
            end_time: None,
            total_cost: Decimal::ZERO,
            is_returned: false,
        }
    }

    #[test]
    fn one_hour_costs_the_hourly_price() {
        let start = datetime!(2024-05-01 10:00 UTC);
        let cost = cost_of(price("10.00"), start, start + Duration::hours(1));
        assert_eq!(cost, price("10.00"));
    }

    #[test]
    fn partial_hours_are_billed_per_second() {
        let start = datetime!(2024-05-01 10:00 UTC);
        // 90 minutes at 599.99/h = 899.985 -> 899.99
        let cost = cost_of(price("599.99"), start, start + Duration::minutes(90));
        assert_eq!(cost, price("899.99"));
        // 1 second at 10.00/h = 0.00277.. -> 0.00
        let cost = cost_of(price("10.00"), start, start + Duration::seconds(1));
        assert_eq!(cost, price("0.00"));
    }

    #[test]
    fn midpoint_rounds_away_from_zero() {
        let start = datetime!(2024-05-01 10:00 UTC);
        // 18 seconds at 1.00/h = 0.005 exactly
        let cost = cost_of(price("1.00"), start, start + Duration::seconds(18));
        assert_eq!(cost, price("0.01"));
        // 54 seconds at 1.00/h = 0.015 exactly
        let cost = cost_of(price("1.00"), start, start + Duration::seconds(54));
        assert_eq!(cost, price("0.02"));
    }

    #[test]
    fn cost_is_monotonic_in_duration_and_price() {
        let start = datetime!(2024-05-01 10:00 UTC);
        let mut last = Decimal::ZERO;
        for minutes in [0, 1, 7, 30, 61, 600, 6000] {
            let c = cost_of(price("3.33"), start, start + Duration::minutes(minutes));
            assert!(c >= last, "{c} < {last} at {minutes}m");
            last = c;
        }

        let end = start + Duration::hours(2);
        let cheap = cost_of(price("4.99"), start, end);
        let pricey = cost_of(price("5.00"), start, end);
        assert!(pricey > cheap);
    }

    #[test]
    fn costs_always_carry_two_decimals() {
        let start = datetime!(2024-05-01 10:00 UTC);
        let cost = cost_of(price("10"), start, start + Duration::hours(2));
        assert_eq!(cost.to_string(), "20.00");
        assert_eq!(cost_of(price("10"), start, start).to_string(), "0.00");
    }

    #[test]
    fn empty_or_inverted_interval_is_free() {
        let start = datetime!(2024-05-01 10:00 UTC);
        assert_eq!(cost_of(price("10.00"), start, start), Decimal::ZERO);
        assert_eq!(
            cost_of(price("10.00"), start, start - Duration::hours(1)),
            Decimal::ZERO
        );
    }

    #[test]
    fn close_sets_end_cost_and_releases_bicycle() {
        let start = datetime!(2024-05-01 10:00 UTC);
        let mut rental = open_rental(start);
        let mut bike = bicycle("10.00", true);

        close(&mut rental, &mut bike, Some(start + Duration::hours(3))).unwrap();

        assert!(rental.is_returned);
        assert_eq!(rental.end_time, Some(start + Duration::hours(3)));
        assert_eq!(rental.total_cost, price("30.00"));
        assert!(!bike.in_rent);
    }

    #[test]
    fn close_defaults_end_to_now() {
        let start = now_micros() - Duration::minutes(30);
        let mut rental = open_rental(start);
        let mut bike = bicycle("2.00", true);

        close(&mut rental, &mut bike, None).unwrap();

        let end = rental.end_time.unwrap();
        assert!(end > start);
        assert_eq!(end.nanosecond() % 1_000, 0);
        assert!(rental.total_cost >= price("1.00"));
    }

    #[test]
    fn close_twice_fails_without_changes() {
        let start = datetime!(2024-05-01 10:00 UTC);
        let mut rental = open_rental(start);
        let mut bike = bicycle("10.00", true);
        close(&mut rental, &mut bike, Some(start + Duration::hours(1))).unwrap();

        let before = rental.clone();
        bike.in_rent = true;
        let err = close(&mut rental, &mut bike, Some(start + Duration::hours(5))).unwrap_err();

        assert_eq!(err, RentalError::AlreadyReturned);
        assert_eq!(rental, before);
        assert!(bike.in_rent);
    }

    #[test]
    fn close_rejects_end_not_after_start() {
        let start = datetime!(2024-05-01 10:00 UTC);
        let mut rental = open_rental(start);
        let mut bike = bicycle("10.00", true);

        for end in [start, start - Duration::hours(1)] {
            let err = close(&mut rental, &mut bike, Some(end)).unwrap_err();
            assert_eq!(err, RentalError::EndNotAfterStart);
        }
        assert!(!rental.is_returned);
        assert!(rental.end_time.is_none());
        assert!(bike.in_rent);
    }

    #[test]
    fn rented_bicycle_is_unavailable() {
        assert!(ensure_available(&bicycle("1.00", false)).is_ok());
        assert_eq!(
            ensure_available(&bicycle("1.00", true)),
            Err(RentalError::BicycleInRent)
        );
    }

    #[test]
    fn cost_ceiling_is_the_column_maximum() {
        let start = datetime!(2024-05-01 10:00 UTC);
        let top = price("999999.99");
        assert_eq!(cost_of(top, start, start + Duration::hours(100)), price("99999999.00"));
        assert_eq!(
            compute_cost(top, start, start + Duration::hours(101)),
            Err(RentalError::CostOutOfRange)
        );
        // far-future end at the cheapest price
        assert_eq!(
            compute_cost(price("0.01"), start, datetime!(9999-12-31 23:59 UTC)),
            Ok(price("699132.62"))
        );
        assert_eq!(
            compute_cost(top, start, datetime!(9999-12-31 23:59 UTC)),
            Err(RentalError::CostOutOfRange)
        );
    }

    #[test]
    fn close_refuses_unstorable_cost_without_changes() {
        let start = datetime!(2024-05-01 10:00 UTC);
        let mut rental = open_rental(start);
        let mut bike = bicycle("999999.99", true);

        let err = close(&mut rental, &mut bike, Some(start + Duration::hours(101))).unwrap_err();
        assert_eq!(err, RentalError::CostOutOfRange);
        assert!(!rental.is_returned);
        assert!(rental.end_time.is_none());
        assert!(bike.in_rent);

        close(&mut rental, &mut bike, Some(start + Duration::hours(99))).unwrap();
        assert_eq!(rental.total_cost, price("98999999.01"));
    }
}
