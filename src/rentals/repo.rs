use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::bicycles::repo_types::Bicycle;
use crate::rentals::domain::{self, RentalError};
use crate::rentals::repo_types::{Rental, RentalFilter};
use crate::store::{is_unique_violation, StoreError};

#[async_trait]
pub trait RentalRepo: Send + Sync {
    /// Marks the bicycle rented and records a new open rental, atomically.
    async fn open(
        &self,
        bicycle_id: i64,
        renter_id: Uuid,
        start: OffsetDateTime,
    ) -> Result<Rental, StoreError>;

    /// Closes an open rental (`end` defaults to now) and releases its bicycle,
    /// atomically.
    async fn close(&self, rental_id: i64, end: Option<OffsetDateTime>)
        -> Result<Rental, StoreError>;

    async fn find(&self, id: i64) -> Result<Option<Rental>, StoreError>;
    /// Newest first.
    async fn list_by_renter(&self, renter_id: Uuid) -> Result<Vec<Rental>, StoreError>;
    async fn list(&self, filter: &RentalFilter) -> Result<Vec<Rental>, StoreError>;
}

#[derive(Clone)]
pub struct PgRentals {
    db: PgPool,
}

impl PgRentals {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

// Row locks are always taken bicycle first, then rental.
async fn lock_bicycle_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<Bicycle>, StoreError> {
    let row = sqlx::query_as::<_, Bicycle>(
        r#"
        SELECT id, model, price, in_rent
          FROM bicycles
         WHERE id = $1
           FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

async fn lock_rental_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<Rental>, StoreError> {
    let row = sqlx::query_as::<_, Rental>(
        r#"
        SELECT id, bicycle_id, renter_id, start_time, end_time, total_cost, is_returned
          FROM rentals
         WHERE id = $1
           FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

async fn write_in_rent_tx(
    tx: &mut Transaction<'_, Postgres>,
    bicycle_id: i64,
    in_rent: bool,
) -> Result<(), StoreError> {
    sqlx::query(r#"UPDATE bicycles SET in_rent = $2 WHERE id = $1"#)
        .bind(bicycle_id)
        .bind(in_rent)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl RentalRepo for PgRentals {
    async fn open(
        &self,
        bicycle_id: i64,
        renter_id: Uuid,
        start: OffsetDateTime,
    ) -> Result<Rental, StoreError> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let bicycle = lock_bicycle_tx(&mut tx, bicycle_id)
            .await?
            .ok_or(StoreError::UnknownBicycle(bicycle_id))?;
        domain::ensure_available(&bicycle)?;

        write_in_rent_tx(&mut tx, bicycle_id, true).await?;
        let inserted = sqlx::query_as::<_, Rental>(
            r#"
            INSERT INTO rentals (bicycle_id, renter_id, start_time)
            VALUES ($1, $2, $3)
            RETURNING id, bicycle_id, renter_id, start_time, end_time, total_cost, is_returned
            "#,
        )
        .bind(bicycle_id)
        .bind(renter_id)
        .bind(start)
        .fetch_one(&mut *tx)
        .await;

        let rental = match inserted {
            Ok(r) => r,
            // rentals_one_open_per_bicycle
            Err(e) if is_unique_violation(&e) => return Err(RentalError::BicycleInRent.into()),
            Err(e) => return Err(e.into()),
        };

        tx.commit().await.context("commit tx")?;
        debug!(rental_id = rental.id, bicycle_id, "rental row inserted");
        Ok(rental)
    }

    async fn close(
        &self,
        rental_id: i64,
        end: Option<OffsetDateTime>,
    ) -> Result<Rental, StoreError> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let bicycle_id: i64 =
            sqlx::query_scalar(r#"SELECT bicycle_id FROM rentals WHERE id = $1"#)
                .bind(rental_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::NotFound("Rental"))?;

        let mut bicycle = lock_bicycle_tx(&mut tx, bicycle_id)
            .await?
            .ok_or(StoreError::NotFound("Bicycle"))?;
        let mut rental = lock_rental_tx(&mut tx, rental_id)
            .await?
            .ok_or(StoreError::NotFound("Rental"))?;

        domain::close(&mut rental, &mut bicycle, end)?;

        sqlx::query(
            r#"
            UPDATE rentals
               SET end_time = $2, total_cost = $3, is_returned = $4
             WHERE id = $1
            "#,
        )
        .bind(rental.id)
        .bind(rental.end_time)
        .bind(rental.total_cost)
        .bind(rental.is_returned)
        .execute(&mut *tx)
        .await?;
        write_in_rent_tx(&mut tx, bicycle.id, bicycle.in_rent).await?;

        tx.commit().await.context("commit tx")?;
        Ok(rental)
    }

    async fn find(&self, id: i64) -> Result<Option<Rental>, StoreError> {
        let row = sqlx::query_as::<_, Rental>(
            r#"
            SELECT id, bicycle_id, renter_id, start_time, end_time, total_cost, is_returned
              FROM rentals
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_by_renter(&self, renter_id: Uuid) -> Result<Vec<Rental>, StoreError> {
        let rows = sqlx::query_as::<_, Rental>(
            r#"
            SELECT id, bicycle_id, renter_id, start_time, end_time, total_cost, is_returned
              FROM rentals
             WHERE renter_id = $1
             ORDER BY start_time DESC, id DESC
            "#,
        )
        .bind(renter_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list(&self, filter: &RentalFilter) -> Result<Vec<Rental>, StoreError> {
        let rows = sqlx::query_as::<_, Rental>(
            r#"
            SELECT id, bicycle_id, renter_id, start_time, end_time, total_cost, is_returned
              FROM rentals
             WHERE ($1::bigint IS NULL OR bicycle_id = $1)
               AND ($2::uuid IS NULL OR renter_id = $2)
               AND ($3::bool IS NULL OR is_returned = $3)
             ORDER BY start_time DESC, id DESC
             LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.bicycle_id)
        .bind(filter.renter_id)
        .bind(filter.is_returned)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
