use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::bicycles::repo_types::{Bicycle, BicycleFilter};
use crate::store::StoreError;

#[async_trait]
pub trait BicycleRepo: Send + Sync {
    /// Bicycles with `in_rent = false`, ordered by id.
    async fn list_available(&self) -> Result<Vec<Bicycle>, StoreError>;
    async fn list(&self, filter: &BicycleFilter) -> Result<Vec<Bicycle>, StoreError>;
    async fn create(&self, model: &str, price: Decimal) -> Result<Bicycle, StoreError>;
    async fn update_price(&self, id: i64, price: Decimal) -> Result<Bicycle, StoreError>;
    /// Administrative override of the availability flag. Returns rows changed.
    async fn set_in_rent(&self, ids: &[i64], in_rent: bool) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct PgBicycles {
    db: PgPool,
}

impl PgBicycles {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BicycleRepo for PgBicycles {
    async fn list_available(&self) -> Result<Vec<Bicycle>, StoreError> {
        let rows = sqlx::query_as::<_, Bicycle>(
            r#"
            SELECT id, model, price, in_rent
              FROM bicycles
             WHERE in_rent = FALSE
             ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list(&self, filter: &BicycleFilter) -> Result<Vec<Bicycle>, StoreError> {
        let rows = sqlx::query_as::<_, Bicycle>(
            r#"
            SELECT id, model, price, in_rent
              FROM bicycles
             WHERE ($1::bool IS NULL OR in_rent = $1)
               AND ($2::text IS NULL OR strpos(lower(model), lower($2)) > 0)
             ORDER BY id
             LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.in_rent)
        .bind(filter.search.as_deref())
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn create(&self, model: &str, price: Decimal) -> Result<Bicycle, StoreError> {
        let row = sqlx::query_as::<_, Bicycle>(
            r#"
            INSERT INTO bicycles (model, price)
            VALUES ($1, $2)
            RETURNING id, model, price, in_rent
            "#,
        )
        .bind(model)
        .bind(price)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_price(&self, id: i64, price: Decimal) -> Result<Bicycle, StoreError> {
        sqlx::query_as::<_, Bicycle>(
            r#"
            UPDATE bicycles
               SET price = $2
             WHERE id = $1
            RETURNING id, model, price, in_rent
            "#,
        )
        .bind(id)
        .bind(price)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound("Bicycle"))
    }

    async fn set_in_rent(&self, ids: &[i64], in_rent: bool) -> Result<u64, StoreError> {
        let res = sqlx::query(r#"UPDATE bicycles SET in_rent = $2 WHERE id = ANY($1)"#)
            .bind(ids)
            .bind(in_rent)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
