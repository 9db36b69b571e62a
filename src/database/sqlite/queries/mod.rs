
use super::models::{NewProduct, NewSkinCondition, Product, SkinCondition};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

pub struct ProductQueries;

impl ProductQueries {
    /// Insert or update a product, keyed by its upstream catalog id.
    #[inline]
    pub async fn upsert(pool: &SqlitePool, new_product: NewProduct) -> Result<Product> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            "INSERT INTO products (id, name, payload, embedding_text, created_date)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 payload = excluded.payload,
                 embedding_text = excluded.embedding_text,
                 updated_date = excluded.created_date",
        )
        .bind(new_product.id)
        .bind(&new_product.name)
        .bind(&new_product.payload)
        .bind(&new_product.embedding_text)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to upsert product")?;

        Self::get_by_id(pool, new_product.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve upserted product"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Product>> {
        let result = sqlx::query_as::<_, Product>(
            "SELECT id, name, payload, embedding_text, created_date, updated_date
             FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get product by id")?;

        Ok(result)
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, payload, embedding_text, created_date, updated_date
             FROM products ORDER BY id",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list products")?;

        Ok(products)
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(pool)
            .await
            .context("Failed to count products")?;

        Ok(count)
    }
}

pub struct SkinConditionQueries;

impl SkinConditionQueries {
    /// Insert or update a condition profile, keyed by name.
    #[inline]
    pub async fn upsert(
        pool: &SqlitePool,
        new_condition: NewSkinCondition,
    ) -> Result<SkinCondition> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            "INSERT INTO skin_conditions (name, description, created_date)
             VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                 description = excluded.description,
                 updated_date = excluded.created_date",
        )
        .bind(&new_condition.name)
        .bind(&new_condition.description)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to upsert skin condition")?;

        Self::get_by_name(pool, &new_condition.name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve upserted skin condition"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<SkinCondition>> {
        let result = sqlx::query_as::<_, SkinCondition>(
            "SELECT id, name, description, created_date, updated_date
             FROM skin_conditions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get skin condition by id")?;

        Ok(result)
    }

    /// Case-insensitive name lookup with a partial-match fallback, so
    /// "redness" finds "Redness" and "oily" finds "Oily Skin".
    #[inline]
    pub async fn get_by_name(pool: &SqlitePool, name: &str) -> Result<Option<SkinCondition>> {
        let exact = sqlx::query_as::<_, SkinCondition>(
            "SELECT id, name, description, created_date, updated_date
             FROM skin_conditions WHERE LOWER(name) = LOWER(?)",
        )
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get skin condition by name")?;

        if exact.is_some() {
            return Ok(exact);
        }

        let partial = sqlx::query_as::<_, SkinCondition>(
            "SELECT id, name, description, created_date, updated_date
             FROM skin_conditions WHERE LOWER(name) LIKE LOWER(?)
             ORDER BY id LIMIT 1",
        )
        .bind(format!("%{}%", name))
        .fetch_optional(pool)
        .await
        .context("Failed to get skin condition by partial name")?;

        if partial.is_some() {
            debug!("Skin condition '{}' resolved via partial match", name);
        }

        Ok(partial)
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<SkinCondition>> {
        let conditions = sqlx::query_as::<_, SkinCondition>(
            "SELECT id, name, description, created_date, updated_date
             FROM skin_conditions ORDER BY id",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list skin conditions")?;

        Ok(conditions)
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM skin_conditions")
            .fetch_one(pool)
            .await
            .context("Failed to count skin conditions")?;

        Ok(count)
    }
}
