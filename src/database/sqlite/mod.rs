use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::config::Config;
use crate::database::sqlite::models::{NewProduct, NewSkinCondition, Product, SkinCondition};
use crate::database::sqlite::queries::{ProductQueries, SkinConditionQueries};


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_url: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_url)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    /// Open the metadata database at the location derived from config.
    pub async fn initialize(config: &Config) -> Result<Self> {
        let base_dir = config.get_base_dir();

        std::fs::create_dir_all(base_dir)
            .with_context(|| format!("Failed to create config directory: {}", base_dir.display()))?;

        let db_path = config.database_path();
        Self::new(db_path.to_string_lossy().as_ref()).await
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    // Product operations
    pub async fn upsert_product(&self, product: NewProduct) -> Result<Product> {
        ProductQueries::upsert(&self.pool, product).await
    }

    pub async fn get_product_by_id(&self, id: i64) -> Result<Option<Product>> {
        ProductQueries::get_by_id(&self.pool, id).await
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        ProductQueries::list_all(&self.pool).await
    }

    pub async fn count_products(&self) -> Result<i64> {
        ProductQueries::count(&self.pool).await
    }

    // Skin condition operations
    pub async fn upsert_skin_condition(&self, condition: NewSkinCondition) -> Result<SkinCondition> {
        SkinConditionQueries::upsert(&self.pool, condition).await
    }

    pub async fn get_skin_condition_by_name(&self, name: &str) -> Result<Option<SkinCondition>> {
        SkinConditionQueries::get_by_name(&self.pool, name).await
    }

    pub async fn list_skin_conditions(&self) -> Result<Vec<SkinCondition>> {
        SkinConditionQueries::list_all(&self.pool).await
    }

    pub async fn count_skin_conditions(&self) -> Result<i64> {
        SkinConditionQueries::count(&self.pool).await
    }
}
