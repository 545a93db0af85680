//! PostgreSQL-backed drink repository.

use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::{Duration, Instant};
use tracing::{info, instrument};

use crate::models::{Drink, DrinkPatch, DrinkRow, NewDrink};
use crate::services::metrics::record_query;
use crate::services::repository::{DrinkRepository, DrinkTransaction, RepoError};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "drinks-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

fn decode(row: DrinkRow) -> Result<Drink, RepoError> {
    let id = row.id;
    Drink::try_from(row).map_err(|source| RepoError::CorruptRecipe { id, source })
}

/// Classifies write failures: integrity violations are the caller's fault,
/// everything else is a storage problem.
fn map_write_error(err: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(ref db_err) = err {
        let integrity = matches!(
            db_err.kind(),
            sqlx::error::ErrorKind::UniqueViolation
                | sqlx::error::ErrorKind::NotNullViolation
                | sqlx::error::ErrorKind::CheckViolation
        );
        // 22001: string_data_right_truncation (title longer than the column)
        let too_long = db_err.code().as_deref() == Some("22001");
        if integrity || too_long {
            return RepoError::ConstraintViolation(db_err.message().to_string());
        }
    }
    RepoError::Database(err)
}

#[async_trait]
impl DrinkRepository for Database {
    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Drink>, RepoError> {
        let started = Instant::now();
        let rows = sqlx::query_as::<_, DrinkRow>(
            r#"
            SELECT id, title, recipe
            FROM drinks
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        record_query("list_all", started);

        rows.into_iter().map(decode).collect()
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> Result<Option<Drink>, RepoError> {
        let started = Instant::now();
        let row = sqlx::query_as::<_, DrinkRow>(
            r#"
            SELECT id, title, recipe
            FROM drinks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        record_query("find_by_id", started);

        row.map(decode).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_title(&self, title: &str) -> Result<Option<Drink>, RepoError> {
        let started = Instant::now();
        let row = sqlx::query_as::<_, DrinkRow>(
            r#"
            SELECT id, title, recipe
            FROM drinks
            WHERE title = $1
            "#,
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;
        record_query("find_by_title", started);

        row.map(decode).transpose()
    }

    async fn begin(&self) -> Result<Box<dyn DrinkTransaction>, RepoError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgDrinkTransaction { tx }))
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One PostgreSQL transaction. Rolled back by sqlx if dropped uncommitted.
pub struct PgDrinkTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl DrinkTransaction for PgDrinkTransaction {
    #[instrument(skip(self, drink), fields(title = %drink.title))]
    async fn create(&mut self, drink: &NewDrink) -> Result<(), RepoError> {
        let started = Instant::now();
        let recipe = drink.recipe.to_text()?;

        sqlx::query(
            r#"
            INSERT INTO drinks (title, recipe)
            VALUES ($1, $2)
            "#,
        )
        .bind(&drink.title)
        .bind(recipe)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        record_query("create", started);

        Ok(())
    }

    #[instrument(skip(self, patch))]
    async fn update(&mut self, id: i32, patch: &DrinkPatch) -> Result<Drink, RepoError> {
        let started = Instant::now();
        let recipe = patch.recipe.as_ref().map(|r| r.to_text()).transpose()?;

        let row = sqlx::query_as::<_, DrinkRow>(
            r#"
            UPDATE drinks
            SET title = COALESCE($2, title),
                recipe = COALESCE($3, recipe)
            WHERE id = $1
            RETURNING id, title, recipe
            "#,
        )
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(recipe)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        record_query("update", started);

        decode(row.ok_or(RepoError::NotFound)?)
    }

    #[instrument(skip(self))]
    async fn delete(&mut self, id: i32) -> Result<(), RepoError> {
        let started = Instant::now();
        let result = sqlx::query("DELETE FROM drinks WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        record_query("delete", started);

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
