//! Storage abstraction for the drinks catalog.
//!
//! Reads go straight through the repository. Writes happen inside a
//! [`DrinkTransaction`] obtained from [`DrinkRepository::begin`]; the caller
//! decides whether to commit or roll back, so nothing a failed request did is
//! ever visible to later reads.

use async_trait::async_trait;
use service_core::error::AppError;
use thiserror::Error;

use crate::models::{Drink, DrinkPatch, NewDrink};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("drink not found")]
    NotFound,

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("stored recipe for drink {id} is not valid JSON: {source}")]
    CorruptRecipe {
        id: i32,
        #[source]
        source: serde_json::Error,
    },

    #[error("recipe could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::not_found(),
            RepoError::ConstraintViolation(_) => AppError::unprocessable(),
            RepoError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            other => AppError::InternalError(anyhow::Error::new(other)),
        }
    }
}

#[async_trait]
pub trait DrinkRepository: Send + Sync {
    /// Every drink, ordered by id.
    async fn list_all(&self) -> Result<Vec<Drink>, RepoError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Drink>, RepoError>;

    async fn find_by_title(&self, title: &str) -> Result<Option<Drink>, RepoError>;

    /// Opens a unit of work for mutations.
    async fn begin(&self) -> Result<Box<dyn DrinkTransaction>, RepoError>;

    async fn health_check(&self) -> Result<(), RepoError>;
}

/// Mutations staged inside one transaction. Dropping the handle without
/// calling [`commit`](DrinkTransaction::commit) discards them.
#[async_trait]
pub trait DrinkTransaction: Send {
    /// Fails with `ConstraintViolation` when the title is taken or a field
    /// does not fit the column.
    async fn create(&mut self, drink: &NewDrink) -> Result<(), RepoError>;

    /// Applies whichever fields `patch` carries and returns the new state.
    async fn update(&mut self, id: i32, patch: &DrinkPatch) -> Result<Drink, RepoError>;

    async fn delete(&mut self, id: i32) -> Result<(), RepoError>;

    async fn commit(self: Box<Self>) -> Result<(), RepoError>;

    async fn rollback(self: Box<Self>) -> Result<(), RepoError>;
}
