//! In-process drink repository for local development and tests.
//!
//! Rows are kept as [`DrinkRow`]s so recipes go through the same text
//! encoding as the PostgreSQL backend. A transaction holds the store lock for
//! its whole lifetime and works on a staged copy that replaces the store on
//! commit. Reads through the repository wait for an open transaction, so a
//! task must not read while it holds one.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::{Drink, DrinkPatch, DrinkRow, NewDrink};
use crate::services::repository::{DrinkRepository, DrinkTransaction, RepoError};

/// Mirrors `VARCHAR(80)` on the title column.
const TITLE_MAX_LEN: usize = 80;

#[derive(Debug, Clone)]
struct Store {
    next_id: i32,
    rows: BTreeMap<i32, DrinkRow>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryDrinkRepository {
    store: Arc<Mutex<Store>>,
}

impl InMemoryDrinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row with raw recipe text, bypassing validation.
    pub async fn insert_raw(&self, title: &str, recipe: &str) -> i32 {
        let mut store = self.store.lock().await;
        let id = store.next_id;
        store.next_id += 1;
        store.rows.insert(
            id,
            DrinkRow {
                id,
                title: title.to_string(),
                recipe: recipe.to_string(),
            },
        );
        id
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn decode(row: &DrinkRow) -> Result<Drink, RepoError> {
    Drink::try_from(row.clone()).map_err(|source| RepoError::CorruptRecipe { id: row.id, source })
}

#[async_trait]
impl DrinkRepository for InMemoryDrinkRepository {
    async fn list_all(&self) -> Result<Vec<Drink>, RepoError> {
        let store = self.store.lock().await;
        store.rows.values().map(decode).collect()
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Drink>, RepoError> {
        let store = self.store.lock().await;
        store.rows.get(&id).map(decode).transpose()
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Drink>, RepoError> {
        let store = self.store.lock().await;
        store
            .rows
            .values()
            .find(|row| row.title == title)
            .map(decode)
            .transpose()
    }

    async fn begin(&self) -> Result<Box<dyn DrinkTransaction>, RepoError> {
        let guard = self.store.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Store>,
    staged: Store,
}

impl InMemoryTransaction {
    fn check_title(&self, title: &str, except_id: Option<i32>) -> Result<(), RepoError> {
        if title.chars().count() > TITLE_MAX_LEN {
            return Err(RepoError::ConstraintViolation(format!(
                "title longer than {} characters",
                TITLE_MAX_LEN
            )));
        }
        let taken = self
            .staged
            .rows
            .values()
            .any(|row| row.title == title && Some(row.id) != except_id);
        if taken {
            return Err(RepoError::ConstraintViolation(format!(
                "title '{}' already exists",
                title
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DrinkTransaction for InMemoryTransaction {
    async fn create(&mut self, drink: &NewDrink) -> Result<(), RepoError> {
        self.check_title(&drink.title, None)?;
        let recipe = drink.recipe.to_text()?;

        let id = self.staged.next_id;
        self.staged.next_id += 1;
        self.staged.rows.insert(
            id,
            DrinkRow {
                id,
                title: drink.title.clone(),
                recipe,
            },
        );
        Ok(())
    }

    async fn update(&mut self, id: i32, patch: &DrinkPatch) -> Result<Drink, RepoError> {
        if !self.staged.rows.contains_key(&id) {
            return Err(RepoError::NotFound);
        }
        if let Some(title) = &patch.title {
            self.check_title(title, Some(id))?;
        }
        let recipe = patch.recipe.as_ref().map(|r| r.to_text()).transpose()?;

        let row = self
            .staged
            .rows
            .get_mut(&id)
            .ok_or(RepoError::NotFound)?;
        if let Some(title) = &patch.title {
            row.title = title.clone();
        }
        if let Some(recipe) = recipe {
            row.recipe = recipe;
        }
        decode(row)
    }

    async fn delete(&mut self, id: i32) -> Result<(), RepoError> {
        self.staged
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        let InMemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        Ok(())
    }
}
