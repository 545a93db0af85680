//! Services layer for drinks-service: storage backends and metrics.

pub mod database;
pub mod memory;
pub mod metrics;
pub mod repository;

pub use database::Database;
pub use memory::InMemoryDrinkRepository;
pub use repository::{DrinkRepository, DrinkTransaction, RepoError};
