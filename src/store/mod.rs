//! Store abstraction over the three record collections.
//!
//! All concurrency safety of the pipelines comes from the unique keys
//! enforced here (transaction id, flight id, membership transaction_id)
//! rather than application-level locks. Every write is a single-record
//! operation; no transaction spans collections.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Flight, Membership, Transaction};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-key violation on insert. Expected and non-fatal: the pipelines
    /// treat it as "already exists".
    #[error("duplicate key: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Backend(#[source] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }
        StoreError::Backend(err.into())
    }
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Inserts a transaction; fails with [`StoreError::Conflict`] if one with
    /// the same id is already stored.
    async fn insert(&self, transaction: &Transaction) -> Result<(), StoreError>;

    async fn find(&self, id: &str) -> Result<Option<Transaction>, StoreError>;
}

#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Inserts a membership; fails with [`StoreError::Conflict`] if any
    /// membership already holds the same `transaction_id`. The unique index
    /// is the final authority under racing pair attempts.
    async fn insert(&self, membership: &Membership) -> Result<(), StoreError>;

    async fn find_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Membership>, StoreError>;

    /// Finds a membership covering a flight by `username` on `date`:
    /// same pilot, and either unconsumed or already consumed for the same
    /// period (see [`Membership::covers`]). When several match, the one with
    /// the earliest `date_paired` wins (ties broken by id) so the result is
    /// deterministic.
    async fn find_match(
        &self,
        username: &str,
        date: NaiveDate,
    ) -> Result<Option<Membership>, StoreError>;

    /// Sets the consumption marker. Idempotent: re-setting the value a
    /// membership already holds is a no-op in effect.
    async fn set_used_for(&self, id: Uuid, used_for: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait FlightStore: Send + Sync {
    async fn insert(&self, flight: &Flight) -> Result<(), StoreError>;

    async fn find(&self, id: &str) -> Result<Option<Flight>, StoreError>;

    /// Flips `processed` to `true`. Never reverts.
    async fn mark_processed(&self, id: &str) -> Result<(), StoreError>;
}
