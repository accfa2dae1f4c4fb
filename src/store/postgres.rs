use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use crate::models::{Flight, Membership, Pilot, Transaction};
use crate::store::{FlightStore, MembershipStore, StoreError, TransactionStore};

/// Production store backed by Postgres. Unique keys are enforced by the
/// schema (see `migrations/`); unique violations surface as
/// [`StoreError::Conflict`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl FromRow<'_, PgRow> for Transaction {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            amount: row.try_get("amount")?,
            currency: row.try_get("currency")?,
            date: row.try_get("date")?,
            counterparty_account: row.try_get("counterparty_account")?,
            counterparty_name: row.try_get("counterparty_name")?,
            message: row.try_get("message")?,
        })
    }
}

impl FromRow<'_, PgRow> for Membership {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let type_str: String = row.try_get("membership_type")?;
        let membership_type = type_str
            .parse()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "membership_type".to_string(),
                source: Box::new(e),
            })?;
        Ok(Self {
            id: row.try_get("id")?,
            transaction_id: row.try_get("transaction_id")?,
            membership_type,
            pilot: Pilot {
                username: row.try_get("pilot_username")?,
                id: row.try_get("pilot_id")?,
            },
            date_paired: row.try_get("date_paired")?,
            used_for: row.try_get("used_for")?,
        })
    }
}

impl FromRow<'_, PgRow> for Flight {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            pilot: Pilot {
                username: row.try_get("pilot_username")?,
                id: row.try_get("pilot_id")?,
            },
            datetime: row.try_get("datetime")?,
            processed: row.try_get("processed")?,
        })
    }
}

#[async_trait]
impl TransactionStore for PgStore {
    async fn insert(&self, transaction: &Transaction) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, amount, currency, date, counterparty_account, counterparty_name, message)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&transaction.id)
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(transaction.date)
        .bind(&transaction.counterparty_account)
        .bind(&transaction.counterparty_name)
        .bind(&transaction.message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<Transaction>, StoreError> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }
}

#[async_trait]
impl MembershipStore for PgStore {
    async fn insert(&self, membership: &Membership) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO memberships
                (id, transaction_id, membership_type, pilot_username, pilot_id, date_paired, used_for)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(membership.id)
        .bind(&membership.transaction_id)
        .bind(membership.membership_type.as_str())
        .bind(&membership.pilot.username)
        .bind(&membership.pilot.id)
        .bind(membership.date_paired)
        .bind(&membership.used_for)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Membership>, StoreError> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT * FROM memberships WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    async fn find_match(
        &self,
        username: &str,
        date: NaiveDate,
    ) -> Result<Option<Membership>, StoreError> {
        // Mirrors Membership::covers; earliest date_paired wins.
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT * FROM memberships
            WHERE pilot_username = $1
              AND (
                (membership_type = 'daily' AND used_for = $2)
                OR (membership_type = 'yearly' AND used_for = $3)
                OR used_for IS NULL
              )
            ORDER BY date_paired ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(username)
        .bind(date.to_string())
        .bind(chrono::Datelike::year(&date).to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    async fn set_used_for(&self, id: Uuid, used_for: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE memberships SET used_for = $2 WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(used_for)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl FlightStore for PgStore {
    async fn insert(&self, flight: &Flight) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO flights (id, pilot_username, pilot_id, datetime, processed)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&flight.id)
        .bind(&flight.pilot.username)
        .bind(&flight.pilot.id)
        .bind(flight.datetime)
        .bind(flight.processed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<Flight>, StoreError> {
        let flight = sqlx::query_as::<_, Flight>(
            r#"
            SELECT * FROM flights WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(flight)
    }

    async fn mark_processed(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE flights SET processed = TRUE WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
