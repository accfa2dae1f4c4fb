use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single movement on the club bank account, as reported by the bank feed.
///
/// Immutable once stored: the pipeline persists each transaction exactly once
/// (the unique index on `id` absorbs re-delivery) and never updates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Bank-assigned movement id, numeric string.
    pub id: String,
    pub amount: Decimal,
    pub currency: String,
    pub date: NaiveDate,
    pub counterparty_account: Option<String>,
    pub counterparty_name: Option<String>,
    pub message: Option<String>,
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "transaction {} ({} {} on {})",
            self.id, self.amount, self.currency, self.date
        )
    }
}
