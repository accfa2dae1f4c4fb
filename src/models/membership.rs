use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::flight::Pilot;

/// Amounts (CZK) recognized by the transaction classifier.
const DAILY_AMOUNT: u32 = 150;
const YEARLY_AMOUNT: u32 = 450;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipType {
    Daily,
    Yearly,
}

#[derive(Debug, Error)]
#[error("unknown membership type: {0:?}")]
pub struct UnknownMembershipType(pub String);

impl MembershipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipType::Daily => "daily",
            MembershipType::Yearly => "yearly",
        }
    }

    /// Classifies a transaction amount into a membership type.
    ///
    /// Amounts outside the table return `None` ("unclassified") - a valid
    /// outcome surfaced to the operators for manual pairing, not an error.
    pub fn from_amount(amount: Decimal) -> Option<Self> {
        if amount == Decimal::from(DAILY_AMOUNT) {
            Some(MembershipType::Daily)
        } else if amount == Decimal::from(YEARLY_AMOUNT) {
            Some(MembershipType::Yearly)
        } else {
            None
        }
    }

    /// The `used_for` marker this membership type records for a flight on
    /// `date`: the ISO date for daily passes, the year for yearly passes.
    pub fn used_for_value(&self, date: NaiveDate) -> String {
        match self {
            MembershipType::Daily => date.to_string(),
            MembershipType::Yearly => chrono::Datelike::year(&date).to_string(),
        }
    }
}

impl std::str::FromStr for MembershipType {
    type Err = UnknownMembershipType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(MembershipType::Daily),
            "yearly" => Ok(MembershipType::Yearly),
            _ => Err(UnknownMembershipType(s.to_string())),
        }
    }
}

impl std::fmt::Display for MembershipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grant entitling a pilot to fly under a bank-transaction-funded
/// allotment. Created by the pairing flow; only `used_for` mutates afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    /// Bank transaction funding this grant. Unique across all memberships.
    pub transaction_id: String,
    pub membership_type: MembershipType,
    pub pilot: Pilot,
    pub date_paired: NaiveDate,
    /// Consumption marker: ISO date for daily, year for yearly, `None` while
    /// the pass is unconsumed.
    pub used_for: Option<String>,
}

impl Membership {
    pub fn new(
        transaction_id: String,
        membership_type: MembershipType,
        pilot: Pilot,
        date_paired: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id,
            membership_type,
            pilot,
            date_paired,
            used_for: None,
        }
    }

    /// Whether this membership covers a flight by `username` on `date`.
    ///
    /// A pass matches when it is unconsumed, or when it was already consumed
    /// for the same period (same day for daily, same year for yearly) - which
    /// allows multiple flights per period on one pass.
    pub fn covers(&self, username: &str, date: NaiveDate) -> bool {
        if self.pilot.username != username {
            return false;
        }
        match &self.used_for {
            None => true,
            Some(marker) => *marker == self.membership_type.used_for_value(date),
        }
    }
}
