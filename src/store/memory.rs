use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{Flight, Membership, Transaction};
use crate::store::{FlightStore, MembershipStore, StoreError, TransactionStore};

/// In-memory store with the same unique-key semantics as the Postgres
/// backend. Used by the test suite and for local dry runs.
#[derive(Default)]
pub struct MemoryStore {
    transactions: Mutex<Vec<Transaction>>,
    memberships: Mutex<Vec<Membership>>,
    flights: Mutex<Vec<Flight>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn memberships(&self) -> Vec<Membership> {
        self.memberships.lock().unwrap().clone()
    }

    pub fn flights(&self) -> Vec<Flight> {
        self.flights.lock().unwrap().clone()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn insert(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let mut transactions = self.transactions.lock().unwrap();
        if transactions.iter().any(|t| t.id == transaction.id) {
            return Err(StoreError::Conflict(format!(
                "transactions.id = {}",
                transaction.id
            )));
        }
        transactions.push(transaction.clone());
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<Transaction>, StoreError> {
        let transactions = self.transactions.lock().unwrap();
        Ok(transactions.iter().find(|t| t.id == id).cloned())
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn insert(&self, membership: &Membership) -> Result<(), StoreError> {
        let mut memberships = self.memberships.lock().unwrap();
        if memberships
            .iter()
            .any(|m| m.transaction_id == membership.transaction_id)
        {
            return Err(StoreError::Conflict(format!(
                "memberships.transaction_id = {}",
                membership.transaction_id
            )));
        }
        memberships.push(membership.clone());
        Ok(())
    }

    async fn find_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Membership>, StoreError> {
        let memberships = self.memberships.lock().unwrap();
        Ok(memberships
            .iter()
            .find(|m| m.transaction_id == transaction_id)
            .cloned())
    }

    async fn find_match(
        &self,
        username: &str,
        date: NaiveDate,
    ) -> Result<Option<Membership>, StoreError> {
        let memberships = self.memberships.lock().unwrap();
        let mut matching: Vec<&Membership> = memberships
            .iter()
            .filter(|m| m.covers(username, date))
            .collect();
        // Same tie-break as the Postgres query: earliest date_paired, then id.
        matching.sort_by_key(|m| (m.date_paired, m.id));
        Ok(matching.first().map(|m| (*m).clone()))
    }

    async fn set_used_for(&self, id: Uuid, used_for: &str) -> Result<(), StoreError> {
        let mut memberships = self.memberships.lock().unwrap();
        if let Some(membership) = memberships.iter_mut().find(|m| m.id == id) {
            membership.used_for = Some(used_for.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl FlightStore for MemoryStore {
    async fn insert(&self, flight: &Flight) -> Result<(), StoreError> {
        let mut flights = self.flights.lock().unwrap();
        if flights.iter().any(|f| f.id == flight.id) {
            return Err(StoreError::Conflict(format!("flights.id = {}", flight.id)));
        }
        flights.push(flight.clone());
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<Flight>, StoreError> {
        let flights = self.flights.lock().unwrap();
        Ok(flights.iter().find(|f| f.id == id).cloned())
    }

    async fn mark_processed(&self, id: &str) -> Result<(), StoreError> {
        let mut flights = self.flights.lock().unwrap();
        if let Some(flight) = flights.iter_mut().find(|f| f.id == id) {
            flight.processed = true;
        }
        Ok(())
    }
}
