use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::error::SourceError;
use crate::models::{Membership, MembershipType};
use crate::services::xcontest::PilotDirectory;
use crate::store::{MembershipStore, StoreError};

/// Operator-facing pairing failures. The `Display` text of each variant is
/// sent back to the invoking operator verbatim.
#[derive(Debug, Error)]
pub enum PairError {
    #[error("Expected 3 arguments, got {0}")]
    WrongArgCount(usize),

    #[error("Transaction ID must be numeric")]
    NonNumericId,

    #[error("Unknown membership type {0:?}")]
    UnknownType(String),

    #[error("Could not look up pilot: {0}")]
    Lookup(SourceError),

    #[error("This transaction is already paired as {membership_type} for pilot {pilot_username}")]
    AlreadyPaired {
        membership_type: MembershipType,
        pilot_username: String,
    },

    #[error("Storage failed, please retry")]
    Store(#[source] StoreError),
}

/// Links a bank transaction to a new membership grant.
pub struct PairingService {
    memberships: Arc<dyn MembershipStore>,
    pilots: Arc<dyn PilotDirectory>,
}

impl PairingService {
    pub fn new(memberships: Arc<dyn MembershipStore>, pilots: Arc<dyn PilotDirectory>) -> Self {
        Self {
            memberships,
            pilots,
        }
    }

    /// Applies a pair command: `<transaction_id> <membership_type> <pilot>`.
    ///
    /// Validation runs in order (argument count, numeric id, known type,
    /// pilot lookup) and fails fast; nothing is written on a validation
    /// failure. The membership store's unique index on `transaction_id` is
    /// the final authority when two operators race to pair the same
    /// transaction: the loser gets the same conflict report as a plain
    /// duplicate attempt.
    pub async fn pair(&self, args: &str, operator: &str) -> Result<Membership, PairError> {
        tracing::info!(operator, args, "Pairing command received");

        let parts: Vec<&str> = args.split_whitespace().collect();
        let &[transaction_id, type_str, username] = parts.as_slice() else {
            return Err(PairError::WrongArgCount(parts.len()));
        };

        if transaction_id.is_empty() || !transaction_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PairError::NonNumericId);
        }

        let membership_type: MembershipType = type_str
            .parse()
            .map_err(|_| PairError::UnknownType(type_str.to_string()))?;

        let pilot = self
            .pilots
            .resolve(username)
            .await
            .map_err(PairError::Lookup)?;

        if let Some(existing) = self
            .memberships
            .find_by_transaction(transaction_id)
            .await
            .map_err(PairError::Store)?
        {
            return Err(already_paired(existing));
        }

        let membership = Membership::new(
            transaction_id.to_string(),
            membership_type,
            pilot,
            Utc::now().date_naive(),
        );

        match self.memberships.insert(&membership).await {
            Ok(()) => {
                tracing::info!(
                    transaction_id,
                    %membership_type,
                    pilot = %membership.pilot.username,
                    "Paired"
                );
                Ok(membership)
            }
            Err(StoreError::Conflict(_)) => {
                // Lost the race; report whoever won.
                let existing = self
                    .memberships
                    .find_by_transaction(transaction_id)
                    .await
                    .map_err(PairError::Store)?;
                match existing {
                    Some(existing) => Err(already_paired(existing)),
                    None => Err(PairError::Store(StoreError::Backend(anyhow::anyhow!(
                        "conflicting membership vanished for transaction {transaction_id}"
                    )))),
                }
            }
            Err(e) => Err(PairError::Store(e)),
        }
    }
}

fn already_paired(existing: Membership) -> PairError {
    PairError::AlreadyPaired {
        membership_type: existing.membership_type,
        pilot_username: existing.pilot.username,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::StaticPilots;

    fn service(store: Arc<MemoryStore>) -> PairingService {
        let pilots = StaticPilots::with(&[("jan_novak", "42")]);
        PairingService::new(store, Arc::new(pilots))
    }

    #[tokio::test]
    async fn pairs_a_transaction() {
        let store = Arc::new(MemoryStore::new());
        let membership = service(store.clone())
            .pair("98765 daily jan_novak", "operator")
            .await
            .unwrap();

        assert_eq!(membership.transaction_id, "98765");
        assert_eq!(membership.membership_type, MembershipType::Daily);
        assert_eq!(membership.pilot.id, "42");
        assert!(membership.used_for.is_none());
        assert_eq!(store.memberships().len(), 1);
    }

    #[tokio::test]
    async fn reports_wrong_argument_count() {
        let store = Arc::new(MemoryStore::new());
        let err = service(store)
            .pair("98765 daily", "operator")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Expected 3 arguments, got 2");
    }

    #[tokio::test]
    async fn rejects_non_numeric_transaction_id() {
        let store = Arc::new(MemoryStore::new());
        let err = service(store)
            .pair("abc daily jan_novak", "operator")
            .await
            .unwrap_err();
        assert!(matches!(err, PairError::NonNumericId));
    }

    #[tokio::test]
    async fn rejects_unknown_membership_type() {
        let store = Arc::new(MemoryStore::new());
        let err = service(store)
            .pair("98765 weekly jan_novak", "operator")
            .await
            .unwrap_err();
        assert!(matches!(err, PairError::UnknownType(t) if t == "weekly"));
    }

    #[tokio::test]
    async fn propagates_pilot_lookup_failure() {
        let store = Arc::new(MemoryStore::new());
        let err = service(store.clone())
            .pair("98765 daily nobody", "operator")
            .await
            .unwrap_err();
        assert!(matches!(err, PairError::Lookup(_)));
        assert!(store.memberships().is_empty());
    }

    #[tokio::test]
    async fn second_pair_attempt_reports_existing_grant() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone());

        service.pair("98765 daily jan_novak", "operator").await.unwrap();
        let err = service
            .pair("98765 yearly jan_novak", "operator")
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "This transaction is already paired as daily for pilot jan_novak"
        );
        // The losing attempt must not touch the store.
        assert_eq!(store.memberships().len(), 1);
        assert_eq!(
            store.memberships()[0].membership_type,
            MembershipType::Daily
        );
    }
}
