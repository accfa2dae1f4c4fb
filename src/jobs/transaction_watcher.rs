use std::sync::Arc;

use tokio::task::JoinSet;

use crate::error::SourceError;
use crate::models::{MembershipType, Transaction};
use crate::services::bank::BankSource;
use crate::services::notifier::Notifier;
use crate::store::{StoreError, TransactionStore};
use crate::views;

/// One discovery cycle: pull transactions the bank has not handed out before
/// and process each as an independent unit of work. The cycle waits for its
/// own tasks so a shutdown between cron ticks leaves no orphaned work.
pub async fn watch_transactions(
    bank: Arc<dyn BankSource>,
    transactions: Arc<dyn TransactionStore>,
    notifier: Arc<dyn Notifier>,
) -> Result<(), SourceError> {
    let discovered = bank.new_transactions().await?;
    tracing::info!(count = discovered.len(), "Discovered new transactions");

    let mut tasks = JoinSet::new();
    for transaction in discovered {
        let transactions = transactions.clone();
        let notifier = notifier.clone();
        tasks.spawn(async move {
            let id = transaction.id.clone();
            if let Err(e) =
                process_transaction(transactions.as_ref(), notifier.as_ref(), transaction).await
            {
                tracing::error!(transaction_id = %id, error = ?e, "Transaction processing failed");
            }
        });
    }
    while tasks.join_next().await.is_some() {}

    Ok(())
}

/// Persist, classify, notify - in that order.
///
/// A duplicate delivery hits the unique index on the transaction id and ends
/// the unit of work quietly; re-running a transaction must not repeat its
/// notification. A notify failure is logged as this item's failure but the
/// persisted transaction stays.
pub async fn process_transaction(
    transactions: &dyn TransactionStore,
    notifier: &dyn Notifier,
    transaction: Transaction,
) -> anyhow::Result<()> {
    tracing::info!(%transaction, "Processing");

    match transactions.insert(&transaction).await {
        Ok(()) => {}
        Err(StoreError::Conflict(_)) => {
            tracing::debug!(transaction_id = %transaction.id, "Already stored, skipping");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let suggested = MembershipType::from_amount(transaction.amount);
    let msg = views::new_transaction_msg(&transaction, suggested);
    notifier.send(&msg).await?;

    Ok(())
}
