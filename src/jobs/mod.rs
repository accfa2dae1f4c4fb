// Jobs module - the periodic watch cycles and their cron registry

use std::sync::Arc;

use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::services::bank::BankSource;
use crate::services::notifier::Notifier;
use crate::services::xcontest::ActivitySource;
use crate::store::{FlightStore, MembershipStore, TransactionStore};

pub mod flight_watcher;
pub mod transaction_watcher;

/// Everything the watch jobs need, built once at startup and shared by
/// reference. No job reaches for globals.
pub struct JobDeps {
    pub bank: Arc<dyn BankSource>,
    pub activity: Arc<dyn ActivitySource>,
    pub transactions: Arc<dyn TransactionStore>,
    pub memberships: Arc<dyn MembershipStore>,
    pub flights: Arc<dyn FlightStore>,
    pub notifier: Arc<dyn Notifier>,
    pub takeoff: String,
    pub flight_watch_days_back: i64,
}

/// Registers the two watch jobs on their cron schedules and starts the
/// scheduler. A cycle failure is logged and the schedule simply fires again
/// next time.
pub async fn start(
    deps: Arc<JobDeps>,
    transaction_cron: &str,
    flight_cron: &str,
) -> anyhow::Result<JobScheduler> {
    let sched = JobScheduler::new().await?;

    let d = deps.clone();
    sched
        .add(Job::new_async(transaction_cron, move |_id, _sched| {
            let d = d.clone();
            Box::pin(async move {
                if let Err(e) = transaction_watcher::watch_transactions(
                    d.bank.clone(),
                    d.transactions.clone(),
                    d.notifier.clone(),
                )
                .await
                {
                    tracing::error!(error = %e, "Transaction watch cycle failed");
                }
            })
        })?)
        .await?;

    let d = deps;
    sched
        .add(Job::new_async(flight_cron, move |_id, _sched| {
            let d = d.clone();
            Box::pin(async move {
                let since =
                    Utc::now().date_naive() - chrono::Duration::days(d.flight_watch_days_back);
                if let Err(e) = flight_watcher::watch_flights(
                    d.activity.clone(),
                    d.flights.clone(),
                    d.memberships.clone(),
                    d.notifier.clone(),
                    &d.takeoff,
                    since,
                )
                .await
                {
                    tracing::error!(error = %e, "Flight watch cycle failed");
                }
            })
        })?)
        .await?;

    sched.start().await?;
    tracing::info!(transaction_cron, flight_cron, "Watch jobs scheduled");

    Ok(sched)
}
