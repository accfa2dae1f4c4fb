use std::sync::Arc;

use chrono::NaiveDate;
use futures::StreamExt;
use tokio::task::JoinSet;

use crate::error::SourceError;
use crate::models::Flight;
use crate::services::notifier::Notifier;
use crate::services::xcontest::ActivitySource;
use crate::store::{FlightStore, MembershipStore, StoreError};
use crate::views;

/// One discovery cycle: stream flights at `takeoff` since the cutoff date
/// and process each as an independent unit of work.
///
/// A fetch failure aborts discovery (the next cron tick retries the whole
/// window), but flights already handed out keep processing and the cycle
/// drains them before returning. A single flight's failure never touches its
/// siblings.
pub async fn watch_flights(
    source: Arc<dyn ActivitySource>,
    flights: Arc<dyn FlightStore>,
    memberships: Arc<dyn MembershipStore>,
    notifier: Arc<dyn Notifier>,
    takeoff: &str,
    since: NaiveDate,
) -> Result<(), SourceError> {
    tracing::debug!(takeoff, %since, "Downloading flights");

    let mut stream = source.flights_since(takeoff, since);
    let mut tasks = JoinSet::new();
    let mut discovered = 0usize;
    let mut fetch_result = Ok(());

    while let Some(item) = stream.next().await {
        match item {
            Ok(flight) => {
                discovered += 1;
                let flights = flights.clone();
                let memberships = memberships.clone();
                let notifier = notifier.clone();
                tasks.spawn(async move {
                    let id = flight.id.clone();
                    if let Err(e) = process_flight(
                        flights.as_ref(),
                        memberships.as_ref(),
                        notifier.as_ref(),
                        flight,
                    )
                    .await
                    {
                        tracing::error!(flight_id = %id, error = ?e, "Flight processing failed");
                    }
                });
            }
            Err(e) => {
                fetch_result = Err(e);
                break;
            }
        }
    }
    drop(stream);

    tracing::info!(discovered, "Downloaded flights");
    while tasks.join_next().await.is_some() {}

    fetch_result
}

/// Validate one flight against the memberships and consume the matching
/// pass.
///
/// Steps: ingest (or skip when already processed), match, consume or alert,
/// and only then mark the flight processed. The marker comes last so that a
/// crash anywhere above causes a reprocess on the next cycle - safe, because
/// every earlier step is idempotent.
pub async fn process_flight(
    flights: &dyn FlightStore,
    memberships: &dyn MembershipStore,
    notifier: &dyn Notifier,
    flight: Flight,
) -> anyhow::Result<()> {
    match flights.find(&flight.id).await? {
        Some(existing) if existing.processed => {
            tracing::info!(%flight, "Skipping, already processed");
            return Ok(());
        }
        // Stored but unprocessed: a previous run died mid-way, reprocess.
        Some(_) => {}
        None => match flights.insert(&flight).await {
            // A concurrent sibling delivering the same flight may win the
            // insert; both then run the idempotent steps below.
            Ok(()) | Err(StoreError::Conflict(_)) => {}
            Err(e) => return Err(e.into()),
        },
    }

    tracing::info!(%flight, "Processing");

    match memberships
        .find_match(&flight.pilot.username, flight.date())
        .await?
    {
        None => {
            tracing::debug!(flight_id = %flight.id, "No membership found, reporting");
            // Best-effort alert: a failed send is logged, not retried, and
            // must not block marking the flight processed.
            if let Err(e) = notifier.send(&views::offending_flight_msg(&flight)).await {
                tracing::error!(flight_id = %flight.id, error = %e, "Failed to send alert");
            }
        }
        Some(membership) => {
            tracing::debug!(
                flight_id = %flight.id,
                membership_id = %membership.id,
                "Found membership"
            );
            let marker = membership.membership_type.used_for_value(flight.date());
            memberships.set_used_for(membership.id, &marker).await?;
        }
    }

    flights.mark_processed(&flight.id).await?;
    Ok(())
}
