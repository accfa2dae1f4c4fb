//! Shared fixtures and collaborator fakes for the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::BoxStream;
use rust_decimal::Decimal;

use crate::error::SourceError;
use crate::models::{Flight, Pilot, Transaction};
use crate::services::bank::BankSource;
use crate::services::notifier::Notifier;
use crate::services::xcontest::{ActivitySource, PilotDirectory};

pub fn transaction_fixture(id: &str, amount: Decimal) -> Transaction {
    Transaction {
        id: id.to_string(),
        amount,
        currency: "CZK".to_string(),
        date: "2024-05-01".parse().unwrap(),
        counterparty_account: Some("2212345678".to_string()),
        counterparty_name: Some("Jan Novák".to_string()),
        message: None,
    }
}

pub fn flight_fixture(id: &str, username: &str, datetime: &str) -> Flight {
    Flight {
        id: id.to_string(),
        pilot: Pilot {
            username: username.to_string(),
            id: "42".to_string(),
        },
        datetime: datetime.parse::<DateTime<Utc>>().unwrap(),
        processed: false,
    }
}

/// Records every message instead of sending it; optionally fails each send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), SourceError> {
        if self.failing {
            return Err(SourceError::Malformed("notifier down".to_string()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Bank feed returning a fixed batch once, then nothing - mirrors the
/// source-side cursor of the real feed.
pub struct StaticBank {
    batches: Mutex<Vec<Vec<Transaction>>>,
}

impl StaticBank {
    pub fn with(transactions: Vec<Transaction>) -> Self {
        Self {
            batches: Mutex::new(vec![transactions]),
        }
    }
}

#[async_trait]
impl BankSource for StaticBank {
    async fn new_transactions(&self) -> Result<Vec<Transaction>, SourceError> {
        let mut batches = self.batches.lock().unwrap();
        Ok(if batches.is_empty() {
            Vec::new()
        } else {
            batches.remove(0)
        })
    }
}

/// Activity source streaming a fixed set of flights, optionally ending the
/// stream with a fetch error.
pub struct StaticFlights {
    flights: Vec<Flight>,
    fail_at_end: bool,
}

impl StaticFlights {
    pub fn with(flights: Vec<Flight>) -> Self {
        Self {
            flights,
            fail_at_end: false,
        }
    }

    pub fn failing_after(flights: Vec<Flight>) -> Self {
        Self {
            flights,
            fail_at_end: true,
        }
    }
}

impl ActivitySource for StaticFlights {
    fn flights_since<'a>(
        &'a self,
        _takeoff: &'a str,
        _since: NaiveDate,
    ) -> BoxStream<'a, Result<Flight, SourceError>> {
        let mut items: Vec<Result<Flight, SourceError>> =
            self.flights.iter().cloned().map(Ok).collect();
        if self.fail_at_end {
            items.push(Err(SourceError::Malformed("fetch broke".to_string())));
        }
        Box::pin(futures::stream::iter(items))
    }
}

/// Pilot directory backed by a fixed username -> id table.
pub struct StaticPilots {
    ids: HashMap<String, String>,
}

impl StaticPilots {
    pub fn with(entries: &[(&str, &str)]) -> Self {
        Self {
            ids: entries
                .iter()
                .map(|(username, id)| (username.to_string(), id.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl PilotDirectory for StaticPilots {
    async fn resolve(&self, username: &str) -> Result<Pilot, SourceError> {
        match self.ids.get(username) {
            Some(id) => Ok(Pilot {
                username: username.to_string(),
                id: id.clone(),
            }),
            None => Err(SourceError::Lookup(username.to_string())),
        }
    }
}
