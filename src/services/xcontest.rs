use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::SourceError;
use crate::models::{Flight, Pilot};

/// Feed of flights at a takeoff. Returns a lazy, finite stream; each call
/// restarts from the cutoff date, so a failed cycle is simply retried whole.
pub trait ActivitySource: Send + Sync {
    fn flights_since<'a>(
        &'a self,
        takeoff: &'a str,
        since: NaiveDate,
    ) -> BoxStream<'a, Result<Flight, SourceError>>;
}

/// Resolves a pilot username to the stable identity used in stored records.
#[async_trait]
pub trait PilotDirectory: Send + Sync {
    async fn resolve(&self, username: &str) -> Result<Pilot, SourceError>;
}

const PAGE_SIZE: usize = 50;

/// Client for the XContest flight listings.
pub struct XContest {
    client: reqwest::Client,
    base_url: String,
}

impl XContest {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn fetch_page(
        &self,
        takeoff: &str,
        since: NaiveDate,
        offset: usize,
    ) -> Result<Vec<Flight>, SourceError> {
        let url = format!("{}/api/flights", self.base_url);
        let page: FlightPage = self
            .client
            .get(&url)
            .query(&[
                ("takeoff", takeoff),
                ("from", &since.to_string()),
                ("offset", &offset.to_string()),
                ("limit", &PAGE_SIZE.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(page.items.into_iter().map(Flight::from).collect())
    }
}

impl ActivitySource for XContest {
    fn flights_since<'a>(
        &'a self,
        takeoff: &'a str,
        since: NaiveDate,
    ) -> BoxStream<'a, Result<Flight, SourceError>> {
        // Paged fetch flattened into one stream; consumers never see pages.
        futures::stream::try_unfold(0usize, move |offset| async move {
            let page = self.fetch_page(takeoff, since, offset).await?;
            if page.is_empty() {
                Ok::<_, SourceError>(None)
            } else {
                let next = offset + page.len();
                Ok(Some((page, next)))
            }
        })
        .map_ok(|page| futures::stream::iter(page.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
    }
}

#[async_trait]
impl PilotDirectory for XContest {
    async fn resolve(&self, username: &str) -> Result<Pilot, SourceError> {
        let url = format!("{}/api/pilots/{}", self.base_url, username);
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::Lookup(username.to_string()));
        }

        let dto: PilotDto = response.error_for_status()?.json().await?;
        Ok(Pilot {
            username: username.to_string(),
            id: dto.id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FlightPage {
    #[serde(default)]
    items: Vec<FlightDto>,
}

#[derive(Debug, Deserialize)]
struct FlightDto {
    id: String,
    pilot: FlightPilotDto,
    datetime: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct FlightPilotDto {
    username: String,
    id: String,
}

#[derive(Debug, Deserialize)]
struct PilotDto {
    id: String,
}

impl From<FlightDto> for Flight {
    fn from(dto: FlightDto) -> Self {
        Flight {
            id: dto.id,
            pilot: Pilot {
                username: dto.pilot.username,
                id: dto.pilot.id,
            },
            datetime: dto.datetime,
            processed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn flight_json(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "pilot": {"username": "jan_novak", "id": "42"},
            "datetime": "2024-05-01T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn streams_flights_across_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/flights"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [flight_json("fl-1"), flight_json("fl-2")]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/flights"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;

        let xcontest = XContest::new(reqwest::Client::new(), server.uri());
        let flights: Vec<Flight> = xcontest
            .flights_since("doubrava", "2024-04-29".parse().unwrap())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(flights.len(), 2);
        assert_eq!(flights[0].id, "fl-1");
        assert!(!flights[0].processed);
    }

    #[tokio::test]
    async fn fetch_failure_surfaces_as_stream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let xcontest = XContest::new(reqwest::Client::new(), server.uri());
        let result: Result<Vec<Flight>, _> = xcontest
            .flights_since("doubrava", "2024-04-29".parse().unwrap())
            .try_collect()
            .await;

        assert!(matches!(result, Err(SourceError::Http(_))));
    }

    #[tokio::test]
    async fn resolves_pilot_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/pilots/jan_novak"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "42"})))
            .mount(&server)
            .await;

        let xcontest = XContest::new(reqwest::Client::new(), server.uri());
        let pilot = xcontest.resolve("jan_novak").await.unwrap();
        assert_eq!(pilot.username, "jan_novak");
        assert_eq!(pilot.id, "42");
    }

    #[tokio::test]
    async fn unknown_pilot_is_a_lookup_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let xcontest = XContest::new(reqwest::Client::new(), server.uri());
        let err = xcontest.resolve("nobody").await.unwrap_err();
        assert!(matches!(err, SourceError::Lookup(u) if u == "nobody"));
    }
}
