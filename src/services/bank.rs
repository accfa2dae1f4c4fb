use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use crate::error::SourceError;
use crate::models::Transaction;

/// Feed of bank account movements. The source, not this engine, owns the
/// "new" cursor: each call returns only transactions not seen by a previous
/// call.
#[async_trait]
pub trait BankSource: Send + Sync {
    async fn new_transactions(&self) -> Result<Vec<Transaction>, SourceError>;
}

/// Client for the Fio bank REST API.
///
/// Uses the `/last/` endpoint, which advances a server-side cursor on every
/// successful fetch and therefore returns each transaction exactly once.
pub struct FioBank {
    client: reqwest::Client,
    token: Secret<String>,
    base_url: String,
}

impl FioBank {
    pub fn new(client: reqwest::Client, token: Secret<String>, base_url: String) -> Self {
        Self {
            client,
            token,
            base_url,
        }
    }
}

#[async_trait]
impl BankSource for FioBank {
    async fn new_transactions(&self) -> Result<Vec<Transaction>, SourceError> {
        let url = format!(
            "{}/last/{}/transactions.json",
            self.base_url,
            self.token.expose_secret()
        );

        let statement: StatementResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        statement
            .account_statement
            .transaction_list
            .transaction
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}

// Fio wire format: each field is a numbered "column" object; absent fields
// come through as null.

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(rename = "accountStatement")]
    account_statement: AccountStatement,
}

#[derive(Debug, Deserialize)]
struct AccountStatement {
    #[serde(rename = "transactionList")]
    transaction_list: TransactionList,
}

#[derive(Debug, Deserialize)]
struct TransactionList {
    #[serde(default)]
    transaction: Vec<FioTransaction>,
}

#[derive(Debug, Deserialize)]
struct FioTransaction {
    #[serde(rename = "column22")]
    id: Option<Column<i64>>,
    #[serde(rename = "column0")]
    date: Option<Column<String>>,
    #[serde(rename = "column1")]
    amount: Option<Column<Decimal>>,
    #[serde(rename = "column14")]
    currency: Option<Column<String>>,
    #[serde(rename = "column2")]
    counterparty_account: Option<Column<String>>,
    #[serde(rename = "column10")]
    counterparty_name: Option<Column<String>>,
    #[serde(rename = "column16")]
    message: Option<Column<String>>,
}

#[derive(Debug, Deserialize)]
struct Column<T> {
    value: T,
}

impl TryFrom<FioTransaction> for Transaction {
    type Error = SourceError;

    fn try_from(t: FioTransaction) -> Result<Self, Self::Error> {
        let id = t
            .id
            .ok_or_else(|| SourceError::Malformed("transaction without id".to_string()))?
            .value
            .to_string();
        let raw_date = t
            .date
            .ok_or_else(|| SourceError::Malformed(format!("transaction {id} without date")))?
            .value;
        // Fio dates look like "2024-05-01+0200"; the offset is irrelevant here.
        let date = raw_date
            .get(..10)
            .and_then(|d| d.parse().ok())
            .ok_or_else(|| SourceError::Malformed(format!("unparsable date {raw_date:?}")))?;
        let amount = t
            .amount
            .ok_or_else(|| SourceError::Malformed(format!("transaction {id} without amount")))?
            .value;

        Ok(Transaction {
            id,
            amount,
            currency: t.currency.map(|c| c.value).unwrap_or_else(|| "CZK".to_string()),
            date,
            counterparty_account: t.counterparty_account.map(|c| c.value),
            counterparty_name: t.counterparty_name.map(|c| c.value),
            message: t.message.map(|c| c.value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fio(base_url: String) -> FioBank {
        FioBank::new(
            reqwest::Client::new(),
            Secret::new("test-token".to_string()),
            base_url,
        )
    }

    #[tokio::test]
    async fn parses_fio_statement() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/last/test-token/transactions.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accountStatement": {
                    "transactionList": {
                        "transaction": [{
                            "column22": {"value": 98765, "name": "ID pohybu"},
                            "column0": {"value": "2024-05-01+0200", "name": "Datum"},
                            "column1": {"value": 150.0, "name": "Objem"},
                            "column14": {"value": "CZK", "name": "Měna"},
                            "column2": {"value": "2212345678", "name": "Protiúčet"},
                            "column10": {"value": "Novák, Jan", "name": "Název protiúčtu"},
                            "column16": {"value": "daily pass", "name": "Zpráva"}
                        }]
                    }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let transactions = fio(server.uri()).new_transactions().await.unwrap();

        assert_eq!(transactions.len(), 1);
        let t = &transactions[0];
        assert_eq!(t.id, "98765");
        assert_eq!(t.amount, Decimal::from(150));
        assert_eq!(t.date, "2024-05-01".parse().unwrap());
        assert_eq!(t.counterparty_name.as_deref(), Some("Novák, Jan"));
    }

    #[tokio::test]
    async fn empty_statement_yields_no_transactions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accountStatement": {"transactionList": {}}
            })))
            .mount(&server)
            .await;

        let transactions = fio(server.uri()).new_transactions().await.unwrap();
        assert!(transactions.is_empty());
    }

    #[tokio::test]
    async fn server_error_is_a_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = fio(server.uri()).new_transactions().await.unwrap_err();
        assert!(matches!(err, SourceError::Http(_)));
    }
}
