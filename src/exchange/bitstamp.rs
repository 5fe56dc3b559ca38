//! Bitstamp Exchange API client
//!
//! Blocking HTTP client for the Bitstamp v1 REST API. Public market data is a
//! plain GET; account endpoints are signed form POSTs (see [`super::auth`]).

use chrono::{NaiveDateTime, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::auth::Credentials;
use super::Exchange;
use crate::config::ExchangeConfig;
use crate::error::{Result, TradeError};
use crate::money::{format_amount, format_price};
use crate::types::{Balance, OpenOrder, OrderAck, Side, Ticker, UserTransaction};

/// Bitstamp transaction type for a market trade (0 = deposit, 1 = withdrawal)
const TRANSACTION_TYPE_TRADE: i64 = 2;

#[derive(Debug, Clone)]
pub struct BitstampClient {
    base_url: String,
    credentials: Option<Credentials>,
    client: Client,
}

impl BitstampClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(BitstampClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            client,
        })
    }

    /// Build a client from configuration.
    ///
    /// Credentials are optional: without them only the ticker is available.
    pub fn from_config(config: &ExchangeConfig) -> Result<Self> {
        let credentials = match (&config.client_id, &config.api_key, &config.api_secret) {
            (Some(client_id), Some(key), Some(secret)) => {
                Some(Credentials::new(client_id, key, secret))
            }
            _ => None,
        };
        Self::new(&config.base_url, credentials, config.timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Nonce as unix time in microseconds, which keeps it strictly increasing
    fn nonce() -> String {
        Utc::now().timestamp_micros().to_string()
    }

    fn public_get(&self, path: &str) -> Result<Value> {
        debug!("GET {}", path);
        let response = self.client.get(self.url(path)).send()?;
        Self::parse(response)
    }

    fn private_post(&self, path: &str, params: &[(&'static str, String)]) -> Result<Value> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(TradeError::MissingCredentials)?;

        let mut form = credentials.auth_fields(&Self::nonce());
        form.extend(params.iter().cloned());

        debug!("POST {}", path);
        let response = self.client.post(self.url(path)).form(&form).send()?;
        Self::parse(response)
    }

    fn parse(response: reqwest::blocking::Response) -> Result<Value> {
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(TradeError::Api(format!("HTTP {}: {}", status, body.trim())));
        }

        let value: Value = serde_json::from_str(&body)?;
        check_api_error(value)
    }
}

/// Turn an `{"error": ...}` payload into [`TradeError::Api`]
fn check_api_error(value: Value) -> Result<Value> {
    if let Some(error) = value.as_object().and_then(|obj| obj.get("error")) {
        return Err(TradeError::Api(error.to_string()));
    }
    Ok(value)
}

impl Exchange for BitstampClient {
    fn current_price(&self) -> Result<Ticker> {
        let ticker: TickerResponse = serde_json::from_value(self.public_get("/api/ticker/")?)?;
        Ok(Ticker {
            buy: ticker.ask,
            sell: ticker.bid,
        })
    }

    fn balance(&self) -> Result<Balance> {
        let balance: BalanceResponse =
            serde_json::from_value(self.private_post("/api/balance/", &[])?)?;
        Ok(Balance {
            usd: balance.usd_balance,
            btc: balance.btc_balance,
            fee: balance.fee,
        })
    }

    fn open_orders(&self) -> Result<Vec<OpenOrder>> {
        let orders: Vec<OpenOrderResponse> =
            serde_json::from_value(self.private_post("/api/open_orders/", &[])?)?;
        Ok(orders.into_iter().map(|o| OpenOrder { id: o.id }).collect())
    }

    fn cancel_order(&self, id: u64) -> Result<()> {
        self.private_post("/api/cancel_order/", &[("id", id.to_string())])?;
        debug!("Cancelled order {}", id);
        Ok(())
    }

    fn buy_order(&self, amount: f64, price: f64) -> Result<OrderAck> {
        place(self, "/api/buy/", Side::Buy, amount, price)
    }

    fn sell_order(&self, amount: f64, price: f64) -> Result<OrderAck> {
        place(self, "/api/sell/", Side::Sell, amount, price)
    }

    fn transactions(&self) -> Result<Vec<UserTransaction>> {
        let rows: Vec<TransactionResponse> =
            serde_json::from_value(self.private_post("/api/user_transactions/", &[])?)?;

        rows.into_iter()
            .filter(|row| row.kind.map_or(true, |k| k == TRANSACTION_TYPE_TRADE))
            .map(|row| {
                let time = NaiveDateTime::parse_from_str(&row.datetime, "%Y-%m-%d %H:%M:%S%.f")
                    .map_err(|_| TradeError::InvalidValue {
                        key: "datetime".to_string(),
                        value: row.datetime.clone(),
                    })?
                    .and_utc()
                    .timestamp();

                Ok(UserTransaction {
                    time,
                    usd: row.usd,
                    btc: row.btc,
                    rate: row.btc_usd,
                })
            })
            .collect()
    }
}

fn place(
    client: &BitstampClient,
    path: &str,
    side: Side,
    amount: f64,
    price: f64,
) -> Result<OrderAck> {
    let params = [("amount", format_amount(amount)), ("price", format_price(price))];
    let response: OrderResponse = serde_json::from_value(client.private_post(path, &params)?)?;

    info!(
        "{} order {} placed: {} BTC @ ${}",
        side, response.id, params[0].1, params[1].1
    );

    Ok(OrderAck {
        id: response.id,
        side,
        amount: response.amount.unwrap_or(amount),
        price: response.price.unwrap_or(price),
    })
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TickerResponse {
    #[serde(deserialize_with = "de_f64")]
    ask: f64,
    #[serde(deserialize_with = "de_f64")]
    bid: f64,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    #[serde(deserialize_with = "de_f64")]
    usd_balance: f64,
    #[serde(deserialize_with = "de_f64")]
    btc_balance: f64,
    #[serde(deserialize_with = "de_f64")]
    fee: f64,
}

#[derive(Debug, Deserialize)]
struct OpenOrderResponse {
    #[serde(deserialize_with = "de_u64")]
    id: u64,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    #[serde(deserialize_with = "de_u64")]
    id: u64,
    #[serde(default, deserialize_with = "de_opt_f64")]
    amount: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    datetime: String,
    #[serde(rename = "type", default, deserialize_with = "de_opt_i64")]
    kind: Option<i64>,
    #[serde(default, deserialize_with = "de_f64")]
    usd: f64,
    #[serde(default, deserialize_with = "de_f64")]
    btc: f64,
    #[serde(default, deserialize_with = "de_f64")]
    btc_usd: f64,
}

/// Bitstamp sends most numbers as strings
#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Int(i64),
    Float(f64),
    Str(String),
}

impl NumOrStr {
    fn as_f64(&self) -> std::result::Result<f64, String> {
        match self {
            NumOrStr::Int(n) => Ok(*n as f64),
            NumOrStr::Float(n) => Ok(*n),
            NumOrStr::Str(s) => s.trim().parse().map_err(|_| format!("not a number: {}", s)),
        }
    }

    fn as_i64(&self) -> std::result::Result<i64, String> {
        match self {
            NumOrStr::Int(n) => Ok(*n),
            NumOrStr::Float(n) => Ok(*n as i64),
            NumOrStr::Str(s) => s.trim().parse().map_err(|_| format!("not an integer: {}", s)),
        }
    }
}

fn de_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    NumOrStr::deserialize(d)?
        .as_f64()
        .map_err(serde::de::Error::custom)
}

fn de_opt_f64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    Option::<NumOrStr>::deserialize(d)?
        .map(|v| v.as_f64().map_err(serde::de::Error::custom))
        .transpose()
}

fn de_opt_i64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<i64>, D::Error> {
    Option::<NumOrStr>::deserialize(d)?
        .map(|v| v.as_i64().map_err(serde::de::Error::custom))
        .transpose()
}

fn de_u64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u64, D::Error> {
    let id = NumOrStr::deserialize(d)?
        .as_i64()
        .map_err(serde::de::Error::custom)?;
    u64::try_from(id).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> BitstampClient {
        BitstampClient::new(
            server.url(),
            Some(Credentials::new("123", "key", "secret")),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_ticker_maps_ask_and_bid() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/api/ticker/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"high": "440.00", "last": "431.00", "ask": "431.50", "bid": "430.10"}"#)
            .create();

        let ticker = client(&server).current_price().unwrap();

        mock.assert();
        assert_eq!(ticker.buy, 431.50);
        assert_eq!(ticker.sell, 430.10);
    }

    #[test]
    fn test_balance_is_signed_post() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/balance/")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "key".into()),
                Matcher::Regex("nonce=[0-9]+".into()),
                Matcher::Regex("signature=[0-9A-F]{64}".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"usd_balance": "1200.50", "btc_balance": "0.75000000", "fee": "0.5000"}"#)
            .create();

        let balance = client(&server).balance().unwrap();

        mock.assert();
        assert_eq!(balance.usd, 1200.50);
        assert_eq!(balance.btc, 0.75);
        assert_eq!(balance.fee, 0.5);
    }

    #[test]
    fn test_error_payload_becomes_api_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/sell/")
            .with_status(200)
            .with_body(r#"{"error": {"__all__": ["You have only 0.1 BTC available."]}}"#)
            .create();

        let err = client(&server).sell_order(1.0, 430.0).unwrap_err();

        assert!(err.is_api());
        assert!(err.to_string().contains("0.1 BTC available"));
    }

    #[test]
    fn test_sell_order_sends_wire_formatted_values() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/sell/")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("amount".into(), "0.12345678".into()),
                Matcher::UrlEncoded("price".into(), "429.25".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"id": 98765, "type": 1, "price": "429.25", "amount": "0.12345678"}"#)
            .create();

        let ack = client(&server).sell_order(0.123456789, 429.25).unwrap();

        mock.assert();
        assert_eq!(ack.id, 98765);
        assert_eq!(ack.side, Side::Sell);
        assert_eq!(ack.price, 429.25);
    }

    #[test]
    fn test_cancel_all_orders_cancels_each() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/open_orders/")
            .with_status(200)
            .with_body(r#"[{"id": 1, "price": "430.00"}, {"id": "2", "price": "431.00"}]"#)
            .create();
        let cancel = server
            .mock("POST", "/api/cancel_order/")
            .with_status(200)
            .with_body("true")
            .expect(2)
            .create();

        let cancelled = client(&server).cancel_all_orders().unwrap();

        cancel.assert();
        assert_eq!(cancelled, 2);
    }

    #[test]
    fn test_transactions_keep_only_trades() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/user_transactions/")
            .with_status(200)
            .with_body(
                r#"[
                    {"datetime": "2014-04-12 10:15:00", "type": 2, "usd": "480.00", "btc": "-1.00000000", "btc_usd": "480.00", "fee": "2.40"},
                    {"datetime": "2014-04-10 09:00:00.123456", "type": "2", "usd": "-500.00", "btc": "1.00000000", "btc_usd": "500.00", "fee": "2.50"},
                    {"datetime": "2014-04-01 08:00:00", "type": 0, "usd": "1000.00", "btc": "0", "btc_usd": "0.00", "fee": "0"}
                ]"#,
            )
            .create();

        let txs = client(&server).transactions().unwrap();

        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].side(), Some(Side::Sell));
        assert_eq!(txs[0].rate, 480.0);
        assert_eq!(txs[1].side(), Some(Side::Buy));
        assert!(txs[0].time > txs[1].time);
    }

    #[test]
    fn test_private_call_without_credentials() {
        let server = mockito::Server::new();
        let client = BitstampClient::new(server.url(), None, Duration::from_secs(5)).unwrap();

        assert!(matches!(client.balance(), Err(TradeError::MissingCredentials)));
    }

    #[test]
    fn test_http_failure_is_api_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/api/ticker/")
            .with_status(503)
            .with_body("maintenance")
            .create();

        let err = client(&server).current_price().unwrap_err();
        assert!(err.is_api());
        assert!(err.to_string().contains("503"));
    }
}
