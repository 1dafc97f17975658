//! Polymarket CLOB REST client implementing [`MarketGateway`].

use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use super::gateway::MarketGateway;
use super::types::{Market, Outcome};
use crate::config::Config;
use crate::error::GatewayError;
use crate::metrics;
use crate::signing::ApiCredentials;
use crate::trading::{Order, OrderParams, OrderStatus, OrderType};

/// Cursor value the CLOB returns after the last page.
const END_CURSOR: &str = "LTE=";

/// USDC has 6 decimals on Polygon.
const USDC_DECIMALS: u32 = 6;

/// Polymarket CLOB API client.
#[derive(Debug, Clone)]
pub struct PolymarketClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL for CLOB API.
    clob_url: String,
    /// L2 credentials; `None` restricts the client to market data.
    credentials: Option<ApiCredentials>,
    /// Chain ID (137 for Polygon).
    chain_id: u64,
    /// Maximum pages fetched by one `list_markets` call.
    max_pages: u32,
}

/// One page of `GET /markets`.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketsPage {
    /// Markets on this page.
    #[serde(default)]
    pub data: Vec<ClobMarket>,
    /// Cursor for the next page.
    pub next_cursor: Option<String>,
}

/// Market as returned by the CLOB.
#[derive(Debug, Clone, Deserialize)]
pub struct ClobMarket {
    /// Condition id.
    pub condition_id: Option<String>,
    /// Market question.
    pub question: Option<String>,
    /// Whether the market is active.
    #[serde(default)]
    pub active: bool,
    /// Whether the market is closed.
    #[serde(default)]
    pub closed: bool,
    /// Whether the market is archived.
    #[serde(default)]
    pub archived: bool,
    /// Whether the book accepts orders.
    #[serde(default)]
    pub accepting_orders: bool,
    /// End date (ISO format).
    pub end_date_iso: Option<String>,
    /// Outcome tokens.
    #[serde(default)]
    pub tokens: Vec<ClobToken>,
}

/// Outcome token of a CLOB market.
#[derive(Debug, Clone, Deserialize)]
pub struct ClobToken {
    /// Token id used for order routing.
    pub token_id: String,
    /// Outcome label ("Yes"/"No" for binary markets).
    pub outcome: Option<String>,
    /// Last price, as a number or a string.
    pub price: Option<Value>,
}

/// Balance allowance response from API.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceAllowanceResponse {
    /// Balance in base units.
    pub balance: Option<String>,
}

/// Response to `POST /order`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostOrderResponse {
    /// Whether the venue accepted the order.
    #[serde(default)]
    pub success: bool,
    /// Error message when rejected.
    pub error_msg: Option<String>,
    /// Venue order id.
    #[serde(rename = "orderID")]
    pub order_id: Option<String>,
    /// Order status.
    pub status: Option<String>,
}

/// Response to `DELETE /order`.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelResponse {
    /// Ids the venue cancelled.
    #[serde(default)]
    pub canceled: Vec<String>,
}

/// Parse a price that may arrive as a JSON number or string.
fn parse_decimal_field(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

/// Order type name on the CLOB, which has no plain limit type.
fn venue_order_type(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Limit | OrderType::Gtc => "GTC",
        OrderType::Fok => "FOK",
    }
}

/// Map a CLOB market onto a YES/NO snapshot.
///
/// Tokens labelled "Yes"/"No" are matched by label, otherwise the first token
/// is the YES leg and the second the NO leg. Markets without two tokens are
/// skipped.
pub fn convert_market(raw: ClobMarket) -> Option<Market> {
    let id = raw.condition_id?;
    if raw.tokens.len() < 2 {
        return None;
    }

    let by_label = |label: Outcome| {
        raw.tokens.iter().find(|t| {
            t.outcome
                .as_deref()
                .and_then(|o| Outcome::from_str(o).ok())
                .is_some_and(|o| o == label)
        })
    };

    let (yes, no) = match (by_label(Outcome::Yes), by_label(Outcome::No)) {
        (Some(yes), Some(no)) => (yes, no),
        _ => (&raw.tokens[0], &raw.tokens[1]),
    };

    Some(Market {
        id,
        description: raw.question.unwrap_or_default(),
        yes_price: parse_decimal_field(yes.price.as_ref()).unwrap_or(Decimal::ZERO),
        no_price: parse_decimal_field(no.price.as_ref()).unwrap_or(Decimal::ZERO),
        yes_token_id: Some(yes.token_id.clone()),
        no_token_id: Some(no.token_id.clone()),
        active: raw.active && !raw.closed,
        accepting_orders: raw.accepting_orders,
        archived: raw.archived,
        end_date: raw
            .end_date_iso
            .as_deref()
            .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok()),
        created_at: None,
    })
}

impl PolymarketClient {
    /// Create a new Polymarket client from config.
    ///
    /// Credentials are optional; without them only market data is available.
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_millis(config.http_timeout_ms.min(2000)))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http,
            clob_url: config.polymarket_clob_url.trim_end_matches('/').to_string(),
            credentials: ApiCredentials::from_config(config),
            chain_id: config.polymarket_chain_id,
            max_pages: config.max_market_pages.max(1),
        })
    }

    /// Get the CLOB base URL.
    pub fn clob_url(&self) -> &str {
        &self.clob_url
    }

    /// Get the chain ID.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Whether authenticated endpoints can be used.
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    fn credentials(&self, operation: &str) -> Result<&ApiCredentials, GatewayError> {
        self.credentials.as_ref().ok_or_else(|| {
            GatewayError::MissingCredentials(format!("{} requires POLYMARKET_API_KEY", operation))
        })
    }

    /// Build an authenticated request with L2 headers.
    fn signed_request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<String>,
        operation: &str,
    ) -> Result<reqwest::RequestBuilder, GatewayError> {
        let creds = self.credentials(operation)?;
        let timestamp = chrono::Utc::now().timestamp();
        let body_str = body.as_deref().unwrap_or("");
        let headers = creds.l2_headers(method.as_str(), path, body_str, timestamp)?;

        let mut request = self
            .http
            .request(method, format!("{}{}", self.clob_url, path));
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }
        Ok(request)
    }

    /// Turn a non-success response into a status error.
    async fn check_status(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GatewayError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Status {
            endpoint: endpoint.to_string(),
            status,
            body,
        })
    }

    /// Fetch one page of markets.
    async fn fetch_markets_page(&self, cursor: Option<&str>) -> Result<MarketsPage, GatewayError> {
        let mut request = self.http.get(format!("{}/markets", self.clob_url));
        if let Some(cursor) = cursor {
            request = request.query(&[("next_cursor", cursor)]);
        }

        let response = Self::check_status("/markets", request.send().await?).await?;
        response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(format!("failed to parse markets page: {}", e)))
    }
}

#[async_trait]
impl MarketGateway for PolymarketClient {
    #[instrument(skip(self))]
    async fn list_markets(&self, active_only: bool) -> Result<Vec<Market>, GatewayError> {
        let mut markets = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 0..self.max_pages {
            let batch = self.fetch_markets_page(cursor.as_deref()).await?;
            debug!(page, count = batch.data.len(), "Fetched markets page");

            markets.extend(
                batch
                    .data
                    .into_iter()
                    .filter_map(convert_market)
                    .filter(|m| !active_only || m.is_tradeable()),
            );

            match batch.next_cursor {
                Some(next) if !next.is_empty() && next != END_CURSOR => cursor = Some(next),
                _ => break,
            }
        }

        debug!(count = markets.len(), active_only, "Listed markets");
        Ok(markets)
    }

    #[instrument(skip(self))]
    async fn get_balance(&self) -> Result<Decimal, GatewayError> {
        let path = "/balance-allowance";
        let creds = self.credentials("get_balance")?;
        let signature_type = creds.signature_type.to_string();

        let request = self
            .signed_request(reqwest::Method::GET, path, None, "get_balance")?
            .query(&[
                ("asset_type", "COLLATERAL"),
                ("signature_type", signature_type.as_str()),
            ]);

        let response = Self::check_status(path, request.send().await?).await?;
        let body: BalanceAllowanceResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(format!("failed to parse balance: {}", e)))?;

        let base_units: Decimal = body
            .balance
            .as_deref()
            .unwrap_or("0")
            .parse()
            .map_err(|e| GatewayError::Parse(format!("invalid balance value: {}", e)))?;

        let balance = base_units / Decimal::from(10u64.pow(USDC_DECIMALS));
        debug!(balance = %balance, "Retrieved USDC balance");
        Ok(balance)
    }

    #[instrument(skip(self, params), fields(market = %params.market_id, outcome = %params.outcome))]
    async fn place_order(&self, params: &OrderParams) -> Result<Order, GatewayError> {
        params.validate().map_err(GatewayError::InvalidParams)?;
        if params.price > Decimal::ONE {
            return Err(GatewayError::InvalidParams(format!(
                "price {} outside [0, 1]",
                params.price
            )));
        }
        let token_id = params.token_id.as_deref().ok_or_else(|| {
            GatewayError::InvalidParams(format!(
                "market {} has no token id for {}",
                params.market_id, params.outcome
            ))
        })?;

        let path = "/order";
        let body = json!({
            "tokenID": token_id,
            "price": params.price.to_string(),
            "size": params.size.to_string(),
            "side": params.side.to_string(),
            "orderType": venue_order_type(params.order_type),
        })
        .to_string();

        let started = Instant::now();
        let request = self.signed_request(reqwest::Method::POST, path, Some(body), "place_order")?;
        let response = Self::check_status(path, request.send().await?).await?;
        metrics::record_order_submit_latency(started);

        let ack: PostOrderResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(format!("failed to parse order response: {}", e)))?;

        let order_id = match ack.order_id {
            Some(id) if ack.success && !id.is_empty() => id,
            _ => {
                let reason = ack
                    .error_msg
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "order not accepted".to_string());
                warn!(reason = %reason, "Order rejected by venue");
                return Err(GatewayError::OrderRejected { reason });
            }
        };

        let status = ack
            .status
            .as_deref()
            .and_then(|s| OrderStatus::from_str(s).ok())
            .unwrap_or(OrderStatus::Live);

        info!(order_id = %order_id, status = %status, "Order accepted");
        Ok(Order::from_params(order_id, params, status))
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: &str) -> Result<bool, GatewayError> {
        let path = "/order";
        let body = json!({ "orderID": order_id }).to_string();

        let request =
            self.signed_request(reqwest::Method::DELETE, path, Some(body), "cancel_order")?;
        let response = Self::check_status(path, request.send().await?).await?;
        let result: CancelResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(format!("failed to parse cancel response: {}", e)))?;

        let cancelled = result.canceled.iter().any(|id| id == order_id);
        debug!(cancelled, "Cancel processed");
        Ok(cancelled)
    }

    fn name(&self) -> &'static str {
        "polymarket"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn market_json(tokens: Value) -> ClobMarket {
        serde_json::from_value(json!({
            "condition_id": "0xcond",
            "question": "Will it rain tomorrow?",
            "active": true,
            "closed": false,
            "archived": false,
            "accepting_orders": true,
            "end_date_iso": "2026-12-31T00:00:00Z",
            "tokens": tokens,
        }))
        .unwrap()
    }

    #[test]
    fn client_creation_works() {
        let client = PolymarketClient::new(&Config::default()).unwrap();
        assert_eq!(client.chain_id(), 137);
        assert_eq!(client.clob_url(), "https://clob.polymarket.com");
        assert!(!client.has_credentials());
    }

    #[test]
    fn converts_labelled_tokens() {
        let raw = market_json(json!([
            {"token_id": "t-no", "outcome": "No", "price": 0.46},
            {"token_id": "t-yes", "outcome": "Yes", "price": "0.52"},
        ]));

        let market = convert_market(raw).unwrap();

        assert_eq!(market.id, "0xcond");
        assert_eq!(market.yes_price, dec!(0.52));
        assert_eq!(market.no_price, dec!(0.46));
        assert_eq!(market.yes_token_id.as_deref(), Some("t-yes"));
        assert_eq!(market.no_token_id.as_deref(), Some("t-no"));
        assert!(market.end_date.is_some());
        assert!(market.is_tradeable());
    }

    #[test]
    fn unlabelled_tokens_use_position() {
        let raw = market_json(json!([
            {"token_id": "first", "outcome": "Lakers", "price": 0.3},
            {"token_id": "second", "outcome": "Celtics", "price": 0.6},
        ]));

        let market = convert_market(raw).unwrap();

        assert_eq!(market.yes_token_id.as_deref(), Some("first"));
        assert_eq!(market.no_price, dec!(0.6));
    }

    #[test]
    fn missing_price_becomes_zero() {
        let raw = market_json(json!([
            {"token_id": "a", "outcome": "Yes"},
            {"token_id": "b", "outcome": "No", "price": null},
        ]));

        let market = convert_market(raw).unwrap();

        assert_eq!(market.yes_price, Decimal::ZERO);
        assert!(!market.has_valid_prices());
    }

    #[test]
    fn single_token_market_is_skipped() {
        let raw = market_json(json!([{"token_id": "a", "outcome": "Yes", "price": 0.5}]));
        assert!(convert_market(raw).is_none());
    }

    #[test]
    fn closed_market_is_not_active() {
        let mut raw = market_json(json!([
            {"token_id": "a", "outcome": "Yes", "price": 0.5},
            {"token_id": "b", "outcome": "No", "price": 0.4},
        ]));
        raw.closed = true;

        assert!(!convert_market(raw).unwrap().is_tradeable());
    }

    #[tokio::test]
    async fn authenticated_calls_require_credentials() {
        let client = PolymarketClient::new(&Config::default()).unwrap();

        let err = client.get_balance().await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredentials(_)));

        let params = OrderParams::buy("m1", Outcome::Yes, Some("tok".into()), dec!(0.5), dec!(1));
        let err = client.place_order(&params).await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredentials(_)));
    }

    #[tokio::test]
    async fn place_order_validates_before_sending() {
        let client = PolymarketClient::new(&Config::default()).unwrap();

        let too_high = OrderParams::buy("m1", Outcome::Yes, Some("tok".into()), dec!(1.02), dec!(1));
        let err = client.place_order(&too_high).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParams(_)));

        let no_token = OrderParams::buy("m1", Outcome::No, None, dec!(0.5), dec!(1));
        let err = client.place_order(&no_token).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParams(_)));
    }

    #[test]
    fn limit_orders_rest_as_gtc() {
        assert_eq!(venue_order_type(OrderType::Limit), "GTC");
        assert_eq!(venue_order_type(OrderType::Fok), "FOK");
    }

    #[test]
    fn parses_post_order_response() {
        let ack: PostOrderResponse = serde_json::from_value(json!({
            "success": true,
            "errorMsg": "",
            "orderID": "0xorder",
            "status": "matched"
        }))
        .unwrap();

        assert!(ack.success);
        assert_eq!(ack.order_id.as_deref(), Some("0xorder"));
    }
}
