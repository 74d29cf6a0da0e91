//! Binance USD-M futures REST client
//!
//! Public market data needs no credentials; leverage and order endpoints are
//! signed with [`RequestSigner`].

use super::{Exchange, RequestSigner};
use crate::config::ExchangeConfig;
use crate::error::{BotError, Result};
use crate::types::{exchange_symbol, Candle, MarketInfo, OrderFill, OrderRequest, Ticker, Timeframe};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, Method, Response};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const MAINNET_URL: &str = "https://fapi.binance.com";
pub const TESTNET_URL: &str = "https://testnet.binancefuture.com";

pub struct BinanceFuturesClient {
    http: Client,
    base_url: String,
    signer: Option<RequestSigner>,
    /// exchange symbol -> precision, filled lazily from exchangeInfo
    markets: RwLock<HashMap<String, MarketInfo>>,
}

#[derive(Debug, Deserialize)]
struct PriceTicker {
    symbol: String,
    price: String,
    time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfoResponse {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    filters: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: Option<i64>,
    executed_qty: Option<String>,
    avg_price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

impl BinanceFuturesClient {
    pub fn new(config: &ExchangeConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config.base_url.clone().unwrap_or_else(|| {
            if config.testnet {
                TESTNET_URL.to_string()
            } else {
                MAINNET_URL.to_string()
            }
        });

        let signer = if config.has_credentials() {
            Some(RequestSigner::new(
                config.api_key.clone(),
                config.api_secret.clone(),
                config.recv_window_ms,
            )?)
        } else {
            None
        };

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
            markets: RwLock::new(HashMap::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.signer.is_some()
    }

    /// Fetch and cache precision data for every listed symbol
    pub async fn load_markets(&self) -> Result<usize> {
        let url = format!("{}/fapi/v1/exchangeInfo", self.base_url);
        let response = self.http.get(&url).send().await?;
        let info: ExchangeInfoResponse = Self::check(response).await?.json().await?;

        let parsed = parse_exchange_info(info)?;
        let count = parsed.len();

        let mut markets = self.markets.write().await;
        for market in parsed {
            markets.insert(market.symbol.clone(), market);
        }

        info!("Loaded {} futures markets from {}", count, self.base_url);
        Ok(count)
    }

    async fn signed_request(&self, method: Method, path: &str, params: &[(&str, String)]) -> Result<Response> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| BotError::Auth("API key and secret are not configured".into()))?;

        let query = signer.signed_query(params, Utc::now().timestamp_millis())?;
        let url = format!("{}{}?{}", self.base_url, path, query);

        let response = self
            .http
            .request(method, &url)
            .header("X-MBX-APIKEY", signer.api_key())
            .send()
            .await?;

        Self::check(response).await
    }

    /// Turn non-2xx responses into structured errors
    async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(err) => Err(BotError::Exchange {
                code: err.code,
                msg: err.msg,
            }),
            Err(_) => Err(BotError::Api(format!("HTTP {}: {}", status, body))),
        }
    }
}

#[async_trait]
impl Exchange for BinanceFuturesClient {
    async fn fetch_candles(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Candle>> {
        let url = format!("{}/fapi/v1/klines", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("symbol", exchange_symbol(symbol)),
                ("interval", timeframe.as_str().to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;

        let rows: Vec<Vec<serde_json::Value>> = Self::check(response).await?.json().await?;
        rows.iter().map(|row| parse_kline(row)).collect()
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker> {
        let url = format!("{}/fapi/v1/ticker/price", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("symbol", exchange_symbol(symbol))])
            .send()
            .await?;

        let ticker: PriceTicker = Self::check(response).await?.json().await?;
        let timestamp = ticker
            .time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);

        debug!("Ticker {} = {}", ticker.symbol, ticker.price);

        Ok(Ticker {
            symbol: symbol.to_string(),
            last: ticker.price.parse()?,
            timestamp,
        })
    }

    async fn market_info(&self, symbol: &str) -> Result<MarketInfo> {
        let key = exchange_symbol(symbol);

        if let Some(info) = self.markets.read().await.get(&key) {
            return Ok(info.clone());
        }

        self.load_markets().await?;

        self.markets
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| BotError::MarketData(format!("Unknown symbol: {}", symbol)))
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()> {
        let params = [
            ("symbol", exchange_symbol(symbol)),
            ("leverage", leverage.to_string()),
        ];
        self.signed_request(Method::POST, "/fapi/v1/leverage", &params).await?;
        info!("Leverage for {} set to {}x", symbol, leverage);
        Ok(())
    }

    async fn create_market_order(&self, order: &OrderRequest) -> Result<OrderFill> {
        let mut params = vec![
            ("symbol", exchange_symbol(&order.symbol)),
            ("side", order.side.as_str().to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", order.quantity.normalize().to_string()),
            ("newOrderRespType", "RESULT".to_string()),
        ];
        if order.reduce_only {
            params.push(("reduceOnly", "true".to_string()));
        }

        let response = self.signed_request(Method::POST, "/fapi/v1/order", &params).await?;
        let body: OrderResponse = response.json().await?;

        info!(
            "Market order {} {} {} accepted (id {:?})",
            order.side, order.quantity, order.symbol, body.order_id
        );

        parse_order_response(body)
    }
}

/// Parse one `/fapi/v1/klines` row: `[openTime, open, high, low, close, volume, ...]`
fn parse_kline(row: &[serde_json::Value]) -> Result<Candle> {
    if row.len() < 6 {
        return Err(BotError::MarketData(format!("Malformed kline: {} fields", row.len())));
    }

    let open_time = row[0]
        .as_i64()
        .ok_or_else(|| BotError::MarketData("Kline open time is not an integer".into()))?;

    let field = |i: usize| -> Result<Decimal> {
        match &row[i] {
            serde_json::Value::String(s) => Ok(s.parse()?),
            other => Err(BotError::MarketData(format!("Unexpected kline field: {}", other))),
        }
    };

    Ok(Candle {
        open_time,
        open: field(1)?,
        high: field(2)?,
        low: field(3)?,
        close: field(4)?,
        volume: field(5)?,
    })
}

fn parse_exchange_info(info: ExchangeInfoResponse) -> Result<Vec<MarketInfo>> {
    let mut markets = Vec::with_capacity(info.symbols.len());

    for symbol in info.symbols {
        let mut tick_size = Decimal::ZERO;
        let mut step_size = Decimal::ZERO;
        let mut min_qty = Decimal::ZERO;

        for filter in &symbol.filters {
            match filter["filterType"].as_str() {
                Some("PRICE_FILTER") => {
                    if let Some(v) = filter["tickSize"].as_str() {
                        tick_size = v.parse()?;
                    }
                }
                Some("LOT_SIZE") => {
                    if let Some(v) = filter["stepSize"].as_str() {
                        step_size = v.parse()?;
                    }
                    if let Some(v) = filter["minQty"].as_str() {
                        min_qty = v.parse()?;
                    }
                }
                _ => {}
            }
        }

        markets.push(MarketInfo {
            symbol: symbol.symbol,
            tick_size: tick_size.normalize(),
            step_size: step_size.normalize(),
            min_qty: min_qty.normalize(),
        });
    }

    Ok(markets)
}

fn parse_order_response(body: OrderResponse) -> Result<OrderFill> {
    let filled = match body.executed_qty {
        Some(q) => q.parse()?,
        None => Decimal::ZERO,
    };
    let average = match body.avg_price {
        Some(p) => p.parse()?,
        None => Decimal::ZERO,
    };

    Ok(OrderFill {
        order_id: body.order_id.map(|id| id.to_string()),
        filled,
        average,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_kline() {
        let row: Vec<serde_json::Value> = serde_json::from_str(
            r#"[1499040000000, "0.01634790", "0.80000000", "0.01575800", "0.01577100", "148976.11427815", 1499644799999, "2434.19055334", 308, "1756.87402397", "28.46694368", "0"]"#,
        )
        .unwrap();

        let candle = parse_kline(&row).unwrap();
        assert_eq!(candle.open_time, 1499040000000);
        assert_eq!(candle.open, dec!(0.01634790));
        assert_eq!(candle.high, dec!(0.8));
        assert_eq!(candle.close, dec!(0.015771));
        assert_eq!(candle.volume, dec!(148976.11427815));
    }

    #[test]
    fn test_parse_kline_rejects_short_rows() {
        let row: Vec<serde_json::Value> = serde_json::from_str(r#"[1, "1", "2"]"#).unwrap();
        assert!(parse_kline(&row).is_err());
    }

    #[test]
    fn test_parse_exchange_info() {
        let info: ExchangeInfoResponse = serde_json::from_str(
            r#"{
                "symbols": [{
                    "symbol": "BTCUSDT",
                    "filters": [
                        {"filterType": "PRICE_FILTER", "minPrice": "556.80", "maxPrice": "4529764", "tickSize": "0.10"},
                        {"filterType": "LOT_SIZE", "minQty": "0.001", "maxQty": "1000", "stepSize": "0.001"},
                        {"filterType": "MIN_NOTIONAL", "notional": "100"}
                    ]
                }]
            }"#,
        )
        .unwrap();

        let markets = parse_exchange_info(info).unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].symbol, "BTCUSDT");
        assert_eq!(markets[0].tick_size, dec!(0.1));
        assert_eq!(markets[0].step_size, dec!(0.001));
        assert_eq!(markets[0].min_qty, dec!(0.001));
    }

    #[test]
    fn test_parse_order_response() {
        let body: OrderResponse = serde_json::from_str(
            r#"{"orderId": 22542179, "status": "FILLED", "executedQty": "0.002", "avgPrice": "64250.10"}"#,
        )
        .unwrap();

        let fill = parse_order_response(body).unwrap();
        assert_eq!(fill.order_id.as_deref(), Some("22542179"));
        assert_eq!(fill.filled, dec!(0.002));
        assert_eq!(fill.average, dec!(64250.10));
    }

    #[test]
    fn test_parse_order_response_without_fill() {
        let body: OrderResponse = serde_json::from_str(r#"{"orderId": 7, "status": "NEW"}"#).unwrap();
        let fill = parse_order_response(body).unwrap();
        assert_eq!(fill.filled, Decimal::ZERO);
        assert_eq!(fill.average, Decimal::ZERO);
    }

    #[test]
    fn test_client_urls() {
        let config = ExchangeConfig::default();
        let client = BinanceFuturesClient::new(&config).unwrap();
        assert_eq!(client.base_url(), TESTNET_URL);
        assert!(!client.is_authenticated());

        let config = ExchangeConfig {
            testnet: false,
            api_key: "key".into(),
            api_secret: "secret".into(),
            ..ExchangeConfig::default()
        };
        let client = BinanceFuturesClient::new(&config).unwrap();
        assert_eq!(client.base_url(), MAINNET_URL);
        assert!(client.is_authenticated());
    }
}
