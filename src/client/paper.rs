//! Paper exchange: live market data, simulated execution
//!
//! Market orders fill immediately and completely at the current ticker price.
//! Nothing is sent to the venue.

use super::Exchange;
use crate::error::Result;
use crate::types::{Candle, MarketInfo, OrderFill, OrderRequest, Side, Ticker, Timeframe};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Simulated fill record
#[derive(Debug, Clone)]
pub struct PaperFill {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub reduce_only: bool,
    pub timestamp: DateTime<Utc>,
}

pub struct PaperExchange {
    market: Arc<dyn Exchange>,
    fills: Mutex<Vec<PaperFill>>,
    /// Signed net position per symbol (positive = long)
    positions: Mutex<HashMap<String, Decimal>>,
}

impl PaperExchange {
    pub fn new(market: Arc<dyn Exchange>) -> Self {
        Self {
            market,
            fills: Mutex::new(Vec::new()),
            positions: Mutex::new(HashMap::new()),
        }
    }

    pub fn fills(&self) -> Vec<PaperFill> {
        self.fills.lock().clone()
    }

    pub fn position(&self, symbol: &str) -> Decimal {
        self.positions.lock().get(symbol).copied().unwrap_or(Decimal::ZERO)
    }
}

#[async_trait]
impl Exchange for PaperExchange {
    async fn fetch_candles(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Candle>> {
        self.market.fetch_candles(symbol, timeframe, limit).await
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker> {
        self.market.fetch_ticker(symbol).await
    }

    async fn market_info(&self, symbol: &str) -> Result<MarketInfo> {
        self.market.market_info(symbol).await
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()> {
        info!("[PAPER] Leverage for {} set to {}x", symbol, leverage);
        Ok(())
    }

    async fn create_market_order(&self, order: &OrderRequest) -> Result<OrderFill> {
        let price = self.market.fetch_ticker(&order.symbol).await?.last;

        let mut quantity = order.quantity;
        {
            let mut positions = self.positions.lock();
            let net = positions.entry(order.symbol.clone()).or_insert(Decimal::ZERO);
            if order.reduce_only {
                // reduce-only can never flip or grow the position
                let closable = match order.side {
                    Side::Sell if *net > Decimal::ZERO => (*net).min(quantity),
                    Side::Buy if *net < Decimal::ZERO => (-*net).min(quantity),
                    _ => Decimal::ZERO,
                };
                quantity = closable;
            }
            match order.side {
                Side::Buy => *net += quantity,
                Side::Sell => *net -= quantity,
            }
        }

        let fill = PaperFill {
            order_id: uuid::Uuid::new_v4().to_string(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity,
            price,
            reduce_only: order.reduce_only,
            timestamp: Utc::now(),
        };

        info!(
            "[PAPER] {} {} {} @ {}{}",
            fill.side,
            fill.quantity,
            fill.symbol,
            fill.price,
            if fill.reduce_only { " (reduce-only)" } else { "" }
        );

        let result = OrderFill {
            order_id: Some(fill.order_id.clone()),
            filled: quantity,
            average: price,
        };
        self.fills.lock().push(fill);
        Ok(result)
    }
}
