//! Exchange clients
//!
//! - [`BinanceFuturesClient`]: USD-M futures REST API (testnet or production)
//! - [`PaperExchange`]: real market data, simulated fills

pub mod auth;
pub mod binance;
pub mod paper;

#[cfg(test)]
mod tests;

pub use auth::RequestSigner;
pub use binance::BinanceFuturesClient;
pub use paper::PaperExchange;

use crate::error::Result;
use crate::types::{Candle, MarketInfo, OrderFill, OrderRequest, Ticker, Timeframe};
use async_trait::async_trait;

/// Venue the trade engine talks to
///
/// Symbols are display symbols ("BTC/USDT"); implementations translate them.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Most recent `limit` candles, oldest first
    async fn fetch_candles(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Candle>>;

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker>;

    /// Tick and lot size for a symbol
    async fn market_info(&self, symbol: &str) -> Result<MarketInfo>;

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()>;

    async fn create_market_order(&self, order: &OrderRequest) -> Result<OrderFill>;
}
