//! Market snapshots: candles + ticker reduced to the indicators the bot trades on


use crate::client::Exchange;
use crate::config::IndicatorConfig;
use crate::error::Result;
use crate::indicators::{self, Bands, NEUTRAL_RSI};
use crate::types::{Candle, Side};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

/// Indicator state of one symbol at one point in time
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub symbol: String,
    /// BUY when the fast EMA is above the slow EMA on the trend timeframe
    pub bias: Side,
    pub ema_fast: f64,
    pub ema_slow: f64,
    /// RSI on the momentum timeframe (50 when undefined)
    pub rsi: f64,
    pub bands: Option<Bands>,
    pub last_price: Decimal,
    pub taken_at: DateTime<Utc>,
}

fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().filter_map(|c| c.close.to_f64()).collect()
}

/// Reduce candle sets and the last price to a snapshot
///
/// Returns `None` if either candle set is empty.
pub fn analyze(
    symbol: &str,
    trend: &[Candle],
    momentum: &[Candle],
    last_price: Decimal,
    config: &IndicatorConfig,
) -> Option<MarketSnapshot> {
    if trend.is_empty() || momentum.is_empty() {
        return None;
    }

    let trend_closes = closes(trend);
    let momentum_closes = closes(momentum);

    let ema_fast = indicators::ewm_mean(&trend_closes, config.fast_span)?;
    let ema_slow = indicators::ewm_mean(&trend_closes, config.slow_span)?;
    let bias = if ema_fast > ema_slow { Side::Buy } else { Side::Sell };

    let rsi = indicators::rsi(&momentum_closes, config.rsi_period).unwrap_or(NEUTRAL_RSI);
    let bands = indicators::bollinger(&momentum_closes, config.bollinger_period, config.bollinger_k);

    Some(MarketSnapshot {
        symbol: symbol.to_string(),
        bias,
        ema_fast,
        ema_slow,
        rsi,
        bands,
        last_price,
        taken_at: Utc::now(),
    })
}

/// Fetch trend candles, momentum candles and ticker, then [`analyze`]
pub async fn fetch_snapshot(
    exchange: &dyn Exchange,
    symbol: &str,
    config: &IndicatorConfig,
) -> Result<Option<MarketSnapshot>> {
    let trend = exchange
        .fetch_candles(symbol, config.trend_timeframe, config.candle_limit)
        .await?;
    let momentum = exchange
        .fetch_candles(symbol, config.momentum_timeframe, config.candle_limit)
        .await?;
    let ticker = exchange.fetch_ticker(symbol).await?;

    let snapshot = analyze(symbol, &trend, &momentum, ticker.last, config);
    if let Some(s) = &snapshot {
        debug!(
            "{} bias={} ema{}={:.4} ema{}={:.4} rsi={:.2} last={}",
            symbol, s.bias, config.fast_span, s.ema_fast, config.slow_span, s.ema_slow, s.rsi, s.last_price
        );
    } else {
        debug!("{}: not enough candles for a snapshot", symbol);
    }
    Ok(snapshot)
}
