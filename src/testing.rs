//! Test doubles shared by unit tests
//!
//! [`ScriptedExchange`] serves fixed candles and a settable price and records
//! every order; [`RecordingNotifier`] captures outgoing messages.

use crate::client::Exchange;
use crate::error::{BotError, Result};
use crate::notify::Notify;
use crate::types::{Candle, MarketInfo, OrderFill, OrderRequest, Ticker, Timeframe};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub struct ScriptedExchange {
    price: Mutex<Decimal>,
    candles: Mutex<HashMap<Timeframe, Vec<Candle>>>,
    info: Mutex<Option<MarketInfo>>,
    orders: Mutex<Vec<OrderRequest>>,
    reject_orders: AtomicBool,
    fail_market_data: AtomicBool,
    ticker_calls: AtomicUsize,
    leverage_calls: AtomicUsize,
    /// When false, orders are acknowledged with zero filled/average
    report_fills: AtomicBool,
}

impl ScriptedExchange {
    pub fn new(price: Decimal) -> Self {
        Self {
            price: Mutex::new(price),
            candles: Mutex::new(HashMap::new()),
            info: Mutex::new(Some(MarketInfo {
                symbol: "BTCUSDT".to_string(),
                tick_size: dec!(0.01),
                step_size: dec!(0.001),
                min_qty: dec!(0.001),
            })),
            orders: Mutex::new(Vec::new()),
            reject_orders: AtomicBool::new(false),
            fail_market_data: AtomicBool::new(false),
            ticker_calls: AtomicUsize::new(0),
            leverage_calls: AtomicUsize::new(0),
            report_fills: AtomicBool::new(true),
        }
    }

    /// Exchange whose trend candles rise steadily (bullish EMA bias)
    pub fn trending_up(price: Decimal) -> Self {
        let exchange = Self::new(price);
        exchange.set_closes(Timeframe::M5, &linear_closes(100.0, 1.0, 50));
        exchange.set_closes(Timeframe::M1, &linear_closes(100.0, 0.1, 50));
        exchange
    }

    /// Exchange whose trend candles fall steadily (bearish EMA bias)
    pub fn trending_down(price: Decimal) -> Self {
        let exchange = Self::new(price);
        exchange.set_closes(Timeframe::M5, &linear_closes(200.0, -1.0, 50));
        exchange.set_closes(Timeframe::M1, &linear_closes(200.0, -0.1, 50));
        exchange
    }

    pub fn set_price(&self, price: Decimal) {
        *self.price.lock() = price;
    }

    pub fn set_closes(&self, timeframe: Timeframe, closes: &[Decimal]) {
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, close)| Candle {
                open_time: i as i64 * 60_000,
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume: Decimal::ONE,
            })
            .collect();
        self.candles.lock().insert(timeframe, candles);
    }

    pub fn clear_market_info(&self) {
        *self.info.lock() = None;
    }

    pub fn reject_orders(&self, reject: bool) {
        self.reject_orders.store(reject, Ordering::SeqCst);
    }

    pub fn fail_market_data(&self, fail: bool) {
        self.fail_market_data.store(fail, Ordering::SeqCst);
    }

    pub fn report_fills(&self, report: bool) {
        self.report_fills.store(report, Ordering::SeqCst);
    }

    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().clone()
    }

    pub fn ticker_calls(&self) -> usize {
        self.ticker_calls.load(Ordering::SeqCst)
    }

    pub fn leverage_calls(&self) -> usize {
        self.leverage_calls.load(Ordering::SeqCst)
    }
}

/// `count` closes starting at `start`, moving by `step` each candle
pub fn linear_closes(start: f64, step: f64, count: usize) -> Vec<Decimal> {
    (0..count)
        .map(|i| Decimal::try_from(start + step * i as f64).unwrap_or(Decimal::ZERO).round_dp(4))
        .collect()
}

#[async_trait]
impl Exchange for ScriptedExchange {
    async fn fetch_candles(&self, _symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Candle>> {
        if self.fail_market_data.load(Ordering::SeqCst) {
            return Err(BotError::MarketData("scripted failure".into()));
        }
        let candles = self.candles.lock().get(&timeframe).cloned().unwrap_or_default();
        let skip = candles.len().saturating_sub(limit);
        Ok(candles.into_iter().skip(skip).collect())
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker> {
        self.ticker_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_market_data.load(Ordering::SeqCst) {
            return Err(BotError::MarketData("scripted failure".into()));
        }
        Ok(Ticker {
            symbol: symbol.to_string(),
            last: *self.price.lock(),
            timestamp: Utc::now(),
        })
    }

    async fn market_info(&self, symbol: &str) -> Result<MarketInfo> {
        self.info
            .lock()
            .clone()
            .ok_or_else(|| BotError::MarketData(format!("Unknown symbol: {}", symbol)))
    }

    async fn set_leverage(&self, _symbol: &str, _leverage: u32) -> Result<()> {
        self.leverage_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_market_order(&self, order: &OrderRequest) -> Result<OrderFill> {
        if self.reject_orders.load(Ordering::SeqCst) {
            return Err(BotError::Exchange {
                code: -2019,
                msg: "Margin is insufficient.".into(),
            });
        }
        self.orders.lock().push(order.clone());

        let (filled, average) = if self.report_fills.load(Ordering::SeqCst) {
            (order.quantity, *self.price.lock())
        } else {
            (Decimal::ZERO, Decimal::ZERO)
        };

        Ok(OrderFill {
            order_id: Some(format!("scripted-{}", self.orders.lock().len())),
            filled,
            average,
        })
    }
}

/// Notifier that keeps every message in memory
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(i64, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(i64, String)> {
        self.messages.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().iter().any(|(_, text)| text.contains(needle))
    }
}

#[async_trait]
impl Notify for RecordingNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        self.messages.lock().push((chat_id, text.to_string()));
        Ok(())
    }
}
