//! Order placement
//!
//! Converts a quote-currency stake into an exchange-precision quantity, opens
//! positions with market orders and closes them reduce-only.

#[cfg(test)]
mod tests;

use crate::client::Exchange;
use crate::error::{BotError, Result};
use crate::types::{OrderFill, OrderRequest, Side};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Position opened by [`Executor::open`]
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFill {
    pub order_id: Option<String>,
    pub side: Side,
    pub amount: Decimal,
    pub avg_price: Decimal,
}

#[derive(Clone)]
pub struct Executor {
    exchange: Arc<dyn Exchange>,
    fallback_tick: Decimal,
}

impl Executor {
    pub fn new(exchange: Arc<dyn Exchange>, fallback_tick: Decimal) -> Self {
        Self {
            exchange,
            fallback_tick,
        }
    }

    /// Open a position worth `stake` at the current price
    pub async fn open(&self, symbol: &str, side: Side, stake: Decimal) -> Result<EntryFill> {
        let price = self.exchange.fetch_ticker(symbol).await?.last;
        if price <= Decimal::ZERO {
            return Err(BotError::MarketData(format!("Non-positive price for {}: {}", symbol, price)));
        }

        let market = self.exchange.market_info(symbol).await?;
        let quantity = market.amount_to_precision(stake / price);
        if quantity <= Decimal::ZERO || quantity < market.min_qty {
            return Err(BotError::Execution(format!(
                "Stake {} too small for {} at {} (qty {}, min {})",
                stake, symbol, price, quantity, market.min_qty
            )));
        }

        tracing::info!("Opening {} {} {} (stake {} @ ~{})", side, quantity, symbol, stake, price);

        let fill = self
            .exchange
            .create_market_order(&OrderRequest {
                symbol: symbol.to_string(),
                side,
                quantity,
                reduce_only: false,
            })
            .await?;

        // venues may acknowledge before reporting fill details
        let amount = if fill.filled.is_zero() { quantity } else { fill.filled };
        let avg_price = if fill.average.is_zero() { price } else { fill.average };

        Ok(EntryFill {
            order_id: fill.order_id,
            side,
            amount,
            avg_price,
        })
    }

    /// Close a position opened on `entry_side`
    pub async fn close(&self, symbol: &str, entry_side: Side, amount: Decimal) -> Result<OrderFill> {
        let exit_side = entry_side.opposite();
        tracing::info!("Closing {} {} with {}", amount, symbol, exit_side);

        self.exchange
            .create_market_order(&OrderRequest {
                symbol: symbol.to_string(),
                side: exit_side,
                quantity: amount,
                reduce_only: true,
            })
            .await
    }

    /// Price increment for `symbol`, falling back when unavailable
    pub async fn tick_size(&self, symbol: &str) -> Decimal {
        match self.exchange.market_info(symbol).await {
            Ok(info) if info.tick_size > Decimal::ZERO => info.tick_size,
            Ok(_) => self.fallback_tick,
            Err(e) => {
                tracing::warn!("No tick size for {} ({}), using {}", symbol, e, self.fallback_tick);
                self.fallback_tick
            }
        }
    }
}
