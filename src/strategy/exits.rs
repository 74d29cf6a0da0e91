//! Take-profit / stop-loss brackets

use crate::types::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brackets {
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
}

impl ExitReason {
    pub fn is_win(self) -> bool {
        self == ExitReason::TakeProfit
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::TakeProfit => write!(f, "TAKE_PROFIT"),
            ExitReason::StopLoss => write!(f, "STOP_LOSS"),
        }
    }
}

/// Brackets `tp_pips` / `sl_pips` away from `entry`, one pip being
/// `pip_ticks` ticks of `tick_size`
pub fn compute_brackets(
    side: Side,
    entry: Decimal,
    tick_size: Decimal,
    tp_pips: u32,
    sl_pips: u32,
    pip_ticks: u32,
) -> Brackets {
    let pip = tick_size * Decimal::from(pip_ticks);
    let tp_move = pip * Decimal::from(tp_pips);
    let sl_move = pip * Decimal::from(sl_pips);

    match side {
        Side::Buy => Brackets {
            take_profit: entry + tp_move,
            stop_loss: entry - sl_move,
        },
        Side::Sell => Brackets {
            take_profit: entry - tp_move,
            stop_loss: entry + sl_move,
        },
    }
}

/// Exit triggered by `price`, take-profit taking precedence
pub fn check_exit(side: Side, brackets: &Brackets, price: Decimal) -> Option<ExitReason> {
    let (hit_tp, hit_sl) = match side {
        Side::Buy => (price >= brackets.take_profit, price <= brackets.stop_loss),
        Side::Sell => (price <= brackets.take_profit, price >= brackets.stop_loss),
    };

    if hit_tp {
        Some(ExitReason::TakeProfit)
    } else if hit_sl {
        Some(ExitReason::StopLoss)
    } else {
        None
    }
}
