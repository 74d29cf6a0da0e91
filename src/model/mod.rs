//! Entry scoring
//!
//! A [`Scorer`] turns a market snapshot into a [`Verdict`]: a 0-100 score and
//! a BUY/SELL/SKIP decision. The engine only trades verdicts whose score
//! reaches its threshold.

mod llm;
mod rule;

pub use llm::{parse_decision, parse_score, verdict_from_reply, LlmScorer};
pub use rule::RuleScorer;

use crate::error::Result;
use crate::indicators::Bands;
use crate::market::MarketSnapshot;
use crate::types::Side;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt;

/// Inputs a scorer sees
#[derive(Debug, Clone)]
pub struct ScoreRequest {
    pub symbol: String,
    pub bias: Side,
    pub rsi: f64,
    pub bands: Option<Bands>,
    pub last_price: Decimal,
}

impl From<&MarketSnapshot> for ScoreRequest {
    fn from(snapshot: &MarketSnapshot) -> Self {
        Self {
            symbol: snapshot.symbol.clone(),
            bias: snapshot.bias,
            rsi: snapshot.rsi,
            bands: snapshot.bands,
            last_price: snapshot.last_price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Buy,
    Sell,
    Skip,
}

impl Decision {
    pub fn side(self) -> Option<Side> {
        match self {
            Decision::Buy => Some(Side::Buy),
            Decision::Sell => Some(Side::Sell),
            Decision::Skip => None,
        }
    }
}

impl From<Side> for Decision {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => Decision::Buy,
            Side::Sell => Decision::Sell,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Buy => write!(f, "BUY"),
            Decision::Sell => write!(f, "SELL"),
            Decision::Skip => write!(f, "SKIP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// 0-100
    pub score: u8,
    pub decision: Decision,
    pub reasoning: String,
}

impl Verdict {
    pub fn skip(reasoning: impl Into<String>) -> Self {
        Self {
            score: 0,
            decision: Decision::Skip,
            reasoning: reasoning.into(),
        }
    }

    /// Side to enter, if this verdict clears `threshold`
    pub fn entry_side(&self, threshold: u8) -> Option<Side> {
        if self.score < threshold {
            return None;
        }
        self.decision.side()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn evaluate(&self, request: &ScoreRequest) -> Result<Verdict>;
}
