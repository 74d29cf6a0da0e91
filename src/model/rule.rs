//! Static entry rule: follow the EMA bias unless RSI or the bands argue against it

use super::{ScoreRequest, Scorer, Verdict};
use crate::config::RuleConfig;
use crate::error::Result;
use crate::types::Side;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;

pub struct RuleScorer {
    config: RuleConfig,
}

impl RuleScorer {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }

    fn judge(&self, request: &ScoreRequest) -> std::result::Result<(), String> {
        let price = request.last_price.to_f64().unwrap_or(0.0);

        match request.bias {
            Side::Buy => {
                if request.rsi >= self.config.rsi_overbought {
                    return Err(format!("RSI {:.1} overbought", request.rsi));
                }
                if let (true, Some(bands)) = (self.config.use_bands, request.bands) {
                    if price >= bands.upper {
                        return Err(format!("price {} at/above upper band {:.4}", request.last_price, bands.upper));
                    }
                }
            }
            Side::Sell => {
                if request.rsi <= self.config.rsi_oversold {
                    return Err(format!("RSI {:.1} oversold", request.rsi));
                }
                if let (true, Some(bands)) = (self.config.use_bands, request.bands) {
                    if price <= bands.lower {
                        return Err(format!("price {} at/below lower band {:.4}", request.last_price, bands.lower));
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Scorer for RuleScorer {
    async fn evaluate(&self, request: &ScoreRequest) -> Result<Verdict> {
        Ok(match self.judge(request) {
            Ok(()) => Verdict {
                score: 100,
                decision: request.bias.into(),
                reasoning: format!("{} bias, RSI {:.1}", request.bias, request.rsi),
            },
            Err(reason) => Verdict::skip(reason),
        })
    }
}
