//! LLM-backed scorer using an OpenAI-compatible chat completion endpoint

use super::{Decision, ScoreRequest, Scorer, Verdict};
use crate::config::{LlmConfig, ScoringMode};
use crate::error::{BotError, Result};
use crate::types::Side;
use async_trait::async_trait;
use reqwest::Client;

pub struct LlmScorer {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
    mode: ScoringMode,
    temperature: f32,
    max_tokens: u32,
}

impl LlmScorer {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let (default_url, default_model) = match config.provider.to_lowercase().as_str() {
            "groq" => ("https://api.groq.com/openai", "llama-3.3-70b-versatile"),
            "openai" | "gpt" => ("https://api.openai.com", "gpt-4o-mini"),
            "deepseek" => ("https://api.deepseek.com", "deepseek-chat"),
            "ollama" => ("http://localhost:11434", "qwen2.5:14b"),
            other => {
                if config.base_url.is_none() || config.model.is_none() {
                    return Err(BotError::InvalidInput(format!(
                        "Unknown LLM provider '{}': set base_url and model",
                        other
                    )));
                }
                ("", "")
            }
        };

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| default_url.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone().unwrap_or_else(|| default_model.to_string()),
            api_key: config.api_key.clone(),
            mode: config.mode,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn prompt(&self, request: &ScoreRequest) -> String {
        let bands = match request.bands {
            Some(b) => format!("BOLLINGER(20,2): {:.4} / {:.4} / {:.4}\n", b.lower, b.middle, b.upper),
            None => String::new(),
        };
        let context = format!(
            "ASSET: {}\nBIAS (EMA20>EMA50 ?): {}\nRSI(1m): {:.2}\nPRICE: {}\n{}",
            request.symbol, request.bias, request.rsi, request.last_price, bands
        );

        match self.mode {
            ScoringMode::Score => format!(
                "{}\nReturn ONLY:\nSCORE: <0-100>\nGive 50+ only if trade is high probability for a quick scalp.",
                context
            ),
            ScoringMode::Decision => format!(
                "{}\nReturn ONLY one word: BUY, SELL or SKIP.\nSKIP unless a quick scalp is high probability.",
                context
            ),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let mut req = self
            .http
            .post(self.endpoint())
            .header("content-type", "application/json");

        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = req.json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BotError::Api(format!("LLM HTTP {}: {}", status, text)));
        }

        let resp: serde_json::Value = response.json().await?;
        resp["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| BotError::Api("Empty LLM response".into()))
    }
}

#[async_trait]
impl Scorer for LlmScorer {
    async fn evaluate(&self, request: &ScoreRequest) -> Result<Verdict> {
        let reply = self.complete(&self.prompt(request)).await?;
        tracing::debug!("LLM reply for {}: {:?}", request.symbol, reply);

        Ok(verdict_from_reply(self.mode, request.bias, reply))
    }
}

/// Map a model reply to a verdict
///
/// Score mode trades the snapshot bias with the parsed score; decision mode
/// trades the named side at full score, or skips at zero.
pub fn verdict_from_reply(mode: ScoringMode, bias: Side, reply: String) -> Verdict {
    match mode {
        ScoringMode::Score => Verdict {
            score: parse_score(&reply),
            decision: bias.into(),
            reasoning: reply,
        },
        ScoringMode::Decision => {
            let decision = parse_decision(&reply);
            Verdict {
                score: if decision == Decision::Skip { 0 } else { 100 },
                decision,
                reasoning: reply,
            }
        }
    }
}

/// Score from a free-text reply: the first run of digits, clamped to 0-100.
///
/// No digits yields 0. Digits are not joined across the reply, so "7/10"
/// scores 7 rather than 100.
pub fn parse_score(reply: &str) -> u8 {
    let digits: String = reply
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        return 0;
    }
    // only overflow can fail here, and anything that large is above 100
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    value.min(100) as u8
}

/// First BUY / SELL / SKIP word in the reply; anything else is a skip
pub fn parse_decision(reply: &str) -> Decision {
    reply
        .to_uppercase()
        .split(|c: char| !c.is_ascii_alphabetic())
        .find_map(|word| match word {
            "BUY" => Some(Decision::Buy),
            "SELL" => Some(Decision::Sell),
            "SKIP" => Some(Decision::Skip),
            _ => None,
        })
        .unwrap_or(Decision::Skip)
}
