//! Configuration management
//!
//! Settings are read from a TOML file via the `config` crate. Every section
//! except `[llm]` and `[telegram]` has defaults, so a minimal file only needs
//! exchange keys and a `[[sessions]]` entry.

use crate::error::{BotError, Result};
use crate::types::Timeframe;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    pub telegram: Option<TelegramConfig>,
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub stake: StakeConfig,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub rule: RuleConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub sessions: Vec<SessionConfig>,
}

/// Binance USD-M futures connection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Use the futures testnet instead of production
    pub testnet: bool,
    /// Override the REST base URL
    pub base_url: Option<String>,
    pub api_key: String,
    pub api_secret: String,
    pub recv_window_ms: u64,
    pub timeout_secs: u64,
    /// Leverage applied when a session starts
    pub leverage: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            testnet: true,
            base_url: None,
            api_key: String::new(),
            api_secret: String::new(),
            recv_window_ms: 5000,
            timeout_secs: 30,
            leverage: 1,
        }
    }
}

impl ExchangeConfig {
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

/// Outbound Telegram notifications
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default = "default_true")]
    pub notify_trades: bool,
    #[serde(default = "default_true")]
    pub notify_errors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Reply is a 0-100 score; direction comes from the EMA bias
    #[default]
    Score,
    /// Reply is BUY, SELL or SKIP
    Decision,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub mode: ScoringMode,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Minimum verdict score (0-100) to open a trade
    pub score_threshold: u8,
    pub scan_interval_secs: u64,
    pub active_poll_secs: u64,
    pub error_backoff_secs: u64,
    /// Longest single wait while a cooldown is running
    pub max_cooldown_wait_secs: u64,
    pub tp_pips: u32,
    pub sl_pips: u32,
    /// Ticks per pip
    pub pip_ticks: u32,
    /// Tick size used when the exchange does not report one
    pub fallback_tick_size: Decimal,
    /// Interval between status log lines in `run`
    pub status_interval_secs: u64,
    /// Failed exit attempts before the trade is booked at the trigger price
    pub max_exit_retries: u32,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            score_threshold: 50,
            scan_interval_secs: 30,
            active_poll_secs: 2,
            error_backoff_secs: 10,
            max_cooldown_wait_secs: 30,
            tp_pips: 10,
            sl_pips: 5,
            pip_ticks: 10,
            fallback_tick_size: dec!(0.01),
            status_interval_secs: 300,
            max_exit_retries: 3,
        }
    }
}

/// How the next stake is derived after a loss
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StakeRecovery {
    /// Multiply the stake by `factor` after every loss
    Martingale { factor: Decimal },
    /// Always trade the base stake
    Fixed,
}

impl Default for StakeRecovery {
    fn default() -> Self {
        StakeRecovery::Martingale { factor: dec!(2.2) }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StakeConfig {
    /// Base stake (quote currency) when a session does not set one
    pub default_stake: Decimal,
    pub max_stake: Decimal,
    pub recovery: StakeRecovery,
    /// Loss streak at which cooldowns start
    pub cooldown_after_losses: u32,
    pub cooldown_step_secs: u64,
}

impl Default for StakeConfig {
    fn default() -> Self {
        Self {
            default_stake: dec!(50),
            max_stake: dec!(5000),
            recovery: StakeRecovery::default(),
            cooldown_after_losses: 2,
            cooldown_step_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Candles used for the EMA bias
    pub trend_timeframe: Timeframe,
    /// Candles used for RSI and Bollinger
    pub momentum_timeframe: Timeframe,
    pub candle_limit: usize,
    pub fast_span: usize,
    pub slow_span: usize,
    pub rsi_period: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            trend_timeframe: Timeframe::M5,
            momentum_timeframe: Timeframe::M1,
            candle_limit: 50,
            fast_span: 20,
            slow_span: 50,
            rsi_period: 14,
            bollinger_period: 20,
            bollinger_k: 2.0,
        }
    }
}

/// Static entry rule used when no LLM is configured
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    /// Require price inside the Bollinger envelope on the entry side
    pub use_bands: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            use_bands: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "trades.jsonl".to_string(),
        }
    }
}

/// A trading session started by `run`
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Telegram chat that owns the session and receives its messages
    pub chat_id: i64,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    pub stake: Option<Decimal>,
}

fn default_true() -> bool {
    true
}

fn default_max_tokens() -> u32 {
    20
}

fn default_symbol() -> String {
    "BTC/USDT".to_string()
}

impl Config {
    /// Load configuration from a TOML file (`~` is expanded)
    pub fn load(path: &str) -> Result<Self> {
        let path = shellexpand::tilde(path).into_owned();

        let settings = config::Config::builder()
            .add_source(config::File::new(&path, config::FileFormat::Toml))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trading.score_threshold > 100 {
            return Err(BotError::InvalidInput(format!(
                "score_threshold must be 0-100, got {}",
                self.trading.score_threshold
            )));
        }
        if self.stake.max_stake <= Decimal::ZERO {
            return Err(BotError::InvalidInput("max_stake must be positive".into()));
        }
        if let StakeRecovery::Martingale { factor } = self.stake.recovery {
            if factor < Decimal::ONE {
                return Err(BotError::InvalidInput(format!(
                    "martingale factor must be >= 1, got {}",
                    factor
                )));
            }
        }
        if self.indicators.fast_span >= self.indicators.slow_span {
            return Err(BotError::InvalidInput(
                "fast_span must be shorter than slow_span".into(),
            ));
        }
        Ok(())
    }
}
