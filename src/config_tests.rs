//! Tests for configuration

#[cfg(test)]
mod tests {
    use super::super::config::*;
    use crate::types::Timeframe;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_trading_config_default() {
        let config = TradingConfig::default();
        assert_eq!(config.score_threshold, 50);
        assert_eq!(config.scan_interval_secs, 30);
        assert_eq!(config.active_poll_secs, 2);
        assert_eq!(config.error_backoff_secs, 10);
        assert_eq!(config.tp_pips, 10);
        assert_eq!(config.sl_pips, 5);
        assert_eq!(config.pip_ticks, 10);
        assert_eq!(config.fallback_tick_size, dec!(0.01));
        assert_eq!(config.max_exit_retries, 3);
    }

    #[test]
    fn test_stake_config_default() {
        let config = StakeConfig::default();
        assert_eq!(config.default_stake, dec!(50));
        assert_eq!(config.max_stake, dec!(5000));
        assert_eq!(config.recovery, StakeRecovery::Martingale { factor: dec!(2.2) });
        assert_eq!(config.cooldown_after_losses, 2);
        assert_eq!(config.cooldown_step_secs, 300);
    }

    #[test]
    fn test_indicator_config_defaults_from_empty() {
        let config: IndicatorConfig = toml::from_str("").unwrap();
        assert_eq!(config.trend_timeframe, Timeframe::M5);
        assert_eq!(config.momentum_timeframe, Timeframe::M1);
        assert_eq!(config.candle_limit, 50);
        assert_eq!(config.fast_span, 20);
        assert_eq!(config.slow_span, 50);
        assert_eq!(config.rsi_period, 14);
    }

    #[test]
    fn test_stake_recovery_fixed() {
        let toml_str = r#"
default_stake = 25
recovery = { kind = "fixed" }
"#;
        let config: StakeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_stake, dec!(25));
        assert_eq!(config.recovery, StakeRecovery::Fixed);
        assert_eq!(config.max_stake, dec!(5000));
    }

    #[test]
    fn test_stake_recovery_martingale_factor() {
        let toml_str = r#"
max_stake = 1000
recovery = { kind = "martingale", factor = 2.0 }
"#;
        let config: StakeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.max_stake, dec!(1000));
        assert_eq!(config.recovery, StakeRecovery::Martingale { factor: dec!(2) });
    }

    #[test]
    fn test_exchange_config_defaults() {
        let config: ExchangeConfig = toml::from_str(r#"api_key = "k""#).unwrap();
        assert!(config.testnet);
        assert_eq!(config.api_key, "k");
        assert!(!config.has_credentials());
        assert_eq!(config.recv_window_ms, 5000);
        assert_eq!(config.leverage, 1);
    }

    #[test]
    fn test_telegram_config_defaults() {
        let config: TelegramConfig = toml::from_str(r#"bot_token = "123:abc""#).unwrap();
        assert_eq!(config.bot_token, "123:abc");
        assert!(config.notify_trades);
        assert!(config.notify_errors);
    }

    #[test]
    fn test_llm_config_minimal() {
        let toml_str = r#"
provider = "groq"
api_key = "gsk-xxx"
"#;
        let config: LlmConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider, "groq");
        assert_eq!(config.api_key, "gsk-xxx");
        assert_eq!(config.mode, ScoringMode::Score);
        assert_eq!(config.max_tokens, 20);
        assert_eq!(config.temperature, 0.0);
        assert!(config.model.is_none());
    }

    #[test]
    fn test_llm_config_decision_mode() {
        let toml_str = r#"
provider = "ollama"
mode = "decision"
model = "qwen2.5:14b"
"#;
        let config: LlmConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.mode, ScoringMode::Decision);
        assert_eq!(config.api_key, "");
        assert_eq!(config.model, Some("qwen2.5:14b".to_string()));
    }

    #[test]
    fn test_session_config_defaults() {
        let config: SessionConfig = toml::from_str("chat_id = 42").unwrap();
        assert_eq!(config.chat_id, 42);
        assert_eq!(config.symbol, "BTC/USDT");
        assert!(config.stake.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.trading.score_threshold = 150;
        assert!(config.validate().is_err());
        config.trading.score_threshold = 50;

        config.stake.recovery = StakeRecovery::Martingale { factor: dec!(0.5) };
        assert!(config.validate().is_err());
        config.stake.recovery = StakeRecovery::Fixed;

        config.indicators.fast_span = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[exchange]
api_key = "key"
api_secret = "secret"

[trading]
score_threshold = 60

[[sessions]]
chat_id = 1001
symbol = "ETH/USDT"
stake = 20

[[sessions]]
chat_id = 1002
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert!(config.exchange.has_credentials());
        assert_eq!(config.trading.score_threshold, 60);
        assert_eq!(config.trading.scan_interval_secs, 30);
        assert_eq!(config.sessions.len(), 2);
        assert_eq!(config.sessions[0].stake, Some(dec!(20)));
        assert_eq!(config.sessions[1].symbol, "BTC/USDT");
        assert!(config.llm.is_none());
        assert!(config.telegram.is_none());
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load("/nonexistent/scalper.toml").is_err());
    }
}
