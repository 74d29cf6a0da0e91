//! Per-session trade engine
//!
//! One engine drives one symbol for one chat, one trade at a time:
//!
//! ```text
//! cooldown? ──yes──▶ wait (≤ 30s)
//!     │no
//! active trade? ──no──▶ snapshot → verdict → stake → market entry → brackets
//!     │yes
//! ticker → TP / SL? → reduce-only exit → stake update (+ cooldown) → journal
//! ```
//!
//! [`TradeEngine::step`] performs one pass and says how long to wait;
//! [`TradeEngine::run`] loops it until stopped.


use crate::client::Exchange;
use crate::config::{Config, IndicatorConfig, StakeConfig};
use crate::error::{BotError, Result};
use crate::executor::Executor;
use crate::journal::{position_pnl, ClosedTrade, Journal};
use crate::market;
use crate::model::{ScoreRequest, Scorer, Verdict};
use crate::notify::Notify;
use crate::strategy::{check_exit, compute_brackets, Brackets, StakeManager};
use crate::types::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

/// Timing and trade parameters of an engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub score_threshold: u8,
    pub scan_interval: Duration,
    pub active_poll: Duration,
    pub error_backoff: Duration,
    pub max_cooldown_wait: Duration,
    pub tp_pips: u32,
    pub sl_pips: u32,
    pub pip_ticks: u32,
    pub fallback_tick: Decimal,
    pub max_exit_retries: u32,
    pub leverage: u32,
    pub indicators: IndicatorConfig,
}

impl EngineConfig {
    pub fn from_config(config: &Config) -> Self {
        let t = &config.trading;
        Self {
            score_threshold: t.score_threshold,
            scan_interval: Duration::from_secs(t.scan_interval_secs),
            active_poll: Duration::from_secs(t.active_poll_secs),
            error_backoff: Duration::from_secs(t.error_backoff_secs),
            max_cooldown_wait: Duration::from_secs(t.max_cooldown_wait_secs),
            tp_pips: t.tp_pips,
            sl_pips: t.sl_pips,
            pip_ticks: t.pip_ticks,
            fallback_tick: t.fallback_tick_size,
            max_exit_retries: t.max_exit_retries.max(1),
            leverage: config.exchange.leverage,
            indicators: config.indicators.clone(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Open position tracked by the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveTrade {
    pub id: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub amount: Decimal,
    pub brackets: Brackets,
    pub stake: Decimal,
    pub order_id: Option<String>,
    pub opened_at: DateTime<Utc>,
    /// Rejected exit attempts so far
    pub exit_failures: u32,
}

/// Mutable state of one session, shared between its engine and the manager
#[derive(Debug, Clone)]
pub struct SessionState {
    pub chat_id: i64,
    pub symbol: String,
    pub stake: StakeManager,
    pub active_trade: Option<ActiveTrade>,
    /// No new entries before this instant
    pub next_trade_time: Option<DateTime<Utc>>,
    pub is_trading: bool,
}

impl SessionState {
    pub fn new(chat_id: i64, symbol: &str, initial_stake: Decimal, stake_config: &StakeConfig) -> Self {
        Self {
            chat_id,
            symbol: symbol.to_string(),
            stake: StakeManager::new(initial_stake, stake_config),
            active_trade: None,
            next_trade_time: None,
            is_trading: false,
        }
    }
}

pub type SharedState = Arc<RwLock<SessionState>>;

/// Collaborators shared by every session
#[derive(Clone)]
pub struct Services {
    pub exchange: Arc<dyn Exchange>,
    pub scorer: Arc<dyn Scorer>,
    pub notifier: Arc<dyn Notify>,
    pub journal: Option<Arc<Journal>>,
}

#[derive(Debug, Clone)]
pub enum StepOutcome {
    CoolingDown,
    /// Market data missing or unavailable
    NoData,
    Skipped(Verdict),
    Opened(ActiveTrade),
    /// Trade still open at this price
    Holding(Decimal),
    Closed(ClosedTrade),
    /// Exit order failed; the trade stays open and is retried until
    /// `max_exit_retries` attempts have failed
    ExitFailed,
}

#[derive(Debug, Clone)]
pub struct Step {
    pub outcome: StepOutcome,
    /// How long to wait before the next step
    pub wait: Duration,
}

pub struct TradeEngine {
    chat_id: i64,
    symbol: String,
    services: Services,
    executor: Executor,
    config: EngineConfig,
    state: SharedState,
}

impl TradeEngine {
    pub fn new(chat_id: i64, symbol: &str, state: SharedState, services: Services, config: EngineConfig) -> Self {
        let executor = Executor::new(services.exchange.clone(), config.fallback_tick);
        Self {
            chat_id,
            symbol: symbol.to_string(),
            services,
            executor,
            config,
            state,
        }
    }

    async fn say(&self, text: &str) {
        if let Err(e) = self.services.notifier.send(self.chat_id, text).await {
            warn!("Failed to notify chat {}: {}", self.chat_id, e);
        }
    }

    /// Drive the session until `stop` flips to true (or its sender is dropped)
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        info!("Engine for chat {} started on {}", self.chat_id, self.symbol);
        self.say(&format!("🚀 FUTURES START\nMonitoring: {}", self.symbol)).await;

        if let Err(e) = self
            .services
            .exchange
            .set_leverage(&self.symbol, self.config.leverage)
            .await
        {
            debug!("Could not set leverage on {}: {}", self.symbol, e);
        }

        loop {
            if *stop.borrow() {
                break;
            }

            let wait = match self.step(Utc::now()).await {
                Ok(step) => step.wait,
                Err(e) => {
                    error!("Engine error for chat {}: {}", self.chat_id, e);
                    self.say(&format!(
                        "⚠️ CRITICAL ENGINE ERROR: {}\nRetrying in {}s...",
                        e,
                        self.config.error_backoff.as_secs()
                    ))
                    .await;
                    self.config.error_backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.state.write().await.is_trading = false;
        info!("Engine for chat {} stopped", self.chat_id);
        self.say("🛑 Engine stopped").await;
    }

    /// One pass of the state machine at time `now`
    pub async fn step(&self, now: DateTime<Utc>) -> Result<Step> {
        let active = {
            let mut state = self.state.write().await;
            if let Some(next) = state.next_trade_time {
                if now < next {
                    let remaining = (next - now).to_std().unwrap_or(Duration::ZERO);
                    return Ok(Step {
                        outcome: StepOutcome::CoolingDown,
                        wait: remaining.min(self.config.max_cooldown_wait),
                    });
                }
                state.next_trade_time = None;
            }
            state.active_trade.clone()
        };

        match active {
            None => self.scan(now).await,
            Some(trade) => self.manage(trade, now).await,
        }
    }

    fn wait_scan(&self, outcome: StepOutcome) -> Result<Step> {
        Ok(Step {
            outcome,
            wait: self.config.scan_interval,
        })
    }

    async fn scan(&self, now: DateTime<Utc>) -> Result<Step> {
        let snapshot = match market::fetch_snapshot(
            self.services.exchange.as_ref(),
            &self.symbol,
            &self.config.indicators,
        )
        .await
        {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return self.wait_scan(StepOutcome::NoData),
            Err(e) => {
                warn!("Market data for {} unavailable: {}", self.symbol, e);
                return self.wait_scan(StepOutcome::NoData);
            }
        };

        let request = ScoreRequest::from(&snapshot);
        let verdict = match self.services.scorer.evaluate(&request).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Scorer failed for {}: {}", self.symbol, e);
                Verdict::skip(format!("scorer error: {}", e))
            }
        };

        let side = match verdict.entry_side(self.config.score_threshold) {
            Some(side) => side,
            None => {
                debug!(
                    "{}: {} score {} below threshold {} ({})",
                    self.symbol, verdict.decision, verdict.score, self.config.score_threshold, verdict.reasoning
                );
                return self.wait_scan(StepOutcome::Skipped(verdict));
            }
        };

        let stake = self.state.write().await.stake.stake_for_entry();
        if stake.was_reset {
            self.say(&format!("🛑 Stake capped. Reset to base {}.", stake.amount)).await;
        }

        let entry = match self.executor.open(&self.symbol, side, stake.amount).await {
            Ok(entry) => entry,
            Err(e) => {
                self.say(&format!("⚠️ Order Failed: {}", e)).await;
                return Err(e);
            }
        };
        self.say(&format!(
            "🟢 ENTRY {} (Futures)\nQty: {}\nAvg: {}",
            side, entry.amount, entry.avg_price
        ))
        .await;

        let tick = self.executor.tick_size(&self.symbol).await;
        let brackets = compute_brackets(
            side,
            entry.avg_price,
            tick,
            self.config.tp_pips,
            self.config.sl_pips,
            self.config.pip_ticks,
        );

        let trade = ActiveTrade {
            id: uuid::Uuid::new_v4().to_string(),
            side,
            entry_price: entry.avg_price,
            amount: entry.amount,
            brackets,
            stake: stake.amount,
            order_id: entry.order_id,
            opened_at: now,
            exit_failures: 0,
        };
        self.state.write().await.active_trade = Some(trade.clone());

        info!(
            "Chat {} opened {} {} @ {} (tp {}, sl {}, score {})",
            self.chat_id, side, self.symbol, trade.entry_price, brackets.take_profit, brackets.stop_loss, verdict.score
        );
        self.say(&format!(
            "🎯 OPEN {}\nEntry: {}\nTP: {}\nSL: {}\nStake: {}",
            side, trade.entry_price, brackets.take_profit, brackets.stop_loss, trade.stake
        ))
        .await;

        Ok(Step {
            outcome: StepOutcome::Opened(trade),
            wait: self.config.active_poll,
        })
    }

    async fn manage(&self, trade: ActiveTrade, now: DateTime<Utc>) -> Result<Step> {
        let price = self.services.exchange.fetch_ticker(&self.symbol).await?.last;

        let reason = match check_exit(trade.side, &trade.brackets, price) {
            Some(reason) => reason,
            None => {
                return Ok(Step {
                    outcome: StepOutcome::Holding(price),
                    wait: self.config.active_poll,
                })
            }
        };

        let exit_price = match self.executor.close(&self.symbol, trade.side, trade.amount).await {
            Ok(fill) => {
                self.say(&format!("🔴 EXIT {} (closed)", trade.side.opposite())).await;
                if fill.average.is_zero() {
                    price
                } else {
                    fill.average
                }
            }
            Err(e) => {
                let failures = {
                    let mut state = self.state.write().await;
                    match state.active_trade.as_mut() {
                        Some(active) => {
                            active.exit_failures += 1;
                            active.exit_failures
                        }
                        None => 1,
                    }
                };

                if failures < self.config.max_exit_retries {
                    warn!(
                        "Exit for {} failed ({}/{}), will retry: {}",
                        self.symbol, failures, self.config.max_exit_retries, e
                    );
                    if failures == 1 {
                        self.say(&format!("⚠️ Exit Failed: {}\nRetrying...", e)).await;
                    }
                    return Ok(Step {
                        outcome: StepOutcome::ExitFailed,
                        wait: self.config.active_poll,
                    });
                }

                // give up and book the outcome at the trigger price
                error!(
                    "Exit for {} failed {} times, booking {} at {}: {}",
                    self.symbol, failures, reason, price, e
                );
                self.say(&format!(
                    "⚠️ Exit Failed {} times: {}\nBooking {} at {}. Check the position manually.",
                    failures, e, reason, price
                ))
                .await;
                price
            }
        };

        let (closed, cooldown, initial) = {
            let mut state = self.state.write().await;
            let cooldown = if reason.is_win() {
                state.stake.record_win();
                state.next_trade_time = None;
                Duration::ZERO
            } else {
                let cooldown = state.stake.record_loss();
                state.next_trade_time = if cooldown.is_zero() {
                    None
                } else {
                    let delta = chrono::Duration::from_std(cooldown)
                        .map_err(|e| BotError::InvalidInput(format!("cooldown out of range: {}", e)))?;
                    Some(now + delta)
                };
                cooldown
            };
            state.active_trade = None;

            let closed = ClosedTrade {
                id: trade.id.clone(),
                chat_id: self.chat_id,
                symbol: self.symbol.clone(),
                side: trade.side,
                amount: trade.amount,
                stake: trade.stake,
                entry_price: trade.entry_price,
                exit_price,
                reason,
                pnl: position_pnl(trade.side, trade.entry_price, exit_price, trade.amount),
                next_stake: state.stake.current(),
                loss_streak: state.stake.loss_streak(),
                opened_at: trade.opened_at,
                closed_at: now,
            };
            (closed, cooldown, state.stake.initial())
        };

        info!(
            "Chat {} closed {} {} at {} ({}, pnl {})",
            self.chat_id, closed.side, self.symbol, exit_price, reason, closed.pnl
        );

        if let Some(journal) = &self.services.journal {
            if let Err(e) = journal.append(&closed).await {
                warn!("Failed to journal trade {}: {}", closed.id, e);
            }
        }

        if reason.is_win() {
            self.say(&format!("✅ WIN. Stake reset to {}", initial)).await;
        } else {
            let mut msg = format!("❌ LOSS. Next stake: {}", closed.next_stake.round_dp(2));
            if !cooldown.is_zero() {
                msg.push_str(&format!("\n😴 Rest: {} min", cooldown.as_secs() / 60));
            }
            self.say(&msg).await;
        }

        Ok(Step {
            outcome: StepOutcome::Closed(closed),
            wait: self.config.active_poll,
        })
    }
}
