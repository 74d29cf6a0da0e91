//! Session registry
//!
//! Maps chat ids to running engines. Each session owns its state; launching
//! again for a chat replaces a finished session but never races a live one.


use crate::config::StakeConfig;
use crate::engine::{ActiveTrade, EngineConfig, Services, SessionState, SharedState, TradeEngine};
use crate::error::{BotError, Result};
use crate::types::normalize_symbol;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub chat_id: i64,
    pub symbol: String,
    pub is_trading: bool,
    pub initial_stake: Decimal,
    pub current_stake: Decimal,
    pub wins: u32,
    pub losses: u32,
    pub loss_streak: u32,
    pub active_trade: Option<ActiveTrade>,
    pub next_trade_time: Option<DateTime<Utc>>,
}

impl SessionStatus {
    fn from_state(state: &SessionState) -> Self {
        Self {
            chat_id: state.chat_id,
            symbol: state.symbol.clone(),
            is_trading: state.is_trading,
            initial_stake: state.stake.initial(),
            current_stake: state.stake.current(),
            wins: state.stake.wins(),
            losses: state.stake.losses(),
            loss_streak: state.stake.loss_streak(),
            active_trade: state.active_trade.clone(),
            next_trade_time: state.next_trade_time,
        }
    }
}

struct SessionHandle {
    state: SharedState,
    stop_tx: watch::Sender<bool>,
    /// Flips to true once the engine loop has returned
    done_rx: watch::Receiver<bool>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    fn is_running(&self) -> bool {
        !*self.done_rx.borrow() && self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }
}

pub struct SessionManager {
    services: Services,
    engine_config: EngineConfig,
    stake_config: StakeConfig,
    sessions: Mutex<HashMap<i64, SessionHandle>>,
}

impl SessionManager {
    pub fn new(services: Services, engine_config: EngineConfig, stake_config: StakeConfig) -> Self {
        Self {
            services,
            engine_config,
            stake_config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Start trading `symbol` for `chat_id` with a fresh stake ladder
    pub fn launch(&self, chat_id: i64, symbol: &str, stake: Decimal) -> Result<()> {
        if stake <= Decimal::ZERO {
            return Err(BotError::InvalidInput(format!("Stake must be positive, got {}", stake)));
        }
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(BotError::InvalidInput("Symbol is empty".into()));
        }

        let mut sessions = self.sessions.lock();
        if let Some(existing) = sessions.get(&chat_id) {
            if existing.is_running() {
                return Err(BotError::Session(format!(
                    "Chat {} is still trading; stop it first",
                    chat_id
                )));
            }
        }

        let mut state = SessionState::new(chat_id, &symbol, stake, &self.stake_config);
        state.is_trading = true;
        let state = Arc::new(RwLock::new(state));

        let (stop_tx, stop_rx) = watch::channel(false);
        let engine = TradeEngine::new(
            chat_id,
            &symbol,
            state.clone(),
            self.services.clone(),
            self.engine_config.clone(),
        );
        let (done_tx, done_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            engine.run(stop_rx).await;
            let _ = done_tx.send(true);
        });

        info!("Launched session for chat {} on {} with stake {}", chat_id, symbol, stake);
        sessions.insert(
            chat_id,
            SessionHandle {
                state,
                stop_tx,
                done_rx,
                task: Some(task),
            },
        );
        Ok(())
    }

    /// Signal the chat's engine to stop and wait for it to finish.
    /// Returns false if there was nothing running.
    ///
    /// The session stays registered as running until its loop has exited,
    /// even if this future is dropped early.
    pub async fn stop(&self, chat_id: i64) -> bool {
        let mut done = {
            let sessions = self.sessions.lock();
            let handle = match sessions.get(&chat_id) {
                Some(handle) => handle,
                None => return false,
            };
            if !handle.is_running() {
                return false;
            }
            let _ = handle.stop_tx.send(true);
            handle.done_rx.clone()
        };

        // Err means the task ended without reporting (panic); join below logs it
        let _ = done.wait_for(|finished| *finished).await;

        let task = self.sessions.lock().get_mut(&chat_id).and_then(|handle| {
            if handle.is_running() {
                // relaunched meanwhile
                None
            } else {
                handle.task.take()
            }
        });
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Engine task for chat {} ended abnormally: {}", chat_id, e);
            }
        }
        info!("Stopped session for chat {}", chat_id);
        true
    }

    pub async fn stop_all(&self) {
        let ids: Vec<i64> = self.sessions.lock().keys().copied().collect();
        for chat_id in ids {
            self.stop(chat_id).await;
        }
    }

    pub async fn status(&self, chat_id: i64) -> Option<SessionStatus> {
        let state = self.sessions.lock().get(&chat_id).map(|h| h.state.clone())?;
        let state = state.read().await;
        Some(SessionStatus::from_state(&state))
    }

    pub async fn statuses(&self) -> Vec<SessionStatus> {
        let states: Vec<SharedState> = self.sessions.lock().values().map(|h| h.state.clone()).collect();
        let mut out = Vec::with_capacity(states.len());
        for state in states {
            out.push(SessionStatus::from_state(&*state.read().await));
        }
        out.sort_by_key(|s| s.chat_id);
        out
    }

    pub fn is_running(&self, chat_id: i64) -> bool {
        self.sessions
            .lock()
            .get(&chat_id)
            .map(SessionHandle::is_running)
            .unwrap_or(false)
    }
}
