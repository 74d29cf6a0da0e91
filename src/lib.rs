//! Futures Scalper Bot
//!
//! Automated single-position scalping on Binance USD-M futures.
//!
//! ## Architecture
//!
//! ```text
//! Exchange (klines/ticker) → Market (EMA/RSI/Bands) → Model (LLM or rules)
//!                                                        ↓
//!   Notifier ← Engine (stake ladder, TP/SL, cooldown) → Executor → Exchange
//!                 ↓
//!              Journal
//! ```
//!
//! A [`session::SessionManager`] runs one engine per chat.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod indicators;
pub mod journal;
pub mod market;
pub mod model;
pub mod notify;
pub mod session;
pub mod strategy;
pub mod testing;
pub mod types;

#[cfg(test)]
mod config_tests;
