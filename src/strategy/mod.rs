//! Stake management and exit brackets
//!
//! Implements:
//! - Martingale stake recovery with a hard cap
//! - Loss-streak cooldowns
//! - Pip-based take-profit / stop-loss brackets

pub mod exits;

pub use exits::{check_exit, compute_brackets, Brackets, ExitReason};

use crate::config::{StakeConfig, StakeRecovery};
use rust_decimal::Decimal;
use std::time::Duration;

/// Cooldown after a loss streak: none below `after` losses, then one `step`
/// per loss beyond the first.
pub fn cooldown_for(loss_streak: u32, after: u32, step: Duration) -> Duration {
    if loss_streak < after.max(1) {
        return Duration::ZERO;
    }
    step * (loss_streak - 1)
}

/// Running stake and win/loss tally of one session
#[derive(Debug, Clone)]
pub struct StakeManager {
    initial: Decimal,
    current: Decimal,
    max: Decimal,
    recovery: StakeRecovery,
    cooldown_after: u32,
    cooldown_step: Duration,
    wins: u32,
    losses: u32,
    loss_streak: u32,
}

/// Stake chosen for a new entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryStake {
    pub amount: Decimal,
    /// The running stake exceeded the cap and was reset to the base stake
    pub was_reset: bool,
}

impl StakeManager {
    pub fn new(initial: Decimal, config: &StakeConfig) -> Self {
        Self {
            initial,
            current: initial,
            max: config.max_stake,
            recovery: config.recovery,
            cooldown_after: config.cooldown_after_losses,
            cooldown_step: Duration::from_secs(config.cooldown_step_secs),
            wins: 0,
            losses: 0,
            loss_streak: 0,
        }
    }

    pub fn initial(&self) -> Decimal {
        self.initial
    }

    pub fn current(&self) -> Decimal {
        self.current
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn losses(&self) -> u32 {
        self.losses
    }

    pub fn loss_streak(&self) -> u32 {
        self.loss_streak
    }

    /// Stake for the next entry; resets to the base stake once above the cap
    pub fn stake_for_entry(&mut self) -> EntryStake {
        let was_reset = self.current > self.max;
        if was_reset {
            self.current = self.initial;
        }
        EntryStake {
            amount: self.current,
            was_reset,
        }
    }

    pub fn record_win(&mut self) {
        self.wins += 1;
        self.loss_streak = 0;
        self.current = self.initial;
    }

    /// Book a loss, grow the stake and return the cooldown to observe
    pub fn record_loss(&mut self) -> Duration {
        self.losses += 1;
        self.loss_streak += 1;

        self.current = match self.recovery {
            StakeRecovery::Martingale { factor } => (self.current * factor).min(self.max),
            StakeRecovery::Fixed => self.initial,
        };

        cooldown_for(self.loss_streak, self.cooldown_after, self.cooldown_step)
    }
}
