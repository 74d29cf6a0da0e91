//! Futures Scalper Bot
//!
//! Runs the configured trading sessions against Binance USD-M futures.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use scalper_bot::{
    client::{BinanceFuturesClient, Exchange, PaperExchange},
    config::Config,
    engine::{EngineConfig, Services},
    journal::Journal,
    market,
    model::{LlmScorer, RuleScorer, ScoreRequest, Scorer},
    notify::{Notifier, Notify},
    session::SessionManager,
    strategy::ExitReason,
    types::normalize_symbol,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "scalper-bot")]
#[command(about = "Single-position scalping bot for Binance USD-M futures")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every configured session
    Run {
        /// Simulate fills against live prices (no orders sent)
        #[arg(long)]
        dry_run: bool,
    },
    /// Check exchange connectivity
    Check {
        /// Symbol to fetch a ticker for
        #[arg(short, long)]
        symbol: Option<String>,
    },
    /// Analyze a symbol once and print the verdict
    Scan {
        #[arg(short, long, default_value = "BTC/USDT")]
        symbol: String,
    },
    /// Summarize the trade journal
    Journal {
        /// Number of recent trades to list
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Send a test Telegram message
    TestNotify {
        chat_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run { dry_run } => run_bot(config, dry_run).await,
        Commands::Check { symbol } => check(config, symbol).await,
        Commands::Scan { symbol } => scan(config, &symbol).await,
        Commands::Journal { limit } => show_journal(config, limit).await,
        Commands::TestNotify { chat_id } => test_notify(config, chat_id).await,
    }
}

fn build_scorer(config: &Config) -> anyhow::Result<Arc<dyn Scorer>> {
    match &config.llm {
        Some(llm_config) => {
            let llm = LlmScorer::from_config(llm_config)?;
            tracing::info!("LLM scorer initialized: {} ({:?} mode)", llm.model(), llm_config.mode);
            Ok(Arc::new(llm))
        }
        None => {
            tracing::info!("No [llm] section, using rule-based scorer");
            Ok(Arc::new(RuleScorer::new(config.rule.clone())))
        }
    }
}

fn build_notifier(config: &Config) -> Notifier {
    match &config.telegram {
        Some(tg) => Notifier::new(tg),
        None => {
            tracing::warn!("Telegram not configured, notifications go to the log");
            Notifier::disabled()
        }
    }
}

async fn run_bot(config: Config, dry_run: bool) -> anyhow::Result<()> {
    tracing::info!("Starting futures scalper bot");

    if config.sessions.is_empty() {
        anyhow::bail!("No [[sessions]] configured");
    }

    let binance = Arc::new(BinanceFuturesClient::new(&config.exchange)?);
    tracing::info!("Exchange endpoint: {}", binance.base_url());
    match binance.load_markets().await {
        Ok(count) => tracing::info!("Loaded {} markets", count),
        Err(e) => tracing::warn!("Failed to preload markets: {}", e),
    }

    let exchange: Arc<dyn Exchange> = if dry_run {
        tracing::warn!("Running in DRY RUN mode - fills are simulated, no orders are sent");
        Arc::new(PaperExchange::new(binance.clone()))
    } else {
        if !binance.is_authenticated() {
            anyhow::bail!("Live trading needs exchange.api_key and exchange.api_secret (or use --dry-run)");
        }
        binance.clone() as Arc<dyn Exchange>
    };

    let journal = if config.journal.enabled {
        let journal = Journal::new(&config.journal.path);
        tracing::info!("Journaling closed trades to {}", journal.path().display());
        Some(Arc::new(journal))
    } else {
        None
    };

    let services = Services {
        exchange,
        scorer: build_scorer(&config)?,
        notifier: Arc::new(build_notifier(&config)),
        journal,
    };
    let manager = SessionManager::new(services, EngineConfig::from_config(&config), config.stake.clone());

    for session in &config.sessions {
        let stake = session.stake.unwrap_or(config.stake.default_stake);
        if let Err(e) = manager.launch(session.chat_id, &session.symbol, stake) {
            tracing::error!("Failed to launch session for chat {}: {}", session.chat_id, e);
        }
    }

    let mut status_timer =
        tokio::time::interval(Duration::from_secs(config.trading.status_interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = status_timer.tick() => {
                for status in manager.statuses().await {
                    tracing::info!(
                        "📊 chat {} {}: trading={} stake={} W/L={}/{} streak={} in_position={}",
                        status.chat_id,
                        status.symbol,
                        status.is_trading,
                        status.current_stake.round_dp(2),
                        status.wins,
                        status.losses,
                        status.loss_streak,
                        status.active_trade.is_some()
                    );
                }
            }
            res = tokio::signal::ctrl_c() => {
                res?;
                break;
            }
        }
    }

    tracing::info!("Shutting down, stopping all sessions...");
    manager.stop_all().await;
    Ok(())
}

async fn check(config: Config, symbol: Option<String>) -> anyhow::Result<()> {
    let symbol = symbol
        .or_else(|| config.sessions.first().map(|s| s.symbol.clone()))
        .map(|s| normalize_symbol(&s))
        .unwrap_or_else(|| "BTC/USDT".to_string());

    let client = BinanceFuturesClient::new(&config.exchange)?;
    println!("\n🔌 Exchange Check\n");
    println!("Endpoint: {}", client.base_url());
    println!("Credentials: {}", if client.is_authenticated() { "configured" } else { "missing" });

    let ticker = client.fetch_ticker(&symbol).await?;
    println!("{} last price: {}", ticker.symbol, ticker.last);

    let info = client.market_info(&symbol).await?;
    println!(
        "Tick size: {}  Step size: {}  Min qty: {}",
        info.tick_size, info.step_size, info.min_qty
    );

    println!("\n✅ Connection OK");
    Ok(())
}

async fn scan(config: Config, symbol: &str) -> anyhow::Result<()> {
    let symbol = normalize_symbol(symbol);
    let client = BinanceFuturesClient::new(&config.exchange)?;

    let snapshot = market::fetch_snapshot(&client, &symbol, &config.indicators)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No candle data for {}", symbol))?;

    println!("\n📈 {} Snapshot\n", symbol);
    println!("Price: {}", snapshot.last_price);
    println!(
        "EMA{} / EMA{}: {:.4} / {:.4} → {} bias",
        config.indicators.fast_span, config.indicators.slow_span, snapshot.ema_fast, snapshot.ema_slow, snapshot.bias
    );
    println!("RSI({}): {:.2}", config.indicators.rsi_period, snapshot.rsi);
    if let Some(bands) = &snapshot.bands {
        println!("Bands: {:.4} / {:.4} / {:.4}", bands.lower, bands.middle, bands.upper);
    }

    let scorer = build_scorer(&config)?;
    let verdict = scorer.evaluate(&ScoreRequest::from(&snapshot)).await?;
    println!("\n🤖 Verdict: {} score {} ({})", verdict.decision, verdict.score, verdict.reasoning);

    match verdict.entry_side(config.trading.score_threshold) {
        Some(side) => println!("Would enter {} (threshold {})", side, config.trading.score_threshold),
        None => println!("No entry (threshold {})", config.trading.score_threshold),
    }
    Ok(())
}

async fn show_journal(config: Config, limit: usize) -> anyhow::Result<()> {
    let journal = Journal::new(&config.journal.path);
    let trades = journal.load().await?;

    if trades.is_empty() {
        println!("No trades in {}", journal.path().display());
        return Ok(());
    }

    println!("\n📒 Last {} of {} trades\n", limit.min(trades.len()), trades.len());
    println!(
        "{:<20} {:>12} {:<10} {:<5} {:>12} {:>12} {:<11} {:>10}",
        "Closed", "Chat", "Symbol", "Side", "Entry", "Exit", "Reason", "PnL"
    );
    println!("{}", "-".repeat(100));

    for trade in trades.iter().rev().take(limit).rev() {
        println!(
            "{:<20} {:>12} {:<10} {:<5} {:>12} {:>12} {:<11} {:>10}",
            trade.closed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            trade.chat_id,
            trade.symbol,
            trade.side.as_str(),
            trade.entry_price.to_string(),
            trade.exit_price.to_string(),
            trade.reason.to_string(),
            trade.pnl.round_dp(4).to_string()
        );
    }

    let wins = trades.iter().filter(|t| t.reason == ExitReason::TakeProfit).count();
    let total: Decimal = trades.iter().map(|t| t.pnl).sum();
    println!(
        "\nWins: {}  Losses: {}  Net PnL: {}",
        wins,
        trades.len() - wins,
        total.round_dp(4)
    );
    Ok(())
}

async fn test_notify(config: Config, chat_id: i64) -> anyhow::Result<()> {
    let tg_config = config
        .telegram
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Telegram not configured in config.toml"))?;

    let notifier = Notifier::new(tg_config);
    if !notifier.is_enabled() {
        anyhow::bail!("telegram.bot_token is empty");
    }
    notifier
        .send(chat_id, "🧪 Test Notification\n\nIf you see this, Telegram integration is working!")
        .await?;

    println!("✅ Test notification sent!");
    Ok(())
}
