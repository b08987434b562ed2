//! LevelUp CLI - drive the progress engine from a terminal.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use levelup_core::{LevelAttempt, LevelId, LevelRecord, UserId};
use levelup_progress::{
    sync, EngineConfig, HttpConfig, HttpProgressService, ProgressEngine, RegenScope,
    RewardPolicy, AUTH_TOKEN_KEY,
};
use levelup_storage::{JsonFileStore, KeyValueStore};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "levelup")]
#[command(about = "Learner progress tracking and sync", long_about = None)]
struct Cli {
    /// Local store file
    #[arg(long, default_value = ".levelup/store.json")]
    data: PathBuf,

    /// Learner to bind to (progress is volatile without one)
    #[arg(long)]
    user: Option<String>,

    /// Remote progress API root; remote sync is off without it
    #[arg(long)]
    api_url: Option<String>,

    /// Remote request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Only reward the first pass of each level
    #[arg(long)]
    first_pass_only: bool,

    /// Keep a separate heart regeneration clock per user
    #[arg(long)]
    per_user_regen: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a level attempt
    Complete {
        /// Level ordinal
        level: LevelId,
        /// Correct answers
        score: u32,
        /// Questions asked
        total: u32,
        /// XP granted on a pass
        #[arg(long, default_value = "10")]
        xp: u32,
        /// Seconds spent on the attempt
        #[arg(long, default_value = "0")]
        time_spent: u32,
    },
    /// Show aggregate progress
    Status,
    /// Show the latest attempt at a level
    Level {
        /// Level ordinal
        level: LevelId,
    },
    /// Check whether a level is playable
    Unlocked {
        /// Level ordinal
        level: LevelId,
    },
    /// Regenerate a heart if the interval has elapsed
    Regen,
    /// Wipe progress for the bound user
    Reset,
    /// Store the bearer token used for remote sync
    Login {
        /// Bearer token
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Open storage
    let store = Arc::new(
        JsonFileStore::open(&cli.data)
            .with_context(|| format!("Failed to open store at {}", cli.data.display()))?,
    );

    let config = EngineConfig {
        regen_scope: if cli.per_user_regen { RegenScope::PerUser } else { RegenScope::Global },
        reward_policy: if cli.first_pass_only { RewardPolicy::FirstPassOnly } else { RewardPolicy::EveryPass },
        ..Default::default()
    };
    let mut engine = ProgressEngine::new(store.clone()).with_config(config);

    let worker = match &cli.api_url {
        Some(url) => {
            let mut http = HttpConfig::new(url.clone());
            http.timeout = cli.timeout_secs.map(std::time::Duration::from_secs);
            let service = HttpProgressService::new(http).context("Failed to build HTTP client")?;
            let (dispatcher, handle) = sync::spawn_worker(service);
            engine = engine.with_sync(dispatcher);
            Some(handle)
        }
        None => None,
    };

    if let Some(user) = cli.user {
        engine.bind_user(UserId::new(user));
    }

    match cli.command {
        Commands::Complete { level, score, total, xp, time_spent } => {
            let attempt = LevelAttempt::new(level, score, total, xp).with_time_spent(time_spent);
            let record = engine.complete_level_with(attempt);
            print_record(&record);
            let progress = engine.user_progress();
            println!("  XP total: {}  Streak: {}  Hearts: {}/{}",
                progress.total_xp,
                progress.current_streak,
                progress.hearts,
                progress.max_hearts,
            );
        }
        Commands::Status => {
            let summary = engine.summary();
            let progress = &summary.progress;
            match engine.bound_user() {
                Some(user) => println!("Progress for {}", user),
                None => println!("Progress (no user bound)"),
            }
            println!("  XP: {}", progress.total_xp);
            println!("  Streak: {}", progress.current_streak);
            println!("  Hearts: {}/{}", progress.hearts, progress.max_hearts);
            println!("  Highest unlocked level: {}", progress.highest_unlocked_level);
            println!("  Levels attempted: {} (passing: {})", summary.attempted_levels, summary.passing_levels);
            let completed: Vec<String> = progress.completed_level_ids.iter().map(|l| l.to_string()).collect();
            println!("  Completed: [{}]", completed.join(", "));
        }
        Commands::Level { level } => match engine.level_progress(level) {
            Some(record) => print_record(&record),
            None => println!("Level {} not attempted", level),
        },
        Commands::Unlocked { level } => {
            if engine.is_level_unlocked(level) {
                println!("Level {} is unlocked", level);
            } else {
                println!("Level {} is locked", level);
            }
        }
        Commands::Regen => {
            if engine.regenerate_hearts() {
                println!("Regenerated a heart: {}/{}", engine.user_progress().hearts, engine.user_progress().max_hearts);
            } else {
                println!("No heart regenerated");
            }
        }
        Commands::Reset => {
            engine.reset_progress();
            println!("Progress reset");
        }
        Commands::Login { token } => {
            store.set(AUTH_TOKEN_KEY, &token).context("Failed to store auth token")?;
            println!("Token saved to {}", store.path().display());
        }
    }

    // Dropping the engine closes the sync queue; wait for it to drain
    drop(engine);
    if let Some(handle) = worker {
        let report = handle.await.context("Sync worker panicked")?;
        debug!("Sync report: {:?}", report);
        if report.submitted > 0 {
            info!("Synced {} attempt(s) to remote", report.submitted);
        }
    }

    Ok(())
}

fn print_record(record: &LevelRecord) {
    println!("Level {}: {} ({}/{} = {}%)",
        record.level_id,
        if record.is_completed { "PASSED" } else { "FAILED" },
        record.score,
        record.total,
        record.percentage,
    );
    println!("  XP earned: {}", record.xp_earned);
    println!("  At: {}", record.completed_at);
}
