// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError, info};

use tradux::app_config::{Config, LogLevel, ProviderKind};
use tradux::cache::{InMemoryVolatileCache, TwoTierCache};
use tradux::database::{DatabaseConnection, Repository};
use tradux::glossary::Glossary;
use tradux::job::NewJob;
use tradux::ledger::{CreditLedger, SqliteLedger};
use tradux::orchestrator::Orchestrator;
use tradux::progress::{ProgressSink, ProgressSnapshot};
use tradux::provider_client::RateLimitedProviderClient;
use tradux::providers::{DeepLProvider, MockProvider, TranslationProvider};
use tradux::rate_limit::{BackoffPolicy, RateLimiter};

/// Minimal stderr logger for the CLI
struct CliLogger;

static LOGGER: CliLogger = CliLogger;

impl log::Log for CliLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let prefix = match record.level() {
                Level::Error => "ERROR",
                Level::Warn => " WARN",
                Level::Info => " INFO",
                Level::Debug => "DEBUG",
                Level::Trace => "TRACE",
            };
            eprintln!("{} {}", prefix, record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logger(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}

fn level_filter(level: &LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Parser, Debug)]
#[command(name = "tradux", version, about = "Document translation with two-tier caching")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the SQLite database (defaults to the user data directory)
    #[arg(long)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a text file
    Translate(TranslateArgs),
    /// Show the status of a job
    Status {
        /// Job identifier
        job_id: String,
    },
    /// Print the assembled translation of a completed job
    Assemble {
        /// Job identifier
        job_id: String,
        /// Write the output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run all pending jobs
    RunPending {
        /// Jobs processed concurrently
        #[arg(long, default_value_t = 2)]
        concurrency: usize,
    },
    /// Show cache statistics
    CacheStats,
    /// Evict never-reused cache entries older than the configured age
    CacheEvict,
    /// Return jobs stuck in processing (after a crash) to pending
    ResetStale,
    /// Create a credit account
    OpenAccount {
        /// Account identifier
        account_id: String,
        /// Opening balance in characters
        #[arg(long, default_value_t = 0)]
        credits: i64,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input text file
    input: PathBuf,

    /// Target language code (defaults to the configured one)
    #[arg(short, long)]
    target: Option<String>,

    /// Source language code; omit for provider-side detection
    #[arg(short, long)]
    source: Option<String>,

    /// Account billed for the translation
    #[arg(short, long)]
    account: String,

    /// JSON glossary file of pinned terms
    #[arg(short, long)]
    glossary: Option<PathBuf>,

    /// Translate only a preview prefix, without billing
    #[arg(long)]
    preview: bool,
}

/// Progress sink rendering an indicatif bar
struct CliProgressSink {
    bar: ProgressBar,
}

impl CliProgressSink {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[async_trait]
impl ProgressSink for CliProgressSink {
    async fn put(&self, _job_id: &str, snapshot: ProgressSnapshot, _ttl: Duration) -> Result<()> {
        self.bar.set_position(snapshot.progress_percent.max(0) as u64);
        self.bar
            .set_message(format!("{} chars saved by cache", snapshot.saved_chars));
        Ok(())
    }
}

/// Engine components wired from the configuration
struct Engine {
    repository: Repository,
    cache: TwoTierCache,
    ledger: SqliteLedger,
    orchestrator: Orchestrator,
}

fn build_engine(
    config: &Config,
    database: Option<&PathBuf>,
    progress: Arc<dyn ProgressSink>,
) -> Result<Engine> {
    let db = match database {
        Some(path) => DatabaseConnection::new(path)?,
        None => DatabaseConnection::new_default()?,
    };
    let repository = Repository::new(db);

    let volatile = Arc::new(InMemoryVolatileCache::new());
    let cache = TwoTierCache::new(
        repository.clone(),
        volatile,
        Duration::from_secs(config.cache.volatile_ttl_secs),
    );

    let provider: Arc<dyn TranslationProvider> = match config.provider.kind {
        ProviderKind::DeepL => Arc::new(DeepLProvider::new(
            &config.provider.endpoint,
            &config.provider.api_key,
            Duration::from_secs(config.provider.timeout_secs),
        )?),
        ProviderKind::Mock => Arc::new(MockProvider::working()),
    };

    let client = RateLimitedProviderClient::new(
        provider,
        Arc::new(RateLimiter::new(config.provider.requests_per_second)),
        BackoffPolicy::new(
            config.provider.retry_count,
            Duration::from_millis(config.provider.retry_backoff_ms),
            config.provider.backoff_multiplier,
        ),
        config.provider.max_chars_per_request,
    );

    let ledger = SqliteLedger::new(repository.clone());

    let orchestrator = Orchestrator::new(
        repository.clone(),
        cache.clone(),
        client,
        Arc::new(ledger.clone()),
        progress,
        config.chunking.clone(),
        Duration::from_secs(config.cache.volatile_ttl_secs),
    );

    Ok(Engine {
        repository,
        cache,
        ledger,
        orchestrator,
    })
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => {
            let mut config = Config::default();
            // without a config file, fall back to the offline provider
            config.provider.kind = ProviderKind::Mock;
            Ok(config)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger(LevelFilter::Info).map_err(|e| anyhow!("Failed to install logger: {}", e))?;

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    log::set_max_level(level_filter(&config.log_level));

    match cli.command {
        Commands::Translate(args) => run_translate(&config, cli.database.as_ref(), args).await,
        Commands::Status { job_id } => {
            let engine = build_engine(&config, cli.database.as_ref(), silent_sink())?;
            let job = engine.orchestrator.job(&job_id).await?;
            println!(
                "{}: {} ({}%), {} billed, {} saved",
                job.id, job.status, job.progress, job.characters_billed, job.characters_saved
            );
            if let Some(error) = job.error_message {
                println!("error: {}", error);
            }
            Ok(())
        }
        Commands::Assemble { job_id, output } => {
            let engine = build_engine(&config, cli.database.as_ref(), silent_sink())?;
            let text = engine.orchestrator.assemble(&job_id).await?;
            match output {
                Some(path) => std::fs::write(&path, text)
                    .with_context(|| format!("Failed to write output: {}", path.display()))?,
                None => println!("{}", text),
            }
            Ok(())
        }
        Commands::RunPending { concurrency } => {
            let engine = build_engine(&config, cli.database.as_ref(), silent_sink())?;
            let summary = engine.orchestrator.run_pending(concurrency).await?;
            println!("{} completed, {} failed", summary.completed, summary.failed);
            Ok(())
        }
        Commands::CacheStats => {
            let engine = build_engine(&config, cli.database.as_ref(), silent_sink())?;
            let stats = engine.cache.stats().await?;
            println!(
                "{} entries, {} hits, {:.1}% hit rate",
                stats.total_entries,
                stats.total_hits,
                stats.hit_rate * 100.0
            );
            Ok(())
        }
        Commands::CacheEvict => {
            let engine = build_engine(&config, cli.database.as_ref(), silent_sink())?;
            let age = Duration::from_secs(config.cache.evict_after_days as u64 * 86_400);
            let evicted = engine.cache.evict(age).await?;
            println!("Evicted {} entries", evicted);
            Ok(())
        }
        Commands::ResetStale => {
            let engine = build_engine(&config, cli.database.as_ref(), silent_sink())?;
            let reset = engine.repository.reset_stale_jobs().await?;
            println!("Reset {} jobs to pending", reset);
            Ok(())
        }
        Commands::OpenAccount { account_id, credits } => {
            let engine = build_engine(&config, cli.database.as_ref(), silent_sink())?;
            engine.ledger.open_account(&account_id, credits).await?;
            println!("Opened account {} with {} credits", account_id, credits);
            Ok(())
        }
    }
}

fn silent_sink() -> Arc<dyn ProgressSink> {
    Arc::new(tradux::progress::InMemoryProgressSink::new())
}

async fn run_translate(
    config: &Config,
    database: Option<&PathBuf>,
    args: TranslateArgs,
) -> Result<()> {
    let source_text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input file: {}", args.input.display()))?;

    let glossary = match &args.glossary {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read glossary: {}", path.display()))?;
            Some(serde_json::from_str::<Glossary>(&content).context("Failed to parse glossary")?)
        }
        None => None,
    };

    let progress = Arc::new(CliProgressSink::new());
    let engine = build_engine(config, database, progress.clone())?;

    let job = engine
        .orchestrator
        .create_job(NewJob {
            account_id: args.account.clone(),
            source_text,
            source_language: args.source.clone(),
            target_language: args
                .target
                .clone()
                .unwrap_or_else(|| config.target_language.clone()),
            glossary,
            preview: args.preview,
        })
        .await?;

    info!("Running job {}", job.id);
    let completed = engine.orchestrator.run_job(&job.id).await;
    progress.finish();
    let completed = completed?;

    let balance = engine.ledger.balance(&args.account).await?;
    println!(
        "Job {} completed: {} characters billed, {} saved by cache{}",
        completed.id,
        completed.characters_billed,
        completed.characters_saved,
        balance
            .map(|b| format!(", balance {}", b))
            .unwrap_or_default()
    );

    let text = engine.orchestrator.assemble(&completed.id).await?;
    let output = args.input.with_extension(format!(
        "{}.txt",
        completed.target_language
    ));
    std::fs::write(&output, text)
        .with_context(|| format!("Failed to write output: {}", output.display()))?;
    println!("Wrote {}", output.display());

    Ok(())
}
