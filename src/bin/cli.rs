//! Memoir CLI
//!
//! Command-line interface for Memoir operations:
//! - Log memories
//! - Run analytics modules
//! - Build the life map
//! - Search memories
//! - Check status

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use memoir::analytics::{AnalyticsEngine, ModuleKind, SearchQuery};
use memoir::cache::{AnalyticsCache, CacheConfig};
use memoir::config::{generate_default_config, Config};
use memoir::memory::{MemoryAccessor, MemoryRecord, MemoryStore, Mood, SqliteStore};
use memoir::AnalyticsPayload;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "memoir")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Personal journaling intelligence")]
#[command(
    long_about = "Memoir turns your journal into structured insight:\nmood trends, relationship dynamics, narrative arcs, forecasts, and a life map."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// User the command operates on
    #[arg(long, default_value = "default", global = true)]
    pub user: String,

    /// Override the database path from config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output format (summary, json)
    #[arg(short, long, default_value = "summary", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log a memory
    Log {
        /// The journal text
        text: String,
        /// Sentiment in [-1, 1]
        #[arg(short, long)]
        sentiment: Option<f64>,
        /// Mood (joyful, happy, calm, neutral, anxious, sad, angry)
        #[arg(short, long)]
        mood: Option<String>,
        /// Topic tags
        #[arg(short = 'T', long = "topic")]
        topics: Vec<String>,
        /// People mentioned
        #[arg(short = 'P', long = "person")]
        people: Vec<String>,
        /// Timestamp (default: now). Supports: "now", "yesterday", ISO 8601, Unix seconds
        #[arg(short, long)]
        time: Option<String>,
    },

    /// Run one analytics module
    Analyze {
        /// Module tag (identity_pulse, relationships, character_analytics,
        /// saga_engine, memory_fabric, insight_engine, prediction_engine,
        /// shadow_engine, xp_engine, life_map)
        module: String,
        /// Invalidate the cached payload and recompute
        #[arg(long)]
        refresh: bool,
    },

    /// Build the full life map
    Lifemap {
        /// Invalidate every cached payload first
        #[arg(long)]
        refresh: bool,
    },

    /// Search memories
    Search {
        /// Free-text query
        query: String,
        /// Restrict to a topic
        #[arg(short = 'T', long)]
        topic: Option<String>,
        /// Restrict to a person
        #[arg(short = 'P', long)]
        person: Option<String>,
        /// Maximum results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show store status
    Status,

    /// Write a default config file
    InitConfig {
        /// Destination path
        #[arg(default_value = "./config.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "memoir=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load_default();

    if let Commands::InitConfig { path } = &cli.command {
        std::fs::write(path, generate_default_config())
            .with_context(|| format!("writing config to {:?}", path))?;
        println!("Wrote default config to {:?}", path);
        return Ok(());
    }

    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.store.db_path));
    let store = Arc::new(SqliteStore::open(&db_path).context("opening memory store")?);
    let accessor = Arc::new(MemoryAccessor::new(
        store.clone(),
        config.analytics.fetch_limit,
    ));
    let cache = Arc::new(AnalyticsCache::new(CacheConfig {
        ttl_minutes: config.analytics.cache_ttl_minutes,
        enabled: config.analytics.cache_enabled,
    }));
    let engine = AnalyticsEngine::new(accessor, cache);

    match cli.command {
        Commands::Log {
            text,
            sentiment,
            mood,
            topics,
            people,
            time,
        } => {
            let mut record = MemoryRecord::new(text);
            if let Some(time) = time {
                record = record.at(parse_time(&time)?);
            }
            if let Some(s) = sentiment {
                anyhow::ensure!((-1.0..=1.0).contains(&s), "sentiment must be in [-1, 1]");
                record = record.sentiment(s);
            }
            if let Some(name) = mood {
                let mood = Mood::parse(&name)
                    .with_context(|| format!("unknown mood \"{}\"", name))?;
                record = record.mood(mood);
            }
            for topic in topics {
                record = record.topic(topic);
            }
            for person in people {
                record = record.person(person);
            }

            store.insert(&cli.user, record).await?;
            engine.cache().invalidate_user(&cli.user).await;
            println!("Logged.");
        }

        Commands::Analyze { module, refresh } => {
            let kind: ModuleKind = module.parse()?;
            let payload = if refresh {
                engine.refresh(&cli.user, kind).await?
            } else {
                engine.run(&cli.user, kind).await?
            };
            print_payload(&payload, &cli.format)?;
        }

        Commands::Lifemap { refresh } => {
            if refresh {
                engine.cache().invalidate_user(&cli.user).await;
            }
            let payload = engine.run(&cli.user, ModuleKind::LifeMap).await?;
            print_payload(&payload, &cli.format)?;
        }

        Commands::Search {
            query,
            topic,
            person,
            limit,
        } => {
            let mut search = SearchQuery::new(query);
            if let Some(topic) = topic {
                search.filters.topics.push(topic);
            }
            if let Some(person) = person {
                search.filters.people.push(person);
            }
            search.limit = limit;

            let payload = engine.search(&cli.user, search).await?;
            print_payload(&payload, &cli.format)?;
        }

        Commands::Status => {
            let count = engine.accessor().count(&cli.user).await?;
            println!("user:     {}", cli.user);
            println!("store:    {:?}", db_path);
            println!("memories: {}", count);
        }

        Commands::InitConfig { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Parse "now", "yesterday", ISO 8601, or Unix seconds
fn parse_time(input: &str) -> anyhow::Result<DateTime<Utc>> {
    match input.trim().to_lowercase().as_str() {
        "now" => return Ok(Utc::now()),
        "yesterday" => return Ok(Utc::now() - Duration::days(1)),
        _ => {}
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(seconds) = input.parse::<i64>() {
        if let Some(parsed) = DateTime::from_timestamp(seconds, 0) {
            return Ok(parsed);
        }
    }

    anyhow::bail!("could not parse time \"{}\"", input)
}

fn print_payload(payload: &AnalyticsPayload, format: &str) -> anyhow::Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(payload)?);
        return Ok(());
    }

    println!("{}", payload.summary);
    if !payload.metrics.is_empty() {
        println!();
        for (key, value) in &payload.metrics {
            match value {
                memoir::MetricValue::Number(n) => println!("  {:<24} {:.3}", key, n),
                memoir::MetricValue::Text(t) => println!("  {:<24} {}", key, t),
            }
        }
    }
    if !payload.insights.is_empty() {
        println!();
        for insight in payload.top_insights(8) {
            println!("  [{:>4.0}%] {}", insight.score * 100.0, insight.text);
        }
    }
    Ok(())
}
