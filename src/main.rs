// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use resolver_lib::cache::CachedMatcher;
use resolver_lib::matching::{FuzzyMatcher, OptimizedMatcher};
use resolver_lib::models::{Candidate, MatchType};
use resolver_lib::query::enhancer::ORGANIZATIONS_KEY;
use resolver_lib::query::{GraphQueryBuilder, QueryEnhancer};
use resolver_lib::utils::config::ResolverConfig;
use resolver_lib::utils::env::load_env;

#[derive(Parser)]
#[command(author, version, about = "Fuzzy entity resolution for IT documentation", long_about = None)]
struct Cli {
    /// Minimum score for a candidate to be reported (defaults to FUZZY_MATCH_THRESHOLD)
    #[arg(long, global = true)]
    threshold: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Match one name through the cache layer
    Match {
        input: String,
        /// JSON file with `[{"id": "...", "name": "..."}]`
        #[arg(long)]
        candidates: PathBuf,
        /// Only report matches won by this strategy
        #[arg(long)]
        match_type: Option<String>,
    },
    /// Match one name with the optimized matcher
    Optimized {
        input: String,
        #[arg(long)]
        candidates: PathBuf,
        #[arg(long, default_value_t = 5)]
        top_n: usize,
    },
    /// Detect intent and resolve the organization in a free-text query
    Enhance {
        query: String,
        #[arg(long)]
        organizations: Option<PathBuf>,
    },
    /// Build a graph query from a free-text query
    Query {
        query: String,
        #[arg(long)]
        organizations: Option<PathBuf>,
        /// Confidence below which the query is flagged for confirmation
        #[arg(long, default_value_t = 0.8)]
        min_confidence: f64,
    },
    /// Precompute cache entries for a JSON array of queries
    Warm {
        #[arg(long)]
        queries: PathBuf,
        #[arg(long)]
        candidates: PathBuf,
    },
    /// Print the cache health report
    Stats {
        /// Drop every cached entry in the namespace first
        #[arg(long)]
        invalidate: bool,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_candidates(path: &Path) -> Result<Vec<Candidate>> {
    let candidates: Vec<Candidate> = read_json(path)?;
    info!("Loaded {} candidates from {}", candidates.len(), path.display());
    Ok(candidates)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a resolver_lib::query::GraphQuery,
    requires_confirmation: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();

    let cli = Cli::parse();
    let config = ResolverConfig::from_env();
    config.log_config();
    let threshold = cli.threshold.unwrap_or(config.matcher.threshold);

    let start = Instant::now();
    let matcher = Arc::new(FuzzyMatcher::new(&config.matcher));

    match cli.command {
        Command::Match {
            input,
            candidates,
            match_type,
        } => {
            let candidates = read_candidates(&candidates)?;
            let match_type = match_type
                .as_deref()
                .map(str::parse::<MatchType>)
                .transpose()?;
            let cached = CachedMatcher::from_config(matcher, config.cache.clone())?;
            let results = cached
                .match_cached_with_type(&input, &candidates, threshold, match_type)
                .await;
            print_json(&results)?;
        }
        Command::Optimized {
            input,
            candidates,
            top_n,
        } => {
            let candidates = read_candidates(&candidates)?;
            let optimized = Arc::new(OptimizedMatcher::from_config(
                &config.matcher,
                config.optimized.clone(),
            )?);
            let results = Arc::clone(&optimized)
                .match_optimized_async(input, candidates, threshold, top_n)
                .await?;
            print_json(&results)?;
            info!("Optimized matcher stats: {:?}", optimized.get_stats());
        }
        Command::Enhance {
            query,
            organizations,
        } => {
            let mut known = HashMap::new();
            if let Some(path) = organizations {
                known.insert(ORGANIZATIONS_KEY.to_string(), read_candidates(&path)?);
            }
            let enhancer = QueryEnhancer::with_threshold(matcher, threshold);
            print_json(&enhancer.enhance_query(&query, &known))?;
        }
        Command::Query {
            query,
            organizations,
            min_confidence,
        } => {
            let organizations = match organizations {
                Some(path) => Some(read_candidates(&path)?),
                None => None,
            };
            let mut known = HashMap::new();
            if let Some(orgs) = &organizations {
                known.insert(ORGANIZATIONS_KEY.to_string(), orgs.clone());
            }
            let enhanced = QueryEnhancer::with_threshold(Arc::clone(&matcher), threshold)
                .enhance_query(&query, &known);
            let built = GraphQueryBuilder::new(matcher)
                .with_threshold(threshold)
                .build_from_enhanced(&enhanced, organizations.as_deref());
            print_json(&QueryOutput {
                requires_confirmation: built.requires_confirmation(min_confidence),
                query: &built,
            })?;
        }
        Command::Warm {
            queries,
            candidates,
        } => {
            let queries: Vec<String> = read_json(&queries)?;
            let candidates = read_candidates(&candidates)?;
            let cached = CachedMatcher::from_config(matcher, config.cache.clone())?;
            let written = cached.warm_cache(&queries, &candidates, threshold).await;
            info!("Warmed {} of {} queries", written, queries.len());
        }
        Command::Stats { invalidate } => {
            let cached = CachedMatcher::from_config(matcher, config.cache.clone())?;
            if invalidate {
                let removed = cached.invalidate_all().await;
                info!("Invalidated {} cached entries", removed);
            }
            print_json(&cached.health().await)?;
        }
    }

    info!("Finished in {:.2?}", start.elapsed());
    Ok(())
}
