// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use clap::Parser;
use lumen_agents::{FetchOutcome, ResourceCache};
use lumen_core::{
    asset::{NoopDisposer, Tag},
    CancellationToken, Stopwatch,
};
use lumen_data::{assets::Sprite, CacheConfig};
use lumen_io::{FileFetcher, HttpFetcher, SourceRouter, SpriteDecoder};
use std::{path::PathBuf, time::Duration};
use tokio::task::JoinSet;

/// Loads sprites through the resource cache and prints its counters.
#[derive(Parser)]
#[command(name = "sandbox", about = "Loads sprites through the Lumen resource cache")]
#[command(version)]
struct Cli {
    /// RON file with per-tag limits. Built-in defaults are used otherwise.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tag every source is loaded under.
    #[arg(long, default_value = Tag::LOCAL_LEVEL_COVER_THUMBNAIL)]
    tag: String,

    /// Mirror remote sources to this directory.
    #[arg(long)]
    mirror: Option<PathBuf>,

    /// Seconds before a remote request is abandoned.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Downscale sprites larger than this many pixels on a side.
    #[arg(long)]
    max_dimension: Option<u32>,

    /// How many concurrent requests to issue per source.
    #[arg(long, default_value_t = 2)]
    requests: usize,

    /// Local paths or http(s) URLs to load.
    #[arg(required = true)]
    sources: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CacheConfig::load(path)
            .with_context(|| format!("loading cache config from {}", path.display()))?,
        None => CacheConfig::default(),
    };
    let remote = HttpFetcher::with_timeout(Duration::from_secs(cli.timeout_secs))
        .context("building the HTTP client")?;
    let fetcher = match &cli.mirror {
        Some(dir) => SourceRouter::mirrored(remote, dir),
        None => SourceRouter::new(FileFetcher::new(), remote),
    };
    let decoder = match cli.max_dimension {
        Some(max) => SpriteDecoder::with_max_dimension(max),
        None => SpriteDecoder::new(),
    };
    let cache: ResourceCache<Sprite> = ResourceCache::new(config, fetcher, decoder, NoopDisposer);

    let token = CancellationToken::new();
    let stopwatch = Stopwatch::new();
    let mut requests = JoinSet::new();
    for source in &cli.sources {
        for _ in 0..cli.requests.max(1) {
            let cache = cache.clone();
            let token = token.clone();
            let source = source.clone();
            let tag = cli.tag.clone();
            requests.spawn(async move {
                let outcome = cache.fetch_or_wait(source.as_str(), tag, &token).await;
                (source, outcome)
            });
        }
    }

    while let Some(joined) = requests.join_next().await {
        let (source, outcome) = joined.context("request task panicked")?;
        match outcome {
            FetchOutcome::Loaded(sprite) => println!(
                "{source}: {}x{} (aspect {:.2}, {} bytes)",
                sprite.width,
                sprite.height,
                sprite.aspect_ratio(),
                sprite.byte_len()
            ),
            FetchOutcome::Absent => println!("{source}: failed to load"),
            FetchOutcome::Cancelled => println!("{source}: cancelled"),
        }
    }

    let tag = Tag::new(cli.tag.as_str());
    let stats = cache.stats();
    log::info!(
        "Loaded {} source(s) in {:.1}ms",
        cli.sources.len(),
        stopwatch.elapsed_ms_f64()
    );
    println!(
        "entries={} (tag {tag}: {}) hits={} misses={} joins={} fetches={} failures={} evictions={} hit_rate={:.2}",
        stats.entries,
        cache.tag_len(&tag),
        stats.hits,
        stats.misses,
        stats.joins,
        stats.fetches,
        stats.failures,
        stats.evictions,
        stats.hit_rate()
    );

    let released = cache.evict_all();
    log::info!("Released {released} cached sprite(s)");
    Ok(())
}
