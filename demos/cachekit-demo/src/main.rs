//! Tiny CLI that exercises `cachekit`'s façade end-to-end over the in-process
//! object backend: put a value, read it back, tag it, invalidate by tag, and
//! print a metrics snapshot. Pure external wiring -- no part of the core's
//! correctness surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cachekit::{Cache, MetricsSnapshot, ObjectBackend, SetOptions};
use cachekit_core::clock::system_clock;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cachekit-demo", about = "Exercise the cachekit façade from the command line")]
struct Cli {
    /// Expose the façade's metrics on this address as a Prometheus scrape
    /// endpoint for the lifetime of this process, e.g. `127.0.0.1:9000`.
    #[arg(long)]
    prometheus_addr: Option<SocketAddr>,

    /// Print command output (`stats`) as JSON instead of plain text.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a value under a key, optionally with a TTL (seconds) and tags.
    Put {
        key: String,
        value: String,
        #[arg(long)]
        ttl_secs: Option<u64>,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Look up a key and print its value, or report a miss.
    Get { key: String },
    /// Remove every key associated with a tag.
    InvalidateTag { tag: String },
    /// Print the façade's metrics snapshot.
    Stats,
    /// Run a scripted end-to-end scenario against a single in-process cache:
    /// set, hit, tag, invalidate, miss, stats.
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.prometheus_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|err| anyhow::anyhow!("failed to install prometheus exporter: {err}"))?;
        tracing::info!(%addr, "prometheus exporter listening");
    }

    let cache = demo_cache();
    let cancel = CancellationToken::new();

    match cli.command {
        Command::Put { key, value, ttl_secs, tags } => {
            let mut options = SetOptions::new().with_tags(tags);
            if let Some(secs) = ttl_secs {
                options = options.with_ttl(Duration::from_secs(secs));
            }
            cache.set(&key, Arc::new(value), options, &cancel).await?;
            publish_metrics(&cache.metrics());
            println!("stored {key}");
        }
        Command::Get { key } => match cache.get(&key, &cancel).await? {
            Some(value) => println!("{value}"),
            None => println!("(miss)"),
        },
        Command::InvalidateTag { tag } => {
            cache.invalidate_tag(&tag, &cancel).await?;
            publish_metrics(&cache.metrics());
            println!("invalidated tag {tag}");
        }
        Command::Stats => print_stats(&cache.metrics(), cli.json),
        Command::Demo => run_demo(&cache, &cancel, cli.json).await?,
    }

    Ok(())
}

/// Mirrors the façade's snapshot into the global `metrics` recorder, so a
/// `--prometheus-addr` listener (if installed) reflects the latest counters.
fn publish_metrics(snapshot: &MetricsSnapshot) {
    metrics::gauge!("cachekit_hits").set(snapshot.hits as f64);
    metrics::gauge!("cachekit_misses").set(snapshot.misses as f64);
    metrics::gauge!("cachekit_stale_hits").set(snapshot.stale_hits as f64);
    metrics::gauge!("cachekit_sets").set(snapshot.sets as f64);
    metrics::gauge!("cachekit_removals").set(snapshot.removals as f64);
    metrics::gauge!("cachekit_evictions").set(snapshot.evictions as f64);
    metrics::gauge!("cachekit_size").set(snapshot.size as f64);
}

fn print_stats(snapshot: &MetricsSnapshot, json: bool) {
    if json {
        let body = serde_json::json!({
            "hits": snapshot.hits,
            "misses": snapshot.misses,
            "stale_hits": snapshot.stale_hits,
            "sets": snapshot.sets,
            "removals": snapshot.removals,
            "evictions": snapshot.evictions,
            "size": snapshot.size,
        });
        println!("{body}");
    } else {
        println!("{snapshot}");
    }
}

async fn run_demo(cache: &Cache<ObjectBackend<String>>, cancel: &CancellationToken, json: bool) -> anyhow::Result<()> {
    cache
        .set(
            "item",
            Arc::new("value".to_string()),
            SetOptions::new().with_tags(["demo".to_string()]),
            cancel,
        )
        .await?;
    println!("set item=value (tag: demo)");

    let hit = cache.get("item", cancel).await?;
    println!("get item -> {hit:?}");

    cache.invalidate_tag("demo", cancel).await?;
    println!("invalidated tag demo");

    let miss = cache.get("item", cancel).await?;
    println!("get item -> {miss:?}");

    let snapshot = cache.metrics();
    publish_metrics(&snapshot);
    print_stats(&snapshot, json);
    Ok(())
}

fn demo_cache() -> Cache<ObjectBackend<String>> {
    let clock = system_clock();
    let backend = ObjectBackend::new(Arc::clone(&clock));
    let config = cachekit::CacheConfig {
        clock,
        ..cachekit::CacheConfig::default()
    };
    Cache::new(backend, config).expect("default config is always valid")
}
