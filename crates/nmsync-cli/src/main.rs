//! nmsync CLI
//!
//! Dynamic inventory source backed by the monitoring service

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use nmsync_client::HttpClient;
use nmsync_core::{FileCache, JsonInventory, Synchronizer, cache_key};
use serde_json::Value;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, reload, util::SubscriberInitExt};

mod config;

/// Print the device inventory as dynamic-inventory JSON
#[derive(Parser, Debug)]
#[command(name = "nmsync", version, about)]
struct Args {
    /// Print the full inventory (default)
    #[arg(long, conflicts_with = "host")]
    list: bool,

    /// Print the variables of a single host
    #[arg(long, value_name = "NAME")]
    host: Option<String>,

    /// Configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ignore the cache and rebuild the inventory
    #[arg(long)]
    refresh: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging before config discovery so its events are kept
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, filter_handle) =
        reload::Layer::new(log_filter(args.verbose, rust_log.as_deref()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let loaded = config::load(args.config.as_deref())?;
    let mut sync_config = loaded.config;
    sync_config.cache_force_update |= args.refresh;
    if sync_config.verbose && !args.verbose {
        filter_handle.reload(log_filter(true, rust_log.as_deref()))?;
    }

    let settings = sync_config.validate()?;
    let store = FileCache::new(settings.cache_dir.clone());
    let key = cache_key(&settings.cache_prefix, &loaded.source);
    tracing::debug!(key = %key, path = %store.path(&key).display(), "cache location");

    let api = Arc::new(HttpClient::new(settings.client.clone())?);
    let synchronizer = Synchronizer::new(api, settings);

    let outcome = synchronizer.run(Some(&store), &key).await?;
    let mut inventory = JsonInventory::new();
    let summary = synchronizer.populate(&outcome.snapshot, &mut inventory);
    tracing::info!(
        groups = summary.groups,
        hosts = summary.hosts,
        excluded = summary.excluded,
        cached = outcome.reused(),
        "inventory ready"
    );

    let document = match args.host.as_deref() {
        Some(host) if !args.list => inventory.host_vars(host),
        _ => inventory.to_value(),
    };
    print_json(&document, args.pretty)?;

    Ok(())
}

/// `RUST_LOG` when set and valid, else `debug` when verbose, else `warn`
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let default_level = if verbose { "debug" } else { "warn" };
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}

fn print_json(value: &Value, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults() {
        assert_eq!(log_filter(false, None).to_string(), "warn");
        assert_eq!(log_filter(true, None).to_string(), "debug");
    }

    #[test]
    fn test_log_filter_prefers_rust_log() {
        let filter = log_filter(true, Some("nmsync_core=trace"));
        assert_eq!(filter.to_string(), "nmsync_core=trace");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["nmsync", "--host", "rtr-1", "--verbose"]).unwrap();
        assert_eq!(args.host.as_deref(), Some("rtr-1"));
        assert!(args.verbose);
        assert!(Args::try_parse_from(["nmsync", "--list", "--host", "rtr-1"]).is_err());
    }
}
