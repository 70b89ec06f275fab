//! Configuration file discovery

use std::path::{Path, PathBuf};

use eyre::WrapErr;
use nmsync_core::SyncConfig;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "NMSYNC_CONFIG";

/// A loaded configuration and the file it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SyncConfig,
    /// Source file; also the input of the cache key
    pub source: PathBuf,
}

/// Well-known locations, in lookup order
fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("nmsync.toml"),
        PathBuf::from("/etc/nmsync/nmsync.toml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("nmsync/nmsync.toml"));
    }
    paths
}

/// Load from an explicit path, `NMSYNC_CONFIG`, or the default paths
///
/// Without any file the defaults are used and credentials must come from
/// the environment.
///
/// # Errors
/// Returns error if the chosen file cannot be read or parsed
pub fn load(explicit: Option<&Path>) -> eyre::Result<LoadedConfig> {
    let env = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
    load_from(explicit, env, &default_paths())
}

fn load_from(
    explicit: Option<&Path>,
    env: Option<PathBuf>,
    defaults: &[PathBuf],
) -> eyre::Result<LoadedConfig> {
    let chosen = explicit
        .map(Path::to_path_buf)
        .or(env)
        .or_else(|| defaults.iter().find(|p| p.exists()).cloned());

    let (config, source) = match chosen {
        Some(path) => {
            let config = SyncConfig::load(&path)
                .wrap_err_with(|| format!("failed to load {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded configuration");
            (config, path)
        }
        None => {
            tracing::warn!("no config file found, using defaults");
            (
                SyncConfig::default(),
                defaults.first().cloned().unwrap_or_default(),
            )
        }
    };

    let source = std::path::absolute(&source).unwrap_or(source);
    Ok(LoadedConfig {
        config: config.with_env(|name| std::env::var(name).ok()),
        source,
    })
}
