//! Configuration types for synchronization runs

use std::path::{Path, PathBuf};
use std::time::Duration;

use nmsync_client::ClientConfig;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::{CacheSettings, DEFAULT_CACHE_PREFIX};
use crate::error::ConfigError;
use crate::filter::PatternSet;
use crate::normalize::{DEFAULT_NAMESPACE, DisabledPolicy, FieldMapping};

/// Environment variable consulted for `api_endpoint`
pub const ENV_ENDPOINT: &str = "LIBRENMS_API";
/// Environment variables consulted for `api_token`, in order of precedence
pub const ENV_TOKENS: [&str; 2] = ["LIBRENMS_TOKEN", "LIBRENMS_API_KEY"];

/// Options recognized in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the monitoring API
    #[serde(default)]
    pub api_endpoint: Option<String>,
    /// API token
    #[serde(default)]
    pub api_token: Option<String>,
    /// Verify TLS certificates
    #[serde(default = "default_true")]
    pub validate_certs: bool,
    /// Drop devices flagged as disabled
    #[serde(default = "default_true")]
    pub exclude_disabled: bool,
    /// Regex filters for group names; empty selects all
    #[serde(default)]
    pub group_name_regex_filter: Vec<String>,
    /// Regex filters for device display names; empty selects all
    #[serde(default)]
    pub host_name_regex_filter: Vec<String>,
    /// Match filters case-insensitively
    #[serde(default = "default_true")]
    pub regex_ignore_case: bool,
    /// Group devices by this raw field instead of by remote group
    #[serde(default)]
    pub group_by: Option<String>,
    /// Ignore any cached inventory
    #[serde(default)]
    pub cache_force_update: bool,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Raise log verbosity
    #[serde(default)]
    pub verbose: bool,
    /// Enable the inventory cache
    #[serde(default)]
    pub cache: bool,
    /// Directory holding cache files (defaults to the system temp dir)
    #[serde(default)]
    pub cache_connection: Option<PathBuf>,
    /// Cache entry lifetime in seconds; 0 never expires
    #[serde(default = "default_cache_timeout")]
    pub cache_timeout: u64,
    /// Prefix of cache keys
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,
    /// Prefix of remote-origin host variables
    #[serde(default = "default_namespace_prefix")]
    pub namespace_prefix: String,
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    60
}

fn default_cache_timeout() -> u64 {
    3600
}

fn default_cache_prefix() -> String {
    DEFAULT_CACHE_PREFIX.to_string()
}

fn default_namespace_prefix() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_endpoint: None,
            api_token: None,
            validate_certs: true,
            exclude_disabled: true,
            group_name_regex_filter: Vec::new(),
            host_name_regex_filter: Vec::new(),
            regex_ignore_case: true,
            group_by: None,
            cache_force_update: false,
            timeout: default_timeout(),
            verbose: false,
            cache: false,
            cache_connection: None,
            cache_timeout: default_cache_timeout(),
            cache_prefix: default_cache_prefix(),
            namespace_prefix: default_namespace_prefix(),
        }
    }
}

impl SyncConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] if the document is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Fill unset credentials from the environment
    ///
    /// `lookup` is normally `|name| std::env::var(name).ok()`.
    #[must_use]
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());
        if self.api_endpoint.is_none() {
            self.api_endpoint = non_empty(ENV_ENDPOINT);
        }
        if self.api_token.is_none() {
            self.api_token = ENV_TOKENS.iter().find_map(|name| non_empty(name));
        }
        self
    }

    /// Check required options and compile filters
    ///
    /// # Errors
    /// Returns a [`ConfigError`] for a missing credential, an unusable
    /// endpoint, or a filter that does not compile.
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let endpoint = required(self.api_endpoint.as_deref(), "api_endpoint")?;
        let token = required(self.api_token.as_deref(), "api_token")?;

        let url = Url::parse(endpoint)
            .map_err(|e| ConfigError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEndpoint(endpoint.to_string()));
        }

        let group_patterns =
            PatternSet::compile(&self.group_name_regex_filter, self.regex_ignore_case)?;
        let host_patterns =
            PatternSet::compile(&self.host_name_regex_filter, self.regex_ignore_case)?;

        let client = ClientConfig::new(endpoint, token)
            .with_validate_certs(self.validate_certs)
            .with_timeout(Duration::from_secs(self.timeout));

        let cache = CacheSettings {
            enabled: self.cache,
            force_update: self.cache_force_update,
            timeout: (self.cache_timeout > 0).then(|| Duration::from_secs(self.cache_timeout)),
        };

        Ok(Settings {
            client,
            group_patterns,
            host_patterns,
            group_by: self.group_by.clone().filter(|field| !field.is_empty()),
            mapping: FieldMapping::new(self.namespace_prefix.clone()),
            disabled: DisabledPolicy {
                exclude_disabled: self.exclude_disabled,
            },
            cache,
            cache_dir: self
                .cache_connection
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            cache_prefix: self.cache_prefix.clone(),
        })
    }
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Validated, immutable settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    pub group_patterns: PatternSet,
    pub host_patterns: PatternSet,
    pub group_by: Option<String>,
    pub mapping: FieldMapping,
    pub disabled: DisabledPolicy,
    pub cache: CacheSettings,
    pub cache_dir: PathBuf,
    pub cache_prefix: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> SyncConfig {
        SyncConfig::from_toml_str(
            r#"
            api_endpoint = "https://nms.example.net/api/v0"
            api_token = "secret"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = minimal();
        assert!(config.validate_certs);
        assert!(config.exclude_disabled);
        assert!(config.regex_ignore_case);
        assert!(!config.cache_force_update);
        assert!(!config.cache);
        assert!(!config.verbose);
        assert_eq!(config.timeout, 60);
        assert_eq!(config.cache_timeout, 3600);
        assert_eq!(config.cache_prefix, "librenms_");
        assert_eq!(config.namespace_prefix, "libre_");
        assert!(config.group_name_regex_filter.is_empty());
        assert!(config.host_name_regex_filter.is_empty());
        assert_eq!(config.group_by, None);
    }

    #[test]
    fn test_full_file() {
        let config = SyncConfig::from_toml_str(
            r#"
            api_endpoint = "https://nms.example.net/api/v0"
            api_token = "secret"
            validate_certs = false
            exclude_disabled = false
            group_name_regex_filter = ["^core-.*", "^edge"]
            host_name_regex_filter = ["rtr"]
            regex_ignore_case = false
            group_by = "location"
            cache = true
            cache_connection = "/var/cache/nmsync"
            cache_timeout = 0
            timeout = 5
            "#,
        )
        .unwrap();

        let settings = config.validate().unwrap();
        assert!(!settings.client.validate_certs);
        assert_eq!(settings.client.timeout, Duration::from_secs(5));
        assert_eq!(settings.group_patterns.sources(), ["^core-.*", "^edge"]);
        assert_eq!(settings.group_by.as_deref(), Some("location"));
        assert!(!settings.disabled.exclude_disabled);
        assert!(settings.cache.enabled);
        assert_eq!(settings.cache.timeout, None);
        assert_eq!(settings.cache_dir, PathBuf::from("/var/cache/nmsync"));
    }

    #[test]
    fn test_missing_endpoint() {
        let config = SyncConfig {
            api_token: Some("secret".to_string()),
            ..SyncConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::Missing("api_endpoint")
        );
    }

    #[test]
    fn test_missing_token() {
        let config = SyncConfig {
            api_endpoint: Some("https://nms.example.net/api/v0".to_string()),
            api_token: Some("  ".to_string()),
            ..SyncConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::Missing("api_token")
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        let config = SyncConfig {
            api_endpoint: Some("nms.example.net".to_string()),
            ..minimal()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_invalid_filter() {
        let config = SyncConfig {
            host_name_regex_filter: vec!["[rtr".to_string()],
            ..minimal()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_empty_group_by_is_unset() {
        let config = SyncConfig {
            group_by: Some(String::new()),
            ..minimal()
        };
        assert_eq!(config.validate().unwrap().group_by, None);
    }

    #[test]
    fn test_env_fallback() {
        let config = SyncConfig::default().with_env(|name| match name {
            "LIBRENMS_API" => Some("https://nms.example.net/api/v0".to_string()),
            "LIBRENMS_TOKEN" => Some(String::new()),
            "LIBRENMS_API_KEY" => Some("from-api-key".to_string()),
            _ => None,
        });
        assert_eq!(
            config.api_endpoint.as_deref(),
            Some("https://nms.example.net/api/v0")
        );
        assert_eq!(config.api_token.as_deref(), Some("from-api-key"));
    }

    #[test]
    fn test_token_precedence() {
        let config = SyncConfig::default().with_env(|name| match name {
            "LIBRENMS_TOKEN" => Some("from-token".to_string()),
            "LIBRENMS_API_KEY" => Some("from-api-key".to_string()),
            _ => None,
        });
        assert_eq!(config.api_token.as_deref(), Some("from-token"));
    }

    #[test]
    fn test_file_wins_over_env() {
        let config = minimal().with_env(|_| Some("from-env".to_string()));
        assert_eq!(config.api_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_malformed_file() {
        assert!(matches!(
            SyncConfig::from_toml_str("api_endpoint = "),
            Err(ConfigError::Parse(_))
        ));
    }
}
