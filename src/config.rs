//! Configuration for tsundoku.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags (`--database`, applied by the CLI)
//! 2. Environment variables (TSUNDOKU_HOME, TSUNDOKU_DATABASE), optionally
//!    loaded from a `.env` file
//! 3. Config file (.tsundoku/config.yaml)
//! 4. Defaults (~/.tsundoku/books.db)
//!
//! Config file discovery:
//! - Searches current directory and parents for .tsundoku/config.yaml
//! - `database` in the config file is relative to the project root (the
//!   directory holding `.tsundoku/`)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::{google, openlibrary};
use crate::core::{DEFAULT_STORE_TIMEOUT, MAX_STORE_TIMEOUT};
use crate::domain::Source;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Default provider HTTP timeout
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const DATABASE_FILE: &str = "books.db";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    /// Database path (relative to the project root)
    pub database: Option<String>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    /// Provider tags in priority order
    pub order: Option<Vec<String>>,
    pub timeout_seconds: Option<u64>,
    pub google: Option<EndpointConfig>,
    pub openlibrary: Option<EndpointConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointConfig {
    pub base_url: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to tsundoku home
    pub home: PathBuf,
    /// SQLite database file
    pub database: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Per-operation store timeout
    pub store_timeout: Duration,
    /// Provider request timeout
    pub http_timeout: Duration,
    /// Providers in priority order
    pub providers: Vec<Source>,
    pub google_base_url: String,
    pub openlibrary_base_url: String,
}

/// Overrides read from the environment
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub home: Option<String>,
    pub database: Option<String>,
}

impl EnvOverrides {
    /// Read TSUNDOKU_HOME and TSUNDOKU_DATABASE
    pub fn from_env() -> Self {
        Self {
            home: std::env::var("TSUNDOKU_HOME").ok(),
            database: std::env::var("TSUNDOKU_DATABASE").ok(),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".tsundoku").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Parse provider tags, keeping order and dropping duplicates
fn parse_provider_order(tags: &[String]) -> Result<Vec<Source>> {
    let mut order = Vec::with_capacity(tags.len());

    for tag in tags {
        let source = Source::from_tag(tag)
            .with_context(|| format!("Unknown provider '{}' (expected google or openlibrary)", tag))?;
        if !order.contains(&source) {
            order.push(source);
        }
    }

    if order.is_empty() {
        anyhow::bail!("At least one provider must be configured");
    }

    Ok(order)
}

/// Combine config file, environment and defaults
fn build_config(
    config_file: Option<PathBuf>,
    file: Option<ConfigFile>,
    env: &EnvOverrides,
    default_home: PathBuf,
) -> Result<ResolvedConfig> {
    let home = env
        .home
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or(default_home);

    let file = file.unwrap_or(ConfigFile {
        version: "1.0".to_string(),
        database: None,
        store: StoreConfig::default(),
        providers: ProvidersConfig::default(),
    });

    // Project root is the parent of .tsundoku/
    let base_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));

    let database = if let Some(ref env_db) = env.database {
        PathBuf::from(env_db)
    } else if let Some(ref db) = file.database {
        resolve_path(base_dir, db)
    } else {
        home.join(DATABASE_FILE)
    };

    let providers = match file.providers.order {
        Some(ref tags) => parse_provider_order(tags)?,
        None => vec![Source::Google, Source::OpenLibrary],
    };

    let store_timeout = file
        .store
        .timeout_seconds
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_STORE_TIMEOUT);

    if store_timeout > MAX_STORE_TIMEOUT {
        anyhow::bail!(
            "store.timeout_seconds is {}s, the maximum is {}s",
            store_timeout.as_secs(),
            MAX_STORE_TIMEOUT.as_secs()
        );
    }

    let http_timeout = file
        .providers
        .timeout_seconds
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_HTTP_TIMEOUT);

    let google_base_url = file
        .providers
        .google
        .and_then(|g| g.base_url)
        .unwrap_or_else(|| google::DEFAULT_BASE_URL.to_string());

    let openlibrary_base_url = file
        .providers
        .openlibrary
        .and_then(|o| o.base_url)
        .unwrap_or_else(|| openlibrary::DEFAULT_BASE_URL.to_string());

    Ok(ResolvedConfig {
        home,
        database,
        config_file,
        store_timeout,
        http_timeout,
        providers,
        google_base_url,
        openlibrary_base_url,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".tsundoku");

    let config_file = find_config_file();
    let file = config_file.as_deref().map(load_config_file).transpose()?;

    build_config(config_file, file, &EnvOverrides::from_env(), default_home)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn home() -> PathBuf {
        PathBuf::from("/home/reader/.tsundoku")
    }

    #[test]
    fn test_defaults_without_file() {
        let config = build_config(None, None, &EnvOverrides::default(), home()).unwrap();

        assert_eq!(config.home, home());
        assert_eq!(config.database, home().join("books.db"));
        assert!(config.config_file.is_none());
        assert_eq!(config.store_timeout, Duration::from_secs(180));
        assert_eq!(config.http_timeout, DEFAULT_HTTP_TIMEOUT);
        assert_eq!(config.providers, vec![Source::Google, Source::OpenLibrary]);
        assert_eq!(config.google_base_url, google::DEFAULT_BASE_URL);
        assert_eq!(config.openlibrary_base_url, openlibrary::DEFAULT_BASE_URL);
    }

    #[test]
    fn test_env_overrides() {
        let env = EnvOverrides {
            home: Some("/srv/tsundoku".to_string()),
            database: None,
        };
        let config = build_config(None, None, &env, home()).unwrap();
        assert_eq!(config.database, PathBuf::from("/srv/tsundoku/books.db"));

        let env = EnvOverrides {
            home: None,
            database: Some("/tmp/shelf.db".to_string()),
        };
        let config = build_config(None, None, &env, home()).unwrap();
        assert_eq!(config.database, PathBuf::from("/tmp/shelf.db"));
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let dot_dir = temp.path().join(".tsundoku");
        std::fs::create_dir_all(&dot_dir).unwrap();

        let config_path = dot_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
database: data/books.db
store:
  timeout_seconds: 5
providers:
  order: [openlibrary, google]
  timeout_seconds: 10
  openlibrary:
    base_url: http://localhost:8080
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        assert_eq!(parsed.version, "1.0");
        assert_eq!(parsed.database.as_deref(), Some("data/books.db"));

        let config = build_config(
            Some(config_path.clone()),
            Some(parsed),
            &EnvOverrides::default(),
            home(),
        )
        .unwrap();

        assert_eq!(config.database, temp.path().join("data/books.db"));
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert_eq!(config.providers, vec![Source::OpenLibrary, Source::Google]);
        assert_eq!(config.openlibrary_base_url, "http://localhost:8080");
        assert_eq!(config.google_base_url, google::DEFAULT_BASE_URL);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_store_timeout_upper_bound() {
        let file = |secs: u64| -> ConfigFile {
            serde_yaml::from_str(&format!(
                "version: \"1.0\"\nstore:\n  timeout_seconds: {}\n",
                secs
            ))
            .unwrap()
        };
        let env = EnvOverrides::default();

        let max = MAX_STORE_TIMEOUT.as_secs();
        let config = build_config(None, Some(file(max)), &env, home()).unwrap();
        assert_eq!(config.store_timeout, Duration::from_secs(max));

        let err = build_config(None, Some(file(3_000_000)), &env, home()).unwrap_err();
        assert!(err.to_string().contains("store.timeout_seconds"));
    }

    #[test]
    fn test_provider_order_validation() {
        let tags = |t: &[&str]| t.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(
            parse_provider_order(&tags(&["google", "google", "openlibrary"])).unwrap(),
            vec![Source::Google, Source::OpenLibrary]
        );
        assert_eq!(
            parse_provider_order(&tags(&["openlibrary"])).unwrap(),
            vec![Source::OpenLibrary]
        );
        assert!(parse_provider_order(&tags(&["amazon"])).is_err());
        assert!(parse_provider_order(&[]).is_err());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./books.db"),
            PathBuf::from("/home/user/project/./books.db")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/books.db"),
            PathBuf::from("/absolute/books.db")
        );
    }
}
