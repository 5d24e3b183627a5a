use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const APP_DIR: &str = "crmsweep";
const CONFIG_FILENAME: &str = "config.toml";

pub const DEFAULT_FUZZY_MIN_SCORE: u8 = 80;
pub const DEFAULT_FUZZY_CHUNK_SIZE: usize = 100;
pub const DEFAULT_BACKUP_RETENTION_DAYS: u32 = 30;
pub const DEFAULT_API_BASE_URL: &str = "https://api.hubapi.com";
pub const DEFAULT_TOKEN_ENV: &str = "CRMSWEEP_TOKEN";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub dedupe: DedupeConfig,
    pub backup: BackupConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone)]
pub struct DedupeConfig {
    /// Composite threshold for fuzzy pairs, 0..=100.
    pub fuzzy_min_score: u8,
    /// Scored pairs between progress callbacks inside one bucket.
    pub fuzzy_chunk_size: usize,
    pub clear_existing: bool,
    pub run_exact: bool,
    pub run_fuzzy: bool,
}

#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Days to keep merge backup documents; zero disables pruning.
    pub retention_days: u32,
    /// Overrides the per-user data directory default.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Environment variable consulted when no stored credential exists.
    pub token_env: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dedupe: DedupeConfig {
                fuzzy_min_score: DEFAULT_FUZZY_MIN_SCORE,
                fuzzy_chunk_size: DEFAULT_FUZZY_CHUNK_SIZE,
                clear_existing: true,
                run_exact: true,
                run_fuzzy: true,
            },
            backup: BackupConfig {
                retention_days: DEFAULT_BACKUP_RETENTION_DAYS,
                dir: None,
            },
            api: ApiConfig {
                base_url: DEFAULT_API_BASE_URL.to_string(),
                token_env: DEFAULT_TOKEN_ENV.to_string(),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing home directory")]
    MissingHomeDir,
    #[error("invalid config path: {0}")]
    InvalidConfigPath(PathBuf),
    #[error("config file not found: {0}")]
    MissingConfigFile(PathBuf),
    #[error("invalid dedupe.fuzzy_min_score value: {0}")]
    InvalidMinScore(i64),
    #[error("invalid dedupe.fuzzy_chunk_size value: {0}")]
    InvalidChunkSize(i64),
    #[error("invalid backup.retention_days value: {0}")]
    InvalidRetentionDays(i64),
    #[error("invalid api.base_url value: {0}")]
    InvalidBaseUrl(String),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    dedupe: Option<DedupeFile>,
    backup: Option<BackupFile>,
    api: Option<ApiFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DedupeFile {
    fuzzy_min_score: Option<i64>,
    fuzzy_chunk_size: Option<i64>,
    clear_existing: Option<bool>,
    run_exact: Option<bool>,
    run_fuzzy: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BackupFile {
    retention_days: Option<i64>,
    dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApiFile {
    base_url: Option<String>,
    token_env: Option<String>,
}

pub fn load(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let required = config_path.is_some();
    let path = match resolve_config_path(config_path) {
        Ok(path) => path,
        Err(ConfigError::MissingHomeDir) if !required => return Ok(AppConfig::default()),
        Err(ConfigError::InvalidConfigPath(_)) if !required => return Ok(AppConfig::default()),
        Err(err) => return Err(err),
    };
    match load_at_path(&path, required)? {
        Some(config) => Ok(config),
        None => Ok(AppConfig::default()),
    }
}

pub fn resolve_config_path(custom: Option<PathBuf>) -> Result<PathBuf> {
    match custom {
        Some(path) => {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidConfigPath(path));
            }
            Ok(path)
        }
        None => {
            let base = if let Some(dir) = env::var_os("XDG_CONFIG_HOME") {
                let path = PathBuf::from(dir);
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidConfigPath(path));
                }
                path
            } else {
                let home = dirs::home_dir().ok_or(ConfigError::MissingHomeDir)?;
                home.join(".config")
            };
            Ok(base.join(APP_DIR).join(CONFIG_FILENAME))
        }
    }
}

fn load_at_path(path: &Path, required: bool) -> Result<Option<AppConfig>> {
    if !path.exists() {
        if required {
            return Err(ConfigError::MissingConfigFile(path.to_path_buf()));
        }
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(merge_config(parsed)?))
}

fn merge_config(parsed: ConfigFile) -> Result<AppConfig> {
    let mut config = AppConfig::default();

    if let Some(dedupe) = parsed.dedupe {
        if let Some(min_score) = dedupe.fuzzy_min_score {
            if !(0..=100).contains(&min_score) {
                return Err(ConfigError::InvalidMinScore(min_score));
            }
            config.dedupe.fuzzy_min_score = min_score as u8;
        }
        if let Some(chunk_size) = dedupe.fuzzy_chunk_size {
            if chunk_size < 1 {
                return Err(ConfigError::InvalidChunkSize(chunk_size));
            }
            config.dedupe.fuzzy_chunk_size = chunk_size as usize;
        }
        if let Some(clear_existing) = dedupe.clear_existing {
            config.dedupe.clear_existing = clear_existing;
        }
        if let Some(run_exact) = dedupe.run_exact {
            config.dedupe.run_exact = run_exact;
        }
        if let Some(run_fuzzy) = dedupe.run_fuzzy {
            config.dedupe.run_fuzzy = run_fuzzy;
        }
    }

    if let Some(backup) = parsed.backup {
        if let Some(retention_days) = backup.retention_days {
            if retention_days < 0 {
                return Err(ConfigError::InvalidRetentionDays(retention_days));
            }
            config.backup.retention_days = retention_days as u32;
        }
        if let Some(dir) = backup.dir {
            config.backup.dir = Some(dir);
        }
    }

    if let Some(api) = parsed.api {
        if let Some(base_url) = api.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(ConfigError::InvalidBaseUrl(base_url));
            }
            config.api.base_url = base_url;
        }
        if let Some(token_env) = api.token_env {
            config.api.token_env = token_env;
        }
    }

    Ok(config)
}
