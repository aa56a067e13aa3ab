// src/config/engine.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/engine.toml";

pub const ENV_CONFIG_PATH: &str = "LEADS_CONFIG_PATH";
pub const ENV_DATA_DIR: &str = "LEADS_DATA_DIR";
pub const ENV_MAX_STORE_SIZE: &str = "LEADS_MAX_STORE_SIZE";
pub const ENV_CONCURRENCY: &str = "LEADS_CONCURRENCY";
pub const ENV_RUN_INTERVAL_SECS: &str = "LEADS_RUN_INTERVAL_SECS";

/// Upper bound on simultaneous extraction tasks, whatever the config says.
pub const MAX_CONCURRENCY: usize = 16;

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_concurrency() -> usize {
    3
}
fn default_run_interval_secs() -> u64 {
    6 * 3600
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding `leads-v2.json` and the mirrored artifacts.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Keep only the top-K ranked leads after each run. `None` keeps everything.
    #[serde(default)]
    pub max_store_size: Option<usize>,
    /// Extraction tasks in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_run_interval_secs")]
    pub run_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_store_size: None,
            concurrency: default_concurrency(),
            run_interval_secs: default_run_interval_secs(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading engine config {}", path.display()))?;
        let cfg: EngineConfig = toml::from_str(&data)
            .with_context(|| format!("parsing engine config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// $LEADS_CONFIG_PATH, then `config/engine.toml`, then defaults;
    /// env overrides are applied last.
    pub fn load_default() -> Result<Self> {
        let base = match env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
                }
                Self::load_from_file(&pb)?
            }
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_from_file(DEFAULT_CONFIG_PATH)?
            }
            Err(_) => Self::default(),
        };
        Ok(base.with_env_overrides().sanitized())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = env::var(ENV_DATA_DIR) {
            if !dir.trim().is_empty() {
                self.data_dir = PathBuf::from(dir.trim());
            }
        }
        if let Some(v) = parse_env::<usize>(ENV_MAX_STORE_SIZE) {
            self.max_store_size = Some(v);
        }
        if let Some(v) = parse_env::<usize>(ENV_CONCURRENCY) {
            self.concurrency = v;
        }
        if let Some(v) = parse_env::<u64>(ENV_RUN_INTERVAL_SECS) {
            self.run_interval_secs = v;
        }
        self
    }

    pub fn sanitized(mut self) -> Self {
        self.concurrency = self.concurrency.clamp(1, MAX_CONCURRENCY);
        // zero cap would wipe the store every run
        if self.max_store_size == Some(0) {
            self.max_store_size = None;
        }
        if self.run_interval_secs == 0 {
            self.run_interval_secs = default_run_interval_secs();
        }
        self
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}
