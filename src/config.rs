//! Runtime configuration.
//!
//! Values are layered with `figment`: built-in defaults, then `sio.toml` and
//! `sio.yaml` if present, then `SIO_`-prefixed environment variables (nested keys
//! separated by `__`, e.g. `SIO_ALLOCATOR__SLAB_CELLS=1024`).

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::memory::{DEFAULT_ARENA_SLAB_SIZE, DEFAULT_CELL_UNITS, DEFAULT_SLAB_CELLS};
use crate::error::{Result, SioError};
use crate::fsm::GraphFormat;
use crate::logging::LoggingConfig;

fn default_slab_cells() -> usize { DEFAULT_SLAB_CELLS }
fn default_cell_units() -> usize { DEFAULT_CELL_UNITS }
fn default_arena_slab_size() -> usize { DEFAULT_ARENA_SLAB_SIZE }

/// Decoding graph location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Path to the graph file
    pub path: PathBuf,

    /// Encoding of the graph file
    #[serde(default)]
    pub format: GraphFormat,
}

/// Sizing of per-session search pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Cells per slab allocator slab
    #[serde(default = "default_slab_cells")]
    pub slab_cells: usize,

    /// Units of `T` per slab allocator cell
    #[serde(default = "default_cell_units")]
    pub cell_units: usize,

    /// Objects per arena slab
    #[serde(default = "default_arena_slab_size")]
    pub arena_slab_size: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            slab_cells: default_slab_cells(),
            cell_units: default_cell_units(),
            arena_slab_size: default_arena_slab_size(),
        }
    }
}

/// Configuration loaded from multiple sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub graph: GraphConfig,

    /// Path to the tokenizer vocabulary listing
    pub tokenizer_vocab: PathBuf,

    #[serde(default)]
    pub allocator: AllocatorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            graph: GraphConfig {
                path: PathBuf::from("model/graph.fsm"),
                format: GraphFormat::Binary,
            },
            tokenizer_vocab: PathBuf::from("model/tokenizer.vocab"),
            allocator: AllocatorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. sio.yaml (if exists)
    /// 3. sio.toml (if exists)
    /// 4. Built-in defaults (lowest priority)
    pub fn load() -> Result<Self> {
        Self::extract(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file("sio.toml"))
                .merge(Yaml::file("sio.yaml")),
        )
    }

    /// Load configuration from an explicit TOML file, still honoring environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SioError::Config(format!("config file {:?} not found", path)));
        }
        debug!("Loading configuration from {:?}", path);
        Self::extract(
            Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(path)),
        )
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Config = figment
            .merge(Env::prefixed("SIO_").split("__"))
            .extract()
            .map_err(|e| SioError::Config(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.graph.path.as_os_str().is_empty() {
            return Err(SioError::Config("graph.path cannot be empty".to_string()));
        }
        if self.tokenizer_vocab.as_os_str().is_empty() {
            return Err(SioError::Config("tokenizer_vocab cannot be empty".to_string()));
        }

        let alloc = &self.allocator;
        if alloc.slab_cells == 0 || alloc.cell_units == 0 || alloc.arena_slab_size == 0 {
            return Err(SioError::Config(
                "allocator sizes must be at least 1".to_string(),
            ));
        }

        self.logging.env_filter()?;
        Ok(())
    }

    /// Export configuration to TOML format
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SioError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}
