// Fri Oct 16 2026 - Alex

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Page size for memory dumps; live processes report their own.
    pub page_size: u64,
    pub max_thunk_depth: u32,
    pub max_function_bytes: usize,
    pub max_vtable_pages: u32,
    /// Ticks an identification survives without a hit.
    pub identification_ttl: u32,
    /// Known deallocation routines. When empty, `dealloc_signatures` are scanned for.
    pub dealloc_routines: Vec<u64>,
    pub dealloc_signatures: Vec<String>,
    /// Image base the name database addresses are expressed against.
    pub dataset_preferred_base: u64,
    pub dataset_path: Option<PathBuf>,
    pub schema_path: Option<PathBuf>,
    pub module_cache_max_age_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: 0x1000,
            max_thunk_depth: 8,
            max_function_bytes: 0x10000,
            max_vtable_pages: 16,
            identification_ttl: 2,
            dealloc_routines: Vec::new(),
            dealloc_signatures: vec![
                "E8 ?? ?? ?? ?? 48 C7 04".to_string(),
                "E8 ?? ?? ?? ?? 48 8B C3 48 83 C4 ?? 5F 5D".to_string(),
            ],
            dataset_preferred_base: 0x1_4000_0000,
            dataset_path: None,
            schema_path: None,
            module_cache_max_age_ms: 5000,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn with_dataset(mut self, path: PathBuf) -> Self {
        self.dataset_path = Some(path);
        self
    }

    pub fn with_schemas(mut self, path: PathBuf) -> Self {
        self.schema_path = Some(path);
        self
    }

    pub fn with_dealloc_routines(mut self, routines: Vec<u64>) -> Self {
        self.dealloc_routines = routines;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.page_size.is_power_of_two() || self.page_size < 0x100 {
            return Err(ConfigError::Invalid(format!(
                "page_size must be a power of two of at least 0x100, got 0x{:x}",
                self.page_size
            )));
        }
        if self.max_thunk_depth == 0 {
            return Err(ConfigError::Invalid("max_thunk_depth must be greater than 0".to_string()));
        }
        if self.max_function_bytes == 0 {
            return Err(ConfigError::Invalid("max_function_bytes must be greater than 0".to_string()));
        }
        if self.max_vtable_pages == 0 {
            return Err(ConfigError::Invalid("max_vtable_pages must be greater than 0".to_string()));
        }
        if self.identification_ttl == 0 {
            return Err(ConfigError::Invalid("identification_ttl must be greater than 0".to_string()));
        }
        if self.dealloc_routines.is_empty() && self.dealloc_signatures.iter().all(|s| s.trim().is_empty()) {
            log::warn!("no dealloc routines or signatures configured, destructor sizes will be unavailable");
        }
        Ok(())
    }
}
