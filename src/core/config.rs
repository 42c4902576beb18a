//! Configuration types and management for metrik-rs.
//!
//! Canonical default values live here in one place so that the public API
//! and any embedding driver cannot drift apart.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::{MetrikError, Result};
use crate::io::cache::{CacheDriver, FileCacheDriver, MemoryCacheDriver};

/// Main configuration for the metrik analysis core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetrikConfig {
    /// Code-rank analyzer configuration
    #[serde(default)]
    pub coderank: CodeRankConfig,

    /// Coverage report configuration (CRAP index)
    #[serde(default)]
    pub coverage: CoverageConfig,

    /// Metric cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

impl MetrikConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            MetrikError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.coderank.strategies.is_empty() {
            return Err(MetrikError::config_field(
                "at least one code-rank strategy must be configured",
                "coderank.strategies",
            ));
        }
        if let Some(report) = &self.coverage.report {
            if report.as_os_str().is_empty() {
                return Err(MetrikError::config_field(
                    "coverage report path must not be empty",
                    "coverage.report",
                ));
            }
        }
        Ok(())
    }
}

/// Relation kinds contributing edges to the code-rank dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeRankStrategy {
    /// Subtype → supertype and implementor → interface edges
    Inheritance,
    /// Declaring type → property type edges
    Property,
    /// Callable owner → parameter/return/throw type edges
    Method,
}

/// Configuration for the code-rank analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRankConfig {
    /// Active edge strategies (the `coderank-mode` option)
    #[serde(rename = "mode")]
    pub strategies: Vec<CodeRankStrategy>,
}

impl Default for CodeRankConfig {
    fn default() -> Self {
        Self {
            strategies: vec![CodeRankStrategy::Inheritance],
        }
    }
}

/// Configuration for coverage-dependent analyzers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Path to a Clover-XML coverage report; absent disables the CRAP index
    #[serde(default)]
    pub report: Option<PathBuf>,
}

/// Configuration for the metric cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory for the persistent file cache; absent selects the
    /// process-lifetime in-memory cache
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl CacheConfig {
    /// Build the cache driver selected by this configuration.
    pub fn build_driver(&self) -> Result<Arc<dyn CacheDriver>> {
        match &self.dir {
            Some(dir) => Ok(Arc::new(FileCacheDriver::new(dir)?)),
            None => Ok(Arc::new(MemoryCacheDriver::new())),
        }
    }
}
