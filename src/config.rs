//! Configuration management.
//!
//! This module handles the layered configuration system with the following
//! precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CoriolisError, Result};

/// Command-line arguments for the inspection binary
#[derive(Parser, Debug)]
#[command(name = "inspect")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the product file to inspect
    pub file: PathBuf,

    /// Chunk size along the row dimension
    #[arg(long, env = "CORIOLIS_CHUNK_ROWS")]
    pub chunk_rows: Option<usize>,

    /// Chunk size along the column dimension
    #[arg(long, env = "CORIOLIS_CHUNK_COLUMNS")]
    pub chunk_columns: Option<usize>,

    /// Path to JSON configuration file
    #[arg(short, long, env = "CORIOLIS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CORIOLIS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Chunking configuration for reading products
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Chunk size along the row dimension
    #[serde(default = "default_chunk")]
    pub rows: usize,

    /// Chunk size along the column dimension
    #[serde(default = "default_chunk")]
    pub columns: usize,
}

/// Data processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Default tie-point interpolation method
    #[serde(default = "default_interpolation")]
    pub interpolation_method: String,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chunking configuration
    #[serde(default)]
    pub chunks: ChunkConfig,

    /// Data configuration
    #[serde(default)]
    pub data: DataConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, PathBuf)> {
        let args = Args::parse();
        Self::from_args(args)
    }

    /// Build the configuration from parsed arguments
    pub fn from_args(args: Args) -> Result<(Self, PathBuf)> {
        // Start with defaults
        let mut config = Config::default();

        // Load from JSON file if provided
        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        // Override with command-line arguments
        if let Some(rows) = args.chunk_rows {
            config.chunks.rows = rows;
        }
        if let Some(columns) = args.chunk_columns {
            config.chunks.columns = columns;
        }
        config.log_level = args.log_level;

        Ok((config, args.file))
    }

    /// Load configuration from a JSON file
    fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        self.chunks = other.chunks;
        self.data = other.data;
        self.log_level = other.log_level;
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunks.rows == 0 || self.chunks.columns == 0 {
            return Err(CoriolisError::Config {
                message: "Chunk sizes cannot be 0".to_string(),
            });
        }

        // Validate log level
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(CoriolisError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        // Validate interpolation method
        match self.data.interpolation_method.as_str() {
            "nearest" | "bilinear" => {}
            _ => {
                return Err(CoriolisError::Config {
                    message: format!(
                        "Invalid interpolation method: {}. Must be one of: nearest, bilinear",
                        self.data.interpolation_method
                    ),
                });
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunks: ChunkConfig::default(),
            data: DataConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            rows: default_chunk(),
            columns: default_chunk(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            interpolation_method: default_interpolation(),
        }
    }
}

// Default value functions for serde
fn default_chunk() -> usize {
    512
}

fn default_interpolation() -> String {
    "bilinear".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
