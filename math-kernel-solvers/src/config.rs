//! JSON configuration for kernel ridge solves
//!
//! ```json
//! {
//!   "kernel": { "type": "gaussian", "dim": 2, "value_dim": 1, "bandwidth": 1.0 },
//!   "ridge": 0.1,
//!   "tolerance": 1e-6,
//!   "preconditioner": { "type": "nystrom", "seed": 42 }
//! }
//! ```

use crate::error::{Result, SolverError};
use crate::kernels::KernelSpec;
use crate::solve::KernelSolveOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete solver configuration loaded from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Kernel descriptor
    pub kernel: KernelSpec,
    /// Ridge regularisation λ
    #[serde(default)]
    pub ridge: f64,
    /// Absolute residual tolerance (omitted: the precision's default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    /// Iteration cap
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Preconditioner selection
    #[serde(default)]
    pub preconditioner: PreconditionerConfig,
    /// Log progress every N iterations (0 = no output)
    #[serde(default)]
    pub log_interval: usize,
}

/// Preconditioner configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PreconditionerConfig {
    /// Plain CG
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "nystrom")]
    /// Nyström landmark preconditioner
    Nystrom {
        /// Landmark sampling seed
        #[serde(default)]
        seed: Option<u64>,
        /// Scale the landmark self-kernel by λ
        #[serde(default)]
        ridge_scaled_landmarks: bool,
    },
}

fn default_max_iterations() -> usize {
    1000
}

impl SolverConfig {
    /// Configuration with default solver settings for `kernel`
    pub fn new(kernel: KernelSpec) -> Self {
        Self {
            kernel,
            ridge: 0.0,
            tolerance: None,
            max_iterations: default_max_iterations(),
            preconditioner: PreconditionerConfig::None,
            log_interval: 0,
        }
    }

    /// Parse configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SolverError::Config(format!("Failed to parse JSON: {}", e)))
    }

    /// Load configuration from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| SolverError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_json_str(&contents)
    }

    /// Save configuration to JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SolverError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, json)
            .map_err(|e| SolverError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Convert to solve options
    pub fn to_options(&self) -> KernelSolveOptions {
        let (use_preconditioner, seed, ridge_scaled_landmarks) = match self.preconditioner {
            PreconditionerConfig::None => (false, None, false),
            PreconditionerConfig::Nystrom {
                seed,
                ridge_scaled_landmarks,
            } => (true, seed, ridge_scaled_landmarks),
        };
        KernelSolveOptions {
            ridge: self.ridge,
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
            use_preconditioner,
            seed,
            log_interval: self.log_interval,
            ridge_scaled_landmarks,
        }
    }
}
