use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::OutputFormat;
use crate::engine::EngineOptions;
use crate::error::ConfigError;
use crate::probe::{CpuProbe, FixedLimit, ProbePolicy, ResourceLimitProbe, UlimitProbe};

pub const DEFAULT_CONFIG_PATH: &str = "pixbright.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub output: OutputConfig,
    pub budget: BudgetConfig,
    pub engine: EngineConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub name: String,
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("new_images"),
            name: "obaa_image".to_string(),
            format: OutputFormat::Png,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BudgetConfig {
    /// Skips the probe when set.
    pub limit: Option<usize>,
    pub strict_probe: bool,
    pub fallback_multiplier: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            limit: None,
            strict_probe: false,
            fallback_multiplier: CpuProbe::default().multiplier,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub max_workers: Option<usize>,
    pub pixels_per_task: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            pixels_per_task: 1,
        }
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.name.trim().is_empty() {
            return Err(invalid("output.name", "must not be empty"));
        }
        if self.budget.fallback_multiplier == 0 {
            return Err(invalid("budget.fallback_multiplier", "must be at least 1"));
        }
        if self.engine.max_workers == Some(0) {
            return Err(invalid("engine.max_workers", "must be at least 1"));
        }
        if self.engine.pixels_per_task == 0 {
            return Err(invalid("engine.pixels_per_task", "must be at least 1"));
        }
        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .dir
            .join(format!("{}.{}", self.output.name, self.output.format.extension()))
    }

    pub fn probe(&self) -> Box<dyn ResourceLimitProbe> {
        match self.budget.limit {
            Some(limit) => Box::new(FixedLimit(limit)),
            None => Box::new(UlimitProbe::default()),
        }
    }

    pub fn probe_policy(&self) -> ProbePolicy {
        if self.budget.strict_probe {
            ProbePolicy::Strict
        } else {
            ProbePolicy::Fallback(CpuProbe {
                multiplier: self.budget.fallback_multiplier,
            })
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        let defaults = EngineOptions::default();
        EngineOptions {
            max_workers: self
                .engine
                .max_workers
                .and_then(NonZeroUsize::new)
                .unwrap_or(defaults.max_workers),
            pixels_per_task: NonZeroUsize::new(self.engine.pixels_per_task)
                .unwrap_or(defaults.pixels_per_task),
        }
    }
}

pub fn parse_config(data: &str, path: &Path) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Reads `path` if given. Without a path the default file is used when it
/// exists, otherwise the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !default.is_file() {
                return Ok(Config::default());
            }
            default
        }
    };
    let data = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    parse_config(&data, &path)
}
