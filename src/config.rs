use std::path::Path;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use crate::core::DatabaseError;

/// Environment variables `POSTGRUST_EVAL_*` override file settings
pub const ENV_PREFIX: &str = "POSTGRUST_EVAL";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Iteration cap for recursive CTEs
    #[serde(default = "default_max_recursion_iterations")]
    pub max_recursion_iterations: usize,
    /// Roll a transaction back as soon as one of its statements fails
    #[serde(default)]
    pub auto_rollback_on_error: bool,
}

const fn default_max_recursion_iterations() -> usize {
    1000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_recursion_iterations: default_max_recursion_iterations(),
            auto_rollback_on_error: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration with priority: ENV > config file > defaults
    pub fn load(path: Option<&Path>) -> Result<Self, DatabaseError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
            log::debug!("loading config from {}", path.display());
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.max_recursion_iterations == 0 {
            return Err(DatabaseError::Config(
                "max_recursion_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
