//! Dashboard configuration: an optional YAML file merged with command-line
//! flags. Flags win over file values, file values win over defaults.
//!
//! ```yaml
//! strategy: interpolate
//! cost_column: Unit Cost
//! top: 5
//! include_profit: true
//! columns:
//!   revenue: Net Amount
//!   date: Booked On
//! ```

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    clean::MissingValueStrategy, error::ConfigurationError, mapper::CanonicalField,
    pipeline::PipelineOptions,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub cost_column: Option<String>,
    #[serde(default)]
    pub top: Option<usize>,
    #[serde(default)]
    pub include_profit: Option<bool>,
    /// Canonical field name → original column name.
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

/// Values supplied on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub strategy: Option<String>,
    pub cost_column: Option<String>,
    pub top: Option<usize>,
    pub include_profit: bool,
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Reading configuration file {path:?}"))?;
        Self::from_yaml(&raw).with_context(|| format!("Parsing configuration file {path:?}"))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        path.map(Self::load).transpose().map(Option::unwrap_or_default)
    }

    pub fn resolve(&self, cli: &ConfigOverrides) -> Result<PipelineOptions, ConfigurationError> {
        let defaults = PipelineOptions::default();
        let strategy = match cli.strategy.as_deref().or(self.strategy.as_deref()) {
            Some(name) => name.parse::<MissingValueStrategy>()?,
            None => defaults.strategy,
        };
        let top_n = cli.top.or(self.top).unwrap_or(defaults.top_n);
        if top_n == 0 {
            return Err(ConfigurationError::InvalidTopN);
        }
        let overrides = self
            .columns
            .iter()
            .map(|(field, column)| Ok((field.parse::<CanonicalField>()?, column.clone())))
            .collect::<Result<BTreeMap<_, _>, ConfigurationError>>()?;
        Ok(PipelineOptions {
            strategy,
            cost_column: cli.cost_column.clone().or_else(|| self.cost_column.clone()),
            top_n,
            include_profit: cli.include_profit || self.include_profit.unwrap_or(false),
            overrides,
        })
    }
}
