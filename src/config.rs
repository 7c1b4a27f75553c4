//! Chloride balance configuration loaded from TOML.
//!
//! ```toml
//! initial_concentration = 90.0
//! storage_epsilon = 1e-9
//!
//! [source_concentrations]
//! precipitation = 6.0
//! seepage_in = 400.0
//! ```
//!
//! Omitted keys keep their defaults; a `[source_concentrations]` table replaces
//! the default table as a whole.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, WbError};
use crate::schema::category;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChlorideConfig {
    /// Concentration of the water at the start of the balance
    pub initial_concentration: f64,
    /// Concentration carried by each incoming category
    pub source_concentrations: BTreeMap<String, f64>,
    /// Storage at or below this value cannot be divided by
    pub storage_epsilon: f64,
}

impl Default for ChlorideConfig {
    fn default() -> Self {
        let source_concentrations = [
            (category::PRECIPITATION, 6.0),
            (category::SEEPAGE_IN, 400.0),
            (category::PAVED_RUNOFF, 10.0),
            (category::DRAINAGE, 70.0),
            (category::LEACHING, 70.0),
            (category::SURFACE_RUNOFF, 35.0),
            (category::INTAKE, 100.0),
        ]
        .into_iter()
        .map(|(name, c)| (name.to_string(), c))
        .collect();

        Self {
            initial_concentration: 90.0,
            source_concentrations,
            storage_epsilon: 1e-9,
        }
    }
}

impl ChlorideConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Concentration for a category, 0 for categories that carry no mass in.
    pub fn source_concentration(&self, name: &str) -> f64 {
        self.source_concentrations.get(name).copied().unwrap_or(0.0)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(unknown) = self
            .source_concentrations
            .keys()
            .find(|k| !category::ALL.contains(&k.as_str()))
        {
            return Err(WbError::Config(format!("unknown category '{unknown}'")));
        }
        if !self.storage_epsilon.is_finite() || self.storage_epsilon < 0.0 {
            return Err(WbError::Config(format!(
                "storage_epsilon must be a non-negative number, got {}",
                self.storage_epsilon
            )));
        }
        Ok(())
    }
}
