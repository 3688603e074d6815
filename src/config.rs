// src/config.rs
//! Calculator configuration.
//!
//! Loaded from JSON; every field is optional.
//!
//! ```
//! use qsar_descriptors::config::CalculatorConfig;
//! use qsar_descriptors::descriptors::Family;
//!
//! let config = CalculatorConfig::from_json(r#"{
//!     "families": ["ABC", "MATS"],
//!     "max_order": 3,
//!     "properties": ["m", "pe"]
//! }"#)?;
//! assert_eq!(config.families, vec![Family::Abc, Family::Mats]);
//! assert!(config.parallel);
//! # Ok::<(), qsar_descriptors::DescriptorError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::descriptors::{DescriptorError, Family, MAX_DISTANCE};
use crate::properties::PropertyKey;

/// Which descriptors a [`Calculator`](crate::calculator::Calculator) computes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalculatorConfig {
    /// Families to register, in column order. Default: all of them.
    pub families: Vec<Family>,

    /// Highest autocorrelation order to enumerate (at most `MAX_DISTANCE`).
    pub max_order: Option<u32>,

    /// Property selectors to keep; `None` keeps every preset property.
    pub properties: Option<Vec<String>>,

    /// Evaluate molecules on the rayon thread pool.
    pub parallel: bool,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            families: Family::ALL.to_vec(),
            max_order: None,
            properties: None,
            parallel: true,
        }
    }
}

impl CalculatorConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, DescriptorError> {
        let config: CalculatorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, DescriptorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject order caps above `MAX_DISTANCE`, unknown selectors and empty
    /// family lists.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.families.is_empty() {
            return Err(DescriptorError::InvalidConfig(
                "no descriptor families selected".to_string(),
            ));
        }
        if let Some(max) = self.max_order {
            if max > MAX_DISTANCE {
                return Err(DescriptorError::InvalidConfig(format!(
                    "max_order {max} exceeds the maximum distance {MAX_DISTANCE}"
                )));
            }
        }
        self.property_keys().map(|_| ())
    }

    /// The property whitelist as validated keys.
    pub fn property_keys(&self) -> Result<Option<Vec<PropertyKey>>, DescriptorError> {
        self.properties
            .as_ref()
            .map(|names| names.iter().map(|n| PropertyKey::new(n)).collect())
            .transpose()
    }

    /// Effective order cap, `MAX_DISTANCE` when unset.
    pub fn max_order(&self) -> u32 {
        self.max_order.unwrap_or(MAX_DISTANCE)
    }
}
