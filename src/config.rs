//! Simulator configuration templating
//!
//! The simulator takes its cache hierarchy as a JSON document on the
//! command line. Experiments start from a default document and derive
//! variants from it (a different policy, a different set count, ...).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Replacement policy understood by the simulator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    #[default]
    Lru,
    Lrudb,
    Nmru,
}

impl Policy {
    pub const ALL: [Policy; 3] = [Policy::Lru, Policy::Lrudb, Policy::Nmru];

    pub fn name(&self) -> &'static str {
        match self {
            Policy::Lru => "lru",
            Policy::Lrudb => "lrudb",
            Policy::Nmru => "nmru",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Policy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lru" => Ok(Policy::Lru),
            "lrudb" => Ok(Policy::Lrudb),
            "nmru" => Ok(Policy::Nmru),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Geometry parameter of a cache level that sweeps can vary
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelParam {
    Sets,
    Ways,
}

impl LevelParam {
    pub fn name(&self) -> &'static str {
        match self {
            LevelParam::Sets => "sets",
            LevelParam::Ways => "ways",
        }
    }
}

impl FromStr for LevelParam {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sets" => Ok(LevelParam::Sets),
            "ways" => Ok(LevelParam::Ways),
            _ => Err(ConfigError::UnknownParam(s.to_string())),
        }
    }
}

/// One level of the simulated hierarchy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheLevel {
    pub name: String,
    pub sets: usize,
    pub ways: usize,
    pub repl: Policy,
}

/// Full simulator configuration, as passed with `--config`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub block_size: usize,
    pub caches: Vec<CacheLevel>,
}

impl Default for SimConfig {
    /// Three-level hierarchy with 64B blocks
    fn default() -> Self {
        let level = |name: &str, sets, ways| CacheLevel {
            name: name.to_string(),
            sets,
            ways,
            repl: Policy::Lru,
        };
        Self {
            block_size: 64,
            caches: vec![
                level("L1D", 64, 8),
                level("L2C", 1024, 8),
                level("LLC", 2048, 16),
            ],
        }
    }
}

impl SimConfig {
    /// Read a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(path.into(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Copy of this configuration where every level uses `policy`
    pub fn with_policy(&self, policy: Policy) -> Self {
        let mut config = self.clone();
        for cache in &mut config.caches {
            cache.repl = policy;
        }
        config
    }

    /// Copy of this configuration with one level's geometry replaced
    pub fn with_level_param(
        &self,
        level: &str,
        param: LevelParam,
        value: usize,
    ) -> Result<Self, ConfigError> {
        let mut config = self.clone();
        let cache = config
            .caches
            .iter_mut()
            .find(|c| c.name == level)
            .ok_or_else(|| ConfigError::UnknownLevel(level.to_string()))?;
        match param {
            LevelParam::Sets => cache.sets = value,
            LevelParam::Ways => cache.ways = value,
        }
        config.validate()?;
        Ok(config)
    }

    /// The simulator asserts power-of-two geometry, reject it up front
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.block_size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                level: "config".to_string(),
                field: "block_size",
                value: self.block_size,
            });
        }
        for cache in &self.caches {
            for (field, value) in [("sets", cache.sets), ("ways", cache.ways)] {
                if !value.is_power_of_two() {
                    return Err(ConfigError::NotPowerOfTwo {
                        level: cache.name.clone(),
                        field,
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    /// Compact JSON for the simulator command line
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn level_names(&self) -> Vec<String> {
        self.caches.iter().map(|c| c.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "block_size": 64,
        "caches": [
            { "name": "L1D", "sets": 64, "ways": 8, "repl": "lru" },
            { "name": "LLC", "sets": 2048, "ways": 16, "repl": "nmru" }
        ]
    }"#;

    #[test]
    fn test_parse() {
        let config = SimConfig::parse(CONFIG).unwrap();
        assert_eq!(config.block_size, 64);
        assert_eq!(config.caches.len(), 2);
        assert_eq!(config.caches[1].repl, Policy::Nmru);
        assert_eq!(config.level_names(), vec!["L1D", "LLC"]);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let bad = CONFIG.replace("nmru", "fifo");
        assert!(SimConfig::parse(&bad).is_err());
        assert!("fifo".parse::<Policy>().is_err());
        assert_eq!("LRUDB".parse::<Policy>().unwrap(), Policy::Lrudb);
    }

    #[test]
    fn test_with_policy() {
        let config = SimConfig::parse(CONFIG).unwrap();
        let db = config.with_policy(Policy::Lrudb);
        assert!(db.caches.iter().all(|c| c.repl == Policy::Lrudb));
        // The template itself is untouched
        assert_eq!(config.caches[0].repl, Policy::Lru);
    }

    #[test]
    fn test_with_level_param() {
        let config = SimConfig::default();
        let swept = config.with_level_param("LLC", LevelParam::Ways, 4).unwrap();
        assert_eq!(swept.caches[2].ways, 4);
        assert_eq!(swept.caches[2].sets, config.caches[2].sets);

        assert!(config.with_level_param("L9", LevelParam::Sets, 4).is_err());
        assert!(config.with_level_param("LLC", LevelParam::Sets, 3).is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = SimConfig::default();
        assert!(config.validate().is_ok());
        config.block_size = 48;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_to_json_round_trips_through_simulator_shape() {
        let config = SimConfig::default().with_policy(Policy::Lrudb);
        let json = config.to_json().unwrap();
        assert!(json.contains(r#""repl":"lrudb""#));
        assert!(!json.contains('\n'));
        assert_eq!(SimConfig::parse(&json).unwrap(), config);
    }
}
