//! Per-cache statistics reported by the simulator

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// One cache level's statistics, as written to the `--json` file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub name: String,
    pub misses: u64,
    pub hits: u64,
    #[serde(deserialize_with = "nan_if_null")]
    pub miss_rate: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub mpki: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub reuse: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub lifetime: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub efficiency: f64,
    /// Per-way live/dead ratio, flattened set-major
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency_image: Option<Vec<f64>>,
}

// serde_json writes NaN (no allocations, no accesses) as null
fn nan_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl CacheStats {
    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Parse the simulator's result file contents
pub fn parse_results(content: &str) -> serde_json::Result<Vec<CacheStats>> {
    serde_json::from_str(content)
}

/// Scalar metric of a [`CacheStats`] record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Statistic {
    Misses,
    Hits,
    MissRate,
    Mpki,
    Reuse,
    Lifetime,
    Efficiency,
}

impl Statistic {
    pub const ALL: [Statistic; 7] = [
        Statistic::Misses,
        Statistic::Hits,
        Statistic::MissRate,
        Statistic::Mpki,
        Statistic::Reuse,
        Statistic::Lifetime,
        Statistic::Efficiency,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Misses => "misses",
            Statistic::Hits => "hits",
            Statistic::MissRate => "miss_rate",
            Statistic::Mpki => "mpki",
            Statistic::Reuse => "reuse",
            Statistic::Lifetime => "lifetime",
            Statistic::Efficiency => "efficiency",
        }
    }

    pub fn get(&self, stats: &CacheStats) -> f64 {
        match self {
            Statistic::Misses => stats.misses as f64,
            Statistic::Hits => stats.hits as f64,
            Statistic::MissRate => stats.miss_rate,
            Statistic::Mpki => stats.mpki,
            Statistic::Reuse => stats.reuse,
            Statistic::Lifetime => stats.lifetime,
            Statistic::Efficiency => stats.efficiency,
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Statistic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase().replace('-', "_");
        Statistic::ALL
            .into_iter()
            .find(|stat| stat.name() == wanted)
            .ok_or_else(|| {
                format!(
                    "Invalid statistic: '{}'. Expected one of: {}.",
                    s,
                    Statistic::ALL.map(|stat| stat.name()).join(", ")
                )
            })
    }
}
