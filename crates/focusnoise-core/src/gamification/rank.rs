//! Rank table.
//!
//! Ranks are an ordered list of `(threshold_hours, name)` pairs with
//! non-decreasing thresholds. A total maps to the last tier whose threshold
//! it reaches, so duplicate thresholds resolve to the later (higher) tier.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankTier {
    pub threshold_hours: f64,
    pub name: String,
}

impl RankTier {
    pub fn new(threshold_hours: f64, name: &str) -> Self {
        Self {
            threshold_hours,
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RankTable {
    tiers: Vec<RankTier>,
}

impl RankTable {
    /// Build a table, rejecting empty lists, negative or non-finite
    /// thresholds and thresholds that go down.
    pub fn new(tiers: Vec<RankTier>) -> Result<Self, ValidationError> {
        if tiers.is_empty() {
            return Err(ValidationError::EmptyCollection("rank table".into()));
        }
        for (i, tier) in tiers.iter().enumerate() {
            if !tier.threshold_hours.is_finite() || tier.threshold_hours < 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: format!("ranks[{i}].threshold_hours"),
                    message: format!("{} is not a valid number of hours", tier.threshold_hours),
                });
            }
            if i > 0 && tier.threshold_hours < tiers[i - 1].threshold_hours {
                return Err(ValidationError::InvalidValue {
                    field: format!("ranks[{i}].threshold_hours"),
                    message: "thresholds must be in ascending order".into(),
                });
            }
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[RankTier] {
        &self.tiers
    }

    /// Highest rank whose threshold is `<= total_hours`. Totals below the
    /// first threshold get the first rank.
    pub fn rank_for(&self, total_hours: f64) -> &str {
        self.tiers
            .iter()
            .rev()
            .find(|t| t.threshold_hours <= total_hours)
            .unwrap_or(&self.tiers[0])
            .name
            .as_str()
    }

    pub fn rank_for_secs(&self, total_secs: u64) -> &str {
        self.rank_for(total_secs as f64 / 3600.0)
    }

    /// The next tier above `total_hours` and how many hours remain to reach it.
    pub fn next_tier(&self, total_hours: f64) -> Option<(&RankTier, f64)> {
        self.tiers
            .iter()
            .find(|t| t.threshold_hours > total_hours)
            .map(|t| (t, t.threshold_hours - total_hours))
    }
}

impl Default for RankTable {
    fn default() -> Self {
        Self {
            tiers: vec![
                RankTier::new(0.0, "Terminal Tourist"),
                RankTier::new(1.0, "Script Kiddie"),
                RankTier::new(5.0, "Shell Wrangler"),
                RankTier::new(10.0, "Time Lord"),
                RankTier::new(25.0, "Kernel Monk"),
                RankTier::new(50.0, "Root of All Focus"),
                RankTier::new(100.0, "The Daemon"),
            ],
        }
    }
}

impl<'de> Deserialize<'de> for RankTable {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tiers = Vec::<RankTier>::deserialize(deserializer)?;
        RankTable::new(tiers).map_err(serde::de::Error::custom)
    }
}
