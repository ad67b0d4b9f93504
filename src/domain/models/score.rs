//! Scoring domain types.
//!
//! A dimension score pairs a stage's 0-10 score with its registry weight.
//! The composite maps to a recommendation tier; override rules can only
//! drag the tier down, never up.

use serde::{Deserialize, Serialize};

use super::stage::StageType;

/// Recommendation tier. Ordered worst-first so `Ord::min` picks the more
/// conservative of two tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    NoGo,
    Defer,
    CautiousProceed,
    ConditionalGo,
    StrongGo,
}

impl Recommendation {
    /// Map a composite score to its tier.
    pub fn from_composite(composite: f64) -> Self {
        if composite >= 8.0 {
            Self::StrongGo
        } else if composite >= 6.5 {
            Self::ConditionalGo
        } else if composite >= 5.0 {
            Self::CautiousProceed
        } else if composite >= 3.5 {
            Self::Defer
        } else {
            Self::NoGo
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrongGo => "Strong Go",
            Self::ConditionalGo => "Conditional Go",
            Self::CautiousProceed => "Cautious Proceed",
            Self::Defer => "Defer",
            Self::NoGo => "No Go",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scored dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub stage: StageType,
    /// 0-10
    pub score: f64,
    /// Registry weight, possibly rescaled after redistribution
    pub weight: f64,
}

/// An override rule that fired during aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideTrigger {
    pub stage: StageType,
    pub score: f64,
    /// The tier this rule caps the recommendation at
    pub cap: Recommendation,
    pub reason: String,
}

/// Aggregation result: composite, tier, fired overrides, and gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    /// Scored dimensions with redistributed weights (sum to 1.0)
    pub dimensions: Vec<DimensionScore>,
    /// Stages that errored and contributed no score
    pub unscored: Vec<StageType>,
    pub composite: f64,
    /// Tier implied by the composite alone
    pub composite_tier: Recommendation,
    /// Overrides that fired, in registry order
    pub overrides: Vec<OverrideTrigger>,
    /// Most conservative of composite tier and all caps
    pub recommendation: Recommendation,
}
