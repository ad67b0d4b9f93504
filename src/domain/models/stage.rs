//! Stage catalog for the validation pipeline.
//!
//! The nine stages form a fixed two-layer DAG: seven independent research
//! dimensions, a tiger-team synthesis that consumes all of them, and a QA
//! review of the synthesis. Registry order doubles as report order so the
//! two can never drift apart.

use serde::{Deserialize, Serialize};

/// One research task type in the fixed stage catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    /// Labor market demand for program completers
    LaborMarket,
    /// Program cost and revenue viability
    FinancialViability,
    /// Employer demand and partnership potential
    EmployerDemand,
    /// Target learner demand
    LearnerDemand,
    /// Competitive landscape
    CompetitiveLandscape,
    /// Institutional fit and capacity
    InstitutionalFit,
    /// Regulatory and compliance posture
    RegulatoryCompliance,
    /// Executive synthesis across all research dimensions
    TigerTeamSynthesis,
    /// Quality review of the synthesis
    QaReview,
}

impl StageType {
    /// All stages, in registry order. Report sections and dependency
    /// resolution both use this ordering.
    pub const ALL: [Self; 9] = [
        Self::LaborMarket,
        Self::FinancialViability,
        Self::EmployerDemand,
        Self::LearnerDemand,
        Self::CompetitiveLandscape,
        Self::InstitutionalFit,
        Self::RegulatoryCompliance,
        Self::TigerTeamSynthesis,
        Self::QaReview,
    ];

    /// The seven independent research stages (no predecessors).
    pub const INDEPENDENT: [Self; 7] = [
        Self::LaborMarket,
        Self::FinancialViability,
        Self::EmployerDemand,
        Self::LearnerDemand,
        Self::CompetitiveLandscape,
        Self::InstitutionalFit,
        Self::RegulatoryCompliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LaborMarket => "labor_market",
            Self::FinancialViability => "financial_viability",
            Self::EmployerDemand => "employer_demand",
            Self::LearnerDemand => "learner_demand",
            Self::CompetitiveLandscape => "competitive_landscape",
            Self::InstitutionalFit => "institutional_fit",
            Self::RegulatoryCompliance => "regulatory_compliance",
            Self::TigerTeamSynthesis => "tiger_team_synthesis",
            Self::QaReview => "qa_review",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "labor_market" => Some(Self::LaborMarket),
            "financial_viability" => Some(Self::FinancialViability),
            "employer_demand" => Some(Self::EmployerDemand),
            "learner_demand" => Some(Self::LearnerDemand),
            "competitive_landscape" => Some(Self::CompetitiveLandscape),
            "institutional_fit" => Some(Self::InstitutionalFit),
            "regulatory_compliance" => Some(Self::RegulatoryCompliance),
            "tiger_team_synthesis" => Some(Self::TigerTeamSynthesis),
            "qa_review" => Some(Self::QaReview),
            _ => None,
        }
    }

    /// Human-readable section title used in reports.
    pub fn title(&self) -> &'static str {
        match self {
            Self::LaborMarket => "Labor Market Demand",
            Self::FinancialViability => "Financial Viability",
            Self::EmployerDemand => "Employer Demand & Partnerships",
            Self::LearnerDemand => "Target Learner Demand",
            Self::CompetitiveLandscape => "Competitive Landscape",
            Self::InstitutionalFit => "Institutional Fit & Capacity",
            Self::RegulatoryCompliance => "Regulatory & Compliance",
            Self::TigerTeamSynthesis => "Tiger Team Synthesis",
            Self::QaReview => "QA Review",
        }
    }

    /// Scoring weight for this dimension. Synthesis and QA stages are
    /// unweighted. Weights across the seven scored stages sum to 1.0.
    pub fn weight(&self) -> Option<f64> {
        match self {
            Self::LaborMarket => Some(0.25),
            Self::FinancialViability => Some(0.20),
            Self::EmployerDemand | Self::LearnerDemand => Some(0.15),
            Self::CompetitiveLandscape | Self::InstitutionalFit => Some(0.10),
            Self::RegulatoryCompliance => Some(0.05),
            Self::TigerTeamSynthesis | Self::QaReview => None,
        }
    }

    /// Stages whose components must be terminal before this stage runs.
    pub fn depends_on(&self) -> &'static [StageType] {
        match self {
            Self::TigerTeamSynthesis => &Self::INDEPENDENT,
            Self::QaReview => &[Self::TigerTeamSynthesis],
            _ => &[],
        }
    }

    /// Whether this stage contributes a dimension score.
    pub fn is_scored(&self) -> bool {
        self.weight().is_some()
    }

    /// Whether this stage has no predecessors.
    pub fn is_independent(&self) -> bool {
        self.depends_on().is_empty()
    }

    /// Score below which this dimension forces the recommendation down to
    /// Defer regardless of the composite. Only labor market and financial
    /// viability carry a floor.
    pub fn defer_floor(&self) -> Option<f64> {
        match self {
            Self::LaborMarket | Self::FinancialViability => Some(4.0),
            _ => None,
        }
    }
}

impl std::fmt::Display for StageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let total: f64 = StageType::INDEPENDENT
            .iter()
            .filter_map(StageType::weight)
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn independent_stages_have_no_predecessors() {
        for stage in StageType::INDEPENDENT {
            assert!(stage.is_independent());
            assert!(stage.is_scored());
        }
    }

    #[test]
    fn synthesis_depends_on_all_independents() {
        assert_eq!(
            StageType::TigerTeamSynthesis.depends_on(),
            &StageType::INDEPENDENT
        );
        assert_eq!(
            StageType::QaReview.depends_on(),
            &[StageType::TigerTeamSynthesis]
        );
        assert!(!StageType::TigerTeamSynthesis.is_scored());
        assert!(!StageType::QaReview.is_scored());
    }

    #[test]
    fn string_round_trip() {
        for stage in StageType::ALL {
            assert_eq!(StageType::from_str(stage.as_str()), Some(stage));
        }
        assert_eq!(StageType::from_str("unknown"), None);
    }

    #[test]
    fn registry_order_is_stable() {
        assert_eq!(StageType::ALL[0], StageType::LaborMarket);
        assert_eq!(StageType::ALL[7], StageType::TigerTeamSynthesis);
        assert_eq!(StageType::ALL[8], StageType::QaReview);
    }
}
