//! Weighted-scoring aggregation.
//!
//! Combines the per-dimension scores into one composite and applies the
//! override rules. Errored dimensions contribute no score; their weight is
//! redistributed proportionally across the remaining scored dimensions and
//! the gap is carried on the score card rather than silently ignored.
//! Deterministic: same scores in, same card out, regardless of order.

use crate::domain::models::{
    DimensionScore, OverrideTrigger, Recommendation, ScoreCard, StageType,
};

/// A dimension's raw outcome going into aggregation: `None` means the
/// stage errored and is a documented gap.
#[derive(Debug, Clone, Copy)]
pub struct StageScore {
    pub stage: StageType,
    pub score: Option<f64>,
}

/// Aggregate scored dimensions into a recommendation.
///
/// Walks the registry's scored stages; any stage absent from `scores` is
/// treated the same as an errored one.
pub fn aggregate(scores: &[StageScore]) -> ScoreCard {
    let mut dimensions = Vec::new();
    let mut unscored = Vec::new();

    for stage in StageType::INDEPENDENT {
        let weight = stage.weight().unwrap_or(0.0);
        let score = scores
            .iter()
            .find(|s| s.stage == stage)
            .and_then(|s| s.score);

        match score {
            Some(raw) => dimensions.push(DimensionScore {
                stage,
                score: raw.clamp(0.0, 10.0),
                weight,
            }),
            None => unscored.push(stage),
        }
    }

    let total_weight: f64 = dimensions.iter().map(|d| d.weight).sum();

    // Redistribute errored stages' weight proportionally: normalizing by
    // the remaining total is exactly that.
    let composite = if total_weight > 0.0 {
        for dim in &mut dimensions {
            dim.weight /= total_weight;
        }
        dimensions.iter().map(|d| d.score * d.weight).sum()
    } else {
        0.0
    };

    let composite_tier = if dimensions.is_empty() {
        Recommendation::NoGo
    } else {
        Recommendation::from_composite(composite)
    };

    let overrides = collect_overrides(&dimensions);
    let recommendation = overrides
        .iter()
        .map(|t| t.cap)
        .fold(composite_tier, Recommendation::min);

    ScoreCard {
        dimensions,
        unscored,
        composite,
        composite_tier,
        overrides,
        recommendation,
    }
}

/// Override rules, each a downgrade-only cap. Collected in registry order
/// so the card reads deterministically; the fold above makes the final
/// tier order-independent anyway.
fn collect_overrides(dimensions: &[DimensionScore]) -> Vec<OverrideTrigger> {
    let mut triggers = Vec::new();

    for dim in dimensions {
        if dim.score <= 3.0 {
            triggers.push(OverrideTrigger {
                stage: dim.stage,
                score: dim.score,
                cap: Recommendation::ConditionalGo,
                reason: format!(
                    "{} scored {:.1}/10, capping the recommendation at Conditional Go",
                    dim.stage.title(),
                    dim.score
                ),
            });
        }

        if let Some(floor) = dim.stage.defer_floor() {
            if dim.score < floor {
                triggers.push(OverrideTrigger {
                    stage: dim.stage,
                    score: dim.score,
                    cap: Recommendation::Defer,
                    reason: format!(
                        "{} scored {:.1}/10 — a program cannot launch on this dimension; \
                         recommendation capped at Defer",
                        dim.stage.title(),
                        dim.score
                    ),
                });
            }
        }
    }

    triggers
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn all_scored(scores: [f64; 7]) -> Vec<StageScore> {
        StageType::INDEPENDENT
            .iter()
            .zip(scores)
            .map(|(stage, score)| StageScore {
                stage: *stage,
                score: Some(score),
            })
            .collect()
    }

    #[test]
    fn uniform_nines_are_a_strong_go() {
        let card = aggregate(&all_scored([9.0; 7]));
        assert!((card.composite - 9.0).abs() < 1e-9);
        assert_eq!(card.recommendation, Recommendation::StrongGo);
        assert!(card.overrides.is_empty());
        assert!(card.unscored.is_empty());
    }

    #[test]
    fn financial_viability_floor_forces_defer() {
        // FV=2, everything else 8: composite 6.8 (Conditional Go band),
        // but the floor and the <=3 cap both fire; Defer wins.
        let mut scores = [8.0; 7];
        scores[1] = 2.0; // FinancialViability is second in registry order
        let card = aggregate(&all_scored(scores));

        assert!((card.composite - 6.8).abs() < 1e-9);
        assert_eq!(card.composite_tier, Recommendation::ConditionalGo);
        assert_eq!(card.recommendation, Recommendation::Defer);
        assert_eq!(card.overrides.len(), 2);
    }

    #[test]
    fn labor_market_floor_forces_defer() {
        let mut scores = [8.0; 7];
        scores[0] = 3.5; // below the 4.0 floor, above the <=3 cap
        let card = aggregate(&all_scored(scores));
        assert_eq!(card.overrides.len(), 1);
        assert_eq!(card.recommendation, Recommendation::Defer);
    }

    #[test]
    fn weak_dimension_caps_at_conditional_go() {
        let mut scores = [9.0; 7];
        scores[4] = 3.0; // CompetitiveLandscape, no defer floor
        let card = aggregate(&all_scored(scores));
        assert_eq!(card.recommendation, Recommendation::ConditionalGo);
        assert_eq!(card.overrides.len(), 1);
    }

    #[test]
    fn overrides_never_upgrade() {
        // Composite already worse than every triggered cap
        let card = aggregate(&all_scored([2.0, 5.0, 2.0, 2.0, 2.0, 2.0, 2.0]));
        assert_eq!(card.composite_tier, Recommendation::NoGo);
        assert_eq!(card.recommendation, Recommendation::NoGo);
    }

    #[test]
    fn errored_stage_weight_is_redistributed() {
        let mut scores: Vec<StageScore> = all_scored([8.0; 7]);
        scores[2].score = None; // EmployerDemand errored

        let card = aggregate(&scores);
        assert_eq!(card.unscored, vec![StageType::EmployerDemand]);
        assert_eq!(card.dimensions.len(), 6);

        let weight_sum: f64 = card.dimensions.iter().map(|d| d.weight).sum();
        assert!((weight_sum - 1.0).abs() < 1e-9);
        // All remaining scores equal, so the composite is unchanged
        assert!((card.composite - 8.0).abs() < 1e-9);
    }

    #[test]
    fn no_scores_at_all_is_a_no_go() {
        let card = aggregate(&[]);
        assert_eq!(card.composite, 0.0);
        assert_eq!(card.recommendation, Recommendation::NoGo);
        assert_eq!(card.unscored.len(), 7);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let card = aggregate(&all_scored([12.0; 7]));
        assert!((card.composite - 10.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn composite_is_bounded(scores in proptest::array::uniform7(0.0f64..=10.0)) {
            let card = aggregate(&all_scored(scores));
            prop_assert!(card.composite >= 0.0);
            prop_assert!(card.composite <= 10.0 + 1e-9);
        }

        #[test]
        fn composite_is_monotone_in_each_score(
            scores in proptest::array::uniform7(0.0f64..=10.0),
            idx in 0usize..7,
            bump in 0.0f64..=2.0,
        ) {
            let base = aggregate(&all_scored(scores));
            let mut raised = scores;
            raised[idx] = (raised[idx] + bump).min(10.0);
            let card = aggregate(&all_scored(raised));
            prop_assert!(card.composite >= base.composite - 1e-9);
        }

        #[test]
        fn redistributed_weights_sum_to_one(
            scores in proptest::array::uniform7(0.0f64..=10.0),
            dropped in 0usize..7,
        ) {
            let mut stage_scores = all_scored(scores);
            stage_scores[dropped].score = None;
            let card = aggregate(&stage_scores);
            let sum: f64 = card.dimensions.iter().map(|d| d.weight).sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
        }

        #[test]
        fn weak_dimension_never_beats_conditional_go(
            scores in proptest::array::uniform7(0.0f64..=10.0),
        ) {
            let card = aggregate(&all_scored(scores));
            if scores.iter().any(|s| *s <= 3.0) {
                prop_assert!(card.recommendation <= Recommendation::ConditionalGo);
            }
        }
    }
}
