//! Final validation report assembly.
//!
//! Deterministic markdown rendering: a header block, the recommendation
//! and score card, a coverage summary naming every dimension that has no
//! data, then each stage's narrative in registry order. The report is
//! hashed so re-runs can be compared cheaply.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

use crate::domain::models::{
    ComponentStatus, Project, ResearchComponent, ScoreCard, StageType,
};

pub struct ReportInput<'a> {
    pub project: &'a Project,
    pub components: &'a [ResearchComponent],
    pub card: &'a ScoreCard,
    pub run_id: &'a str,
    pub version: u32,
    pub generated_at: DateTime<Utc>,
}

/// Render the full report markdown.
pub fn assemble(input: &ReportInput<'_>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Workforce Program Validation Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "**Program:** {}", input.project.brief.name);
    if let Some(program_type) = &input.project.brief.program_type {
        let _ = writeln!(out, "**Type:** {program_type}");
    }
    if let Some(audience) = &input.project.brief.audience {
        let _ = writeln!(out, "**Audience:** {audience}");
    }
    let _ = writeln!(out, "**Report ID:** {}", input.run_id);
    let _ = writeln!(out, "**Version:** {}", input.version);
    let _ = writeln!(
        out,
        "**Generated:** {}",
        input.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(out);

    render_recommendation(&mut out, input.card);
    render_coverage(&mut out, input.card, input.components);
    render_sections(&mut out, input.components);

    out
}

/// SHA-256 of the report markdown, lowercase hex.
pub fn report_hash(markdown: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(markdown.as_bytes());
    hex::encode(hasher.finalize())
}

fn render_recommendation(out: &mut String, card: &ScoreCard) {
    let _ = writeln!(out, "## Recommendation: {}", card.recommendation.as_str());
    let _ = writeln!(out);
    let _ = writeln!(out, "**Composite score:** {:.1}/10", card.composite);
    if card.recommendation != card.composite_tier {
        let _ = writeln!(
            out,
            "**Composite tier:** {} (downgraded by override)",
            card.composite_tier.as_str()
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "| Dimension | Score | Weight |");
    let _ = writeln!(out, "|---|---|---|");
    for dim in &card.dimensions {
        let _ = writeln!(
            out,
            "| {} | {:.1} | {:.0}% |",
            dim.stage.title(),
            dim.score,
            dim.weight * 100.0
        );
    }
    let _ = writeln!(out);

    if !card.overrides.is_empty() {
        let _ = writeln!(out, "**Overrides applied:**");
        let _ = writeln!(out);
        for trigger in &card.overrides {
            let _ = writeln!(out, "- {}", trigger.reason);
        }
        let _ = writeln!(out);
    }
}

fn render_coverage(out: &mut String, card: &ScoreCard, components: &[ResearchComponent]) {
    if card.unscored.is_empty() {
        return;
    }

    let _ = writeln!(out, "### Coverage Gaps");
    let _ = writeln!(out);
    for stage in &card.unscored {
        let diagnostic = components
            .iter()
            .find(|c| c.stage == *stage)
            .and_then(|c| c.error.as_deref())
            .unwrap_or("analysis did not run");
        let _ = writeln!(
            out,
            "- {} data unavailable ({diagnostic}); its weight was \
             redistributed across the scored dimensions",
            stage.title()
        );
    }
    let _ = writeln!(out);
}

fn render_sections(out: &mut String, components: &[ResearchComponent]) {
    for stage in StageType::ALL {
        let Some(component) = components.iter().find(|c| c.stage == stage) else {
            continue;
        };
        if component.status != ComponentStatus::Completed {
            continue;
        }
        if let Some(markdown) = &component.markdown {
            let _ = writeln!(out, "---");
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", markdown.trim_end());
            let _ = writeln!(out);
        }
    }
}
