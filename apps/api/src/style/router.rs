//! Style Router: deterministic rubric that maps a signal tuple to a style profile.
//!
//! No LLM call and no hidden state: identical signals always yield an identical
//! profile. Ties on the top score resolve red > yellow > blue > green.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::style::scoring_table::{contributions, Color, ColorScore, DEFAULT_BIAS};
use crate::style::signals::SignalTuple;

/// A runner-up colour closer than this to the primary becomes the secondary.
pub const MARGIN: f64 = 0.15;

/// Float sums of decimal weights are compared with this tolerance.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    Proactive,
    Reflective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceFrame {
    PersonOriented,
    FactOriented,
}

/// Resolved persuasion profile. `secondary` is never equal to `primary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    pub primary: Color,
    pub secondary: Option<Color>,
    pub mode: InteractionMode,
    pub frame: ReferenceFrame,
    /// Hard overrides in precedence order: legal/ethics > brand > role.
    pub constraints: Vec<String>,
}

impl StyleProfile {
    /// Attaches hard constraints. Consumes the profile so it is never edited in place.
    pub fn with_constraints(mut self, constraints: Vec<String>) -> Self {
        self.constraints = constraints
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        self
    }
}

/// Accumulates all four dimensions plus the fixed bias.
pub fn score_signals(signals: &SignalTuple) -> ColorScore {
    let mut score = ColorScore::default();
    for (_, _, weights) in contributions(signals) {
        score.add_all(weights);
    }
    let (bias_color, bias) = DEFAULT_BIAS;
    score.add(bias_color, bias);
    score
}

/// Argmax over `candidates`, which must be in tie-break priority order.
fn argmax(score: &ColorScore, candidates: impl Iterator<Item = Color>) -> Option<Color> {
    let mut best: Option<(Color, f64)> = None;
    for color in candidates {
        let value = score.get(color);
        match best {
            Some((_, best_value)) if value <= best_value + EPSILON => {}
            _ => best = Some((color, value)),
        }
    }
    best.map(|(color, _)| color)
}

/// Primary colour plus the runner-up when it trails by less than `MARGIN`.
fn select_colors(score: &ColorScore) -> (Color, Option<Color>) {
    let primary = argmax(score, Color::PRIORITY.into_iter()).unwrap_or(DEFAULT_BIAS.0);
    let runner_up = argmax(
        score,
        Color::PRIORITY.into_iter().filter(|&c| c != primary),
    );

    let secondary = runner_up
        .filter(|&color| score.get(primary) - score.get(color) < MARGIN - EPSILON);
    (primary, secondary)
}

/// Routes a signal tuple to a style profile. Never fails.
pub fn route(signals: &SignalTuple) -> StyleProfile {
    let score = score_signals(signals);
    let (primary, secondary) = select_colors(&score);

    let mode = match primary {
        Color::Red | Color::Yellow => InteractionMode::Proactive,
        Color::Blue | Color::Green => InteractionMode::Reflective,
    };
    let frame = match primary {
        Color::Yellow | Color::Green => ReferenceFrame::PersonOriented,
        Color::Red | Color::Blue => ReferenceFrame::FactOriented,
    };

    info!(
        "Style routed: primary={} secondary={} mode={:?} | {}",
        primary,
        secondary.map(Color::as_str).unwrap_or("none"),
        mode,
        format_scores(&score)
    );

    StyleProfile {
        primary,
        secondary,
        mode,
        frame,
        constraints: Vec::new(),
    }
}

fn format_scores(score: &ColorScore) -> String {
    score
        .ranked()
        .iter()
        .map(|(c, s)| format!("{c}: {s:.2}"))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Human-readable account of a routing decision, one line per step.
pub fn explain(signals: &SignalTuple) -> Vec<String> {
    let mut lines = Vec::new();

    for (dimension, value, weights) in contributions(signals) {
        if weights.is_empty() {
            lines.push(format!("{}='{}' => no signal", dimension.label(), value));
        } else {
            let deltas = weights
                .iter()
                .map(|(c, w)| format!("{c}+{w:.2}"))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("{}='{}' => {}", dimension.label(), value, deltas));
        }
    }
    let (bias_color, bias) = DEFAULT_BIAS;
    lines.push(format!("default bias => {bias_color}+{bias:.2}"));

    let score = score_signals(signals);
    let profile = route(signals);
    lines.push(format!("final scores: {}", format_scores(&score)));
    lines.push(format!(
        "primary: {} ({:.2})",
        profile.primary,
        score.get(profile.primary)
    ));

    match profile.secondary {
        Some(secondary) => lines.push(format!(
            "secondary: {} ({:.2}), within margin {MARGIN}",
            secondary,
            score.get(secondary)
        )),
        None => {
            let runner_up = score
                .ranked()
                .into_iter()
                .find(|(c, _)| *c != profile.primary)
                .map(|(_, s)| s)
                .unwrap_or(0.0);
            lines.push(format!(
                "no secondary: gap {:.2} >= margin {MARGIN}",
                score.get(profile.primary) - runner_up
            ));
        }
    }

    lines
}
