//! Scoring table: static signal → colour weight contributions.
//!
//! Pure data keyed by explicit enum values; every lookup is an exhaustive match,
//! so adding a signal value without weighing it is a compile error.
//! `Unknown` values contribute nothing to any colour.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::style::signals::{CompanyType, Formality, Industry, Seniority, SignalTuple};

/// The four persuasion colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Yellow,
    Blue,
    Green,
}

impl Color {
    /// Tie-break priority on exactly equal scores: red > yellow > blue > green.
    pub const PRIORITY: [Color; 4] = [Color::Red, Color::Yellow, Color::Blue, Color::Green];

    pub fn as_str(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Yellow => "yellow",
            Color::Blue => "blue",
            Color::Green => "green",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unconditional bias applied after all signals: job ads lean credible.
pub const DEFAULT_BIAS: (Color, f64) = (Color::Blue, 0.10);

/// Signal dimension, used in routing explanations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Industry,
    CompanyType,
    Formality,
    Seniority,
}

impl Dimension {
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Industry => "industry",
            Dimension::CompanyType => "company_type",
            Dimension::Formality => "formality",
            Dimension::Seniority => "seniority",
        }
    }
}

type Weights = &'static [(Color, f64)];

pub fn industry_weights(industry: Industry) -> Weights {
    use Color::*;
    match industry {
        Industry::Finance => &[(Blue, 0.4), (Green, 0.2)],
        Industry::Healthcare => &[(Green, 0.4), (Blue, 0.2)],
        Industry::SocialCare => &[(Green, 0.4), (Yellow, 0.2)],
        Industry::PublicIt => &[(Blue, 0.3), (Green, 0.3)],
        Industry::AiStartup => &[(Yellow, 0.3), (Red, 0.2)],
        Industry::Ecommerce => &[(Red, 0.3), (Yellow, 0.2)],
        Industry::Manufacturing => &[(Blue, 0.3), (Green, 0.2)],
        Industry::Generic => &[(Blue, 0.1)],
        Industry::Unknown => &[],
    }
}

pub fn company_type_weights(company_type: CompanyType) -> Weights {
    use Color::*;
    match company_type {
        CompanyType::Startup => &[(Yellow, 0.3), (Red, 0.2)],
        CompanyType::Scaleup => &[(Red, 0.2), (Blue, 0.2)],
        CompanyType::Sme => &[(Blue, 0.2), (Green, 0.2)],
        CompanyType::Corporate => &[(Blue, 0.3), (Green, 0.2)],
        CompanyType::PublicSector => &[(Blue, 0.3), (Green, 0.3)],
        CompanyType::SocialSector => &[(Green, 0.4), (Blue, 0.2)],
        CompanyType::Agency => &[(Yellow, 0.3), (Red, 0.2)],
        CompanyType::Consulting => &[(Red, 0.3), (Blue, 0.2)],
        CompanyType::Hospitality => &[(Yellow, 0.3), (Green, 0.2)],
        CompanyType::Retail => &[(Yellow, 0.2), (Red, 0.2)],
        CompanyType::Unknown => &[],
    }
}

pub fn formality_weights(formality: Formality) -> Weights {
    use Color::*;
    match formality {
        Formality::Casual => &[(Yellow, 0.3), (Red, 0.1)],
        Formality::Neutral => &[(Blue, 0.2)],
        Formality::Formal => &[(Blue, 0.3), (Green, 0.2)],
        Formality::Unknown => &[],
    }
}

pub fn seniority_weights(seniority: Seniority) -> Weights {
    use Color::*;
    match seniority {
        Seniority::Intern => &[(Green, 0.3), (Yellow, 0.2)],
        Seniority::Junior => &[(Yellow, 0.2), (Green, 0.1)],
        Seniority::Mid => &[(Blue, 0.1)],
        Seniority::Senior => &[(Blue, 0.2), (Red, 0.1)],
        Seniority::Lead => &[(Red, 0.3), (Blue, 0.2)],
        Seniority::Principal => &[(Blue, 0.3), (Red, 0.2)],
        Seniority::Unknown => &[],
    }
}

/// The weight contributions of every dimension of a request, in dimension order.
pub fn contributions(signals: &SignalTuple) -> [(Dimension, String, Weights); 4] {
    [
        (
            Dimension::Industry,
            signals.industry.to_string(),
            industry_weights(signals.industry),
        ),
        (
            Dimension::CompanyType,
            signals.company_type.to_string(),
            company_type_weights(signals.company_type),
        ),
        (
            Dimension::Formality,
            signals.formality.to_string(),
            formality_weights(signals.formality),
        ),
        (
            Dimension::Seniority,
            signals.seniority.to_string(),
            seniority_weights(signals.seniority),
        ),
    ]
}

/// Per-colour accumulator. Built fresh per routing request.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColorScore {
    red: f64,
    yellow: f64,
    blue: f64,
    green: f64,
}

impl ColorScore {
    pub fn get(&self, color: Color) -> f64 {
        match color {
            Color::Red => self.red,
            Color::Yellow => self.yellow,
            Color::Blue => self.blue,
            Color::Green => self.green,
        }
    }

    pub fn add(&mut self, color: Color, weight: f64) {
        let slot = match color {
            Color::Red => &mut self.red,
            Color::Yellow => &mut self.yellow,
            Color::Blue => &mut self.blue,
            Color::Green => &mut self.green,
        };
        *slot += weight;
    }

    pub fn add_all(&mut self, weights: Weights) {
        for &(color, weight) in weights {
            self.add(color, weight);
        }
    }

    /// Colours sorted by score descending, exact ties in priority order.
    pub fn ranked(&self) -> Vec<(Color, f64)> {
        let mut ranked: Vec<(Color, f64)> =
            Color::PRIORITY.iter().map(|&c| (c, self.get(c))).collect();
        // Stable sort keeps priority order among equal scores.
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}
