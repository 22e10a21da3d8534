//! Routing signals: the closed enumerations a generation request is described by.
//!
//! Every enumeration carries an `Unknown` catch-all so that unrecognized values
//! coming over the wire deserialize instead of failing the request. `Unknown`
//! contributes zero weight in the scoring table.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Generic,
    Finance,
    Healthcare,
    SocialCare,
    PublicIt,
    AiStartup,
    Ecommerce,
    Manufacturing,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyType {
    Startup,
    Scaleup,
    Sme,
    Corporate,
    PublicSector,
    SocialSector,
    Agency,
    Consulting,
    Hospitality,
    Retail,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formality {
    Casual,
    Neutral,
    Formal,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seniority {
    Intern,
    Junior,
    Mid,
    Senior,
    Lead,
    Principal,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Output language of the artifact and of the default style tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
        }
    }
}

/// One routing request. Missing fields deserialize to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalTuple {
    pub industry: Industry,
    pub company_type: CompanyType,
    pub formality: Formality,
    pub seniority: Seniority,
}

#[cfg(test)]
impl SignalTuple {
    pub fn new(
        industry: Industry,
        company_type: CompanyType,
        formality: Formality,
        seniority: Seniority,
    ) -> Self {
        Self {
            industry,
            company_type,
            formality,
            seniority,
        }
    }
}

/// Renders the wire name of a signal value (`ai_startup`, `public_sector`, ...).
fn wire_name<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

macro_rules! display_as_wire_name {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&wire_name(self))
            }
        })*
    };
}

display_as_wire_name!(Industry, CompanyType, Formality, Seniority);
