//! Job posting domain types: the request a generation run is built from and the
//! structured artifact each candidate carries.

use serde::{Deserialize, Serialize};

use crate::style::signals::{CompanyType, Industry, Language, SignalTuple};

/// The structured artifact a generator produces for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobBody {
    pub job_description: String,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub duties: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl JobBody {
    /// Keeps exactly one benefit per keyword, in keyword order.
    ///
    /// For each keyword the best-matching generated benefit wins: one containing the
    /// whole keyword beats one sharing a word longer than three characters. With no
    /// match the keyword itself is used. No keywords means no benefits.
    pub fn enforce_benefit_keywords(&mut self, keywords: &[String]) {
        let generated = std::mem::take(&mut self.benefits);

        self.benefits = keywords
            .iter()
            .map(|keyword| {
                let keyword_lower = keyword.trim().to_lowercase();
                let mut best: Option<(&String, f64)> = None;

                for benefit in &generated {
                    let score = benefit_match_score(&keyword_lower, &benefit.to_lowercase());
                    if score > best.map_or(0.0, |(_, s)| s) {
                        best = Some((benefit, score));
                    }
                }

                best.map_or_else(|| keyword.clone(), |(benefit, _)| benefit.clone())
            })
            .collect();
    }

    /// Renders the posting as Markdown under `title`.
    pub fn to_markdown(&self, title: &str, language: Language) -> String {
        let (requirements, duties, benefits) = match language {
            Language::En => ("Requirements", "Responsibilities", "Benefits"),
            Language::De => ("Anforderungen", "Aufgaben", "Benefits"),
        };

        let mut out = format!("# {title}\n\n{}\n", self.job_description.trim());
        for (heading, items) in [
            (duties, &self.duties),
            (requirements, &self.requirements),
            (benefits, &self.benefits),
        ] {
            if items.is_empty() {
                continue;
            }
            out.push_str(&format!("\n## {heading}\n\n"));
            for item in items {
                out.push_str(&format!("- {item}\n"));
            }
        }
        if let Some(summary) = self.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            out.push_str(&format!("\n{}\n", summary.trim()));
        }
        out
    }
}

fn benefit_match_score(keyword: &str, benefit: &str) -> f64 {
    if benefit.contains(keyword) {
        1.0
    } else if keyword
        .split_whitespace()
        .any(|word| word.chars().count() > 3 && benefit.contains(word))
    {
        0.5
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillItem {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
}

/// Everything a generation run needs to know about the posting itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub job_title: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub signals: SignalTuple,
    #[serde(default)]
    pub min_years_experience: Option<u32>,
    #[serde(default)]
    pub max_years_experience: Option<u32>,
    #[serde(default)]
    pub skills: Vec<SkillItem>,
    #[serde(default)]
    pub benefit_keywords: Vec<String>,
}

impl JobSpec {
    /// Applies industry conventions used for generation: public IT is written as
    /// public sector, AI startups as startups, and empty benefit lists get the
    /// industry's default keywords.
    pub fn with_industry_defaults(&self) -> JobSpec {
        let mut spec = self.clone();

        match spec.signals.industry {
            Industry::PublicIt => spec.signals.company_type = CompanyType::PublicSector,
            Industry::AiStartup => spec.signals.company_type = CompanyType::Startup,
            _ => {}
        }

        if spec.benefit_keywords.iter().all(|k| k.trim().is_empty()) {
            spec.benefit_keywords = industry_benefit_defaults(spec.signals.industry)
                .iter()
                .map(|k| (*k).to_string())
                .collect();
        }

        spec
    }
}

pub fn industry_benefit_defaults(industry: Industry) -> &'static [&'static str] {
    match industry {
        Industry::Finance => &[
            "betriebliche Altersvorsorge",
            "Weiterbildung im Bereich Finanzmarkt",
            "Bonusregelung",
            "hybrides Arbeiten",
        ],
        Industry::Healthcare => &[
            "Work Life Balance",
            "betriebliche Gesundheitsförderung",
            "sicherer Arbeitsplatz",
        ],
        Industry::PublicIt => &[
            "Vereinbarkeit von Beruf und Familie",
            "attraktive Sozialleistungen",
            "sicheres Arbeitsumfeld im öffentlichen Dienst",
        ],
        Industry::AiStartup => &[
            "remote friendly",
            "stock options",
            "Weiterbildungsbudget für Konferenzen",
            "modernes Büro im Stadtzentrum",
        ],
        Industry::Ecommerce => &[
            "Mitarbeiterrabatte",
            "flexible Arbeitszeiten",
            "hybrides Arbeiten",
        ],
        Industry::Manufacturing => &[
            "attraktive Schichtmodelle",
            "Zuschuss zu Fahrtkosten",
            "betriebliche Altersvorsorge",
        ],
        Industry::Generic | Industry::SocialCare | Industry::Unknown => &[],
    }
}
