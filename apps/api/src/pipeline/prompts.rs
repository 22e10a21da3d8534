//! Prompt construction for the writer and the judge.
//!
//! Everything the writer sees is carried by `PromptContext`; the text rendering
//! lives here so generator adapters stay thin.

use serde::Serialize;

use crate::llm_client::prompts::{JOB_BODY_SCHEMA, JSON_ONLY_SYSTEM};
use crate::models::job::{JobBody, JobSpec};
use crate::style::signals::{CompanyType, Formality, Language};

/// Few-shot references beyond this count are ignored.
pub const MAX_GOLD_EXAMPLES: usize = 2;

/// Input to one generation or refinement call.
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    /// Slot this call fills; stable across retries and refinement.
    pub candidate_index: usize,
    pub job: JobSpec,
    pub style_block: String,
    pub company_context: Option<String>,
    pub gold_examples: Vec<JobBody>,
    pub refinement: Option<RefinementBrief>,
}

/// What a refinement call must fix.
#[derive(Debug, Clone, Serialize)]
pub struct RefinementBrief {
    pub previous: JobBody,
    pub score: Option<f64>,
    pub threshold: f64,
    pub feedback: Vec<String>,
}

pub fn writer_system(language: Language) -> String {
    let persona = match language {
        Language::En => "You are an experienced HR copywriter for a recruitment platform.",
        Language::De => "Du bist eine erfahrene HR-Texterin für eine Recruiting-Plattform.",
    };
    format!("{persona} {JSON_ONLY_SYSTEM}")
}

pub const JUDGE_SYSTEM: &str = "You are an expert HR quality judge. You evaluate job \
    descriptions for clarity, tone, alignment with the requested role, and usefulness to \
    candidates. You prefer job ads that are specific, concise, aligned with the seniority \
    level, and realistic for the company type and industry. \
    You MUST respond with valid JSON only.";

fn tone_line(formality: Formality, language: Language) -> &'static str {
    match (language, formality) {
        (Language::En, Formality::Casual) => "Use a friendly modern tone, but stay professional.",
        (Language::En, Formality::Formal) => "Use a formal corporate tone.",
        (Language::En, _) => "Use a clear neutral professional tone.",
        (Language::De, Formality::Casual) => {
            "Verwende einen freundlichen modernen, aber professionellen Ton."
        }
        (Language::De, Formality::Formal) => "Verwende einen formellen, eher konservativen Ton.",
        (Language::De, _) => "Verwende einen klaren sachlich professionellen Ton.",
    }
}

fn company_line(company_type: CompanyType, language: Language) -> Option<&'static str> {
    let line = match language {
        Language::En => match company_type {
            CompanyType::Startup => "The company is a young startup with a fast paced environment.",
            CompanyType::Scaleup => "The company is a growing scaleup with an established product.",
            CompanyType::Sme => "The company is an owner-led small or medium-sized business.",
            CompanyType::Corporate => "The company is a larger established company.",
            CompanyType::PublicSector => "The organization operates in the public sector.",
            CompanyType::SocialSector => "The organization works in the social sector.",
            CompanyType::Agency => "The company is a digital agency working for multiple clients.",
            CompanyType::Consulting => {
                "The company is a consulting firm that delivers client projects."
            }
            CompanyType::Hospitality => "The company operates in hospitality.",
            CompanyType::Retail => "The company operates in retail.",
            CompanyType::Unknown => return None,
        },
        Language::De => match company_type {
            CompanyType::Startup => "Das Unternehmen ist ein junges Startup mit dynamischem Umfeld.",
            CompanyType::Scaleup => {
                "Das Unternehmen ist ein wachsendes Scaleup mit etabliertem Produkt."
            }
            CompanyType::Sme => "Das Unternehmen ist ein inhabergeführter Mittelständler.",
            CompanyType::Corporate => "Das Unternehmen ist ein größeres etabliertes Unternehmen.",
            CompanyType::PublicSector => "Die Organisation ist im öffentlichen Sektor tätig.",
            CompanyType::SocialSector => "Die Organisation ist im sozialen Sektor tätig.",
            CompanyType::Agency => {
                "Das Unternehmen ist eine Agentur mit verschiedenen Kundenprojekten."
            }
            CompanyType::Consulting => {
                "Das Unternehmen ist ein Beratungsunternehmen mit vielfältigen Kundenprojekten."
            }
            CompanyType::Hospitality => "Das Unternehmen ist in der Hotellerie und Gastronomie tätig.",
            CompanyType::Retail => "Das Unternehmen ist im Einzelhandel tätig.",
            CompanyType::Unknown => return None,
        },
    };
    Some(line)
}

fn experience_line(job: &JobSpec) -> Option<String> {
    let min = job.min_years_experience?;
    let line = match (job.language, job.max_years_experience) {
        (Language::En, Some(max)) => format!("Target experience range is {min} to {max} years."),
        (Language::En, None) => format!("Target experience is at least {min} years."),
        (Language::De, Some(max)) => {
            format!("Die gewünschte Erfahrung liegt zwischen {min} und {max} Jahren.")
        }
        (Language::De, None) => {
            format!("Gesucht werden Personen mit mindestens {min} Jahren Berufserfahrung.")
        }
    };
    Some(line)
}

fn skills_line(job: &JobSpec) -> String {
    let skills: Vec<&str> = job.skills.iter().map(|s| s.name.as_str()).collect();
    match (job.language, skills.is_empty()) {
        (Language::En, false) => format!("Required core skills: {}.", skills.join(", ")),
        (Language::En, true) => "Infer reasonable skills for this job title and industry.".to_string(),
        (Language::De, false) => format!("Zentrale Skills: {}.", skills.join(", ")),
        (Language::De, true) => "Ergänze sinnvolle Skills passend zu Titel und Branche.".to_string(),
    }
}

fn benefits_line(job: &JobSpec) -> String {
    let keywords = job.benefit_keywords.join(", ");
    match (job.language, keywords.is_empty()) {
        (Language::En, false) => format!(
            "For benefits, use ONLY these benefit keywords: {keywords}. Expand each keyword \
             into one complete, grammatically correct sentence. Do NOT add other benefits."
        ),
        (Language::En, true) => {
            "No benefit keywords were provided. The benefits field must be an empty list.".to_string()
        }
        (Language::De, false) => format!(
            "Verwende für Benefits AUSSCHLIESSLICH diese Stichworte: {keywords}. Erweitere jedes \
             Stichwort zu einem vollständigen Satz. Füge KEINE weiteren Benefits hinzu."
        ),
        (Language::De, true) => {
            "Es wurden keine Benefit-Stichworte angegeben. Das Benefits-Feld muss leer sein.".to_string()
        }
    }
}

fn examples_section(examples: &[JobBody], language: Language) -> Option<String> {
    let rendered: Vec<String> = examples
        .iter()
        .take(MAX_GOLD_EXAMPLES)
        .filter_map(|e| serde_json::to_string_pretty(e).ok())
        .collect();
    if rendered.is_empty() {
        return None;
    }

    let (heading, label, note) = match language {
        Language::En => (
            "## Previous successful job descriptions (reference for style and structure)",
            "Example",
            "Use these as a guide for style, tone and structure. Adapt the content to the current job; do not copy.",
        ),
        Language::De => (
            "## Frühere erfolgreiche Stellenbeschreibungen (Referenz für Stil und Struktur)",
            "Beispiel",
            "Nutze sie als Leitfaden für Stil, Ton und Struktur. Passe den Inhalt an die aktuelle Stelle an; nicht kopieren.",
        ),
    };

    let mut out = format!("{heading}\n\n");
    for (i, example) in rendered.iter().enumerate() {
        out.push_str(&format!("{label} {}:\n{example}\n\n", i + 1));
    }
    out.push_str(note);
    Some(out)
}

fn output_contract(language: Language) -> &'static str {
    match language {
        Language::En => "Write the posting in English.\n\
            job_description: 2 to 4 sentences on role and context.\n\
            requirements: 6 to 10 bullets matching seniority and skills.\n\
            benefits: one sentence per benefit keyword above, nothing else.\n\
            duties: 5 to 8 bullets on day to day responsibilities.\n\
            summary: 1 short closing line inviting candidates to apply.",
        Language::De => "Schreibe die Stellenanzeige auf Deutsch.\n\
            job_description: 2 bis 4 Sätze zu Rolle und Kontext.\n\
            requirements: 6 bis 10 Stichpunkte passend zu Seniorität und Skills.\n\
            benefits: ein Satz pro Benefit-Stichwort oben, sonst nichts.\n\
            duties: 5 bis 8 Stichpunkte zu den täglichen Aufgaben.\n\
            summary: 1 kurzer Abschlusssatz, der zur Bewerbung einlädt.",
    }
}

/// Full user prompt for a generation call, or a refinement call when
/// `context.refinement` is set.
pub fn render_writer_prompt(context: &PromptContext) -> String {
    let job = &context.job;
    let language = job.language;
    let mut sections: Vec<String> = Vec::new();

    if let Some(brief) = &context.refinement {
        sections.push(refinement_header(brief, language));
    }

    let mut facts = vec![tone_line(job.signals.formality, language).to_string()];
    facts.extend(company_line(job.signals.company_type, language).map(str::to_string));
    facts.extend(experience_line(job));
    facts.push(skills_line(job));
    facts.push(benefits_line(job));
    sections.push(facts.join("\n"));

    sections.push(context.style_block.clone());

    if let Some(company) = context.company_context.as_deref().filter(|c| !c.trim().is_empty()) {
        let heading = match language {
            Language::En => "## Company context (keep the posting consistent with it)",
            Language::De => "## Unternehmenskontext (Anzeige daran ausrichten)",
        };
        sections.push(format!("{heading}\n{company}"));
    }

    sections.extend(examples_section(&context.gold_examples, language));

    let title_label = match language {
        Language::En => "Job title",
        Language::De => "Stellentitel",
    };
    sections.push(format!("{title_label}: {}", job.job_title));
    sections.push(output_contract(language).to_string());
    sections.push(format!("Return a JSON object with this schema:\n{JOB_BODY_SCHEMA}"));

    sections.join("\n\n")
}

fn refinement_header(brief: &RefinementBrief, language: Language) -> String {
    let previous = serde_json::to_string_pretty(&brief.previous).unwrap_or_default();
    let mut out = match language {
        Language::En => String::from(
            "You are refining an existing job description. Keep its structure and all \
             essential information, fix the issues below, and improve clarity.",
        ),
        Language::De => String::from(
            "Du überarbeitest eine bestehende Stellenbeschreibung. Behalte Struktur und alle \
             wesentlichen Informationen bei, behebe die unten genannten Probleme und verbessere die Klarheit.",
        ),
    };

    if !brief.feedback.is_empty() {
        out.push_str(match language {
            Language::En => "\n\nIMPORTANT - reviewer feedback to address:",
            Language::De => "\n\nWICHTIG - Feedback, das umgesetzt werden muss:",
        });
        for note in &brief.feedback {
            out.push_str(&format!("\n- {note}"));
        }
    }

    if let Some(score) = brief.score {
        out.push_str(&format!(
            "\n\nQuality score: {score:.2} (target: above {:.2})",
            brief.threshold
        ));
    }

    let label = match language {
        Language::En => "Current job description",
        Language::De => "Aktuelle Stellenbeschreibung",
    };
    out.push_str(&format!("\n\n{label}:\n{previous}"));
    out
}

/// Prompt asking the judge for one score per posting, in order.
pub fn render_judge_prompt(job_title: &str, artifacts: &[JobBody]) -> String {
    let mut out = format!(
        "Evaluate the quality of the following job descriptions for the job title \"{job_title}\".\n\
         Score each one independently between 0.0 (unusable) and 1.0 (ready to publish).\n\n"
    );
    for (i, artifact) in artifacts.iter().enumerate() {
        let json = serde_json::to_string_pretty(artifact).unwrap_or_default();
        out.push_str(&format!("### Posting {}\n{json}\n\n", i + 1));
    }
    out.push_str(&format!(
        "Return a JSON object {{\"scores\": [...]}} with exactly {} numbers in the order above.",
        artifacts.len()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::SkillItem;
    use crate::style::signals::SignalTuple;

    fn body(tag: &str) -> JobBody {
        JobBody {
            job_description: format!("{tag} description"),
            requirements: vec![],
            benefits: vec![],
            duties: vec![],
            summary: None,
        }
    }

    fn context(language: Language) -> PromptContext {
        PromptContext {
            candidate_index: 0,
            job: JobSpec {
                job_title: "Data Engineer".to_string(),
                language,
                signals: SignalTuple {
                    formality: Formality::Formal,
                    company_type: CompanyType::Corporate,
                    ..SignalTuple::default()
                },
                min_years_experience: Some(3),
                max_years_experience: None,
                skills: vec![SkillItem {
                    name: "Spark".to_string(),
                    category: None,
                    level: None,
                }],
                benefit_keywords: vec!["hybrides Arbeiten".to_string()],
            },
            style_block: "## Persuasion style".to_string(),
            company_context: Some("Acme builds rockets.".to_string()),
            gold_examples: vec![body("one"), body("two"), body("three")],
            refinement: None,
        }
    }

    #[test]
    fn test_generation_prompt_carries_all_sections() {
        let prompt = render_writer_prompt(&context(Language::En));
        assert!(prompt.contains("Use a formal corporate tone."));
        assert!(prompt.contains("larger established company"));
        assert!(prompt.contains("at least 3 years"));
        assert!(prompt.contains("Required core skills: Spark."));
        assert!(prompt.contains("hybrides Arbeiten"));
        assert!(prompt.contains("## Persuasion style"));
        assert!(prompt.contains("Acme builds rockets."));
        assert!(prompt.contains("Job title: Data Engineer"));
        assert!(!prompt.contains("You are refining"));
    }

    #[test]
    fn test_at_most_two_gold_examples_are_included() {
        let prompt = render_writer_prompt(&context(Language::En));
        assert!(prompt.contains("Example 2:"));
        assert!(!prompt.contains("Example 3:"));
        assert!(!prompt.contains("three description"));
    }

    #[test]
    fn test_refinement_prompt_lists_feedback_and_score() {
        let mut ctx = context(Language::De);
        ctx.refinement = Some(RefinementBrief {
            previous: body("old"),
            score: Some(0.42),
            threshold: 0.7,
            feedback: vec!["Weniger Floskeln".to_string()],
        });
        let prompt = render_writer_prompt(&ctx);
        assert!(prompt.starts_with("Du überarbeitest"));
        assert!(prompt.contains("- Weniger Floskeln"));
        assert!(prompt.contains("0.42"));
        assert!(prompt.contains("old description"));
        assert!(prompt.contains("Stellentitel: Data Engineer"));
    }

    #[test]
    fn test_judge_prompt_asks_for_one_score_per_posting() {
        let prompt = render_judge_prompt("Nurse", &[body("a"), body("b")]);
        assert!(prompt.contains("### Posting 2"));
        assert!(prompt.contains("exactly 2 numbers"));
    }
}
