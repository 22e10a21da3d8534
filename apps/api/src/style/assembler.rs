//! Style Assembler: turns a `StyleProfile` into a compact `StyleDirective`.
//!
//! Material comes from the chunk retriever, one query per (colour, dimension).
//! Each dimension is backfilled independently from the built-in tables when
//! retrieval yields fewer than `BACKFILL_THRESHOLD` items, so a directive is
//! always complete even with the retriever down.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{within, CollaboratorError};
use crate::style::defaults::default_kit;
use crate::style::retriever::{ChunkRetriever, StyleDimension};
use crate::style::router::StyleProfile;
use crate::style::scoring_table::Color;
use crate::style::signals::Language;

/// Retrieved dimensions with fewer items than this are backfilled from defaults.
pub const BACKFILL_THRESHOLD: usize = 3;
/// Adjectives a secondary colour may contribute.
pub const SECONDARY_ADJECTIVES: usize = 2;
/// Hooks a secondary colour may contribute.
pub const SECONDARY_HOOKS: usize = 1;

/// The assembled style kit handed to every generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDirective {
    pub do_and_dont: Vec<String>,
    pub adjectives: Vec<String>,
    pub hooks: Vec<String>,
    pub syntax_rules: Vec<String>,
    /// Resolved last; overrides everything above.
    pub hard_constraints: Vec<String>,
}

/// A directive plus what had to be patched to build it.
#[derive(Debug, Clone)]
pub struct AssembledStyle {
    pub directive: StyleDirective,
    pub backfilled: Vec<StyleDimension>,
    pub retrieval_failures: Vec<String>,
}

impl StyleDirective {
    /// Renders the directive as a prompt section. Hard constraints come last.
    pub fn to_prompt_block(&self, language: Language) -> String {
        let h = Headings::for_language(language);
        let mut out = String::new();

        out.push_str(h.title);
        out.push_str("\n\n");
        push_list(&mut out, h.do_and_dont, &self.do_and_dont);
        out.push_str(h.adjectives);
        out.push('\n');
        out.push_str(&self.adjectives.join(", "));
        out.push_str("\n\n");
        push_list(&mut out, h.hooks, &self.hooks);
        push_list(&mut out, h.syntax, &self.syntax_rules);
        if !self.hard_constraints.is_empty() {
            push_list(&mut out, h.constraints, &self.hard_constraints);
        }

        out.trim_end().to_string()
    }
}

struct Headings {
    title: &'static str,
    do_and_dont: &'static str,
    adjectives: &'static str,
    hooks: &'static str,
    syntax: &'static str,
    constraints: &'static str,
}

impl Headings {
    fn for_language(language: Language) -> Self {
        match language {
            Language::En => Headings {
                title: "## Persuasion style",
                do_and_dont: "### Do and don't",
                adjectives: "### Preferred adjectives",
                hooks: "### Hooks",
                syntax: "### Syntax",
                constraints: "### Hard constraints (override all of the above)",
            },
            Language::De => Headings {
                title: "## Überzeugungsstil",
                do_and_dont: "### Tun und Lassen",
                adjectives: "### Bevorzugte Adjektive",
                hooks: "### Aufhänger",
                syntax: "### Satzbau",
                constraints: "### Verbindliche Vorgaben (haben Vorrang vor allem oben)",
            },
        }
    }
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    out.push_str(heading);
    out.push('\n');
    for item in items {
        out.push_str("- ");
        out.push_str(item);
        out.push('\n');
    }
    out.push('\n');
}

// ────────────────────────────────────────────────────────────────────────────
// Assembly
// ────────────────────────────────────────────────────────────────────────────

/// Builds the directive for `profile`. Never fails: every retrieval error is
/// logged, recorded, and replaced by default material.
pub async fn assemble(
    profile: &StyleProfile,
    language: Language,
    retriever: &dyn ChunkRetriever,
    timeout: Duration,
) -> AssembledStyle {
    let primary = profile.primary;
    let fetch = |color, dimension| fetch_items(retriever, color, dimension, language, timeout);

    let (do_and_dont, adjectives, hooks, syntax, secondary) = tokio::join!(
        fetch(primary, StyleDimension::DoAndDont),
        fetch(primary, StyleDimension::Adjectives),
        fetch(primary, StyleDimension::Hooks),
        fetch(primary, StyleDimension::Syntax),
        async {
            match profile.secondary {
                Some(color) => Some((
                    color,
                    tokio::join!(
                        fetch(color, StyleDimension::Adjectives),
                        fetch(color, StyleDimension::Hooks)
                    ),
                )),
                None => None,
            }
        }
    );

    let mut backfilled = Vec::new();
    let mut retrieval_failures = Vec::new();
    let mut resolve = |dimension: StyleDimension, fetched: Fetched| {
        if let Some(failure) = fetched.failure {
            retrieval_failures.push(failure);
        }
        if fetched.items.len() < BACKFILL_THRESHOLD {
            backfilled.push(dimension);
        }
        complete_dimension(fetched.items, primary, dimension, language)
    };

    let do_and_dont = resolve(StyleDimension::DoAndDont, do_and_dont);
    let mut adjectives = resolve(StyleDimension::Adjectives, adjectives);
    let mut hooks = resolve(StyleDimension::Hooks, hooks);
    let syntax_rules = resolve(StyleDimension::Syntax, syntax);

    if let Some((color, (sec_adjectives, sec_hooks))) = secondary {
        for fetched in [&sec_adjectives, &sec_hooks] {
            if let Some(failure) = &fetched.failure {
                retrieval_failures.push(failure.clone());
            }
        }
        blend_secondary(
            &mut adjectives,
            sec_adjectives.items,
            color,
            StyleDimension::Adjectives,
            SECONDARY_ADJECTIVES,
            language,
        );
        blend_secondary(
            &mut hooks,
            sec_hooks.items,
            color,
            StyleDimension::Hooks,
            SECONDARY_HOOKS,
            language,
        );
    }

    if !backfilled.is_empty() {
        info!(
            "Style directive for {primary}: backfilled {:?} from defaults",
            backfilled
        );
    }

    let directive = StyleDirective {
        do_and_dont,
        adjectives,
        hooks,
        syntax_rules,
        hard_constraints: profile.constraints.clone(),
    };
    debug!(
        "Assembled directive: {} do/don't, {} adjectives, {} hooks, {} syntax, {} constraints",
        directive.do_and_dont.len(),
        directive.adjectives.len(),
        directive.hooks.len(),
        directive.syntax_rules.len(),
        directive.hard_constraints.len()
    );

    AssembledStyle {
        directive,
        backfilled,
        retrieval_failures,
    }
}

struct Fetched {
    items: Vec<String>,
    failure: Option<String>,
}

async fn fetch_items(
    retriever: &dyn ChunkRetriever,
    color: Color,
    dimension: StyleDimension,
    language: Language,
    timeout: Duration,
) -> Fetched {
    let result: Result<Vec<String>, CollaboratorError> =
        within("chunk retriever", timeout, retriever.query(color, dimension, language)).await;

    match result {
        Ok(chunks) => Fetched {
            items: normalize(chunks, dimension),
            failure: None,
        },
        Err(e) => {
            warn!("Style retrieval failed for {color}/{dimension}: {e}");
            Fetched {
                items: Vec::new(),
                failure: Some(format!("{color}/{dimension}: {e}")),
            }
        }
    }
}

/// Trims, drops blanks and duplicates. Adjective chunks may hold comma-separated lists.
fn normalize(chunks: Vec<String>, dimension: StyleDimension) -> Vec<String> {
    let pieces: Vec<String> = if dimension == StyleDimension::Adjectives {
        chunks
            .iter()
            .flat_map(|c| c.split(','))
            .map(str::to_string)
            .collect()
    } else {
        chunks
    };

    let mut out: Vec<String> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let piece = piece.trim();
        if !piece.is_empty() && !contains_ignore_case(&out, piece) {
            out.push(piece.to_string());
        }
    }
    out
}

fn contains_ignore_case(items: &[String], candidate: &str) -> bool {
    items.iter().any(|i| i.eq_ignore_ascii_case(candidate))
}

/// Pads a primary dimension with defaults up to `BACKFILL_THRESHOLD` (or its
/// minimum, if higher) and caps it at its maximum. Retrieved items keep
/// precedence over defaults.
fn complete_dimension(
    mut items: Vec<String>,
    color: Color,
    dimension: StyleDimension,
    language: Language,
) -> Vec<String> {
    let (min, max) = dimension.bounds();
    let target = min.max(BACKFILL_THRESHOLD).min(max);

    if items.len() < target {
        for default in default_kit(color, language).items(dimension) {
            if items.len() >= target {
                break;
            }
            if !contains_ignore_case(&items, default) {
                items.push((*default).to_string());
            }
        }
    }

    items.truncate(max);
    items
}

/// Adds at most `cap` secondary items, displacing trailing primary items if the
/// dimension is already at its maximum.
fn blend_secondary(
    target: &mut Vec<String>,
    retrieved: Vec<String>,
    color: Color,
    dimension: StyleDimension,
    cap: usize,
    language: Language,
) {
    let (_, max) = dimension.bounds();
    let defaults = default_kit(color, language)
        .items(dimension)
        .iter()
        .map(|d| (*d).to_string());

    let mut picked: Vec<String> = Vec::with_capacity(cap);
    for item in retrieved.into_iter().chain(defaults) {
        if picked.len() == cap {
            break;
        }
        if !contains_ignore_case(target, &item) && !contains_ignore_case(&picked, &item) {
            picked.push(item);
        }
    }

    target.truncate(max - picked.len());
    target.extend(picked);
}
