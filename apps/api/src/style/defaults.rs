//! Built-in style material per colour and language.
//!
//! Used whenever chunk retrieval comes back short or fails. Each table on its own
//! satisfies the directive minimums (6 do/don't, 10 adjectives, 3 hooks, 2 syntax).

use crate::style::retriever::StyleDimension;
use crate::style::scoring_table::Color;
use crate::style::signals::Language;

#[derive(Debug)]
pub struct DefaultKit {
    pub do_and_dont: &'static [&'static str],
    pub adjectives: &'static [&'static str],
    pub hooks: &'static [&'static str],
    pub syntax: &'static [&'static str],
}

impl DefaultKit {
    pub fn items(&self, dimension: StyleDimension) -> &'static [&'static str] {
        match dimension {
            StyleDimension::DoAndDont => self.do_and_dont,
            StyleDimension::Adjectives => self.adjectives,
            StyleDimension::Hooks => self.hooks,
            StyleDimension::Syntax => self.syntax,
        }
    }
}

pub fn default_kit(color: Color, language: Language) -> &'static DefaultKit {
    match (language, color) {
        (Language::En, Color::Red) => &EN_RED,
        (Language::En, Color::Yellow) => &EN_YELLOW,
        (Language::En, Color::Green) => &EN_GREEN,
        (Language::En, Color::Blue) => &EN_BLUE,
        (Language::De, Color::Red) => &DE_RED,
        (Language::De, Color::Yellow) => &DE_YELLOW,
        (Language::De, Color::Green) => &DE_GREEN,
        (Language::De, Color::Blue) => &DE_BLUE,
    }
}

static EN_RED: DefaultKit = DefaultKit {
    do_and_dont: &[
        "DO: Use direct, action-oriented language",
        "DO: Highlight impact, results, and growth potential",
        "DO: Emphasize speed, autonomy, and decision-making power",
        "DO: Show career acceleration and status markers",
        "DON'T: Use passive voice or hedging language",
        "DON'T: Overload with process descriptions or committee talk",
    ],
    adjectives: &[
        "ambitious",
        "driven",
        "high-impact",
        "strategic",
        "results-oriented",
        "decisive",
        "competitive",
        "dynamic",
        "performance-focused",
        "autonomous",
    ],
    hooks: &[
        "Lead. Build. Deliver.",
        "Ready to make an impact?",
        "Your next career move starts here.",
    ],
    syntax: &[
        "Short declarative sentences: subject, verb, object",
        "Active voice throughout",
        "Imperative allowed for calls to action",
        "Avoid subordinate clauses and qualifiers",
    ],
};

static EN_YELLOW: DefaultKit = DefaultKit {
    do_and_dont: &[
        "DO: Emphasize creativity, freedom, and team spirit",
        "DO: Use energetic, approachable language",
        "DO: Highlight variety, innovation, and personal growth",
        "DO: Show the fun side of the work environment",
        "DON'T: Be overly formal or bureaucratic",
        "DON'T: Use rigid or controlling language",
    ],
    adjectives: &[
        "creative",
        "flexible",
        "collaborative",
        "innovative",
        "dynamic",
        "inspiring",
        "open-minded",
        "energetic",
        "versatile",
        "enthusiastic",
    ],
    hooks: &[
        "Shape the future with us!",
        "Your creativity. Our platform.",
        "Where ideas come to life.",
    ],
    syntax: &[
        "Conversational tone, varied sentence length",
        "Questions and exclamations are welcome",
        "First and second person address ('you', 'we')",
        "Mix short punchy lines with flowing descriptions",
    ],
};

static EN_GREEN: DefaultKit = DefaultKit {
    do_and_dont: &[
        "DO: Emphasize team, belonging, and work-life balance",
        "DO: Use warm, inclusive language",
        "DO: Highlight stability, trust, and mutual support",
        "DO: Show care for employee wellbeing",
        "DON'T: Use aggressive or competitive framing",
        "DON'T: Over-promise or use hype",
    ],
    adjectives: &[
        "supportive",
        "reliable",
        "inclusive",
        "caring",
        "balanced",
        "trustworthy",
        "collaborative",
        "stable",
        "harmonious",
        "community-oriented",
    ],
    hooks: &[
        "Become part of our team.",
        "A place where you belong.",
        "Growing together, at your pace.",
    ],
    syntax: &[
        "Longer, connecting sentences with smooth flow",
        "Conditional and inclusive phrasing ('together', 'we support')",
        "Avoid pressure language or ultimatums",
        "Warm closings that invite rather than demand",
    ],
};

static EN_BLUE: DefaultKit = DefaultKit {
    do_and_dont: &[
        "DO: Use facts, specifics, and evidence",
        "DO: Emphasize quality, structure, and expertise",
        "DO: Back claims with numbers or concrete examples",
        "DO: Show methodological rigor and clear processes",
        "DON'T: Use vague superlatives without backing",
        "DON'T: Use emotional manipulation or pressure",
    ],
    adjectives: &[
        "analytical",
        "structured",
        "expert",
        "precise",
        "thorough",
        "systematic",
        "methodical",
        "evidence-based",
        "quality-driven",
        "detail-oriented",
    ],
    hooks: &[
        "Excellence through expertise.",
        "Built on quality. Driven by data.",
        "Precision matters, and so do you.",
    ],
    syntax: &[
        "Clear topic sentences followed by evidence",
        "Precise, factual language without filler words",
        "Numbered or structured lists where appropriate",
        "Professional but not cold: factual warmth",
    ],
};

static DE_RED: DefaultKit = DefaultKit {
    do_and_dont: &[
        "TUN: Direkte, handlungsorientierte Sprache verwenden",
        "TUN: Wirkung, Ergebnisse und Wachstumspotenzial hervorheben",
        "TUN: Geschwindigkeit, Autonomie und Entscheidungskraft betonen",
        "TUN: Karrieresprünge und Gestaltungsspielraum zeigen",
        "NICHT: Passive Formulierungen oder abschwächende Sprache",
        "NICHT: Prozessbeschreibungen oder Gremien-Sprache überladen",
    ],
    adjectives: &[
        "ambitioniert",
        "leistungsstark",
        "zielstrebig",
        "ergebnisorientiert",
        "strategisch",
        "entschlossen",
        "wettbewerbsfähig",
        "dynamisch",
        "eigenverantwortlich",
        "durchsetzungsstark",
    ],
    hooks: &[
        "Gestalten Sie Ihre Karriere mit echtem Einfluss.",
        "Bereit für den nächsten Schritt?",
        "Führen. Umsetzen. Bewegen.",
    ],
    syntax: &[
        "Kurze, direkte Sätze: Subjekt, Verb, Objekt",
        "Durchgehend aktive Formulierungen",
        "Imperativ für Handlungsaufforderungen erlaubt",
    ],
};

static DE_YELLOW: DefaultKit = DefaultKit {
    do_and_dont: &[
        "TUN: Kreativität, Freiheit und Teamgeist betonen",
        "TUN: Energische, nahbare Sprache verwenden",
        "TUN: Vielfalt, Innovation und persönliches Wachstum zeigen",
        "TUN: Die lockere Seite des Arbeitsumfelds zeigen",
        "NICHT: Zu formell oder bürokratisch formulieren",
        "NICHT: Starre oder kontrollierende Sprache verwenden",
    ],
    adjectives: &[
        "kreativ",
        "flexibel",
        "innovativ",
        "inspirierend",
        "offen",
        "vielseitig",
        "begeisternd",
        "dynamisch",
        "teamorientiert",
        "energiegeladen",
    ],
    hooks: &[
        "Gestalte die Zukunft mit uns!",
        "Deine Kreativität. Unsere Plattform.",
        "Wo Ideen lebendig werden.",
    ],
    syntax: &[
        "Lockerer Ton, abwechslungsreiche Satzlänge",
        "Fragen und Ausrufe willkommen",
        "Direkte Ansprache ('du', 'wir')",
    ],
};

static DE_GREEN: DefaultKit = DefaultKit {
    do_and_dont: &[
        "TUN: Team, Zugehörigkeit und Work-Life-Balance betonen",
        "TUN: Warme, inklusive Sprache verwenden",
        "TUN: Stabilität, Vertrauen und gegenseitige Unterstützung zeigen",
        "TUN: Fürsorge für das Wohlbefinden der Mitarbeitenden zeigen",
        "NICHT: Aggressive oder wettbewerbsorientierte Formulierungen",
        "NICHT: Übertreiben oder Hype verwenden",
    ],
    adjectives: &[
        "unterstützend",
        "verlässlich",
        "inklusiv",
        "fürsorglich",
        "ausgewogen",
        "vertrauenswürdig",
        "harmonisch",
        "stabil",
        "wertschätzend",
        "gemeinschaftlich",
    ],
    hooks: &[
        "Werden Sie Teil unseres Teams.",
        "Ein Ort, an dem Sie dazugehören.",
        "Gemeinsam wachsen, in Ihrem Tempo.",
    ],
    syntax: &[
        "Längere, verbindende Sätze mit sanftem Fluss",
        "Konditionale und inklusive Formulierungen ('gemeinsam', 'wir unterstützen')",
        "Keine Druck-Sprache oder Ultimaten",
    ],
};

static DE_BLUE: DefaultKit = DefaultKit {
    do_and_dont: &[
        "TUN: Fakten, Konkretisierungen und Belege verwenden",
        "TUN: Qualität, Struktur und Expertise betonen",
        "TUN: Aussagen mit Zahlen oder konkreten Beispielen untermauern",
        "TUN: Methodische Sorgfalt und klare Prozesse zeigen",
        "NICHT: Unspezifische Superlative ohne Beleg verwenden",
        "NICHT: Emotionale Manipulation oder Drucksprache",
    ],
    adjectives: &[
        "analytisch",
        "strukturiert",
        "fachkundig",
        "präzise",
        "gründlich",
        "systematisch",
        "methodisch",
        "qualitätsorientiert",
        "sorgfältig",
        "faktenbasiert",
    ],
    hooks: &[
        "Exzellenz durch Expertise.",
        "Aufgebaut auf Qualität. Angetrieben durch Daten.",
        "Präzision zählt, und Sie auch.",
    ],
    syntax: &[
        "Klare Leitsätze gefolgt von Belegen",
        "Präzise, faktische Sprache ohne Füllwörter",
        "Nummerierte oder strukturierte Listen wo sinnvoll",
    ],
};
