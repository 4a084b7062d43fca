use crate::models::{IntentCategory, LocationQuery};

/// Trigger phrases per intent, in declaration order. Order is load-bearing:
/// overlapping phrases ("en" vs "museos en") are disambiguated purely by
/// which entry is reached first.
const PATTERN_TABLE: &[(IntentCategory, &[&str])] = &[
    (
        IntentCategory::General,
        &[
            "que hay en",
            "que puedo ver en",
            "que visitar en",
            "lugares para ver en",
            "que hacer en",
            "que me recomiendas en",
            "lugares de interés en",
            "sitios para visitar en",
            "atracciones en",
            "puntos de interés en",
        ],
    ),
    (
        IntentCategory::Food,
        &[
            "donde comer en",
            "restaurantes en",
            "lugares para comer en",
            "sitios para cenar en",
            "cafeterías en",
            "bares en",
            "donde cenar en",
            "comida en",
            "gastronomía de",
        ],
    ),
    (
        IntentCategory::Culture,
        &[
            "museos en",
            "lugares históricos en",
            "sitios culturales en",
            "monumentos en",
            "arte en",
            "historia de",
            "teatros en",
            "arquitectura de",
            "patrimonio de",
        ],
    ),
    (
        IntentCategory::Nature,
        &[
            "parques en",
            "jardines en",
            "espacios verdes en",
            "naturaleza en",
            "aire libre en",
            "zonas verdes de",
        ],
    ),
];

const GREETINGS: &[&str] = &[
    "hola",
    "buenos días",
    "buenas tardes",
    "buenas noches",
    "hey",
    "saludos",
    "que tal",
    "como estás",
];

const BOT_QUESTIONS: &[&str] = &[
    "quien eres",
    "que eres",
    "como funcionas",
    "que haces",
    "como puedes ayudar",
    "que me puedes decir",
];

// The two multi-word entries can never equal a single whitespace token; they
// are kept to preserve the published preposition set as-is.
const PREPOSITIONS: &[&str] = &["en", "de", "sobre", "cerca de", "alrededor de"];

/// What a single incoming message turned out to be.
#[derive(Debug, Clone)]
pub enum MessageKind {
    Greeting,
    BotQuestion,
    Query(LocationQuery),
}

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Classify one message. Greeting and bot-meta checks run on the lowercased
/// text and short-circuit; everything else goes through the location parser.
pub fn interpret(text: &str) -> MessageKind {
    let original = normalize_text(text);
    let lowered = original.to_lowercase();

    if is_greeting(&lowered) {
        return MessageKind::Greeting;
    }

    if is_bot_question(&lowered) {
        return MessageKind::BotQuestion;
    }

    MessageKind::Query(parse_location_query(&original, &lowered))
}

/// A message is "only a greeting" when it is at most three tokens and one of
/// the fixed greeting phrases appears in it.
pub fn is_greeting(lowered: &str) -> bool {
    lowered.split_whitespace().count() <= 3 && contains_any(lowered, GREETINGS)
}

/// A message is "only about the bot" when a bot phrase appears and the
/// message is at most two tokens longer than that phrase.
pub fn is_bot_question(lowered: &str) -> bool {
    let token_count = lowered.split_whitespace().count();
    BOT_QUESTIONS.iter().any(|question| {
        lowered.contains(question)
            && token_count <= question.split_whitespace().count() + 2
    })
}

/// Extract a location phrase and intent from a message.
///
/// Three stages, first hit wins: the pattern table, then a bare-preposition
/// scan, then a capitalized-token scan. The last stage deliberately reads the
/// ORIGINAL text: it exists to catch proper nouns, which the lowercased form
/// has destroyed. Any capitalized common word triggers it too.
pub fn parse_location_query(original: &str, lowered: &str) -> LocationQuery {
    for (intent, phrases) in PATTERN_TABLE {
        for phrase in *phrases {
            let Some(idx) = lowered.rfind(phrase) else {
                continue;
            };
            let tail_start = idx + phrase.len();
            // Slice the original to keep the location's casing; fall back to
            // the lowered form if case-folding shifted byte offsets.
            let tail = original
                .get(tail_start..)
                .filter(|_| original.len() == lowered.len())
                .unwrap_or(&lowered[tail_start..])
                .trim();

            return LocationQuery {
                raw_text: original.to_string(),
                matched_pattern: Some((*phrase).to_string()),
                location_phrase: (!tail.is_empty()).then(|| tail.to_string()),
                intent: *intent,
            };
        }
    }

    let tokens: Vec<&str> = original.split_whitespace().collect();

    for (idx, token) in tokens.iter().enumerate() {
        let is_preposition = PREPOSITIONS
            .iter()
            .any(|preposition| token.to_lowercase() == *preposition);
        if is_preposition && idx + 1 < tokens.len() {
            return LocationQuery {
                raw_text: original.to_string(),
                matched_pattern: None,
                location_phrase: Some(tokens[idx + 1..].join(" ")),
                intent: IntentCategory::General,
            };
        }
    }

    for (idx, token) in tokens.iter().enumerate() {
        let starts_uppercase = token
            .chars()
            .next()
            .is_some_and(char::is_uppercase);
        if starts_uppercase {
            return LocationQuery {
                raw_text: original.to_string(),
                matched_pattern: None,
                location_phrase: Some(tokens[idx..].join(" ")),
                intent: IntentCategory::General,
            };
        }
    }

    LocationQuery {
        raw_text: original.to_string(),
        matched_pattern: None,
        location_phrase: None,
        intent: IntentCategory::General,
    }
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
