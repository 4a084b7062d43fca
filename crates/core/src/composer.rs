use std::collections::BTreeMap;

use crate::models::{IntentCategory, Place, SessionState};

const MAX_PLACES_CATEGORY: usize = 5;
const MAX_PLACES_GENERAL: usize = 8;
const MAX_SUMMARY_HIGHLIGHTS: usize = 3;

const FOOD_SUBTYPES: &[&str] = &["restaurant", "cafe", "bar"];
const CULTURE_SUBTYPES: &[&str] = &["museum", "historic", "theatre"];
const NATURE_SUBTYPES: &[&str] = &["park", "garden"];

pub fn greeting_reply() -> &'static str {
    "¡Hola! Soy tu guía de lugares. Dime una ciudad o pregúntame, por ejemplo, 'museos en Roma' o 'donde comer en Madrid'."
}

pub fn bot_description_reply() -> &'static str {
    "Soy un asistente que busca lugares de interés: museos, restaurantes, parques y más. Dime qué ciudad te interesa y te cuento qué hay."
}

pub fn no_location_reply() -> &'static str {
    "No he podido identificar el lugar del que me hablas. ¿Podrías decirme específicamente qué ciudad o lugar te interesa?"
}

pub fn location_not_found_reply(phrase: &str) -> String {
    format!("No pude encontrar la ubicación de '{phrase}'. ¿Podrías ser más específico?")
}

pub fn lookup_trouble_reply() -> &'static str {
    "Lo siento, tuve un problema buscando ese lugar. ¿Podrías intentarlo de nuevo?"
}

pub fn no_places_for_location_reply(phrase: &str) -> String {
    format!("No encontré lugares de interés en {phrase}. ¿Quizás podrías probar con una zona más céntrica o turística?")
}

/// Render the place list for one intent. An empty session wins over the
/// per-category empty sentence.
pub fn compose_places_reply(
    intent: IntentCategory,
    location_label: &str,
    places: &[Place],
) -> String {
    if places.is_empty() {
        return "Todavía no tengo lugares guardados para esta ubicación. Dime una ciudad y empiezo a buscar.".to_string();
    }

    match intent {
        IntentCategory::Food => {
            let selected = by_subtype(places, FOOD_SUBTYPES, MAX_PLACES_CATEGORY);
            if selected.is_empty() {
                return "No encontré restaurantes en esta ubicación.".to_string();
            }
            render_section(
                format!("🍽️ Restaurantes y cafés en {location_label}:"),
                &selected,
                |place| {
                    vec![
                        optional_field("Tipo", place.subtype.as_deref().unwrap_or("")),
                        optional_field("⭐", &place.rating),
                        optional_field("Horario", &place.opening_hours),
                        optional_field("Web", &place.website),
                    ]
                },
            )
        }
        IntentCategory::Culture => {
            let selected = by_subtype(places, CULTURE_SUBTYPES, MAX_PLACES_CATEGORY);
            if selected.is_empty() {
                return "No encontré lugares culturales en esta ubicación.".to_string();
            }
            render_section(
                format!("🏛️ Lugares culturales en {location_label}:"),
                &selected,
                cultural_fields,
            )
        }
        IntentCategory::Nature => {
            let selected = by_subtype(places, NATURE_SUBTYPES, MAX_PLACES_CATEGORY);
            if selected.is_empty() {
                return "No encontré parques en esta ubicación.".to_string();
            }
            render_section(
                format!("🌳 Parques y jardines en {location_label}:"),
                &selected,
                cultural_fields,
            )
        }
        IntentCategory::General => {
            let selected: Vec<&Place> = places.iter().take(MAX_PLACES_GENERAL).collect();
            if selected.is_empty() {
                return "No encontré lugares de interés en esta ubicación.".to_string();
            }
            render_section(
                format!("📍 Lugares de interés en {location_label}:"),
                &selected,
                |place| {
                    let mut fields = cultural_fields(place);
                    fields.push(optional_field("Web", &place.website));
                    fields
                },
            )
        }
    }
}

/// Count places per category (alphabetical by label) and highlight the first
/// few, mirroring what the chat surface shows after a resolution.
pub fn summarize(state: &SessionState) -> String {
    if state.current_places.is_empty() {
        return "No hay lugares almacenados para la ubicación actual.".to_string();
    }

    let location_label = state
        .current_location
        .map(|(lat, lon)| format!("({lat:.4}, {lon:.4})"))
        .unwrap_or_else(|| "la ubicación actual".to_string());

    // BTreeMap keeps the category labels alphabetical.
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for place in &state.current_places {
        *counts.entry(place.category.label()).or_default() += 1;
    }

    let mut lines = vec![
        format!("📊 Resumen de lugares en {location_label}:"),
        format!("📍 Total de lugares: {}", state.current_places.len()),
        "🏷️ Lugares por categoría:".to_string(),
    ];
    for (label, count) in &counts {
        lines.push(format!("  • {label}: {count} lugares"));
    }

    lines.push("✨ Algunos lugares destacados:".to_string());
    for place in state.current_places.iter().take(MAX_SUMMARY_HIGHLIGHTS) {
        lines.push(format!("  • {}", place.name));
        if let Some(subtype) = &place.subtype {
            lines.push(format!("    Tipo: {subtype}"));
        }
        if !place.opening_hours.is_empty() {
            lines.push(format!("    Horario: {}", place.opening_hours));
        }
    }

    lines.join("\n")
}

fn by_subtype<'a>(places: &'a [Place], subtypes: &[&str], cap: usize) -> Vec<&'a Place> {
    places
        .iter()
        .filter(|place| {
            place
                .subtype
                .as_deref()
                .is_some_and(|subtype| subtypes.contains(&subtype))
        })
        .take(cap)
        .collect()
}

fn render_section<F>(header: String, places: &[&Place], fields: F) -> String
where
    F: Fn(&Place) -> Vec<String>,
{
    let mut sections = vec![header];
    for place in places.iter().copied() {
        let mut parts = vec![format!("• {}", place.name)];
        parts.extend(fields(place).into_iter().filter(|part| !part.is_empty()));
        sections.push(parts.join(" | "));
    }
    sections.join("\n\n")
}

fn cultural_fields(place: &Place) -> Vec<String> {
    vec![
        optional_field("Tipo", place.subtype.as_deref().unwrap_or("")),
        optional_field("⭐", &place.rating),
        optional_field("", &place.description),
    ]
}

fn optional_field(label: &str, value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else if label.is_empty() {
        value.to_string()
    } else {
        format!("{label}: {value}")
    }
}
