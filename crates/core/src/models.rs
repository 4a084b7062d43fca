use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Sentinel stored in `Place::rating` when the provider carries no rating tag.
pub const RATING_UNAVAILABLE: &str = "not available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceCategory {
    Tourism,
    Historic,
    Amenity,
    Leisure,
    Other,
}

impl PlaceCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Tourism => "tourism",
            Self::Historic => "historic",
            Self::Amenity => "amenity",
            Self::Leisure => "leisure",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    General,
    Food,
    Culture,
    Nature,
}

/// A normalized point of interest. `distance_meters` stays empty until the
/// place has been filtered against a reference point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub category: PlaceCategory,
    pub subtype: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub distance_meters: Option<f64>,
    pub description: String,
    pub website: String,
    pub phone: String,
    pub address: String,
    pub opening_hours: String,
    pub rating: String,
}

impl Place {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            category: PlaceCategory::Other,
            subtype: None,
            lat,
            lon,
            distance_meters: None,
            description: String::new(),
            website: String::new(),
            phone: String::new(),
            address: String::new(),
            opening_hours: String::new(),
            rating: RATING_UNAVAILABLE.to_string(),
        }
    }
}

/// Raw tagged element as returned by the place provider, before
/// normalization. Tag keys and values are free-form strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlaceRecord {
    pub lat: f64,
    pub lon: f64,
    pub tags: HashMap<String, String>,
}

/// Outcome of interpreting one free-text message. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationQuery {
    pub raw_text: String,
    pub matched_pattern: Option<String>,
    pub location_phrase: Option<String>,
    pub intent: IntentCategory,
}

/// A geocoded point with the provider's display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodedLocation {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

/// Session snapshot: the single current location and its place set. Replaced
/// wholesale on every successful resolution, never merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub current_location: Option<(f64, f64)>,
    pub current_places: Vec<Place>,
}

/// Structured reply for one chat message: the rendered text plus enough
/// context for API clients to act on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply_text: String,
    pub intent: IntentCategory,
    pub matched_pattern: Option<String>,
    pub location_phrase: Option<String>,
    pub resolved_location: Option<GeocodedLocation>,
    pub place_count: usize,
}

impl ChatReply {
    pub fn canned(reply_text: impl Into<String>) -> Self {
        Self {
            reply_text: reply_text.into(),
            intent: IntentCategory::General,
            matched_pattern: None,
            location_phrase: None,
            resolved_location: None,
            place_count: 0,
        }
    }
}
