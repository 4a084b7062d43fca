use crate::models::{Place, PlaceCategory, RawPlaceRecord, RATING_UNAVAILABLE};

/// Ordered category table: the first entry whose tag key is present AND whose
/// tag value is in the allowed subtype set decides the primary category.
/// The same table drives the provider's query construction.
pub const PLACE_TYPE_TABLE: &[(PlaceCategory, &[&str])] = &[
    (
        PlaceCategory::Tourism,
        &["museum", "attraction", "viewpoint", "artwork", "gallery"],
    ),
    (
        PlaceCategory::Historic,
        &["monument", "castle", "ruins", "archaeological_site"],
    ),
    (
        PlaceCategory::Amenity,
        &["restaurant", "cafe", "bar", "museum", "theatre"],
    ),
    (PlaceCategory::Leisure, &["park", "garden"]),
];

/// Map raw tagged records to normalized places. Records without a usable
/// "name" tag are dropped: that is a quality filter, not an error. Duplicate
/// names and coincident coordinates pass through untouched.
pub fn normalize_records(records: &[RawPlaceRecord]) -> Vec<Place> {
    records.iter().filter_map(normalize_record).collect()
}

fn normalize_record(record: &RawPlaceRecord) -> Option<Place> {
    let name = record
        .tags
        .get("name")
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())?;

    let (category, subtype) = resolve_category(record);

    Some(Place {
        name: name.to_string(),
        category,
        subtype,
        lat: record.lat,
        lon: record.lon,
        distance_meters: None,
        description: tag_or_empty(record, "description"),
        website: tag_or_empty(record, "website"),
        phone: tag_or_empty(record, "phone"),
        address: tag_or_empty(record, "addr:street"),
        opening_hours: tag_or_empty(record, "opening_hours"),
        rating: record
            .tags
            .get("rating")
            .cloned()
            .unwrap_or_else(|| RATING_UNAVAILABLE.to_string()),
    })
}

fn resolve_category(record: &RawPlaceRecord) -> (PlaceCategory, Option<String>) {
    for (category, subtypes) in PLACE_TYPE_TABLE {
        if let Some(value) = record.tags.get(category.label()) {
            if subtypes.contains(&value.as_str()) {
                return (*category, Some(value.clone()));
            }
        }
    }

    (PlaceCategory::Other, None)
}

fn tag_or_empty(record: &RawPlaceRecord, key: &str) -> String {
    record.tags.get(key).cloned().unwrap_or_default()
}
