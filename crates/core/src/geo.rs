use std::cmp::Ordering;
use std::f64::consts::PI;

use crate::models::Place;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine distance between two lat/lon points, in meters. NaN or
/// out-of-range coordinates propagate; callers validate their inputs.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let to_rad = |deg: f64| deg * PI / 180.0;

    let dlat = to_rad(lat2 - lat1);
    let dlon = to_rad(lon2 - lon1);

    let a = (dlat / 2.0).sin().powi(2)
        + to_rad(lat1).cos() * to_rad(lat2).cos() * (dlon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_METERS * c
}

/// Keep places within `radius_meters` of `origin` (inclusive), attach the
/// computed distance, and sort ascending. The sort is stable so equal
/// distances keep their input order.
pub fn filter_and_sort(
    origin: (f64, f64),
    radius_meters: f64,
    places: &[Place],
) -> Vec<Place> {
    let mut nearby: Vec<Place> = places
        .iter()
        .filter_map(|place| {
            let distance = distance_meters(origin.0, origin.1, place.lat, place.lon);
            (distance <= radius_meters).then(|| {
                let mut place = place.clone();
                place.distance_meters = Some(distance);
                place
            })
        })
        .collect();

    nearby.sort_by(|a, b| {
        a.distance_meters
            .partial_cmp(&b.distance_meters)
            .unwrap_or(Ordering::Equal)
    });

    nearby
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance_meters(40.4168, -3.7038, 40.4168, -3.7038), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let forward = distance_meters(41.9028, 12.4964, 48.8566, 2.3522);
        let backward = distance_meters(48.8566, 2.3522, 41.9028, 12.4964);
        assert!((forward - backward).abs() < 1e-6);
    }

    #[test]
    fn madrid_to_barcelona_is_roughly_right() {
        let d = distance_meters(40.4168, -3.7038, 41.3874, 2.1686);
        assert!(d > 480_000.0 && d < 530_000.0, "got {d}m");
    }

    fn place_at(name: &str, lat: f64, lon: f64) -> Place {
        Place::new(name, lat, lon)
    }

    #[test]
    fn filter_keeps_only_places_within_radius() {
        let places = vec![
            place_at("lejos", 41.0, -3.7),
            place_at("cerca", 40.4178, -3.7038),
        ];
        let nearby = filter_and_sort((40.4168, -3.7038), 2_000.0, &places);

        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].name, "cerca");
        assert!(nearby[0].distance_meters.unwrap() <= 2_000.0);
    }

    #[test]
    fn results_are_sorted_ascending_by_distance() {
        let places = vec![
            place_at("b", 40.4268, -3.7038),
            place_at("a", 40.4178, -3.7038),
            place_at("c", 40.4368, -3.7038),
        ];
        let nearby = filter_and_sort((40.4168, -3.7038), 10_000.0, &places);

        let distances: Vec<f64> = nearby
            .iter()
            .map(|p| p.distance_meters.unwrap())
            .collect();
        assert_eq!(nearby.len(), 3);
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(nearby[0].name, "a");
    }

    #[test]
    fn ties_preserve_input_order() {
        let places = vec![
            place_at("primero", 40.4178, -3.7038),
            place_at("segundo", 40.4178, -3.7038),
        ];
        let nearby = filter_and_sort((40.4168, -3.7038), 2_000.0, &places);

        assert_eq!(nearby[0].name, "primero");
        assert_eq!(nearby[1].name, "segundo");
    }

    #[test]
    fn output_is_subset_of_input() {
        let places = vec![
            place_at("a", 40.4178, -3.7038),
            place_at("b", 44.0, -3.7),
        ];
        let nearby = filter_and_sort((40.4168, -3.7038), 2_000.0, &places);
        assert!(nearby.len() <= places.len());
        assert!(nearby.iter().all(|p| p.distance_meters.is_some()));
    }
}
