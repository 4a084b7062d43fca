mod nominatim;
mod overpass;

use std::time::Duration;

use callejero_core::{GeocodedLocation, RawPlaceRecord};
use thiserror::Error;

pub use nominatim::NominatimClient;
pub use overpass::OverpassClient;

pub const DEFAULT_NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_OVERPASS_BASE_URL: &str = "https://overpass-api.de";
pub const DEFAULT_USER_AGENT: &str = "callejero/0.1";
pub const DEFAULT_GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PLACES_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("no match found for the requested place")]
    NotFound,
    #[error("geocoding timed out")]
    TimedOut,
    #[error("geocoding provider unavailable: {0}")]
    Upstream(String),
}

#[derive(Debug, Error)]
pub enum PlaceSourceError {
    #[error("place lookup timed out")]
    TimedOut,
    #[error("place provider returned status {0}")]
    Status(u16),
    #[error("place provider unreachable: {0}")]
    Transport(String),
}

/// Resolves a free-text place name to coordinates. The deadline is supplied
/// per call so interactive surfaces can keep it short.
pub trait Geocoder: Send + Sync {
    async fn geocode(
        &self,
        query: &str,
        deadline: Duration,
    ) -> Result<GeocodedLocation, GeocodeError>;
}

/// Returns raw tagged map records around a point.
pub trait PlaceSource: Send + Sync {
    async fn find_places(
        &self,
        lat: f64,
        lon: f64,
        radius_meters: u32,
    ) -> Result<Vec<RawPlaceRecord>, PlaceSourceError>;
}
