use std::time::Duration;

use anyhow::{Context, Result};
use callejero_core::GeocodedLocation;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{GeocodeError, Geocoder};

/// Nominatim-style geocoding client. Only the best match is requested; the
/// provider returns coordinates as strings.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    display_name: String,
}

impl NominatimClient {
    /// Nominatim's usage policy requires an identifying User-Agent.
    pub fn new(base_url: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(6))
            .timeout(timeout)
            .build()
            .context("failed to build geocoding HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl Geocoder for NominatimClient {
    #[instrument(skip(self))]
    async fn geocode(
        &self,
        query: &str,
        deadline: Duration,
    ) -> Result<GeocodedLocation, GeocodeError> {
        let fetch = async {
            let response = self
                .client
                .get(format!("{}/search", self.base_url))
                .query(&[("q", query), ("format", "json"), ("limit", "1")])
                .send()
                .await
                .map_err(|error| {
                    if error.is_timeout() {
                        GeocodeError::TimedOut
                    } else {
                        GeocodeError::Upstream(error.to_string())
                    }
                })?;

            let status = response.status();
            if !status.is_success() {
                warn!(status = status.as_u16(), "geocoding request rejected");
                return Err(GeocodeError::Upstream(format!("status {status}")));
            }

            response
                .json::<Vec<SearchResult>>()
                .await
                .map_err(|error| GeocodeError::Upstream(error.to_string()))
        };

        let results = tokio::time::timeout(deadline, fetch)
            .await
            .map_err(|_| GeocodeError::TimedOut)??;

        let hit = results.into_iter().next().ok_or(GeocodeError::NotFound)?;

        let lat = hit
            .lat
            .parse::<f64>()
            .map_err(|_| GeocodeError::Upstream(format!("bad latitude '{}'", hit.lat)))?;
        let lon = hit
            .lon
            .parse::<f64>()
            .map_err(|_| GeocodeError::Upstream(format!("bad longitude '{}'", hit.lon)))?;

        debug!(lat, lon, display_name = %hit.display_name, "geocoded");

        Ok(GeocodedLocation {
            lat,
            lon,
            display_name: hit.display_name,
        })
    }
}
