use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use callejero_core::{RawPlaceRecord, PLACE_TYPE_TABLE};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{PlaceSource, PlaceSourceError};

/// Overpass API client. One query covers all categories of the type table,
/// nodes only, so every element carries its own coordinates.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct InterpreterResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl OverpassClient {
    pub fn new(base_url: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(6))
            .timeout(timeout)
            .build()
            .context("failed to build place provider HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn build_query(&self, lat: f64, lon: f64, radius_meters: u32) -> String {
        let clauses = PLACE_TYPE_TABLE
            .iter()
            .map(|(category, subtypes)| {
                format!(
                    "node[\"{}\"~\"{}\"](around:{radius_meters},{lat},{lon});",
                    category.label(),
                    subtypes.join("|")
                )
            })
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            "[out:json][timeout:{}]; ({clauses}); out body;",
            self.timeout.as_secs()
        )
    }
}

impl PlaceSource for OverpassClient {
    #[instrument(skip(self))]
    async fn find_places(
        &self,
        lat: f64,
        lon: f64,
        radius_meters: u32,
    ) -> Result<Vec<RawPlaceRecord>, PlaceSourceError> {
        let query = self.build_query(lat, lon, radius_meters);
        debug!(%query, "overpass request");

        let response = self
            .client
            .get(format!("{}/api/interpreter", self.base_url))
            .query(&[("data", query.as_str())])
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    PlaceSourceError::TimedOut
                } else {
                    PlaceSourceError::Transport(error.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "overpass request rejected");
            return Err(PlaceSourceError::Status(status.as_u16()));
        }

        let payload: InterpreterResponse = response.json().await.map_err(|error| {
            if error.is_timeout() {
                PlaceSourceError::TimedOut
            } else {
                PlaceSourceError::Transport(error.to_string())
            }
        })?;

        let records = to_records(payload.elements);
        debug!(count = records.len(), "overpass elements received");
        Ok(records)
    }
}

fn to_records(elements: Vec<Element>) -> Vec<RawPlaceRecord> {
    elements
        .into_iter()
        .filter_map(|element| {
            let (Some(lat), Some(lon)) = (element.lat, element.lon) else {
                return None;
            };
            Some(RawPlaceRecord {
                lat,
                lon,
                tags: element.tags,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_covers_every_category_in_table_order() {
        let client = OverpassClient::new(
            "https://overpass.example.org",
            "callejero-test",
            Duration::from_secs(25),
        )
        .unwrap();

        let query = client.build_query(41.9, 12.5, 2000);

        assert!(query.starts_with("[out:json][timeout:25];"));
        let tourism = query.find("node[\"tourism\"").unwrap();
        let historic = query.find("node[\"historic\"").unwrap();
        let amenity = query.find("node[\"amenity\"").unwrap();
        let leisure = query.find("node[\"leisure\"").unwrap();
        assert!(tourism < historic && historic < amenity && amenity < leisure);
        assert!(query.contains("restaurant|cafe|bar|museum|theatre"));
        assert!(query.contains("(around:2000,41.9,12.5)"));
    }

    #[test]
    fn elements_without_coordinates_are_skipped() {
        let payload = r#"{
            "elements": [
                {"lat": 41.9, "lon": 12.5, "tags": {"name": "Museo Uno", "tourism": "museum"}},
                {"tags": {"name": "Sin coordenadas"}}
            ]
        }"#;

        let parsed: InterpreterResponse = serde_json::from_str(payload).unwrap();
        let records = to_records(parsed.elements);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tags.get("name").unwrap(), "Museo Uno");
    }

    #[test]
    fn tagless_elements_deserialize_with_empty_map() {
        let parsed: InterpreterResponse =
            serde_json::from_str(r#"{"elements": [{"lat": 1.0, "lon": 2.0}]}"#).unwrap();
        assert!(parsed.elements[0].tags.is_empty());
    }
}
