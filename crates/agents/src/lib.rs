use std::sync::Arc;
use std::time::{Duration, Instant};

use callejero_core::composer;
use callejero_core::{
    filter_and_sort, interpret, normalize_records, ChatReply, GeocodedLocation, LocationQuery,
    MessageKind, Place, SessionState,
};
use callejero_observability::AppMetrics;
use callejero_providers::{GeocodeError, Geocoder, PlaceSource};
use callejero_storage::SessionStore;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

pub const DEFAULT_SEARCH_RADIUS_METERS: u32 = 2_000;

/// Orchestrates one conversational session: interprets messages, resolves
/// locations through the providers, and keeps the session state current.
#[derive(Clone)]
pub struct GuideAgent<G, P, S>
where
    G: Geocoder,
    P: PlaceSource,
    S: SessionStore,
{
    geocoder: Arc<G>,
    places: Arc<P>,
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
    geocode_deadline: Duration,
    search_radius: u32,
    resolve_gate: Arc<Mutex<()>>,
}

/// What one place lookup actually produced, before it degrades to a count.
enum LookupOutcome {
    Resolved(Vec<Place>),
    Empty,
    ProviderFailed,
}

impl<G, P, S> GuideAgent<G, P, S>
where
    G: Geocoder,
    P: PlaceSource,
    S: SessionStore,
{
    pub fn new(
        geocoder: Arc<G>,
        places: Arc<P>,
        store: Arc<S>,
        metrics: Arc<AppMetrics>,
        geocode_deadline: Duration,
        search_radius: u32,
    ) -> Self {
        Self {
            geocoder,
            places,
            store,
            metrics,
            geocode_deadline,
            search_radius,
            resolve_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Interpret one free-text message and produce a reply. Never fails:
    /// provider trouble degrades to friendly text.
    #[instrument(skip(self, text))]
    pub async fn interpret_query(&self, text: &str) -> ChatReply {
        let started = Instant::now();
        self.metrics.inc_request();

        let reply = match interpret(text) {
            MessageKind::Greeting => ChatReply::canned(composer::greeting_reply()),
            MessageKind::BotQuestion => ChatReply::canned(composer::bot_description_reply()),
            MessageKind::Query(query) => self.answer_location_query(query).await,
        };

        self.metrics.observe_latency(started.elapsed());
        info!(
            intent = ?reply.intent,
            place_count = reply.place_count,
            "message handled"
        );
        reply
    }

    async fn answer_location_query(&self, query: LocationQuery) -> ChatReply {
        let LocationQuery {
            matched_pattern,
            location_phrase,
            intent,
            ..
        } = query;

        let Some(phrase) = location_phrase else {
            return ChatReply {
                reply_text: composer::no_location_reply().to_string(),
                intent,
                matched_pattern,
                location_phrase: None,
                resolved_location: None,
                place_count: 0,
            };
        };

        let located = match self.geocode(&phrase).await {
            Ok(located) => located,
            Err(GeocodeError::NotFound) => {
                return ChatReply {
                    reply_text: composer::location_not_found_reply(&phrase),
                    intent,
                    matched_pattern,
                    location_phrase: Some(phrase),
                    resolved_location: None,
                    place_count: 0,
                };
            }
            Err(error) => {
                warn!(%phrase, %error, "geocoding failed");
                return ChatReply {
                    reply_text: composer::lookup_trouble_reply().to_string(),
                    intent,
                    matched_pattern,
                    location_phrase: Some(phrase),
                    resolved_location: None,
                    place_count: 0,
                };
            }
        };

        let place_count = self
            .resolve_location(located.lat, located.lon, self.search_radius)
            .await;

        let reply_text = if place_count == 0 {
            composer::no_places_for_location_reply(&phrase)
        } else {
            let state = self.store.snapshot();
            composer::compose_places_reply(intent, &phrase, &state.current_places)
        };

        ChatReply {
            reply_text,
            intent,
            matched_pattern,
            location_phrase: Some(phrase),
            resolved_location: Some(located),
            place_count,
        }
    }

    /// Geocode a place name with the agent's deadline, counting failures.
    pub async fn geocode(&self, phrase: &str) -> Result<GeocodedLocation, GeocodeError> {
        self.metrics.inc_geocode();
        match self.geocoder.geocode(phrase, self.geocode_deadline).await {
            Ok(located) => Ok(located),
            Err(error) => {
                self.metrics.inc_geocode_failure();
                Err(error)
            }
        }
    }

    /// Fetch places around a point and replace the session state with the
    /// result. Returns the number of places stored. Provider failures degrade
    /// to an empty set and a zero count; they are logged, never surfaced.
    #[instrument(skip(self))]
    pub async fn resolve_location(&self, lat: f64, lon: f64, radius_meters: u32) -> usize {
        // Fetch and replace must not interleave across callers, or a place
        // list could end up attached to the wrong location.
        let _guard = self.resolve_gate.lock().await;

        self.metrics.inc_place_lookup();
        let outcome = match self.places.find_places(lat, lon, radius_meters).await {
            Ok(records) => {
                let places = normalize_records(&records);
                if places.is_empty() {
                    LookupOutcome::Empty
                } else {
                    LookupOutcome::Resolved(places)
                }
            }
            Err(error) => {
                warn!(lat, lon, radius_meters, %error, "place lookup failed, storing empty set");
                self.metrics.inc_place_lookup_fallback();
                LookupOutcome::ProviderFailed
            }
        };

        let places = match outcome {
            LookupOutcome::Resolved(places) => places,
            LookupOutcome::Empty | LookupOutcome::ProviderFailed => Vec::new(),
        };

        let count = places.len();
        self.metrics.add_places_resolved(count);
        self.store.replace((lat, lon), places);

        info!(lat, lon, radius_meters, count, "location resolved");
        count
    }

    /// Summary of the stored place set: counts per category plus highlights.
    pub fn summarize(&self) -> String {
        composer::summarize(&self.store.snapshot())
    }

    pub fn session_snapshot(&self) -> SessionState {
        self.store.snapshot()
    }

    pub fn search_radius(&self) -> u32 {
        self.search_radius
    }
}

/// Distance-filter and rank a place list against a point. Pure; usable
/// outside any session.
pub fn filter_nearby(lat: f64, lon: f64, radius_meters: u32, places: &[Place]) -> Vec<Place> {
    filter_and_sort((lat, lon), f64::from(radius_meters), places)
}
