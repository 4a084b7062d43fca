use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    geocode_total: AtomicU64,
    geocode_failures_total: AtomicU64,
    place_lookups_total: AtomicU64,
    place_lookup_fallbacks_total: AtomicU64,
    places_resolved_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub geocode_total: u64,
    pub geocode_failures_total: u64,
    pub place_lookups_total: u64,
    pub place_lookup_fallbacks_total: u64,
    pub places_resolved_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_geocode(&self) {
        self.geocode_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_geocode_failure(&self) {
        self.geocode_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_place_lookup(&self) {
        self.place_lookups_total.fetch_add(1, Ordering::Relaxed);
    }

    /// A provider failure that degraded to an empty result set.
    pub fn inc_place_lookup_fallback(&self) {
        self.place_lookup_fallbacks_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_places_resolved(&self, count: usize) {
        self.places_resolved_total
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            geocode_total: self.geocode_total.load(Ordering::Relaxed),
            geocode_failures_total: self.geocode_failures_total.load(Ordering::Relaxed),
            place_lookups_total: self.place_lookups_total.load(Ordering::Relaxed),
            place_lookup_fallbacks_total: self
                .place_lookup_fallbacks_total
                .load(Ordering::Relaxed),
            places_resolved_total: self.places_resolved_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,callejero_api=info,callejero_agents=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reports_average_latency() {
        let metrics = AppMetrics::default();
        metrics.inc_request();
        metrics.inc_request();
        metrics.observe_latency(Duration::from_millis(10));
        metrics.observe_latency(Duration::from_millis(30));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_total, 2);
        assert!((snapshot.avg_latency_millis - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_metrics_avoid_division_by_zero() {
        let snapshot = AppMetrics::default().snapshot();
        assert_eq!(snapshot.avg_latency_millis, 0.0);
    }
}
