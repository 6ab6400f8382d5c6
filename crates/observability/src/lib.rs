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
    place_lookups_total: AtomicU64,
    route_lookups_total: AtomicU64,
    degraded_routes_total: AtomicU64,
    synth_fallbacks_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub place_lookups_total: u64,
    pub route_lookups_total: u64,
    pub degraded_routes_total: u64,
    pub synth_fallbacks_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_place_lookup(&self) {
        self.place_lookups_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_route_lookup(&self) {
        self.route_lookups_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_degraded_route(&self) {
        self.degraded_routes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_synth_fallback(&self) {
        self.synth_fallbacks_total.fetch_add(1, Ordering::Relaxed);
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
            place_lookups_total: self.place_lookups_total.load(Ordering::Relaxed),
            route_lookups_total: self.route_lookups_total.load(Ordering::Relaxed),
            degraded_routes_total: self.degraded_routes_total.load(Ordering::Relaxed),
            synth_fallbacks_total: self.synth_fallbacks_total.load(Ordering::Relaxed),
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
                "{}=info,safepoint_api=info,safepoint_agents=info",
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
