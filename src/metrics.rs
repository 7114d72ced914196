use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, TextEncoder};

static WS_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "live_session_service_ws_connections",
        "Currently open websocket connections",
    )
    .expect("failed to create live_session_service_ws_connections");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register live_session_service_ws_connections");
    gauge
});

static EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "live_session_service_events_total",
            "Inbound realtime events handled, by event type",
        ),
        &["event"],
    )
    .expect("failed to create live_session_service_events_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register live_session_service_events_total");
    counter
});

static SESSIONS_STARTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "live_session_service_sessions_started_total",
        "Broadcast sessions created since process start",
    )
    .expect("failed to create live_session_service_sessions_started_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register live_session_service_sessions_started_total");
    counter
});

pub fn observe_connection_opened() {
    WS_CONNECTIONS.inc();
}

pub fn observe_connection_closed() {
    WS_CONNECTIONS.dec();
}

pub fn observe_event(event: &str) {
    EVENTS_TOTAL.with_label_values(&[event]).inc();
}

pub fn observe_session_started() {
    SESSIONS_STARTED_TOTAL.inc();
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
