use std::sync::atomic::{AtomicU64, Ordering};

use relay_domain::DeliveryReport;

#[derive(Debug, Default)]
pub struct Metrics {
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    subscriptions: AtomicU64,
    invalid_signatures: AtomicU64,
    events_published: AtomicU64,
    events_delivered: AtomicU64,
    events_dropped: AtomicU64,
    frames_sent: AtomicU64,
    frames_dropped: AtomicU64,
    delivery_failures: AtomicU64,
}

impl Metrics {
    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subscription(&self) {
        self.subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_signature(&self) {
        self.invalid_signatures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish(&self, report: &DeliveryReport) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        self.events_delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.events_dropped
            .fetch_add(report.dropped as u64, Ordering::Relaxed);
    }

    pub fn record_frames_sent(&self, count: usize) {
        self.frames_sent.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_connections(&self) -> u64 {
        let opened = self.connections_opened.load(Ordering::Relaxed);
        let closed = self.connections_closed.load(Ordering::Relaxed);
        opened.saturating_sub(closed)
    }

    pub fn invalid_signatures(&self) -> u64 {
        self.invalid_signatures.load(Ordering::Relaxed)
    }

    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self) -> String {
        let opened = self.connections_opened.load(Ordering::Relaxed);
        let active = self.active_connections();
        let subscriptions = self.subscriptions.load(Ordering::Relaxed);
        let invalid = self.invalid_signatures.load(Ordering::Relaxed);
        let published = self.events_published.load(Ordering::Relaxed);
        let delivered = self.events_delivered.load(Ordering::Relaxed);
        let dropped = self.events_dropped.load(Ordering::Relaxed);
        let frames_sent = self.frames_sent.load(Ordering::Relaxed);
        let frames_dropped = self.frames_dropped.load(Ordering::Relaxed);
        let failures = self.delivery_failures.load(Ordering::Relaxed);

        format!(
            "# TYPE relay_connections_opened_total counter\n\
relay_connections_opened_total {}\n\
# TYPE relay_connections_active gauge\n\
relay_connections_active {}\n\
# TYPE relay_subscriptions_total counter\n\
relay_subscriptions_total {}\n\
# TYPE relay_invalid_signatures_total counter\n\
relay_invalid_signatures_total {}\n\
# TYPE relay_events_published_total counter\n\
relay_events_published_total {}\n\
# TYPE relay_events_delivered_total counter\n\
relay_events_delivered_total {}\n\
# TYPE relay_events_dropped_total counter\n\
relay_events_dropped_total {}\n\
# TYPE relay_frames_sent_total counter\n\
relay_frames_sent_total {}\n\
# TYPE relay_frames_dropped_total counter\n\
relay_frames_dropped_total {}\n\
# TYPE relay_delivery_failures_total counter\n\
relay_delivery_failures_total {}\n",
            opened,
            active,
            subscriptions,
            invalid,
            published,
            delivered,
            dropped,
            frames_sent,
            frames_dropped,
            failures
        )
    }
}
