use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    visits_recorded: AtomicU64,
    visits_deduplicated: AtomicU64,
    uploads: AtomicU64,
    upload_failures: AtomicU64,
    login_failures: AtomicU64,
}

impl Metrics {
    pub fn record_visit(&self) {
        self.visits_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate_visit(&self) {
        self.visits_deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upload(&self) {
        self.uploads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upload_failure(&self) {
        self.upload_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_login_failure(&self) {
        self.login_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn render_prometheus(&self) -> String {
        let recorded = self.visits_recorded.load(Ordering::Relaxed);
        let deduplicated = self.visits_deduplicated.load(Ordering::Relaxed);
        let uploads = self.uploads.load(Ordering::Relaxed);
        let upload_failures = self.upload_failures.load(Ordering::Relaxed);
        let login_failures = self.login_failures.load(Ordering::Relaxed);

        format!(
            "# TYPE folio_visits_recorded_total counter\n\
folio_visits_recorded_total {}\n\
# TYPE folio_visits_deduplicated_total counter\n\
folio_visits_deduplicated_total {}\n\
# TYPE folio_uploads_total counter\n\
folio_uploads_total {}\n\
# TYPE folio_upload_failures_total counter\n\
folio_upload_failures_total {}\n\
# TYPE folio_login_failures_total counter\n\
folio_login_failures_total {}\n",
            recorded, deduplicated, uploads, upload_failures, login_failures
        )
    }
}
