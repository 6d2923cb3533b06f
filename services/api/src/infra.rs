use chrono::NaiveDate;
use exit_clearance::workflows::clearance::{
    ClearancePolicy, ClearanceService, InMemoryClearanceRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type InMemoryClearanceService = ClearanceService<InMemoryClearanceRepository>;

/// Service backed by a fresh process-local store.
pub(crate) fn in_memory_service(policy: ClearancePolicy) -> InMemoryClearanceService {
    ClearanceService::new(Arc::new(InMemoryClearanceRepository::default()), policy)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
