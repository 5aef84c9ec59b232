// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. All helpers are no-ops until a recorder is
//! installed, so library crates can call them unconditionally.

use metrics::{describe_counter, describe_gauge};

/// Register all Leadflow metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("leadflow_leads_ingested_total", "Leads ingested from the drop folder");
    describe_counter!(
        "leadflow_ingest_rejected_total",
        "Drop files rejected by validation"
    );
    describe_counter!(
        "leadflow_leads_assigned_total",
        "Leads assigned, labeled by selection algorithm"
    );
    describe_counter!(
        "leadflow_assignment_conflicts_total",
        "Guarded assignments lost to a concurrent caller"
    );
    describe_gauge!("leadflow_agents_online", "Agents currently available");
    describe_gauge!("leadflow_sse_subscribers", "Open real-time event channels");
}

/// Record a lead ingested from the drop folder.
pub fn record_lead_ingested() {
    metrics::counter!("leadflow_leads_ingested_total").increment(1);
}

/// Record a drop file rejected by validation.
pub fn record_ingest_rejected(reason: &str) {
    metrics::counter!("leadflow_ingest_rejected_total", "reason" => reason.to_string())
        .increment(1);
}

/// Record a completed assignment.
pub fn record_lead_assigned(algorithm: &str) {
    metrics::counter!("leadflow_leads_assigned_total", "algorithm" => algorithm.to_string())
        .increment(1);
}

/// Record a guarded assignment lost to a concurrent caller.
pub fn record_assignment_conflict() {
    metrics::counter!("leadflow_assignment_conflicts_total").increment(1);
}

/// Set the number of currently available agents.
pub fn set_agents_online(count: f64) {
    metrics::gauge!("leadflow_agents_online").set(count);
}

/// Set the number of open real-time event channels.
pub fn set_sse_subscribers(count: f64) {
    metrics::gauge!("leadflow_sse_subscribers").set(count);
}
