// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled requeue sweeps.
//!
//! On every cron tick the queued pool goes back through the distribution
//! pipeline, honoring the dwell window. Leads parked by `TooEarly` or
//! `NoEligibleAgent` outcomes are never held in memory with a timer; this
//! sweep is what eventually assigns them.

use std::sync::Arc;

use chrono::Utc;
use croner::Cron;
use leadflow_core::{LeadStatus, LeadflowError};
use leadflow_engine::Distributor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Parse the configured cron expression (seconds field optional).
pub fn parse_schedule(expr: &str) -> Result<Cron, LeadflowError> {
    Cron::new(expr)
        .with_seconds_optional()
        .parse()
        .map_err(|e| {
            LeadflowError::Config(format!("invalid scheduler.requeue_schedule `{expr}`: {e}"))
        })
}

/// Run requeue sweeps on the given schedule until cancellation.
pub async fn run_requeue_sweeps(
    schedule: Cron,
    distributor: Arc<Distributor>,
    cancel: CancellationToken,
) {
    loop {
        let now = Utc::now();
        let next = match schedule.find_next_occurrence(&now, false) {
            Ok(next) => next,
            Err(e) => {
                error!(error = %e, "cannot compute next sweep occurrence; scheduler stopped");
                break;
            }
        };
        let wait = (next - now).to_std().unwrap_or_default();

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                match distributor.assign_batch(LeadStatus::Queued, false).await {
                    Ok(report) if report.assigned > 0 || report.errors > 0 => {
                        info!(
                            assigned = report.assigned,
                            queued = report.queued,
                            errors = report.errors,
                            "requeue sweep finished"
                        );
                    }
                    Ok(_) => debug!("requeue sweep: nothing to assign"),
                    Err(e) => warn!(error = %e, "requeue sweep failed; will retry next tick"),
                }
            }
            _ = cancel.cancelled() => {
                info!("scheduler shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_parses() {
        assert!(parse_schedule("0 */5 * * * *").is_ok());
    }

    #[test]
    fn five_field_expression_parses() {
        assert!(parse_schedule("*/10 * * * *").is_ok());
    }

    #[test]
    fn garbage_expression_is_a_config_error() {
        let err = parse_schedule("every five minutes").unwrap_err();
        assert!(matches!(err, LeadflowError::Config(_)));
    }
}
