// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drop-folder watcher: debounced filesystem events feed the parser, the
//! store, and the automatic-assignment path.
//!
//! A malformed drop file is logged and skipped; it never crashes the loop
//! or blocks files arriving after it. Insert failures leave the file
//! unmarked so a later sweep can retry it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use leadflow_config::model::IngestConfig;
use leadflow_core::{
    AdapterType, HealthStatus, LeadStore, LeadflowError, PluginAdapter,
};
use leadflow_engine::Distributor;
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Snapshot of the watcher's state for the admin surface.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IngestStats {
    pub watched_dir: String,
    pub debounce_ms: u64,
    pub processed_files: usize,
}

/// Watches the configured drop directory for `*.json` lead files.
pub struct DropFolderWatcher {
    config: IngestConfig,
    store: Arc<dyn LeadStore>,
    distributor: Arc<Distributor>,
    processed: Mutex<HashSet<PathBuf>>,
}

impl DropFolderWatcher {
    pub fn new(
        config: IngestConfig,
        store: Arc<dyn LeadStore>,
        distributor: Arc<Distributor>,
    ) -> Self {
        Self {
            config,
            store,
            distributor,
            processed: Mutex::new(HashSet::new()),
        }
    }

    /// Run the watcher until cancellation.
    ///
    /// Creates the drop directory if missing, optionally sweeps files
    /// already present, then processes debounced create/change events.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> Result<(), LeadflowError> {
        let drop_dir = PathBuf::from(&self.config.drop_dir);
        std::fs::create_dir_all(&drop_dir).map_err(|e| LeadflowError::Storage {
            source: Box::new(e),
        })?;

        if self.config.scan_on_start {
            let swept = self.process_existing().await;
            info!(swept, "startup sweep of existing drop files complete");
        }

        let (tx, mut rx) = mpsc::channel::<PathBuf>(256);
        let mut debouncer = new_debouncer(
            Duration::from_millis(self.config.debounce_ms),
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in events {
                        let _ = tx.blocking_send(event.path);
                    }
                }
                Err(e) => error!(error = %e, "drop-folder watch error"),
            },
        )
        .map_err(|e| LeadflowError::Internal(format!("failed to create watcher: {e}")))?;

        debouncer
            .watcher()
            .watch(&drop_dir, RecursiveMode::NonRecursive)
            .map_err(|e| LeadflowError::Internal(format!("failed to watch drop dir: {e}")))?;

        info!(
            dir = %drop_dir.display(),
            debounce_ms = self.config.debounce_ms,
            "drop-folder watcher started"
        );

        loop {
            tokio::select! {
                maybe_path = rx.recv() => match maybe_path {
                    Some(path) => self.process_file(&path).await,
                    None => break,
                },
                _ = cancel.cancelled() => {
                    info!("drop-folder watcher shutting down");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Sweep files already present in the drop directory. Returns how many
    /// leads were ingested.
    pub async fn process_existing(&self) -> usize {
        let drop_dir = PathBuf::from(&self.config.drop_dir);
        let entries = match std::fs::read_dir(&drop_dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, dir = %drop_dir.display(), "cannot read drop directory");
                return 0;
            }
        };

        let before = self.processed_count();
        for entry in entries.flatten() {
            self.process_file(&entry.path()).await;
        }
        self.processed_count().saturating_sub(before)
    }

    /// Validate, persist, and hand one drop file to the engine.
    pub async fn process_file(&self, path: &Path) {
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            debug!(path = %path.display(), "ignoring non-JSON file");
            return;
        }
        if self.is_processed(path) {
            debug!(path = %path.display(), "file already processed");
            return;
        }

        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) => {
                // The file may have been picked up and deleted by a racing
                // sweep, or is still being written.
                warn!(error = %e, path = %path.display(), "cannot read drop file");
                return;
            }
        };

        let source_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string());
        let lead = match crate::parser::parse_lead(&raw, source_file.as_deref(), Utc::now()) {
            Ok(lead) => lead,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "drop file rejected");
                leadflow_prometheus::record_ingest_rejected("validation");
                // Remember rejects so an unchanged bad file is not re-parsed
                // on every sweep.
                self.mark_processed(path);
                return;
            }
        };

        if let Err(e) = self.store.insert_lead(&lead).await {
            error!(error = %e, path = %path.display(), "failed to persist lead; will retry on next sweep");
            return;
        }
        self.mark_processed(path);
        leadflow_prometheus::record_lead_ingested();
        info!(
            lead_id = %lead.id,
            name = lead.name.as_str(),
            category = %lead.category(),
            file = source_file.as_deref().unwrap_or("-"),
            "lead ingested"
        );

        match self.distributor.auto_assign(lead.id).await {
            Ok(outcome) => debug!(lead_id = %lead.id, ?outcome, "automatic assignment attempted"),
            Err(e) => warn!(error = %e, lead_id = %lead.id, "automatic assignment failed"),
        }
    }

    /// Current watcher statistics.
    pub fn stats(&self) -> IngestStats {
        IngestStats {
            watched_dir: self.config.drop_dir.clone(),
            debounce_ms: self.config.debounce_ms,
            processed_files: self.processed_count(),
        }
    }

    fn is_processed(&self, path: &Path) -> bool {
        self.processed
            .lock()
            .map(|set| set.contains(path))
            .unwrap_or(false)
    }

    fn mark_processed(&self, path: &Path) {
        if let Ok(mut set) = self.processed.lock() {
            set.insert(path.to_path_buf());
        }
    }

    fn processed_count(&self) -> usize {
        self.processed.lock().map(|set| set.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PluginAdapter for DropFolderWatcher {
    fn name(&self) -> &str {
        "drop-folder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Ingest
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        let dir = Path::new(&self.config.drop_dir);
        if dir.is_dir() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy(format!(
                "drop directory missing: {}",
                dir.display()
            )))
        }
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_config::model::{DistributionConfig, PresenceConfig};
    use leadflow_core::LeadStatus;
    use leadflow_engine::{NotificationHub, PresenceTracker};
    use leadflow_test_utils::MemoryLeadStore;
    use tempfile::tempdir;

    fn watcher_over(drop_dir: &Path) -> (Arc<DropFolderWatcher>, Arc<MemoryLeadStore>) {
        let store = Arc::new(MemoryLeadStore::new());
        let hub = Arc::new(NotificationHub::new());
        let presence = Arc::new(PresenceTracker::new(
            store.clone(),
            hub.clone(),
            &PresenceConfig::default(),
        ));
        let distributor = Arc::new(Distributor::new(
            store.clone(),
            hub,
            presence,
            None,
            DistributionConfig::default(),
        ));
        let config = IngestConfig {
            enabled: true,
            drop_dir: drop_dir.to_string_lossy().into_owned(),
            debounce_ms: 100,
            scan_on_start: true,
        };
        let watcher = Arc::new(DropFolderWatcher::new(config, store.clone(), distributor));
        (watcher, store)
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn sweep_ingests_valid_files_and_skips_invalid_ones() {
        let dir = tempdir().unwrap();
        let (watcher, store) = watcher_over(dir.path());

        write_file(
            dir.path(),
            "good-1.json",
            r#"{"name": "A", "contact": "1", "problem": "p", "recovery": false}"#,
        );
        // Invalid in the middle must not block the one after it.
        write_file(dir.path(), "bad.json", r#"{"name": "B"}"#);
        write_file(
            dir.path(),
            "good-2.json",
            r#"{"name": "C", "contact": "2", "problem": "q", "rec": true}"#,
        );
        write_file(dir.path(), "notes.txt", "not a lead");

        let swept = watcher.process_existing().await;
        // Both valid files plus the remembered reject.
        assert_eq!(swept, 3);

        // With the toggle off, the automatic path parks ingested leads in
        // the queue for later pickup.
        let queued = store
            .list_leads_by_status(LeadStatus::Queued, None, 100)
            .await
            .unwrap();
        assert_eq!(queued.len(), 2, "two valid leads ingested");

        let stats = watcher.stats();
        assert_eq!(stats.processed_files, 3);
    }

    #[tokio::test]
    async fn file_is_not_ingested_twice() {
        let dir = tempdir().unwrap();
        let (watcher, store) = watcher_over(dir.path());
        let path = write_file(
            dir.path(),
            "lead.json",
            r#"{"name": "A", "contact": "1", "problem": "p", "recovery": false}"#,
        );

        watcher.process_file(&path).await;
        watcher.process_file(&path).await;

        let queued = store
            .list_leads_by_status(LeadStatus::Queued, None, 100)
            .await
            .unwrap();
        assert_eq!(queued.len(), 1);
    }

    #[tokio::test]
    async fn ingested_lead_keeps_opaque_payload_and_source_file() {
        let dir = tempdir().unwrap();
        let (watcher, store) = watcher_over(dir.path());
        let path = write_file(
            dir.path(),
            "lead-42.json",
            r#"{"name": "A", "contact": "1", "problem": "p", "recovery": false,
                "transcript": "..."}"#,
        );

        watcher.process_file(&path).await;

        let leads = store
            .list_leads_by_status(LeadStatus::Queued, None, 10)
            .await
            .unwrap();
        assert_eq!(leads[0].source_file.as_deref(), Some("lead-42.json"));
        assert_eq!(leads[0].payload.as_ref().unwrap()["transcript"], "...");
    }

    #[tokio::test]
    async fn health_check_reports_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("not-created");
        let (watcher, _store) = watcher_over(&missing);

        match watcher.health_check().await.unwrap() {
            HealthStatus::Unhealthy(msg) => assert!(msg.contains("missing")),
            other => panic!("expected Unhealthy, got {other:?}"),
        }
    }
}
