//! One evaluation pass over the current reading snapshot.
//!
//! [`ScanOrchestrator::run_cycle`] is the single entry point for both the
//! periodic scheduler and manual triggers. Cycles are mutually exclusive per
//! orchestrator instance: a trigger that arrives while a cycle is running is
//! dropped, not queued. Callers that may be cancelled use
//! [`ScanOrchestrator::spawn_cycle`].
//!
//! Per device the sequence is lock -> get -> decide -> upsert, and the lock is
//! held for all four steps. Notification happens after the lock is released,
//! so a slow channel never holds up access to the record.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use diskwarden_core::alert::{AlertMessage, ChannelTargets, DeviceContext};
use diskwarden_core::health::decision::{decide, AlertPolicy};
use diskwarden_core::health::Verdict;
use diskwarden_core::ports::{DiskReadingSource, MetricsSink, NotificationSink};
use diskwarden_core::reading::DiskReading;
use diskwarden_core::settings::MonitorSettings;
use diskwarden_core::store::StateStore;
use diskwarden_core::types::Timestamp;
use serde::Serialize;
use tokio::task::JoinHandle;

/// Source of "now" for a cycle.
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// The last reading snapshot a cycle completed with.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub last_scan_time: Timestamp,
    pub disks: Vec<DiskReading>,
}

/// Counters for one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Readings in the snapshot, disabled ones included.
    pub disks: usize,
    /// Devices whose record was evaluated and written.
    pub evaluated: usize,
    /// Verdicts other than `none`, whether or not delivery succeeded.
    pub alerts: usize,
    pub notify_failures: usize,
    pub skipped_disabled: usize,
    pub skipped_malformed: usize,
    /// Devices skipped because their record lock timed out.
    pub skipped_locked: usize,
    pub dropped_writes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Another cycle held the guard.
    Skipped,
    /// The source produced no data; nothing was mutated.
    Aborted { reason: String },
    Completed(CycleReport),
}

/// Releases the in-progress flag on every exit path.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The result of evaluating one reading under its device lock.
struct Evaluated {
    context: DeviceContext,
    verdict: Verdict,
}

pub struct ScanOrchestrator {
    store: Arc<dyn StateStore>,
    source: Arc<dyn DiskReadingSource>,
    notifier: Arc<dyn NotificationSink>,
    metrics: Option<Arc<dyn MetricsSink>>,
    clock: Clock,
    running: AtomicBool,
    last_snapshot: RwLock<Option<Snapshot>>,
}

impl ScanOrchestrator {
    pub fn new(
        store: Arc<dyn StateStore>,
        source: Arc<dyn DiskReadingSource>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            source,
            notifier,
            metrics: None,
            clock: Arc::new(Utc::now),
            running: AtomicBool::new(false),
            last_snapshot: RwLock::new(None),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Whether a cycle currently holds the guard.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Snapshot of the last completed cycle.
    pub fn last_snapshot(&self) -> Option<Snapshot> {
        self.last_snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start time of the last completed cycle.
    pub fn last_completed(&self) -> Option<Timestamp> {
        self.last_snapshot().map(|s| s.last_scan_time)
    }

    fn try_begin(&self) -> Option<CycleGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard(&self.running))
    }

    /// Run a cycle on its own task.
    ///
    /// Dropping the returned handle detaches the cycle instead of cancelling
    /// it, so a record written as alerted always reaches the notifier.
    pub fn spawn_cycle(self: &Arc<Self>, settings: MonitorSettings) -> JoinHandle<CycleOutcome> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.run_cycle(&settings).await })
    }

    /// Run one evaluation pass with `settings`.
    ///
    /// Never fails: every error condition is contained within the cycle and
    /// reflected in the returned outcome.
    pub async fn run_cycle(&self, settings: &MonitorSettings) -> CycleOutcome {
        let Some(_guard) = self.try_begin() else {
            tracing::debug!("Scan already in progress, skipping trigger");
            return CycleOutcome::Skipped;
        };

        let started_at = (self.clock)();
        tracing::info!("Scan cycle started");

        let readings = match self.source.read().await {
            Ok(readings) if readings.is_empty() => {
                tracing::warn!("Reading source returned no disks, aborting cycle");
                return CycleOutcome::Aborted {
                    reason: "reading source returned no disks".to_string(),
                };
            }
            Ok(readings) => readings,
            Err(e) => {
                tracing::warn!(error = %e, "Reading source failed, aborting cycle");
                return CycleOutcome::Aborted {
                    reason: e.to_string(),
                };
            }
        };

        let policy = settings.policy();
        let targets = settings.channels();
        let mut report = CycleReport {
            disks: readings.len(),
            ..Default::default()
        };

        for reading in &readings {
            self.process_reading(reading, settings, &policy, &targets, &mut report)
                .await;
        }

        if let Some(metrics) = &self.metrics {
            if !metrics.record(&readings).await {
                tracing::warn!(disks = readings.len(), "Metrics forwarding failed");
            }
        }

        let mut slot = self
            .last_snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Snapshot {
            last_scan_time: started_at,
            disks: readings,
        });
        drop(slot);

        tracing::info!(
            disks = report.disks,
            evaluated = report.evaluated,
            alerts = report.alerts,
            skipped_locked = report.skipped_locked,
            dropped_writes = report.dropped_writes,
            "Scan cycle finished"
        );
        CycleOutcome::Completed(report)
    }

    async fn process_reading(
        &self,
        reading: &DiskReading,
        settings: &MonitorSettings,
        policy: &AlertPolicy,
        targets: &ChannelTargets,
        report: &mut CycleReport,
    ) {
        let id = match reading.identity() {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(device = %reading.device, error = %e, "Skipping malformed reading");
                report.skipped_malformed += 1;
                return;
            }
        };

        if settings.is_disabled(&id) {
            tracing::debug!(disk_id = %id, "Alerting disabled for disk, skipping");
            report.skipped_disabled += 1;
            return;
        }

        let health = match reading.health() {
            Ok(health) => health,
            Err(e) => {
                tracing::warn!(disk_id = %id, error = %e, "Skipping malformed reading");
                report.skipped_malformed += 1;
                return;
            }
        };

        let Some(evaluated) = self.evaluate(&id, health, reading, policy, report).await else {
            return;
        };

        let Evaluated { context, verdict } = evaluated;
        let Some(message) = AlertMessage::compose(verdict, &context) else {
            return;
        };

        report.alerts += 1;
        tracing::info!(disk_id = %id, ?verdict, health, "{}", message.text());
        if !self.notifier.send(verdict, &context, &message, targets).await {
            report.notify_failures += 1;
        }
    }

    /// Lock, load, decide and persist one device. `None` when the device was skipped.
    async fn evaluate(
        &self,
        id: &str,
        health: u8,
        reading: &DiskReading,
        policy: &AlertPolicy,
        report: &mut CycleReport,
    ) -> Option<Evaluated> {
        let _lock = match self.store.lock(id).await {
            Ok(lock) => lock,
            Err(e) => {
                tracing::warn!(disk_id = %id, error = %e, "Skipping disk this cycle");
                report.skipped_locked += 1;
                return None;
            }
        };

        let now = (self.clock)();
        let prior = self.store.get(id).await;
        let decision = decide(health, policy, &prior.prior(), now);
        let serial = reading.known_serial();
        let next = prior.advance(&reading.device, serial, health, &decision, now);

        if self.store.upsert(&next).await {
            report.evaluated += 1;
        } else {
            tracing::warn!(disk_id = %id, verdict = ?decision.verdict, "State update dropped");
            report.dropped_writes += 1;
        }

        Some(Evaluated {
            context: DeviceContext {
                id: id.to_string(),
                device: reading.device.clone(),
                serial_no: serial.map(str::to_string),
                health_percent: health,
                threshold: policy.threshold,
            },
            verdict: decision.verdict,
        })
    }
}
