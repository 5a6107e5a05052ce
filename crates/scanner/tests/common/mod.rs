//! In-memory collaborators for orchestrator tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use diskwarden_core::alert::{AlertMessage, ChannelTargets, DeviceContext};
use diskwarden_core::health::Verdict;
use diskwarden_core::ports::{DiskReadingSource, MetricsSink, NotificationSink, SourceError};
use diskwarden_core::reading::DiskReading;
use diskwarden_core::store::{
    DeviceLock, DeviceLocks, DeviceRecord, DeviceStatus, StateStore, StoreError,
};
use diskwarden_core::types::{DeviceId, Timestamp};
use diskwarden_scanner::{Clock, ScanOrchestrator};
use tokio::sync::Notify;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct MemoryStore {
    records: Mutex<BTreeMap<DeviceId, DeviceRecord>>,
    locks: DeviceLocks,
    lock_timeout: Duration,
    pub fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            locks: DeviceLocks::new(),
            lock_timeout: Duration::from_millis(50),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn record(&self, id: &str) -> Option<DeviceRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn lock(&self, id: &str) -> Result<DeviceLock, StoreError> {
        self.locks.acquire(id, self.lock_timeout).await
    }

    async fn get(&self, id: &str) -> DeviceRecord {
        self.record(id).unwrap_or_else(|| DeviceRecord::unseen(id))
    }

    async fn upsert(&self, record: &DeviceRecord) -> bool {
        if self.fail_writes.load(Ordering::SeqCst) {
            return false;
        }
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        true
    }

    async fn all(&self) -> BTreeMap<DeviceId, DeviceStatus> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|(id, r)| {
                (
                    id.clone(),
                    DeviceStatus {
                        state: r.state,
                        health_percent: r.health_percent,
                    },
                )
            })
            .collect()
    }

    async fn cleanup(&self, retention: chrono::Duration) -> u64 {
        let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
            return 0;
        };
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, r| r.updated_at.is_some_and(|t| t >= cutoff));
        (before - records.len()) as u64
    }

    async fn find(&self, id: &str) -> Result<Option<DeviceRecord>, StoreError> {
        Ok(self.record(id))
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Serves queued responses in order. An empty queue means "source down".
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Vec<DiskReading>, SourceError>>>,
    /// When set, `read` waits for a notification before answering.
    pub gate: Option<Arc<Notify>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            gate: None,
        }
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn push(&self, readings: Vec<DiskReading>) {
        self.responses.lock().unwrap().push_back(Ok(readings));
    }

    pub fn push_err(&self, err: SourceError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }
}

#[async_trait]
impl DiskReadingSource for ScriptedSource {
    async fn read(&self) -> Result<Vec<DiskReading>, SourceError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SourceError::Unavailable("no scripted response".into())))
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Sent {
    pub verdict: Verdict,
    pub device: DeviceContext,
    pub message: AlertMessage,
    pub targets: ChannelTargets,
}

pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Sent>>,
    pub succeed: AtomicBool,
    /// Delivery latency in milliseconds; a send is recorded once it elapses.
    pub delay_ms: AtomicU64,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            succeed: AtomicBool::new(true),
            delay_ms: AtomicU64::new(0),
        }
    }

    pub fn verdicts(&self) -> Vec<Verdict> {
        self.sent.lock().unwrap().iter().map(|s| s.verdict).collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn send(
        &self,
        verdict: Verdict,
        device: &DeviceContext,
        message: &AlertMessage,
        targets: &ChannelTargets,
    ) -> bool {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.sent.lock().unwrap().push(Sent {
            verdict,
            device: device.clone(),
            message: message.clone(),
            targets: targets.clone(),
        });
        self.succeed.load(Ordering::SeqCst)
    }
}

pub struct RecordingMetrics {
    pub batches: Mutex<Vec<Vec<DiskReading>>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MetricsSink for RecordingMetrics {
    async fn record(&self, readings: &[DiskReading]) -> bool {
        self.batches.lock().unwrap().push(readings.to_vec());
        true
    }
}

// ---------------------------------------------------------------------------
// Clock and fixtures
// ---------------------------------------------------------------------------

/// A clock the test moves by hand.
#[derive(Clone)]
pub struct ManualClock(Arc<Mutex<Timestamp>>);

impl ManualClock {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        )))
    }

    pub fn now(&self) -> Timestamp {
        *self.0.lock().unwrap()
    }

    pub fn advance_minutes(&self, minutes: i64) {
        *self.0.lock().unwrap() += chrono::Duration::minutes(minutes);
    }

    pub fn as_clock(&self) -> Clock {
        let inner = self.0.clone();
        Arc::new(move || *inner.lock().unwrap())
    }
}

pub fn reading(device: &str, serial: Option<&str>, health: i64) -> DiskReading {
    DiskReading {
        device: device.to_string(),
        serial_no: serial.map(str::to_string),
        health_percent: health,
        model_id: None,
        temp: None,
        highest_temp: None,
        performance: None,
        power_on_hours: None,
        lifetime_days: None,
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub source: Arc<ScriptedSource>,
    pub notifier: Arc<RecordingNotifier>,
    pub metrics: Arc<RecordingMetrics>,
    pub clock: ManualClock,
    pub orchestrator: Arc<ScanOrchestrator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_source(ScriptedSource::new())
    }

    pub fn with_source(source: ScriptedSource) -> Self {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(source);
        let notifier = Arc::new(RecordingNotifier::new());
        let metrics = Arc::new(RecordingMetrics::new());
        let clock = ManualClock::new();
        let orchestrator = ScanOrchestrator::new(store.clone(), source.clone(), notifier.clone())
            .with_metrics(metrics.clone())
            .with_clock(clock.as_clock());
        Self {
            store,
            source,
            notifier,
            metrics,
            clock,
            orchestrator: Arc::new(orchestrator),
        }
    }
}
