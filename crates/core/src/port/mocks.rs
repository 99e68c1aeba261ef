// ============================================================================
// In-memory Port Implementations for Testing
// ============================================================================

use crate::domain::{OutboundEvent, Subject};
use crate::error::{AppError, Result};
use crate::port::{ChatTransport, SheetStore, TimeProvider};
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pauses `append_label` so a test can interleave other work with a join.
///
/// The store signals `entered` once the append has been requested and then
/// waits for `release` before writing.
#[derive(Default)]
pub struct AppendGate {
    pub entered: Notify,
    pub release: Notify,
}

/// Spreadsheet double: one Vec of labels per subject code
#[derive(Default)]
pub struct InMemorySheetStore {
    columns: Mutex<HashMap<String, Vec<String>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    gate: Mutex<Option<Arc<AppendGate>>>,
    reads: AtomicUsize,
    clears: AtomicUsize,
}

impl InMemorySheetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a direct edit of the sheet by an administrator
    pub fn set_column(&self, code: &str, labels: &[&str]) {
        lock(&self.columns).insert(
            code.to_string(),
            labels.iter().map(|l| l.to_string()).collect(),
        );
    }

    pub fn column(&self, code: &str) -> Vec<String> {
        lock(&self.columns).get(code).cloned().unwrap_or_default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn install_gate(&self, gate: Arc<AppendGate>) {
        *lock(&self.gate) = Some(gate);
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Store("simulated write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SheetStore for InMemorySheetStore {
    async fn read_ordered_labels(&self, subject: &Subject) -> Result<Vec<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Store("simulated read failure".to_string()));
        }
        Ok(self.column(&subject.code))
    }

    async fn append_label(&self, subject: &Subject, label: &str) -> Result<()> {
        let gate = lock(&self.gate).take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        self.check_writable()?;
        lock(&self.columns)
            .entry(subject.code.clone())
            .or_default()
            .push(label.to_string());
        Ok(())
    }

    async fn remove_label(&self, subject: &Subject, label: &str) -> Result<()> {
        self.check_writable()?;
        if let Some(column) = lock(&self.columns).get_mut(&subject.code) {
            if let Some(index) = column.iter().position(|l| l == label) {
                column.remove(index);
            }
        }
        Ok(())
    }

    async fn clear_column(&self, subject: &Subject) -> Result<()> {
        self.check_writable()?;
        self.clears.fetch_add(1, Ordering::SeqCst);
        lock(&self.columns).remove(&subject.code);
        Ok(())
    }
}

/// Chat double that records every emitted event
#[derive(Default)]
pub struct RecordingTransport {
    events: Mutex<Vec<OutboundEvent>>,
    failing: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<OutboundEvent> {
        lock(&self.events).clone()
    }

    /// Number of "queue open" notifications delivered for a subject
    pub fn opened_count(&self, subject: &str) -> usize {
        lock(&self.events)
            .iter()
            .filter(|e| matches!(e, OutboundEvent::QueueOpened(n) if n.subject == subject))
            .count()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn emit(&self, event: &OutboundEvent) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Transport("simulated send failure".to_string()));
        }
        lock(&self.events).push(event.clone());
        Ok(())
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *lock(&self.now) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = lock(&self.now);
        *now = *now + by;
    }
}

impl TimeProvider for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *lock(&self.now)
    }
}
