use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::auth::UserId;
use crate::store::ProgressStore;
use crate::store::schema::ProgressPatch;

enum SyncRequest {
    Save(ProgressPatch),
    Flush(mpsc::Sender<()>),
    Shutdown,
}

#[derive(Debug)]
enum SyncEvent {
    Started,
    Saved { at: DateTime<Utc>, merged: usize },
    Failed { error: String, merged: usize },
}

/// What the UI shows about background persistence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub in_progress: bool,
    /// Saves submitted but not yet written.
    pub pending: usize,
    pub last_sync: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl SyncStatus {
    fn apply(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Started => self.in_progress = true,
            SyncEvent::Saved { at, merged } => {
                self.in_progress = false;
                self.pending = self.pending.saturating_sub(merged);
                self.last_sync = Some(at);
                self.error = None;
            }
            SyncEvent::Failed { error, merged } => {
                self.in_progress = false;
                self.pending = self.pending.saturating_sub(merged);
                self.error = Some(error);
            }
        }
    }

    pub fn label(&self) -> String {
        if let Some(ref error) = self.error {
            return format!("sync error: {error}");
        }
        if self.in_progress || self.pending > 0 {
            return "saving...".to_string();
        }
        match self.last_sync {
            Some(at) => format!("saved {}", at.with_timezone(&chrono::Local).format("%H:%M:%S")),
            None => "not saved yet".to_string(),
        }
    }
}

/// Writes progress patches on a background thread so the UI never blocks on
/// the store. Patches already queued when the worker wakes are merged into
/// one save, the later field values winning.
pub struct SyncWorker {
    tx: mpsc::Sender<SyncRequest>,
    events: mpsc::Receiver<SyncEvent>,
    handle: Option<JoinHandle<()>>,
    status: SyncStatus,
}

impl SyncWorker {
    pub fn spawn(store: Arc<dyn ProgressStore>, user: UserId) -> Self {
        let (tx, rx) = mpsc::channel::<SyncRequest>();
        let (event_tx, events) = mpsc::channel::<SyncEvent>();

        let handle = thread::spawn(move || run(store.as_ref(), &user, &rx, &event_tx));

        Self {
            tx,
            events,
            handle: Some(handle),
            status: SyncStatus::default(),
        }
    }

    /// Queue a patch. Never blocks; empty patches are dropped.
    pub fn submit(&mut self, patch: ProgressPatch) {
        if patch.is_empty() {
            return;
        }
        match self.tx.send(SyncRequest::Save(patch)) {
            Ok(()) => self.status.pending += 1,
            Err(_) => {
                warn!("sync worker stopped; progress not saved");
                self.status.error = Some("sync worker stopped".to_string());
            }
        }
    }

    /// Drain worker events into the status.
    pub fn poll(&mut self) -> &SyncStatus {
        while let Ok(event) = self.events.try_recv() {
            self.status.apply(event);
        }
        &self.status
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    /// Record a failure that happened outside the worker (e.g. the initial load).
    pub fn report_error(&mut self, error: String) {
        self.status.error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.status.error = None;
    }

    /// Wait until every patch submitted so far has been attempted.
    /// Returns false on timeout or if the worker is gone.
    pub fn flush(&mut self, timeout: Duration) -> bool {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.tx.send(SyncRequest::Flush(ack_tx)).is_err() {
            return false;
        }
        let done = ack_rx.recv_timeout(timeout).is_ok();
        self.poll();
        done
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        let _ = self.tx.send(SyncRequest::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(
    store: &dyn ProgressStore,
    user: &UserId,
    rx: &mpsc::Receiver<SyncRequest>,
    events: &mpsc::Sender<SyncEvent>,
) {
    while let Ok(request) = rx.recv() {
        let mut patch = match request {
            SyncRequest::Save(patch) => patch,
            SyncRequest::Flush(ack) => {
                let _ = ack.send(());
                continue;
            }
            SyncRequest::Shutdown => break,
        };

        let mut merged = 1;
        let mut acks = Vec::new();
        let mut shutdown = false;
        while let Ok(next) = rx.try_recv() {
            match next {
                SyncRequest::Save(later) => {
                    patch.merge(later);
                    merged += 1;
                }
                SyncRequest::Flush(ack) => acks.push(ack),
                SyncRequest::Shutdown => {
                    shutdown = true;
                    break;
                }
            }
        }

        let _ = events.send(SyncEvent::Started);
        match store.save(user, &patch) {
            Ok(()) => {
                debug!("synced {merged} change(s) for {user}");
                let _ = events.send(SyncEvent::Saved {
                    at: Utc::now(),
                    merged,
                });
            }
            Err(e) => {
                warn!("saving progress for {user} failed: {e}");
                let _ = events.send(SyncEvent::Failed {
                    error: e.to_string(),
                    merged,
                });
            }
        }
        for ack in acks {
            let _ = ack.send(());
        }
        if shutdown {
            break;
        }
    }
    info!("sync worker for {user} stopped");
}
