use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::rngs::SmallRng;
use thiserror::Error;

use crate::auth::{AuthProvider, UserIdentity};
use crate::catalog::Catalog;
use crate::engine::confidence::ConfidenceLevel;
use crate::engine::selection::{StudyFilter, StudyMode};
use crate::session::record::{self, StudyRecord};
use crate::session::state::{Changes, DEFAULT_AUTO_ADVANCE, StudyState};
use crate::store::{ProgressStore, StoreError};
use crate::store::schema::{ProgressPatch, ProgressSnapshot};
use crate::store::sync::{SyncStatus, SyncWorker};

pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(3);
/// Delay between attempts to load progress after a failed load.
pub const LOAD_RETRY: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("sign in to track progress")]
    SignInRequired,
}

pub struct TrackerOptions {
    pub auto_advance: Duration,
    /// Seeded generator for shuffles; entropy when absent.
    pub rng: Option<SmallRng>,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            auto_advance: DEFAULT_AUTO_ADVANCE,
            rng: None,
        }
    }
}

/// A signed-in user's study state, persisted in the background.
///
/// Every transition that changes a persisted field submits a patch carrying
/// just that field group.
///
/// Nothing is written until the stored document has been read. While the
/// store cannot be read, changes stay local and the load is retried from
/// [`ProgressTracker::tick`]; once it succeeds, ratings made in the meantime
/// are merged over the stored buckets.
pub struct ProgressTracker {
    user: UserIdentity,
    state: StudyState,
    store: Arc<dyn ProgressStore>,
    sync: SyncWorker,
    /// `Some` while writes are held back, with the next load attempt.
    load_retry: Option<Instant>,
    held: Changes,
    record: StudyRecord,
    history: Vec<StudyRecord>,
    streak_days: u32,
    last_studied: Option<DateTime<Utc>>,
}

impl ProgressTracker {
    pub fn start(
        catalog: Arc<Catalog>,
        auth: &dyn AuthProvider,
        store: Arc<dyn ProgressStore>,
        options: TrackerOptions,
    ) -> Result<Self, SessionError> {
        let user = auth.current_user().ok_or(SessionError::SignInRequired)?;

        let mut state = match options.rng {
            Some(rng) => StudyState::with_rng(catalog, rng),
            None => StudyState::new(catalog),
        };
        state.set_auto_advance(options.auto_advance);

        let loaded = store.load(&user.id);
        let mut sync = SyncWorker::spawn(Arc::clone(&store), user.id.clone());

        let mut snapshot = ProgressSnapshot::default();
        let mut load_retry = None;
        match loaded {
            Ok(Some(stored)) => {
                info!("loaded progress for {}", user.id);
                state.restore(&stored);
                snapshot = stored;
            }
            Ok(None) => {
                info!("no stored progress for {}; starting fresh", user.id);
                sync.submit(ProgressPatch::from(&state.snapshot()));
            }
            // Unparseable: nothing to keep, the first save replaces it.
            Err(e @ StoreError::Corrupt { .. }) => {
                warn!("{e}; starting fresh");
                sync.report_error(format!("load failed: {e}"));
            }
            Err(e) => {
                warn!("loading progress for {} failed, holding writes: {e}", user.id);
                sync.report_error(format!("load failed: {e}"));
                load_retry = Some(Instant::now() + LOAD_RETRY);
            }
        }

        let mut tracker = Self {
            record: StudyRecord::start(Utc::now(), state.domains().ids(), state.mode()),
            user,
            state,
            store,
            sync,
            load_retry,
            held: Changes::default(),
            history: snapshot.study_sessions,
            streak_days: snapshot.streak_days,
            last_studied: snapshot.last_studied,
        };
        // Writes back any repair made while restoring.
        tracker.commit();
        Ok(tracker)
    }

    pub fn user(&self) -> &UserIdentity {
        &self.user
    }

    pub fn state(&self) -> &StudyState {
        &self.state
    }

    pub fn history(&self) -> &[StudyRecord] {
        &self.history
    }

    pub fn current_record(&self) -> &StudyRecord {
        &self.record
    }

    pub fn streak_days(&self) -> u32 {
        self.streak_days
    }

    pub fn last_studied(&self) -> Option<DateTime<Utc>> {
        self.last_studied
    }

    /// False while the stored document has not been read and writes are held.
    pub fn is_synced(&self) -> bool {
        self.load_retry.is_none()
    }

    pub fn sync_status(&self) -> &SyncStatus {
        self.sync.status()
    }

    /// Drain background sync events; call once per UI tick.
    pub fn poll_sync(&mut self) -> &SyncStatus {
        self.sync.poll()
    }

    pub fn flip(&mut self) -> bool {
        self.state.flip()
    }

    pub fn rate(&mut self, level: ConfidenceLevel, now: Instant) -> bool {
        let rated = self.state.rate_current(level, now);
        if rated {
            self.record.record_rating(level);
        }
        self.commit();
        rated
    }

    pub fn advance(&mut self) -> bool {
        self.state.advance()
    }

    pub fn retreat(&mut self) -> bool {
        self.state.retreat()
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.state.toggle_shuffle()
    }

    pub fn change_domain(&mut self, domain: &str) -> bool {
        let changed = self.state.change_domain(domain);
        self.commit();
        changed
    }

    pub fn change_category(&mut self, level: ConfidenceLevel) -> bool {
        let changed = self.state.change_category(level);
        self.commit();
        changed
    }

    pub fn change_study_filter(&mut self, study_filter: StudyFilter) -> bool {
        let changed = self.state.change_study_filter(study_filter);
        self.commit();
        changed
    }

    pub fn switch_mode(&mut self, mode: StudyMode) -> bool {
        let changed = self.state.switch_mode(mode);
        if changed {
            self.record.mode = mode;
        }
        self.commit();
        changed
    }

    pub fn reset_all(&mut self) -> bool {
        let changed = self.state.reset_all();
        self.commit();
        changed
    }

    pub fn reset_buckets(&mut self, levels: &[ConfidenceLevel]) -> bool {
        let changed = self.state.reset_buckets(levels);
        self.commit();
        changed
    }

    /// Fire due timers and retry a failed load when due. Returns true if the
    /// view changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = self.state.poll_timers(now);
        if self.load_retry.is_some_and(|at| now >= at) {
            changed |= self.reload(now);
        }
        changed
    }

    /// Read the stored document again and merge local changes over it.
    /// Returns true once writes are released.
    fn reload(&mut self, now: Instant) -> bool {
        let stored = match self.store.load(&self.user.id) {
            Ok(stored) => stored.unwrap_or_default(),
            Err(e) => {
                debug!("progress for {} still unavailable: {e}", self.user.id);
                self.load_retry = Some(now + LOAD_RETRY);
                return false;
            }
        };
        info!("loaded progress for {} after retry", self.user.id);

        let held = std::mem::take(&mut self.held);
        let local = self.state.snapshot();
        let mut merged = stored;
        if held.classification {
            for level in ConfidenceLevel::ALL {
                for id in local.confidence_tracking.bucket(level) {
                    merged.confidence_tracking.classify(id, level);
                }
            }
        }
        if held.selection {
            merged.selected_domains = local.selected_domains;
            merged.selected_confidence_categories = local.selected_confidence_categories;
            merged.study_filter = local.study_filter;
            merged.current_mode = local.current_mode;
        }

        self.state.restore(&merged);
        self.history = merged.study_sessions;
        self.streak_days = merged.streak_days;
        self.last_studied = merged.last_studied;
        self.load_retry = None;
        self.sync.clear_error();

        let repaired = self.state.take_changes();
        self.sync.submit(self.state.patch(Changes {
            classification: held.classification || repaired.classification,
            selection: held.selection || repaired.selection,
        }));
        true
    }

    /// Close the study record, update the streak, and wait for pending saves.
    /// A sitting with no ratings leaves history and streak untouched.
    ///
    /// Returns false if saves did not complete, including when the stored
    /// document could never be read and nothing was written.
    pub fn finish(&mut self, now: DateTime<Utc>) -> bool {
        if self.load_retry.is_some() {
            self.reload(Instant::now());
        }
        if !self.record.is_empty() {
            let mut record = std::mem::replace(
                &mut self.record,
                StudyRecord::start(now, self.state.domains().ids(), self.state.mode()),
            );
            record.domains = self.state.domains().ids();
            record.finish(now);
            info!(
                "session {} ended: {} cards, {} correct",
                record.id, record.cards_studied, record.correct_answers
            );
            record::push_record(&mut self.history, record);
            self.streak_days = record::next_streak(self.streak_days, self.last_studied, now);
            self.last_studied = Some(now);
            if self.load_retry.is_none() {
                self.sync.submit(ProgressPatch {
                    streak_days: Some(self.streak_days),
                    last_studied: self.last_studied,
                    study_sessions: Some(self.history.clone()),
                    ..Default::default()
                });
            }
        }
        if self.load_retry.is_some() {
            warn!("progress for {} was never loaded; nothing saved", self.user.id);
            self.sync.flush(FLUSH_TIMEOUT);
            return false;
        }
        self.sync.flush(FLUSH_TIMEOUT)
    }

    fn commit(&mut self) {
        let changes = self.state.take_changes();
        if !changes.any() {
            return;
        }
        if self.load_retry.is_some() {
            self.held.classification |= changes.classification;
            self.held.selection |= changes.selection;
            return;
        }
        self.sync.submit(self.state.patch(changes));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{LocalAuth, UserId};
    use crate::catalog::CardId;
    use crate::catalog::tests::sample_catalog;
    use crate::store::memory::MemoryStore;
    use chrono::TimeZone;
    use rand::SeedableRng;

    fn signed_in(name: &str) -> LocalAuth {
        let mut auth = LocalAuth::new();
        auth.sign_in(name).unwrap();
        auth
    }

    fn options() -> TrackerOptions {
        TrackerOptions {
            rng: Some(SmallRng::seed_from_u64(1)),
            ..Default::default()
        }
    }

    #[test]
    fn test_start_requires_identity() {
        let result = ProgressTracker::start(
            Arc::new(sample_catalog()),
            &LocalAuth::new(),
            Arc::new(MemoryStore::new()),
            options(),
        );
        assert!(matches!(result, Err(SessionError::SignInRequired)));
    }

    #[test]
    fn test_new_user_gets_default_document() {
        let store = Arc::new(MemoryStore::new());
        let mut tracker = ProgressTracker::start(
            Arc::new(sample_catalog()),
            &signed_in("alice"),
            store.clone(),
            options(),
        )
        .unwrap();
        assert!(tracker.finish(Utc::now()));
        let doc = store.document(&UserId::from("alice")).unwrap();
        assert!(doc.selected_domains.is_all());
        assert_eq!(doc.current_mode, StudyMode::Study);
    }

    #[test]
    fn test_stored_progress_restored() {
        let mut stored = ProgressSnapshot::default();
        stored
            .confidence_tracking
            .classify(&CardId::from("a2"), ConfidenceLevel::Peeked);
        stored.score.incorrect = 1;
        stored.study_filter = StudyFilter::Unanswered;
        stored.streak_days = 6;
        let store = Arc::new(MemoryStore::with_document(UserId::from("bob"), stored));

        let tracker = ProgressTracker::start(
            Arc::new(sample_catalog()),
            &signed_in("Bob"),
            store,
            options(),
        )
        .unwrap();
        assert_eq!(tracker.state().study_filter(), StudyFilter::Unanswered);
        assert_eq!(tracker.state().visible_cards().len(), 3);
        assert_eq!(tracker.streak_days(), 6);
    }

    #[test]
    fn test_load_failure_falls_back_and_reports() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let tracker = ProgressTracker::start(
            Arc::new(sample_catalog()),
            &signed_in("carol"),
            store,
            options(),
        )
        .unwrap();
        assert!(tracker.state().tracking().is_empty());
        assert!(tracker.sync_status().error.is_some());
        assert!(!tracker.is_synced());
    }

    fn three_known() -> ProgressSnapshot {
        let mut stored = ProgressSnapshot::default();
        for id in ["a2", "b1", "b2"] {
            stored
                .confidence_tracking
                .classify(&CardId::from(id), ConfidenceLevel::KnewIt);
        }
        stored.score.correct = 3;
        stored.streak_days = 4;
        stored
    }

    #[test]
    fn test_unread_progress_not_overwritten_after_store_recovers() {
        let store = Arc::new(MemoryStore::with_document(UserId::from("frank"), three_known()));
        store.set_failing(true);
        let mut tracker = ProgressTracker::start(
            Arc::new(sample_catalog()),
            &signed_in("frank"),
            store.clone(),
            options(),
        )
        .unwrap();

        let t0 = Instant::now();
        tracker.flip();
        assert!(tracker.rate(ConfidenceLevel::Peeked, t0));
        tracker.switch_mode(StudyMode::Review);
        assert_eq!(store.save_count(), 0);

        store.set_failing(false);
        assert!(!tracker.tick(t0));
        assert!(tracker.tick(t0 + LOAD_RETRY + Duration::from_secs(1)));
        assert!(tracker.is_synced());
        assert!(tracker.sync_status().error.is_none());
        assert_eq!(tracker.state().tracking().rated_count(), 4);
        assert_eq!(tracker.streak_days(), 4);

        assert!(tracker.finish(Utc::now()));
        let doc = store.document(&UserId::from("frank")).unwrap();
        assert_eq!(doc.confidence_tracking.count(ConfidenceLevel::KnewIt), 3);
        assert_eq!(
            doc.confidence_tracking.level_of(&CardId::from("a1")),
            Some(ConfidenceLevel::Peeked)
        );
        assert_eq!(doc.score.correct, 3);
        assert_eq!(doc.score.incorrect, 1);
        assert_eq!(doc.current_mode, StudyMode::Review);
        assert_eq!(doc.study_sessions.len(), 1);
    }

    #[test]
    fn test_finish_writes_nothing_when_store_never_recovers() {
        let store = Arc::new(MemoryStore::with_document(UserId::from("gina"), three_known()));
        store.set_failing(true);
        let mut tracker = ProgressTracker::start(
            Arc::new(sample_catalog()),
            &signed_in("gina"),
            store.clone(),
            options(),
        )
        .unwrap();
        tracker.flip();
        assert!(tracker.rate(ConfidenceLevel::Peeked, Instant::now()));

        assert!(!tracker.finish(Utc::now()));
        assert_eq!(store.save_count(), 0);
        store.set_failing(false);
        assert_eq!(store.document(&UserId::from("gina")).unwrap(), three_known());
    }

    #[test]
    fn test_newer_document_holds_writes() {
        let mut stored = three_known();
        stored.version = 99;
        let store = Arc::new(MemoryStore::with_document(UserId::from("hugo"), stored.clone()));
        let mut tracker = ProgressTracker::start(
            Arc::new(sample_catalog()),
            &signed_in("hugo"),
            store.clone(),
            options(),
        )
        .unwrap();
        assert!(!tracker.is_synced());
        tracker.flip();
        assert!(tracker.rate(ConfidenceLevel::KnewIt, Instant::now()));

        assert!(!tracker.finish(Utc::now()));
        assert_eq!(store.save_count(), 0);
        assert_eq!(store.document(&UserId::from("hugo")).unwrap(), stored);
    }

    #[test]
    fn test_ratings_persist_and_finish_records_session() {
        let store = Arc::new(MemoryStore::new());
        let mut tracker = ProgressTracker::start(
            Arc::new(sample_catalog()),
            &signed_in("dana"),
            store.clone(),
            options(),
        )
        .unwrap();
        let t0 = Instant::now();
        tracker.flip();
        assert!(tracker.rate(ConfidenceLevel::KnewIt, t0));
        assert!(tracker.tick(t0 + Duration::from_millis(500)));
        tracker.flip();
        assert!(tracker.rate(ConfidenceLevel::Peeked, t0));

        let end = Utc.with_ymd_and_hms(2026, 5, 2, 18, 0, 0).unwrap();
        assert!(tracker.finish(end));

        let doc = store.document(&UserId::from("dana")).unwrap();
        assert_eq!(doc.score.correct, 1);
        assert_eq!(doc.score.incorrect, 1);
        assert_eq!(doc.completed_card_ids.len(), 2);
        assert_eq!(doc.study_sessions.len(), 1);
        assert_eq!(doc.study_sessions[0].cards_studied, 2);
        assert_eq!(doc.streak_days, 1);
        assert_eq!(doc.last_studied, Some(end));
        assert!(tracker.sync_status().last_sync.is_some());
    }

    #[test]
    fn test_finish_without_ratings_keeps_history() {
        let store = Arc::new(MemoryStore::new());
        let mut tracker = ProgressTracker::start(
            Arc::new(sample_catalog()),
            &signed_in("erin"),
            store.clone(),
            options(),
        )
        .unwrap();
        tracker.change_domain("A");
        assert!(tracker.finish(Utc::now()));
        let doc = store.document(&UserId::from("erin")).unwrap();
        assert!(doc.study_sessions.is_empty());
        assert_eq!(doc.streak_days, 0);
        assert!(!doc.selected_domains.is_all());
    }
}
