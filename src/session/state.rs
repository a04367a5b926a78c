use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::catalog::{Card, CardId, Catalog};
use crate::engine::confidence::{ConfidenceLevel, ConfidenceTracking, Score};
use crate::engine::filter;
use crate::engine::selection::{ALL_DOMAINS, DomainSelection, StudyFilter, StudyMode};
use crate::session::timer::{TaskId, TimerQueue};
use crate::store::schema::{ProgressPatch, ProgressSnapshot};

pub const DEFAULT_AUTO_ADVANCE: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Deferred {
    Advance,
}

/// Which persisted field groups changed since the last [`StudyState::take_changes`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Changes {
    /// Buckets, score and completed ids.
    pub classification: bool,
    /// Domains, categories, filter and mode.
    pub selection: bool,
}

impl Changes {
    pub fn any(self) -> bool {
        self.classification || self.selection
    }
}

/// Study progress for one user: confidence buckets, the filter inputs, and
/// the navigation cursor over the resulting card list.
///
/// Every transition leaves the state settled: the score matches the buckets,
/// the cursor is inside the visible list (or zero when it is empty), and a
/// shuffle order always has exactly as many entries as the visible list.
pub struct StudyState {
    catalog: Arc<Catalog>,
    tracking: ConfidenceTracking,
    score: Score,
    domains: DomainSelection,
    mode: StudyMode,
    categories: Vec<ConfidenceLevel>,
    study_filter: StudyFilter,
    cursor: usize,
    flipped: bool,
    answered: bool,
    last_rating: Option<ConfidenceLevel>,
    shuffle: Option<Vec<usize>>,
    timers: TimerQueue<Deferred>,
    pending_advance: Option<TaskId>,
    auto_advance: Duration,
    changes: Changes,
    rng: SmallRng,
}

impl StudyState {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_rng(catalog, SmallRng::from_entropy())
    }

    pub fn with_rng(catalog: Arc<Catalog>, rng: SmallRng) -> Self {
        Self {
            catalog,
            tracking: ConfidenceTracking::new(),
            score: Score::default(),
            domains: DomainSelection::All,
            mode: StudyMode::Study,
            categories: Vec::new(),
            study_filter: StudyFilter::All,
            cursor: 0,
            flipped: false,
            answered: false,
            last_rating: None,
            shuffle: None,
            timers: TimerQueue::new(),
            pending_advance: None,
            auto_advance: DEFAULT_AUTO_ADVANCE,
            changes: Changes::default(),
            rng,
        }
    }

    pub fn set_auto_advance(&mut self, delay: Duration) {
        self.auto_advance = delay;
    }

    /// Adopt a stored snapshot. Ids unknown to the catalog are dropped and a
    /// card rated in several buckets keeps only the first; any such repair
    /// marks the classification dirty so it is written back.
    pub fn restore(&mut self, snapshot: &ProgressSnapshot) {
        let catalog = Arc::clone(&self.catalog);
        let mut tracking = snapshot.confidence_tracking.clone();
        let pruned = tracking.retain(|id| catalog.contains(id));
        let deduped = tracking.normalize();
        self.tracking = tracking;
        self.score = Score::tally(&self.tracking);
        if pruned || deduped || self.score != snapshot.score {
            self.changes.classification = true;
        }

        self.domains = match &snapshot.selected_domains {
            DomainSelection::All => DomainSelection::All,
            DomainSelection::Domains(ids) => DomainSelection::from(
                ids.iter()
                    .filter(|id| catalog.domain(id).is_some())
                    .cloned()
                    .collect::<Vec<_>>(),
            ),
        };
        self.mode = snapshot.current_mode;
        self.categories = Vec::new();
        if self.mode == StudyMode::Review {
            for level in &snapshot.selected_confidence_categories {
                if !self.categories.contains(level) {
                    self.categories.push(*level);
                }
            }
        }
        self.study_filter = snapshot.study_filter;

        self.shuffle = None;
        self.reset_view();
        self.settle();
    }

    // --- reads ---

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn tracking(&self) -> &ConfidenceTracking {
        &self.tracking
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn domains(&self) -> &DomainSelection {
        &self.domains
    }

    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    pub fn categories(&self) -> &[ConfidenceLevel] {
        &self.categories
    }

    pub fn study_filter(&self) -> StudyFilter {
        self.study_filter
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn is_answered(&self) -> bool {
        self.answered
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle.is_some()
    }

    pub fn shuffle_order(&self) -> Option<&[usize]> {
        self.shuffle.as_deref()
    }

    /// Rating given to the card on screen, until the view moves on.
    pub fn last_rating(&self) -> Option<ConfidenceLevel> {
        self.last_rating
    }

    pub fn is_advance_pending(&self) -> bool {
        self.pending_advance.is_some()
    }

    pub fn visible_cards(&self) -> Vec<&Card> {
        filter::visible_cards(
            self.catalog.cards(),
            &self.domains,
            self.mode,
            &self.categories,
            &self.tracking,
            self.study_filter,
        )
    }

    /// Resolve the cursor against `visible`, through the shuffle order when
    /// one is active and still matches the list.
    pub fn card_at_cursor<'a>(&self, visible: &[&'a Card]) -> Option<&'a Card> {
        match &self.shuffle {
            Some(order) if order.len() == visible.len() => order
                .get(self.cursor)
                .and_then(|&idx| visible.get(idx).copied()),
            _ => visible.get(self.cursor).copied(),
        }
    }

    pub fn current_card(&self) -> Option<&Card> {
        let visible = self.visible_cards();
        self.card_at_cursor(&visible)
    }

    /// Ids rated in any bucket, in catalog order.
    pub fn completed_card_ids(&self) -> Vec<CardId> {
        let rated = self.tracking.rated_ids();
        self.catalog
            .cards()
            .iter()
            .filter(|card| rated.contains(&card.id))
            .map(|card| card.id.clone())
            .collect()
    }

    /// The final card of a non-empty list has been rated.
    pub fn is_complete(&self) -> bool {
        let len = self.visible_cards().len();
        len > 0 && self.cursor + 1 == len && self.answered
    }

    // --- transitions ---

    pub fn flip(&mut self) -> bool {
        if self.current_card().is_none() {
            return false;
        }
        self.flipped = !self.flipped;
        true
    }

    /// Record a confidence rating. Ignored while the current card already
    /// has one, and for ids the catalog does not know.
    ///
    /// When the card stays in the list and is not the last, an advance is
    /// scheduled `auto_advance` after `now`. When rating removes it from the
    /// list, the next card is already under the cursor and nothing is scheduled.
    pub fn rate_card(&mut self, level: ConfidenceLevel, card_id: &CardId, now: Instant) -> bool {
        if self.answered || !self.catalog.contains(card_id) {
            return false;
        }
        let len_before = self.visible_cards().len();

        self.tracking.classify(card_id, level);
        self.score = Score::tally(&self.tracking);
        self.changes.classification = true;

        let len_after = self.visible_cards().len();
        if len_after != len_before {
            self.shuffle = None;
            self.cancel_advance();
            self.clear_card_view();
        } else {
            self.answered = true;
            self.last_rating = Some(level);
            if self.cursor + 1 < len_after {
                self.cancel_advance();
                let id = self.timers.schedule(now, self.auto_advance, Deferred::Advance);
                self.pending_advance = Some(id);
            }
        }
        self.settle();
        true
    }

    pub fn rate_current(&mut self, level: ConfidenceLevel, now: Instant) -> bool {
        let Some(id) = self.current_card().map(|card| card.id.clone()) else {
            return false;
        };
        self.rate_card(level, &id, now)
    }

    /// Move to the next card, clearing flip and answered.
    ///
    /// On the last card the cursor cannot move, so nothing changes: the card
    /// keeps its flip and answered flags and a finished deck stays complete.
    pub fn advance(&mut self) -> bool {
        self.cancel_advance();
        let len = self.visible_cards().len();
        if self.cursor + 1 >= len {
            return false;
        }
        self.cursor += 1;
        self.clear_card_view();
        true
    }

    /// Move to the previous card, clearing flip and answered. Like
    /// [`StudyState::advance`], nothing changes on the first card.
    pub fn retreat(&mut self) -> bool {
        self.cancel_advance();
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.clear_card_view();
        true
    }

    /// Turn shuffle on with a fresh permutation of the visible list, or off.
    pub fn toggle_shuffle(&mut self) -> bool {
        if self.shuffle.take().is_none() {
            let mut order: Vec<usize> = (0..self.visible_cards().len()).collect();
            order.shuffle(&mut self.rng);
            self.shuffle = Some(order);
        }
        self.reset_view();
        self.settle();
        true
    }

    /// One domain picker click. Unknown domain ids are ignored.
    pub fn change_domain(&mut self, domain: &str) -> bool {
        if domain != ALL_DOMAINS && self.catalog.domain(domain).is_none() {
            return false;
        }
        self.domains.toggle(domain);
        self.selection_changed();
        true
    }

    /// Toggle one bucket in the review-mode category selection.
    pub fn change_category(&mut self, level: ConfidenceLevel) -> bool {
        if let Some(pos) = self.categories.iter().position(|l| *l == level) {
            self.categories.remove(pos);
        } else {
            self.categories.push(level);
        }
        self.selection_changed();
        true
    }

    pub fn change_study_filter(&mut self, study_filter: StudyFilter) -> bool {
        self.study_filter = study_filter;
        self.selection_changed();
        true
    }

    /// Entering study mode clears the review categories.
    pub fn switch_mode(&mut self, mode: StudyMode) -> bool {
        self.mode = mode;
        if mode == StudyMode::Study {
            self.categories.clear();
        }
        self.selection_changed();
        true
    }

    /// Back to a fresh profile: empty buckets, every domain, study mode.
    pub fn reset_all(&mut self) -> bool {
        self.tracking.clear_all();
        self.score = Score::default();
        self.domains = DomainSelection::All;
        self.mode = StudyMode::Study;
        self.categories.clear();
        self.study_filter = StudyFilter::All;
        self.changes.classification = true;
        self.selection_changed();
        true
    }

    /// Empty the named buckets. Returns false for an empty list.
    pub fn reset_buckets(&mut self, levels: &[ConfidenceLevel]) -> bool {
        if levels.is_empty() {
            return false;
        }
        for &level in levels {
            self.tracking.clear(level);
        }
        self.score = Score::tally(&self.tracking);
        self.changes.classification = true;
        self.reset_view();
        self.settle();
        true
    }

    /// Fire any deferred work due at `now`. Returns true if the view changed.
    pub fn poll_timers(&mut self, now: Instant) -> bool {
        let mut changed = false;
        for (id, task) in self.timers.take_due(now) {
            if self.pending_advance != Some(id) {
                continue;
            }
            self.pending_advance = None;
            match task {
                Deferred::Advance => changed |= self.advance(),
            }
        }
        changed
    }

    pub fn take_changes(&mut self) -> Changes {
        std::mem::take(&mut self.changes)
    }

    /// Field-level patch carrying exactly the groups in `changes`.
    pub fn patch(&self, changes: Changes) -> ProgressPatch {
        let mut patch = ProgressPatch::default();
        if changes.classification {
            patch.confidence_tracking = Some(self.tracking.clone());
            patch.score = Some(self.score);
            patch.completed_card_ids = Some(self.completed_card_ids());
        }
        if changes.selection {
            patch.selected_domains = Some(self.domains.clone());
            patch.selected_confidence_categories = Some(self.categories.clone());
            patch.study_filter = Some(self.study_filter);
            patch.current_mode = Some(self.mode);
        }
        patch
    }

    /// Full snapshot of the fields this state owns.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            confidence_tracking: self.tracking.clone(),
            score: self.score,
            selected_domains: self.domains.clone(),
            selected_confidence_categories: self.categories.clone(),
            study_filter: self.study_filter,
            current_mode: self.mode,
            completed_card_ids: self.completed_card_ids(),
            ..ProgressSnapshot::default()
        }
    }

    // --- internals ---

    fn selection_changed(&mut self) {
        self.changes.selection = true;
        self.shuffle = None;
        self.reset_view();
        self.settle();
    }

    fn cancel_advance(&mut self) {
        if let Some(id) = self.pending_advance.take() {
            self.timers.cancel(id);
        }
    }

    fn clear_card_view(&mut self) {
        self.flipped = false;
        self.answered = false;
        self.last_rating = None;
    }

    fn reset_view(&mut self) {
        self.cancel_advance();
        self.cursor = 0;
        self.clear_card_view();
    }

    fn settle(&mut self) {
        let len = self.visible_cards().len();
        if self.shuffle.as_ref().is_some_and(|order| order.len() != len) {
            self.shuffle = None;
        }
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;

    fn state() -> StudyState {
        StudyState::with_rng(Arc::new(sample_catalog()), SmallRng::seed_from_u64(7))
    }

    fn current_id(state: &StudyState) -> Option<String> {
        state.current_card().map(|c| c.id.as_str().to_string())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_fresh_state_shows_first_card() {
        let s = state();
        assert_eq!(current_id(&s).as_deref(), Some("a1"));
        assert_eq!(s.score(), Score::default());
        assert!(!s.is_flipped());
        assert!(!s.is_answered());
    }

    #[test]
    fn test_rating_schedules_advance() {
        let mut s = state();
        let t0 = Instant::now();
        assert!(s.flip());
        assert!(s.rate_current(ConfidenceLevel::KnewIt, t0));
        assert!(s.is_answered());
        assert_eq!(s.score().correct, 1);
        assert_eq!(s.last_rating(), Some(ConfidenceLevel::KnewIt));

        assert!(!s.poll_timers(t0 + ms(499)));
        assert_eq!(s.cursor(), 0);
        assert!(s.poll_timers(t0 + ms(500)));
        assert_eq!(current_id(&s).as_deref(), Some("a2"));
        assert!(!s.is_flipped());
        assert!(!s.is_answered());
    }

    #[test]
    fn test_second_rating_ignored_while_answered() {
        let mut s = state();
        let t0 = Instant::now();
        assert!(s.rate_current(ConfidenceLevel::Peeked, t0));
        assert!(!s.rate_current(ConfidenceLevel::KnewIt, t0));
        assert_eq!(s.tracking().level_of(&CardId::from("a1")), Some(ConfidenceLevel::Peeked));
        assert_eq!(s.score().incorrect, 1);
    }

    #[test]
    fn test_rerating_moves_card_between_buckets() {
        let mut s = state();
        let t0 = Instant::now();
        let a1 = CardId::from("a1");
        s.rate_card(ConfidenceLevel::Peeked, &a1, t0);
        s.advance();
        s.retreat();
        s.rate_card(ConfidenceLevel::KnewIt, &a1, t0);
        assert_eq!(s.tracking().rated_count(), 1);
        assert_eq!(s.tracking().level_of(&a1), Some(ConfidenceLevel::KnewIt));
        assert_eq!(s.score(), Score { correct: 1, incorrect: 0 });
    }

    #[test]
    fn test_unknown_card_id_ignored() {
        let mut s = state();
        assert!(!s.rate_card(ConfidenceLevel::KnewIt, &CardId::from("zz"), Instant::now()));
        assert!(s.tracking().is_empty());
        assert!(!s.take_changes().any());
    }

    #[test]
    fn test_manual_navigation_cancels_advance() {
        let mut s = state();
        let t0 = Instant::now();
        s.rate_current(ConfidenceLevel::QuickThink, t0);
        assert!(s.is_advance_pending());
        assert!(s.advance());
        assert!(!s.is_advance_pending());
        assert!(!s.poll_timers(t0 + ms(1000)));
        assert_eq!(current_id(&s).as_deref(), Some("a2"));
    }

    #[test]
    fn test_last_card_rating_completes_without_advance() {
        let mut s = state();
        let t0 = Instant::now();
        for _ in 0..3 {
            s.advance();
        }
        assert_eq!(current_id(&s).as_deref(), Some("b2"));
        s.flip();
        s.rate_current(ConfidenceLevel::LongThink, t0);
        assert!(!s.is_advance_pending());
        assert!(s.is_complete());
        assert!(!s.advance());
        assert_eq!(s.cursor(), 3);
        assert!(s.is_flipped());
        assert!(s.is_answered());
        assert!(s.is_complete());
    }

    #[test]
    fn test_retreat_at_start_is_noop() {
        let mut s = state();
        s.flip();
        assert!(!s.retreat());
        assert_eq!(s.cursor(), 0);
        assert!(s.is_flipped());
    }

    #[test]
    fn test_unanswered_filter_drops_rated_card_in_place() {
        let mut s = state();
        let t0 = Instant::now();
        s.change_study_filter(StudyFilter::Unanswered);
        s.flip();
        s.rate_current(ConfidenceLevel::KnewIt, t0);
        assert_eq!(current_id(&s).as_deref(), Some("a2"));
        assert!(!s.is_answered());
        assert!(!s.is_flipped());
        assert!(!s.is_advance_pending());
        assert_eq!(s.visible_cards().len(), 3);
    }

    #[test]
    fn test_unanswered_last_card_clamps_cursor() {
        let mut s = state();
        let t0 = Instant::now();
        s.change_study_filter(StudyFilter::Unanswered);
        for _ in 0..3 {
            s.advance();
        }
        s.rate_current(ConfidenceLevel::KnewIt, t0);
        assert_eq!(s.cursor(), 2);
        assert_eq!(current_id(&s).as_deref(), Some("b1"));
    }

    #[test]
    fn test_review_mode_empty_until_category_chosen() {
        let mut s = state();
        let t0 = Instant::now();
        s.rate_current(ConfidenceLevel::Peeked, t0);
        s.switch_mode(StudyMode::Review);
        assert!(s.visible_cards().is_empty());
        assert!(s.current_card().is_none());
        assert!(!s.flip());
        s.change_category(ConfidenceLevel::Peeked);
        assert_eq!(current_id(&s).as_deref(), Some("a1"));
    }

    #[test]
    fn test_switch_to_study_clears_categories() {
        let mut s = state();
        s.switch_mode(StudyMode::Review);
        s.change_category(ConfidenceLevel::KnewIt);
        s.change_category(ConfidenceLevel::Peeked);
        s.change_category(ConfidenceLevel::KnewIt);
        assert_eq!(s.categories(), &[ConfidenceLevel::Peeked]);
        s.switch_mode(StudyMode::Study);
        assert!(s.categories().is_empty());
    }

    #[test]
    fn test_domain_change_resets_view_and_shuffle() {
        let mut s = state();
        s.toggle_shuffle();
        s.advance();
        s.flip();
        assert!(s.change_domain("B"));
        assert!(!s.is_shuffled());
        assert_eq!(s.cursor(), 0);
        assert!(!s.is_flipped());
        assert_eq!(current_id(&s).as_deref(), Some("b1"));
        assert!(!s.change_domain("nope"));
        assert!(s.change_domain(ALL_DOMAINS));
        assert!(s.domains().is_all());
    }

    #[test]
    fn test_shuffle_is_permutation_of_visible() {
        let mut s = state();
        s.toggle_shuffle();
        let mut order = s.shuffle_order().unwrap().to_vec();
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2, 3]);

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(current_id(&s).unwrap());
            s.advance();
        }
        seen.sort();
        assert_eq!(seen, vec!["a1", "a2", "b1", "b2"]);

        s.toggle_shuffle();
        assert!(!s.is_shuffled());
        assert_eq!(current_id(&s).as_deref(), Some("a1"));
    }

    #[test]
    fn test_shuffle_dropped_when_list_shrinks() {
        let mut s = state();
        s.change_study_filter(StudyFilter::Unanswered);
        s.toggle_shuffle();
        s.rate_current(ConfidenceLevel::KnewIt, Instant::now());
        assert!(!s.is_shuffled());
    }

    #[test]
    fn test_reset_buckets_recomputes_score() {
        let mut s = state();
        let t0 = Instant::now();
        s.rate_card(ConfidenceLevel::KnewIt, &CardId::from("a1"), t0);
        s.advance();
        s.rate_card(ConfidenceLevel::Peeked, &CardId::from("a2"), t0);
        s.advance();
        s.rate_card(ConfidenceLevel::LongThink, &CardId::from("b1"), t0);

        assert!(!s.reset_buckets(&[]));
        assert!(s.reset_buckets(&ConfidenceLevel::WEAK));
        assert_eq!(s.score(), Score { correct: 1, incorrect: 0 });
        assert_eq!(s.completed_card_ids(), vec![CardId::from("a1")]);
        assert_eq!(s.cursor(), 0);
    }

    #[test]
    fn test_reset_all_restores_defaults() {
        let mut s = state();
        s.rate_current(ConfidenceLevel::KnewIt, Instant::now());
        s.change_domain("A");
        s.switch_mode(StudyMode::Review);
        s.change_category(ConfidenceLevel::KnewIt);
        s.take_changes();

        s.reset_all();
        assert!(s.tracking().is_empty());
        assert_eq!(s.score(), Score::default());
        assert!(s.domains().is_all());
        assert_eq!(s.mode(), StudyMode::Study);
        assert!(s.categories().is_empty());
        let changes = s.take_changes();
        assert!(changes.classification && changes.selection);
    }

    #[test]
    fn test_patch_carries_only_changed_groups() {
        let mut s = state();
        s.rate_current(ConfidenceLevel::KnewIt, Instant::now());
        let changes = s.take_changes();
        let patch = s.patch(changes);
        assert!(patch.confidence_tracking.is_some());
        assert_eq!(patch.completed_card_ids, Some(vec![CardId::from("a1")]));
        assert!(patch.selected_domains.is_none());

        s.change_study_filter(StudyFilter::Unanswered);
        let changes = s.take_changes();
        let patch = s.patch(changes);
        assert!(patch.confidence_tracking.is_none());
        assert_eq!(patch.study_filter, Some(StudyFilter::Unanswered));
        assert!(!s.take_changes().any());
    }

    #[test]
    fn test_restore_repairs_stored_document() {
        let mut snapshot = ProgressSnapshot::default();
        snapshot
            .confidence_tracking
            .classify(&CardId::from("gone"), ConfidenceLevel::KnewIt);
        snapshot
            .confidence_tracking
            .classify(&CardId::from("b1"), ConfidenceLevel::Peeked);
        snapshot.score = Score { correct: 9, incorrect: 9 };
        snapshot.selected_domains = DomainSelection::Domains(vec!["B".into(), "Z".into()]);
        snapshot.current_mode = StudyMode::Review;
        snapshot.selected_confidence_categories =
            vec![ConfidenceLevel::Peeked, ConfidenceLevel::Peeked];

        let mut s = state();
        s.restore(&snapshot);
        assert_eq!(s.tracking().rated_count(), 1);
        assert_eq!(s.score(), Score { correct: 0, incorrect: 1 });
        assert_eq!(s.domains(), &DomainSelection::Domains(vec!["B".into()]));
        assert_eq!(s.categories(), &[ConfidenceLevel::Peeked]);
        assert_eq!(current_id(&s).as_deref(), Some("b1"));
        assert!(s.take_changes().classification);
    }
}
