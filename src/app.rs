use std::sync::Arc;
use std::sync::mpsc;
use std::time::Instant;

use chrono::Utc;
use log::{error, info, warn};

use crate::auth::{AuthListener, AuthProvider, AuthState, LocalAuth, MAX_PROFILE_NAME_LEN};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::engine::confidence::ConfidenceLevel;
use crate::engine::scoring::{self, ProgressSummary};
use crate::engine::selection::{ALL_DOMAINS, StudyMode};
use crate::session::tracker::{ProgressTracker, TrackerOptions};
use crate::store::ProgressStore;
use crate::ui::components::picker::{PickerCursor, PickerItem};
use crate::ui::components::reset_dialog::ResetSelection;
use crate::ui::line_input::{InputResult, LineInput};
use crate::ui::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    SignIn,
    Study,
    Stats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickerKind {
    Domains,
    Categories,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Overlay {
    None,
    Picker { kind: PickerKind, cursor: PickerCursor },
    Reset(ResetSelection),
}

pub struct App {
    pub screen: AppScreen,
    pub overlay: Overlay,
    pub theme: &'static Theme,
    pub config: Config,
    pub catalog: Arc<Catalog>,
    pub auth: LocalAuth,
    pub tracker: Option<ProgressTracker>,
    pub sign_in: LineInput,
    pub sign_in_error: Option<String>,
    pub should_quit: bool,
    store: Arc<dyn ProgressStore>,
    auth_events: mpsc::Receiver<AuthState>,
    persist_config: bool,
}

impl App {
    pub fn new(
        config: Config,
        theme: &'static Theme,
        catalog: Arc<Catalog>,
        store: Arc<dyn ProgressStore>,
    ) -> Self {
        let (tx, auth_events) = mpsc::channel();
        let mut auth = LocalAuth::new();
        let listener: AuthListener = Box::new(move |state: &AuthState| {
            let _ = tx.send(state.clone());
        });
        auth.on_auth_change(listener);

        let sign_in = LineInput::new(config.last_user.as_deref().unwrap_or(""), MAX_PROFILE_NAME_LEN);

        let mut app = Self {
            screen: AppScreen::SignIn,
            overlay: Overlay::None,
            theme,
            config,
            catalog,
            auth,
            tracker: None,
            sign_in,
            sign_in_error: None,
            should_quit: false,
            store,
            auth_events,
            persist_config: false,
        };
        app.process_auth_events();
        app
    }

    /// Write `last_user` back to the config file on sign-in.
    pub fn persist_config(mut self, enabled: bool) -> Self {
        self.persist_config = enabled;
        self
    }

    // --- auth ---

    pub fn sign_in_as(&mut self, name: &str) -> bool {
        match self.auth.sign_in(name) {
            Ok(identity) => {
                self.sign_in_error = None;
                if self.config.remember_user {
                    self.config.last_user = Some(identity.display_name);
                    self.save_config();
                }
                self.process_auth_events();
                self.tracker.is_some()
            }
            Err(e) => {
                self.sign_in_error = Some(e.to_string());
                false
            }
        }
    }

    pub fn handle_sign_in_key(&mut self, key: crossterm::event::KeyEvent) {
        match self.sign_in.handle(key) {
            InputResult::Submit => {
                let name = self.sign_in.value().to_string();
                self.sign_in_as(&name);
            }
            InputResult::Cancel => self.should_quit = true,
            InputResult::Continue => {}
        }
    }

    pub fn sign_out(&mut self) {
        if let Err(e) = self.auth.sign_out() {
            warn!("sign out ignored: {e}");
        }
        self.process_auth_events();
    }

    /// Apply auth changes delivered by the provider's listener.
    pub fn process_auth_events(&mut self) {
        while let Ok(state) = self.auth_events.try_recv() {
            match state {
                AuthState::SignedIn(user) => {
                    if self.tracker.as_ref().is_some_and(|t| t.user().id == user.id) {
                        continue;
                    }
                    self.end_session();
                    self.start_session();
                }
                AuthState::SignedOut => {
                    self.end_session();
                    self.screen = AppScreen::SignIn;
                    self.overlay = Overlay::None;
                }
            }
        }
    }

    fn start_session(&mut self) {
        let options = TrackerOptions {
            auto_advance: self.config.auto_advance(),
            rng: None,
        };
        match ProgressTracker::start(
            Arc::clone(&self.catalog),
            &self.auth,
            Arc::clone(&self.store),
            options,
        ) {
            Ok(tracker) => {
                info!("study session started for {}", tracker.user().id);
                self.tracker = Some(tracker);
                self.screen = AppScreen::Study;
                self.overlay = Overlay::None;
            }
            Err(e) => {
                self.sign_in_error = Some(e.to_string());
                self.screen = AppScreen::SignIn;
            }
        }
    }

    fn end_session(&mut self) {
        if let Some(mut tracker) = self.tracker.take() {
            if !tracker.finish(Utc::now()) {
                warn!("pending progress for {} not confirmed saved", tracker.user().id);
            }
        }
    }

    fn save_config(&self) {
        if !self.persist_config {
            return;
        }
        if let Err(e) = self.config.save() {
            error!("saving config failed: {e:#}");
        }
    }

    /// Close the session cleanly before exit.
    pub fn shutdown(&mut self) {
        self.end_session();
    }

    // --- study ---

    pub fn tick(&mut self, now: Instant) {
        self.process_auth_events();
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.tick(now);
            tracker.poll_sync();
        }
    }

    /// Rate the card on screen. Only offered in study mode once the card is
    /// flipped.
    pub fn rate(&mut self, level: ConfidenceLevel, now: Instant) -> bool {
        let Some(tracker) = self.tracker.as_mut() else {
            return false;
        };
        let state = tracker.state();
        if state.mode() != StudyMode::Study || !state.is_flipped() {
            return false;
        }
        tracker.rate(level, now)
    }

    pub fn toggle_mode(&mut self) {
        if let Some(tracker) = self.tracker.as_mut() {
            let next = tracker.state().mode().toggled();
            tracker.switch_mode(next);
        }
        if matches!(
            self.overlay,
            Overlay::Picker {
                kind: PickerKind::Categories,
                ..
            }
        ) {
            self.overlay = Overlay::None;
        }
    }

    pub fn toggle_study_filter(&mut self) {
        if let Some(tracker) = self.tracker.as_mut() {
            if tracker.state().mode() == StudyMode::Study {
                let next = tracker.state().study_filter().toggled();
                tracker.change_study_filter(next);
            }
        }
    }

    pub fn open_picker(&mut self, kind: PickerKind) {
        let Some(tracker) = self.tracker.as_ref() else {
            return;
        };
        if kind == PickerKind::Categories && tracker.state().mode() != StudyMode::Review {
            return;
        }
        self.overlay = Overlay::Picker {
            kind,
            cursor: PickerCursor::default(),
        };
    }

    pub fn picker_items(&self, kind: PickerKind) -> Vec<PickerItem> {
        let Some(tracker) = self.tracker.as_ref() else {
            return Vec::new();
        };
        let state = tracker.state();
        match kind {
            PickerKind::Domains => {
                let mut items = vec![PickerItem {
                    label: "All domains".to_string(),
                    description: format!("{} cards", self.catalog.len()),
                    checked: state.domains().is_all(),
                }];
                for domain in self.catalog.domains() {
                    items.push(PickerItem {
                        label: format!("{} {}", domain.number, domain.id),
                        description: format!(
                            "{} cards",
                            self.catalog.cards_in_domain(&domain.id).count()
                        ),
                        checked: state.domains().is_selected(&domain.id),
                    });
                }
                items
            }
            PickerKind::Categories => ConfidenceLevel::ALL
                .into_iter()
                .map(|level| PickerItem {
                    label: level.label().to_string(),
                    description: format!("{} cards", state.tracking().count(level)),
                    checked: state.categories().contains(&level),
                })
                .collect(),
        }
    }

    pub fn picker_move(&mut self, down: bool) {
        let Overlay::Picker { kind, cursor } = &self.overlay else {
            return;
        };
        let len = self.picker_items(*kind).len();
        let mut cursor = *cursor;
        if down {
            cursor.next(len);
        } else {
            cursor.prev(len);
        }
        if let Overlay::Picker { cursor: c, .. } = &mut self.overlay {
            *c = cursor;
        }
    }

    pub fn picker_toggle(&mut self) {
        let Overlay::Picker { kind, cursor } = self.overlay.clone() else {
            return;
        };
        let Some(tracker) = self.tracker.as_mut() else {
            return;
        };
        match kind {
            PickerKind::Domains => {
                let domain = if cursor.selected == 0 {
                    Some(ALL_DOMAINS.to_string())
                } else {
                    self.catalog
                        .domains()
                        .get(cursor.selected - 1)
                        .map(|d| d.id.clone())
                };
                if let Some(domain) = domain {
                    tracker.change_domain(&domain);
                }
            }
            PickerKind::Categories => {
                if let Some(level) = ConfidenceLevel::ALL.get(cursor.selected) {
                    tracker.change_category(*level);
                }
            }
        }
    }

    pub fn open_reset(&mut self) {
        if self.tracker.is_some() {
            self.overlay = Overlay::Reset(ResetSelection::default());
        }
    }

    /// Clear the buckets checked in the dialog. Nothing checked: just close.
    pub fn confirm_reset(&mut self) {
        if let Overlay::Reset(selection) = &self.overlay {
            let levels = selection.levels();
            if let Some(tracker) = self.tracker.as_mut() {
                if tracker.reset_buckets(&levels) {
                    info!("reset buckets {levels:?}");
                }
            }
        }
        self.overlay = Overlay::None;
    }

    pub fn reset_everything(&mut self) {
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.reset_all();
            info!("reset all progress for {}", tracker.user().id);
        }
        self.overlay = Overlay::None;
    }

    pub fn go_to_stats(&mut self) {
        if self.tracker.is_some() {
            self.overlay = Overlay::None;
            self.screen = AppScreen::Stats;
        }
    }

    pub fn go_to_study(&mut self) {
        if self.tracker.is_some() {
            self.screen = AppScreen::Study;
        }
    }

    // --- derived view data ---

    pub fn summary(&self) -> ProgressSummary {
        self.tracker
            .as_ref()
            .map(|t| ProgressSummary::of(t.state().tracking()))
            .unwrap_or_default()
    }

    pub fn domains_label(&self) -> String {
        let Some(tracker) = self.tracker.as_ref() else {
            return String::new();
        };
        let domains = tracker.state().domains();
        if domains.is_all() {
            return "all".to_string();
        }
        domains
            .ids()
            .iter()
            .map(|id| {
                self.catalog
                    .domain(id)
                    .map(|d| d.number.clone())
                    .unwrap_or_else(|| id.clone())
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// (confidence %, cards to review) for the completion overlay.
    pub fn completion_metrics(&self) -> Option<(u32, usize)> {
        let state = self.tracker.as_ref()?.state();
        if !state.is_complete() {
            return None;
        }
        let total = state.visible_cards().len();
        Some((
            scoring::confidence_score(state.tracking(), total),
            scoring::cards_to_review(state.tracking()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;
    use crate::store::memory::MemoryStore;
    use std::time::Duration;

    fn app() -> (Arc<MemoryStore>, App) {
        let store = Arc::new(MemoryStore::new());
        let theme: &'static Theme = Box::leak(Box::new(Theme::default()));
        let config = Config {
            last_user: None,
            ..Config::default()
        };
        let app = App::new(config, theme, Arc::new(sample_catalog()), store.clone());
        (store, app)
    }

    #[test]
    fn test_starts_at_sign_in_gate() {
        let (_store, app) = app();
        assert_eq!(app.screen, AppScreen::SignIn);
        assert!(app.tracker.is_none());
    }

    #[test]
    fn test_sign_in_starts_session_and_sign_out_returns_to_gate() {
        let (store, mut app) = app();
        assert!(app.sign_in_as("alice"));
        assert_eq!(app.screen, AppScreen::Study);
        assert_eq!(app.config.last_user.as_deref(), Some("alice"));

        app.sign_out();
        assert_eq!(app.screen, AppScreen::SignIn);
        assert!(app.tracker.is_none());
        assert!(store.document(&"alice".into()).is_some());
    }

    #[test]
    fn test_invalid_name_shows_error() {
        let (_store, mut app) = app();
        assert!(!app.sign_in_as("bad name"));
        assert!(app.sign_in_error.is_some());
        assert_eq!(app.screen, AppScreen::SignIn);
    }

    #[test]
    fn test_rating_requires_flip_and_study_mode() {
        let (_store, mut app) = app();
        app.sign_in_as("bob");
        let now = Instant::now();
        assert!(!app.rate(ConfidenceLevel::KnewIt, now));
        app.tracker.as_mut().unwrap().flip();
        assert!(app.rate(ConfidenceLevel::KnewIt, now));

        app.tick(now + Duration::from_millis(600));
        assert_eq!(app.tracker.as_ref().unwrap().state().cursor(), 1);

        app.toggle_mode();
        app.tracker.as_mut().unwrap().flip();
        assert!(!app.rate(ConfidenceLevel::Peeked, now));
    }

    #[test]
    fn test_category_picker_only_in_review() {
        let (_store, mut app) = app();
        app.sign_in_as("carol");
        app.open_picker(PickerKind::Categories);
        assert_eq!(app.overlay, Overlay::None);
        app.toggle_mode();
        app.open_picker(PickerKind::Categories);
        app.picker_move(false);
        app.picker_toggle();
        let state = app.tracker.as_ref().unwrap().state();
        assert_eq!(state.categories(), &[ConfidenceLevel::Peeked]);
    }

    #[test]
    fn test_domain_picker_toggles_domain() {
        let (_store, mut app) = app();
        app.sign_in_as("dana");
        app.open_picker(PickerKind::Domains);
        app.picker_move(true);
        app.picker_toggle();
        assert_eq!(app.domains_label(), "1.0");
        app.picker_move(false);
        app.picker_toggle();
        assert_eq!(app.domains_label(), "all");
    }

    #[test]
    fn test_reset_dialog_with_nothing_checked_is_noop() {
        let (_store, mut app) = app();
        app.sign_in_as("erin");
        let now = Instant::now();
        app.tracker.as_mut().unwrap().flip();
        app.rate(ConfidenceLevel::Peeked, now);

        app.open_reset();
        app.confirm_reset();
        assert_eq!(app.overlay, Overlay::None);
        assert_eq!(app.summary().answered, 1);

        app.open_reset();
        if let Overlay::Reset(selection) = &mut app.overlay {
            selection.select_weak();
        }
        app.confirm_reset();
        assert_eq!(app.summary().answered, 0);
    }
}
