mod app;
mod auth;
mod catalog;
mod config;
mod engine;
mod event;
mod logging;
mod session;
mod store;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::{error, info};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};

use app::{App, AppScreen, Overlay, PickerKind};
use catalog::Catalog;
use config::Config;
use engine::confidence::ConfidenceLevel;
use engine::scoring;
use engine::selection::{StudyFilter, StudyMode};
use event::{AppEvent, EventHandler};
use store::json_store::JsonStore;
use ui::components::completion::Completion;
use ui::components::confidence_summary::ConfidenceSummary;
use ui::components::flashcard::Flashcard;
use ui::components::picker::Picker;
use ui::components::progress_bar::ProgressBar;
use ui::components::reset_dialog::ResetDialog;
use ui::components::sign_in::SignIn;
use ui::components::stats_panel::StatsPanel;
use ui::layout::{StudyLayout, pack_hint_lines, popup_rect};
use ui::theme::Theme;

#[derive(Parser)]
#[command(name = "certdeck", version, about = "Terminal flashcards for security certification study")]
struct Cli {
    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(short, long, help = "Sign in with this profile name")]
    user: Option<String>,

    #[arg(long, help = "Directory for progress documents and the log file")]
    data_dir: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_default();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let themes = Theme::available_themes();
    let theme_names: Vec<&str> = themes.iter().map(String::as_str).collect();
    config.validate(&theme_names);

    let log_path = logging::init(&config.data_dir(), &config.log_level)?;
    info!("certdeck starting, logging to {}", log_path.display());

    let theme_name = cli.theme.as_deref().unwrap_or(&config.theme);
    let theme: &'static Theme = Box::leak(Box::new(Theme::load(theme_name).unwrap_or_default()));

    let catalog = Arc::new(Catalog::embedded()?);
    let store = Arc::new(JsonStore::with_base_dir(config.data_dir())?);
    let remembered = cli
        .user
        .or_else(|| config.remembered_user().map(String::from));

    let mut app = App::new(config, theme, catalog, store).persist_config(true);
    if let Some(name) = remembered {
        app.sign_in_as(&name);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(Duration::from_millis(50));

    let result = run_app(&mut terminal, &mut app, &events);
    app.shutdown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        error!("exiting on error: {err:?}");
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Tick | AppEvent::Resize => {}
        }
        app.tick(Instant::now());

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    match app.screen {
        AppScreen::SignIn => app.handle_sign_in_key(key),
        AppScreen::Study => match app.overlay {
            Overlay::None => handle_study_key(app, key),
            Overlay::Picker { .. } => handle_picker_key(app, key),
            Overlay::Reset(_) => handle_reset_key(app, key),
        },
        AppScreen::Stats => handle_stats_key(app, key),
    }
}

fn handle_study_key(app: &mut App, key: KeyEvent) {
    let now = Instant::now();
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char(' ') | KeyCode::Enter => {
            if let Some(tracker) = app.tracker.as_mut() {
                tracker.flip();
            }
        }
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('n') => {
            if let Some(tracker) = app.tracker.as_mut() {
                tracker.advance();
            }
        }
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('p') => {
            if let Some(tracker) = app.tracker.as_mut() {
                tracker.retreat();
            }
        }
        KeyCode::Char(ch @ '1'..='4') => {
            if let Some(level) = ConfidenceLevel::from_digit(ch) {
                app.rate(level, now);
            }
        }
        KeyCode::Char('s') => {
            if let Some(tracker) = app.tracker.as_mut() {
                tracker.toggle_shuffle();
            }
        }
        KeyCode::Char('m') => app.toggle_mode(),
        KeyCode::Char('u') => app.toggle_study_filter(),
        KeyCode::Char('d') => app.open_picker(PickerKind::Domains),
        KeyCode::Char('c') => app.open_picker(PickerKind::Categories),
        KeyCode::Char('r') => app.open_reset(),
        KeyCode::Char('t') => app.go_to_stats(),
        KeyCode::Char('o') => app.sign_out(),
        _ => {}
    }
}

fn handle_picker_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => app.overlay = Overlay::None,
        KeyCode::Up | KeyCode::Char('k') => app.picker_move(false),
        KeyCode::Down | KeyCode::Char('j') => app.picker_move(true),
        KeyCode::Char(' ') => app.picker_toggle(),
        _ => {}
    }
}

fn handle_reset_key(app: &mut App, key: KeyEvent) {
    let Overlay::Reset(selection) = &mut app.overlay else {
        return;
    };
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.overlay = Overlay::None,
        KeyCode::Enter => app.confirm_reset(),
        KeyCode::Char('x') => app.reset_everything(),
        KeyCode::Up | KeyCode::Char('k') => selection.cursor.prev(ConfidenceLevel::ALL.len()),
        KeyCode::Down | KeyCode::Char('j') => selection.cursor.next(ConfidenceLevel::ALL.len()),
        KeyCode::Char(' ') => selection.toggle_selected(),
        KeyCode::Char('w') => selection.select_weak(),
        KeyCode::Char('g') => selection.select_strong(),
        KeyCode::Char('a') => selection.select_all(),
        KeyCode::Char('n') => selection.select_none(),
        _ => {}
    }
}

fn handle_stats_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('t') => app.go_to_study(),
        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    match app.screen {
        AppScreen::SignIn => render_sign_in(frame, app),
        AppScreen::Study => render_study(frame, app),
        AppScreen::Stats => render_stats(frame, app),
    }
}

fn render_sign_in(frame: &mut ratatui::Frame, app: &App) {
    let centered = popup_rect(frame.area(), 64, 16);
    let sign_in = SignIn {
        input: &app.sign_in,
        error: app.sign_in_error.as_deref(),
        theme: app.theme,
    };
    frame.render_widget(sign_in, centered);
}

fn render_header(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let Some(tracker) = app.tracker.as_ref() else {
        return;
    };
    let state = tracker.state();

    let mode = match state.mode() {
        StudyMode::Study => "Study",
        StudyMode::Review => "Review",
    };
    let streak = if tracker.streak_days() > 0 {
        format!(" | {} day streak", tracker.streak_days())
    } else {
        String::new()
    };
    let info_text = format!(
        " {} | {mode} | {}{streak}",
        tracker.user().display_name,
        tracker.sync_status().label(),
    );
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " certdeck ",
            Style::default()
                .fg(colors.header_fg())
                .bg(colors.header_bg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            info_text,
            Style::default().fg(colors.text_muted()).bg(colors.header_bg()),
        ),
    ]))
    .block(Block::default().style(Style::default().bg(colors.header_bg())));
    frame.render_widget(header, area);
}

fn study_hints(app: &App) -> Vec<&'static str> {
    let Some(tracker) = app.tracker.as_ref() else {
        return Vec::new();
    };
    let state = tracker.state();
    let mut hints = vec!["[space] flip", "[←/→] prev/next"];
    if state.mode() == StudyMode::Study {
        if state.is_flipped() && !state.is_answered() {
            hints.push("[1-4] rate");
        }
        hints.push(match state.study_filter() {
            StudyFilter::All => "[u] unanswered only",
            StudyFilter::Unanswered => "[u] all cards",
        });
        hints.push("[m] review mode");
    } else {
        hints.push("[c] categories");
        hints.push("[m] study mode");
    }
    hints.extend([
        "[s] shuffle",
        "[d] domains",
        "[r] reset",
        "[t] stats",
        "[o] sign out",
        "[q] quit",
    ]);
    hints
}

fn render_study(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;
    let Some(tracker) = app.tracker.as_ref() else {
        return;
    };
    let state = tracker.state();

    let hints = study_hints(app);
    let footer_lines = pack_hint_lines(&hints, area.width as usize);
    let layout = StudyLayout::new(area, footer_lines.len());
    render_header(frame, app, layout.header);

    let visible = state.visible_cards();
    match state.card_at_cursor(&visible) {
        Some(card) => {
            let flashcard = Flashcard {
                card,
                flipped: state.is_flipped(),
                can_rate: state.mode() == StudyMode::Study && !state.is_answered(),
                last_rating: state.last_rating(),
                position: state.cursor() + 1,
                total: visible.len(),
                shuffled: state.is_shuffled(),
                theme: app.theme,
            };
            frame.render_widget(flashcard, layout.card);
        }
        None => render_empty_state(frame, app, layout.card),
    }

    if let Some(progress_area) = layout.progress {
        let (label, done) = match state.mode() {
            StudyMode::Study => ("Rated", state.tracking().rated_count()),
            StudyMode::Review => ("Position", state.cursor() + usize::from(!visible.is_empty())),
        };
        let total = match state.mode() {
            StudyMode::Study => app.catalog.len(),
            StudyMode::Review => visible.len(),
        };
        frame.render_widget(ProgressBar::new(label, done, total, app.theme), progress_area);
    }

    if let Some(sidebar_area) = layout.sidebar {
        let summary = ConfidenceSummary {
            summary: app.summary(),
            score: state.score(),
            mode: state.mode(),
            study_filter: state.study_filter(),
            categories: state.categories(),
            domains_label: app.domains_label(),
            streak_days: tracker.streak_days(),
            theme: app.theme,
        };
        frame.render_widget(summary, sidebar_area);
    }

    let footer: Vec<Line> = footer_lines
        .into_iter()
        .map(|line| Line::from(Span::styled(line, Style::default().fg(colors.text_muted()))))
        .collect();
    frame.render_widget(Paragraph::new(footer), layout.footer);

    if let Some((confidence_score, to_review)) = app.completion_metrics() {
        let completion = Completion {
            deck_size: visible.len(),
            confidence_score,
            to_review,
            score: state.score(),
            theme: app.theme,
        };
        frame.render_widget(completion, popup_rect(layout.card, 52, 12));
    }

    match &app.overlay {
        Overlay::None => {}
        Overlay::Picker { kind, cursor } => {
            let title = match kind {
                PickerKind::Domains => " Domains ",
                PickerKind::Categories => " Review Categories ",
            };
            let hint = "[space] toggle  [enter/esc] close";
            let items = app.picker_items(*kind);
            let height = items.len() as u16 + 6;
            let picker = Picker {
                title,
                items,
                selected: cursor.selected,
                hint,
                theme: app.theme,
            };
            frame.render_widget(picker, popup_rect(area, 56, height));
        }
        Overlay::Reset(selection) => {
            let dialog = ResetDialog {
                selection,
                summary: app.summary(),
                theme: app.theme,
            };
            frame.render_widget(dialog, popup_rect(area, 64, 13));
        }
    }
}

fn render_empty_state(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let Some(tracker) = app.tracker.as_ref() else {
        return;
    };
    let state = tracker.state();

    let (title, detail) = match state.mode() {
        StudyMode::Review if state.categories().is_empty() => (
            "No cards to review",
            "Press [c] to choose which confidence categories to review.",
        ),
        StudyMode::Review => (
            "No cards to review",
            "No rated cards match these categories and domains yet.",
        ),
        StudyMode::Study if state.study_filter() == StudyFilter::Unanswered => (
            "No cards available",
            "Every card in these domains has been rated. Press [u] to show all cards.",
        ),
        StudyMode::Study => (
            "No cards available",
            "Press [d] to pick different domains.",
        ),
    };

    let block = Block::bordered()
        .border_style(Style::default().fg(colors.border()))
        .style(Style::default().bg(colors.bg()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            title,
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(detail, Style::default().fg(colors.text_muted()))),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        inner,
    );
}

fn render_stats(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let Some(tracker) = app.tracker.as_ref() else {
        return;
    };
    let coverage = scoring::domain_coverage(&app.catalog, tracker.state().tracking());
    let panel = StatsPanel {
        coverage: &coverage,
        history: tracker.history(),
        summary: app.summary(),
        catalog_size: app.catalog.len(),
        streak_days: tracker.streak_days(),
        last_studied: tracker.last_studied(),
        theme: app.theme,
    };
    frame.render_widget(panel, area);
}
