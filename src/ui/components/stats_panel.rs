use chrono::{DateTime, Local, Utc};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::engine::scoring::{DomainCoverage, ProgressSummary};
use crate::session::record::StudyRecord;
use crate::ui::theme::Theme;

const RECENT_SESSIONS: usize = 8;

pub struct StatsPanel<'a> {
    pub coverage: &'a [DomainCoverage],
    pub history: &'a [StudyRecord],
    pub summary: ProgressSummary,
    pub catalog_size: usize,
    pub streak_days: u32,
    pub last_studied: Option<DateTime<Utc>>,
    pub theme: &'a Theme,
}

impl Widget for StatsPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(" Statistics ")
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(self.coverage.len() as u16 + 2),
                Constraint::Min(0),
            ])
            .split(inner);

        let muted = Style::default().fg(colors.text_muted());
        let heading = Style::default()
            .fg(colors.accent())
            .add_modifier(Modifier::BOLD);

        let last = self
            .last_studied
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "never".to_string());
        Paragraph::new(vec![
            Line::from(vec![
                Span::styled("  Answered ", muted),
                Span::styled(
                    format!("{} / {}", self.summary.answered, self.catalog_size),
                    Style::default().fg(colors.fg()),
                ),
                Span::styled("   Streak ", muted),
                Span::styled(
                    format!("{} days", self.streak_days),
                    Style::default().fg(colors.warning()),
                ),
                Span::styled("   Last studied ", muted),
                Span::styled(last, Style::default().fg(colors.fg())),
            ]),
        ])
        .render(layout[0], buf);

        let bar_width = 20usize;
        let mut coverage_lines = vec![Line::from(Span::styled("  Domain coverage", heading))];
        for domain in self.coverage {
            let filled = (domain.ratio() * bar_width as f64).round() as usize;
            coverage_lines.push(Line::from(vec![
                Span::styled(format!("  {:<4}", domain.number), muted),
                Span::styled("█".repeat(filled), Style::default().fg(colors.bar_filled())),
                Span::styled(
                    "░".repeat(bar_width - filled.min(bar_width)),
                    Style::default().fg(colors.bar_empty()),
                ),
                Span::styled(
                    format!(" {:>2}/{:<2} ", domain.rated, domain.total),
                    Style::default().fg(colors.fg()),
                ),
                Span::styled(domain.domain.clone(), muted),
            ]));
        }
        Paragraph::new(coverage_lines).render(layout[1], buf);

        let mut history_lines = vec![Line::from(Span::styled("  Recent sessions", heading))];
        if self.history.is_empty() {
            history_lines.push(Line::from(Span::styled("  No sessions recorded yet", muted)));
        }
        for record in self.history.iter().rev().take(RECENT_SESSIONS) {
            let minutes = record
                .duration()
                .map(|d| format!("{}m", d.num_minutes()))
                .unwrap_or_else(|| "-".to_string());
            history_lines.push(Line::from(vec![
                Span::styled(
                    format!(
                        "  {}  ",
                        record.start_time.with_timezone(&Local).format("%m-%d %H:%M")
                    ),
                    muted,
                ),
                Span::styled(
                    format!("{:>3} cards  ", record.cards_studied),
                    Style::default().fg(colors.fg()),
                ),
                Span::styled(
                    format!("{:>5.1}%  ", record.accuracy()),
                    Style::default().fg(colors.success()),
                ),
                Span::styled(format!("{:>4}  {}", minutes, record.mode), muted),
            ]));
        }
        Paragraph::new(history_lines).render(layout[2], buf);
    }
}
