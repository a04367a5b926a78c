use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::engine::confidence::{ConfidenceLevel, Score};
use crate::engine::scoring::ProgressSummary;
use crate::engine::selection::{StudyFilter, StudyMode};
use crate::ui::theme::Theme;

/// Sidebar: bucket counts, score, and the active filter settings.
pub struct ConfidenceSummary<'a> {
    pub summary: ProgressSummary,
    pub score: Score,
    pub mode: StudyMode,
    pub study_filter: StudyFilter,
    pub categories: &'a [ConfidenceLevel],
    pub domains_label: String,
    pub streak_days: u32,
    pub theme: &'a Theme,
}

impl Widget for ConfidenceSummary<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(" Progress ")
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let muted = Style::default().fg(colors.text_muted());
        let mut lines = Vec::new();

        for level in ConfidenceLevel::ALL {
            let in_review = self.mode == StudyMode::Review && self.categories.contains(&level);
            let marker = if in_review { "▸ " } else { "  " };
            let mut style = Style::default().fg(colors.level_color(level));
            if in_review {
                style = style.add_modifier(Modifier::BOLD);
            }
            lines.push(Line::from(vec![
                Span::styled(marker, style),
                Span::styled(format!("{:<6}", level.short_label()), style),
                Span::styled(format!("{:>4}", self.summary.count(level)), style),
            ]));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("  Answered  ", muted),
            Span::styled(
                self.summary.answered.to_string(),
                Style::default().fg(colors.fg()),
            ),
        ]));
        lines.push(Line::from(vec![
            Span::styled("  Score     ", muted),
            Span::styled(
                format!("{}", self.score.correct),
                Style::default().fg(colors.success()),
            ),
            Span::styled(" / ", muted),
            Span::styled(
                format!("{}", self.score.incorrect),
                Style::default().fg(colors.error()),
            ),
        ]));
        lines.push(Line::from(vec![
            Span::styled("  Streak    ", muted),
            Span::styled(
                format!("{} day{}", self.streak_days, if self.streak_days == 1 { "" } else { "s" }),
                Style::default().fg(colors.warning()),
            ),
        ]));

        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("  Mode      ", muted),
            Span::styled(self.mode.as_str(), Style::default().fg(colors.accent())),
        ]));
        if self.mode == StudyMode::Study {
            lines.push(Line::from(vec![
                Span::styled("  Filter    ", muted),
                Span::styled(self.study_filter.as_str(), Style::default().fg(colors.fg())),
            ]));
        }
        lines.push(Line::from(vec![
            Span::styled("  Domains   ", muted),
            Span::styled(self.domains_label, Style::default().fg(colors.fg())),
        ]));

        Paragraph::new(lines).render(inner, buf);
    }
}
