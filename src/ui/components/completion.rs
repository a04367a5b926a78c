use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget};

use crate::engine::confidence::Score;
use crate::ui::theme::Theme;

/// Shown over the deck once its last card has been rated.
pub struct Completion<'a> {
    pub deck_size: usize,
    pub confidence_score: u32,
    pub to_review: usize,
    pub score: Score,
    pub theme: &'a Theme,
}

impl Widget for Completion<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        Clear.render(area, buf);
        let block = Block::bordered()
            .title(" Deck Complete ")
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(2),
            ])
            .split(inner);

        Paragraph::new(Line::from(Span::styled(
            format!("You worked through {} cards", self.deck_size),
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .render(layout[0], buf);

        let score_color = if self.confidence_score >= 80 {
            colors.success()
        } else if self.confidence_score >= 60 {
            colors.warning()
        } else {
            colors.error()
        };
        Paragraph::new(Line::from(vec![
            Span::styled("  Confidence: ", Style::default().fg(colors.fg())),
            Span::styled(
                format!("{}%", self.confidence_score),
                Style::default().fg(score_color).add_modifier(Modifier::BOLD),
            ),
        ]))
        .render(layout[1], buf);

        Paragraph::new(Line::from(vec![
            Span::styled("  To review:  ", Style::default().fg(colors.fg())),
            Span::styled(
                self.to_review.to_string(),
                Style::default().fg(if self.to_review == 0 {
                    colors.success()
                } else {
                    colors.warning()
                }),
            ),
            Span::styled(
                "  (long-think + peeked)",
                Style::default().fg(colors.text_muted()),
            ),
        ]))
        .render(layout[2], buf);

        Paragraph::new(Line::from(vec![
            Span::styled("  Score:      ", Style::default().fg(colors.fg())),
            Span::styled(
                format!("{} correct", self.score.correct),
                Style::default().fg(colors.success()),
            ),
            Span::styled(", ", Style::default().fg(colors.text_muted())),
            Span::styled(
                format!("{} peeked", self.score.incorrect),
                Style::default().fg(colors.error()),
            ),
        ]))
        .render(layout[3], buf);

        Paragraph::new(Line::from(vec![
            Span::styled("  [m] Review mode  ", Style::default().fg(colors.accent())),
            Span::styled("[r] Reset  ", Style::default().fg(colors.accent())),
            Span::styled("[h] Back  ", Style::default().fg(colors.accent())),
            Span::styled("[t] Stats", Style::default().fg(colors.accent())),
        ]))
        .render(layout[5], buf);
    }
}
