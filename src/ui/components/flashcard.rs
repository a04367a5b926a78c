use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::catalog::Card;
use crate::engine::confidence::ConfidenceLevel;
use crate::ui::theme::Theme;

pub struct Flashcard<'a> {
    pub card: &'a Card,
    pub flipped: bool,
    /// Rating buttons are offered (study mode, card not yet rated).
    pub can_rate: bool,
    pub last_rating: Option<ConfidenceLevel>,
    pub position: usize,
    pub total: usize,
    pub shuffled: bool,
    pub theme: &'a Theme,
}

impl Widget for Flashcard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let tag = colors.tag_color(&self.card.color);

        let mut title = format!(
            " {} {}  ·  {} ",
            self.card.domain_number, self.card.domain, self.card.objective
        );
        if self.shuffled {
            title.push_str("· shuffled ");
        }
        let face_bg = if self.flipped {
            colors.card_back()
        } else {
            colors.card_front()
        };
        let block = Block::bordered()
            .title(Span::styled(title, Style::default().fg(tag)))
            .title_bottom(
                Line::from(format!(" {} / {} ", self.position, self.total))
                    .alignment(Alignment::Right),
            )
            .border_style(Style::default().fg(if self.flipped {
                colors.border_focused()
            } else {
                colors.border()
            }))
            .style(Style::default().bg(face_bg));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(3),
            ])
            .split(inner);

        let (face_label, body) = if self.flipped {
            ("ANSWER", self.card.answer.as_str())
        } else {
            ("QUESTION", self.card.question.as_str())
        };
        Paragraph::new(Line::from(Span::styled(
            face_label,
            Style::default()
                .fg(colors.text_muted())
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .render(layout[0], buf);

        Paragraph::new(body)
            .style(Style::default().fg(colors.fg()))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(layout[1], buf);

        let footer = if let Some(level) = self.last_rating {
            Line::from(vec![
                Span::styled("Rated: ", Style::default().fg(colors.text_muted())),
                Span::styled(
                    level.label(),
                    Style::default()
                        .fg(colors.level_color(level))
                        .add_modifier(Modifier::BOLD),
                ),
            ])
        } else if self.flipped && self.can_rate {
            let mut spans = Vec::new();
            for (i, level) in ConfidenceLevel::ALL.into_iter().enumerate() {
                if i > 0 {
                    spans.push(Span::raw("  "));
                }
                spans.push(Span::styled(
                    format!("[{}] {}", i + 1, level.short_label()),
                    Style::default().fg(colors.level_color(level)),
                ));
            }
            Line::from(spans)
        } else if !self.flipped {
            Line::from(Span::styled(
                "[space] reveal answer",
                Style::default().fg(colors.text_muted()),
            ))
        } else {
            Line::from("")
        };
        Paragraph::new(footer)
            .alignment(Alignment::Center)
            .render(layout[2], buf);
    }
}
