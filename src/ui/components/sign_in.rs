use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::ui::line_input::LineInput;
use crate::ui::theme::Theme;

pub struct SignIn<'a> {
    pub input: &'a LineInput,
    pub error: Option<&'a str>,
    pub theme: &'a Theme,
}

impl Widget for SignIn<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5),
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Length(2),
                Constraint::Min(0),
            ])
            .split(inner);

        let title_lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "certdeck",
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Security certification flashcards",
                Style::default().fg(colors.fg()),
            )),
            Line::from(""),
        ];
        Paragraph::new(title_lines)
            .alignment(Alignment::Center)
            .render(layout[0], buf);

        Paragraph::new(Line::from(Span::styled(
            "Sign in with a profile name to load your progress",
            Style::default().fg(colors.text_muted()),
        )))
        .alignment(Alignment::Center)
        .render(layout[1], buf);

        let (before, at, after) = self.input.render_parts();
        let cursor_style = Style::default().fg(colors.bg()).bg(colors.accent());
        let field = Line::from(vec![
            Span::styled("Profile: ", Style::default().fg(colors.fg())),
            Span::styled(before, Style::default().fg(colors.accent())),
            Span::styled(at.map(String::from).unwrap_or_else(|| " ".to_string()), cursor_style),
            Span::styled(after, Style::default().fg(colors.accent())),
        ]);
        Paragraph::new(field)
            .alignment(Alignment::Center)
            .render(layout[2], buf);

        if let Some(error) = self.error {
            Paragraph::new(Line::from(Span::styled(
                error,
                Style::default().fg(colors.error()),
            )))
            .alignment(Alignment::Center)
            .render(layout[3], buf);
        }

        Paragraph::new(Line::from(Span::styled(
            "[enter] sign in  [esc] quit",
            Style::default().fg(colors.text_muted()),
        )))
        .alignment(Alignment::Center)
        .render(layout[4], buf);
    }
}
