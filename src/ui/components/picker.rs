use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget};

use crate::ui::theme::Theme;

pub struct PickerItem {
    pub label: String,
    pub description: String,
    pub checked: bool,
}

/// Cursor over a picker's rows; the rows themselves are rebuilt from the
/// study state on every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PickerCursor {
    pub selected: usize,
}

impl PickerCursor {
    pub fn next(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    pub fn prev(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        if self.selected > 0 {
            self.selected -= 1;
        } else {
            self.selected = len - 1;
        }
    }
}

/// Checkbox list drawn as a popup over the study screen.
pub struct Picker<'a> {
    pub title: &'a str,
    pub items: Vec<PickerItem>,
    pub selected: usize,
    pub hint: &'a str,
    pub theme: &'a Theme,
}

impl Widget for Picker<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        Clear.render(area, buf);
        let block = Block::bordered()
            .title(format!(" {} ", self.title))
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                self.items
                    .iter()
                    .map(|_| Constraint::Length(2))
                    .collect::<Vec<_>>(),
            )
            .split(layout[0]);

        for (i, item) in self.items.iter().enumerate() {
            let is_selected = i == self.selected;
            let indicator = if is_selected { ">" } else { " " };
            let check = if item.checked { "[x]" } else { "[ ]" };

            let label_text = format!(" {indicator} {check} {}", item.label);
            let desc_text = format!("       {}", item.description);

            let lines = vec![
                Line::from(Span::styled(
                    label_text,
                    Style::default()
                        .fg(if is_selected {
                            colors.accent()
                        } else {
                            colors.fg()
                        })
                        .add_modifier(if is_selected {
                            Modifier::BOLD
                        } else {
                            Modifier::empty()
                        }),
                )),
                Line::from(Span::styled(desc_text, Style::default().fg(colors.text_muted()))),
            ];

            if i < rows.len() {
                Paragraph::new(lines).render(rows[i], buf);
            }
        }

        Paragraph::new(Line::from(Span::styled(
            self.hint,
            Style::default().fg(colors.text_muted()),
        )))
        .render(layout[1], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_wraps_both_ways() {
        let mut cursor = PickerCursor::default();
        cursor.prev(3);
        assert_eq!(cursor.selected, 2);
        cursor.next(3);
        assert_eq!(cursor.selected, 0);
        cursor.next(0);
        assert_eq!(cursor.selected, 0);
    }
}
