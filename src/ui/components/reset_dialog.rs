use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget};

use crate::engine::confidence::ConfidenceLevel;
use crate::engine::scoring::ProgressSummary;
use crate::ui::components::picker::PickerCursor;
use crate::ui::theme::Theme;

/// Which buckets the reset dialog will clear.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResetSelection {
    levels: Vec<ConfidenceLevel>,
    pub cursor: PickerCursor,
}

impl ResetSelection {
    pub fn toggle(&mut self, level: ConfidenceLevel) {
        if let Some(pos) = self.levels.iter().position(|l| *l == level) {
            self.levels.remove(pos);
        } else {
            self.levels.push(level);
        }
    }

    pub fn toggle_selected(&mut self) {
        if let Some(level) = ConfidenceLevel::ALL.get(self.cursor.selected) {
            self.toggle(*level);
        }
    }

    pub fn select_weak(&mut self) {
        self.levels = ConfidenceLevel::WEAK.to_vec();
    }

    pub fn select_strong(&mut self) {
        self.levels = ConfidenceLevel::STRONG.to_vec();
    }

    pub fn select_all(&mut self) {
        self.levels = ConfidenceLevel::ALL.to_vec();
    }

    pub fn select_none(&mut self) {
        self.levels.clear();
    }

    pub fn contains(&self, level: ConfidenceLevel) -> bool {
        self.levels.contains(&level)
    }

    /// Selected buckets in display order.
    pub fn levels(&self) -> Vec<ConfidenceLevel> {
        ConfidenceLevel::ALL
            .into_iter()
            .filter(|level| self.levels.contains(level))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

pub struct ResetDialog<'a> {
    pub selection: &'a ResetSelection,
    pub summary: ProgressSummary,
    pub theme: &'a Theme,
}

impl Widget for ResetDialog<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        Clear.render(area, buf);
        let block = Block::bordered()
            .title(" Reset Progress ")
            .border_style(Style::default().fg(colors.warning()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let muted = Style::default().fg(colors.text_muted());
        let mut lines = vec![
            Line::from(Span::styled("  Clear the checked buckets:", Style::default().fg(colors.fg()))),
            Line::from(""),
        ];
        for (i, level) in ConfidenceLevel::ALL.into_iter().enumerate() {
            let is_selected = i == self.selection.cursor.selected;
            let check = if self.selection.contains(level) { "[x]" } else { "[ ]" };
            let indicator = if is_selected { ">" } else { " " };
            let mut style = Style::default().fg(colors.level_color(level));
            if is_selected {
                style = style.add_modifier(Modifier::BOLD);
            }
            lines.push(Line::from(vec![
                Span::styled(format!(" {indicator} {check} {:<28}", level.label()), style),
                Span::styled(format!("{:>3} cards", self.summary.count(level)), muted),
            ]));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "  [w] weak  [g] strong  [a] all  [n] none  [space] toggle",
            muted,
        )));
        lines.push(Line::from(vec![
            Span::styled("  [enter] reset checked  ", Style::default().fg(colors.accent())),
            Span::styled("[x] reset everything  ", Style::default().fg(colors.error())),
            Span::styled("[esc] cancel", muted),
        ]));

        Paragraph::new(lines).render(inner, buf);
    }
}
