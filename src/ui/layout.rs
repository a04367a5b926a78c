use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutTier {
    Wide,   // ≥100 cols: card + confidence sidebar
    Medium, // 60-99 cols: full-width card, progress bar
    Narrow, // <60 cols: card only
}

impl LayoutTier {
    pub fn from_area(area: Rect) -> Self {
        match area.width {
            100.. => LayoutTier::Wide,
            60..=99 => LayoutTier::Medium,
            _ => LayoutTier::Narrow,
        }
    }

    pub fn show_progress_bar(&self, height: u16) -> bool {
        height >= 18 && *self != LayoutTier::Narrow
    }

    pub fn show_sidebar(&self) -> bool {
        *self == LayoutTier::Wide
    }
}

/// Regions of the study screen.
pub struct StudyLayout {
    pub header: Rect,
    pub card: Rect,
    pub progress: Option<Rect>,
    pub sidebar: Option<Rect>,
    pub footer: Rect,
}

impl StudyLayout {
    /// `footer_lines` is the packed hint count; the footer grows to fit it.
    pub fn new(area: Rect, footer_lines: usize) -> Self {
        let tier = LayoutTier::from_area(area);
        let footer_height = (footer_lines.clamp(1, 3) as u16).min(area.height / 4);

        let [header, body, footer] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(6),
                Constraint::Length(footer_height),
            ])
            .areas(area);

        let (main, sidebar) = if tier.show_sidebar() {
            let [main, sidebar] = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
                .areas(body);
            (main, Some(sidebar))
        } else {
            (body, None)
        };

        let (card, progress) = if tier.show_progress_bar(area.height) {
            let [card, progress] = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(6), Constraint::Length(3)])
                .areas(main);
            (card, Some(progress))
        } else {
            (main, None)
        };

        Self {
            header,
            card,
            progress,
            sidebar,
            footer,
        }
    }
}

/// Greedily pack `[key] action` hints into lines no wider than `width`.
pub fn pack_hint_lines(hints: &[&str], width: usize) -> Vec<String> {
    const INDENT: &str = "  ";
    const GAP: &str = "  ";

    let mut lines: Vec<String> = Vec::new();
    if width == 0 {
        return lines;
    }
    for hint in hints.iter().filter(|h| !h.is_empty()) {
        let fits = lines.last().is_some_and(|line| {
            line.chars().count() + GAP.len() + hint.chars().count() <= width
        });
        match lines.last_mut() {
            Some(line) if fits => {
                line.push_str(GAP);
                line.push_str(hint);
            }
            _ => lines.push(format!("{INDENT}{hint}")),
        }
    }
    lines
}

/// A `width` x `height` box centered in `area`, shrunk to fit.
pub fn popup_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(LayoutTier::from_area(Rect::new(0, 0, 120, 40)), LayoutTier::Wide);
        assert_eq!(LayoutTier::from_area(Rect::new(0, 0, 80, 40)), LayoutTier::Medium);
        assert_eq!(LayoutTier::from_area(Rect::new(0, 0, 40, 40)), LayoutTier::Narrow);
    }

    #[test]
    fn test_study_layout_regions() {
        let wide = StudyLayout::new(Rect::new(0, 0, 120, 40), 1);
        assert!(wide.sidebar.is_some());
        assert!(wide.progress.is_some());
        assert_eq!(wide.footer.height, 1);

        let narrow = StudyLayout::new(Rect::new(0, 0, 50, 40), 3);
        assert!(narrow.sidebar.is_none());
        assert!(narrow.progress.is_none());
        assert_eq!(narrow.footer.height, 3);
        assert_eq!(narrow.card.width, 50);
    }

    #[test]
    fn test_pack_hint_lines_wraps() {
        let lines = pack_hint_lines(&["[space] flip", "[1-4] rate", "[q] quit"], 26);
        assert_eq!(lines, vec!["  [space] flip  [1-4] rate", "  [q] quit"]);
    }

    #[test]
    fn test_popup_rect_stays_inside_area() {
        let area = Rect::new(10, 5, 40, 10);
        let popup = popup_rect(area, 60, 8);
        assert_eq!(popup, Rect::new(10, 6, 40, 8));
    }
}
