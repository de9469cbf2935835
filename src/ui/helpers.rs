use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::models::{Operator, Song};

/// Style for a field depending on focus and whether it holds a value.
pub(crate) fn field_style(focused: bool, empty: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else if empty {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    }
}

/// Render a song slot, falling back to the picker placeholder.
pub(crate) fn song_span(song: Option<&Song>, placeholder: &str, focused: bool) -> Span<'static> {
    let text = match song {
        Some(song) => song.name.clone(),
        None => format!("<{placeholder}>"),
    };
    Span::styled(text, field_style(focused, song.is_none()))
}

/// Render a short selector value in brackets, e.g. `[is]`.
pub(crate) fn selector_span(value: &str, focused: bool) -> Span<'static> {
    Span::styled(format!("[{value}]"), field_style(focused, false))
}

/// Centered separator line for a conjunction row.
pub(crate) fn conjunction_line(label: Operator, width: usize) -> Line<'static> {
    let text = format!(" {} ", label.label());
    let padding = width.saturating_sub(text.len());
    let left = padding / 2;
    let right = padding - left;
    Line::from(vec![
        Span::styled("-".repeat(left), Style::default().fg(Color::DarkGray)),
        Span::styled(text, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled("-".repeat(right), Style::default().fg(Color::DarkGray)),
    ])
}

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Context};

    use super::*;

    #[test]
    fn conjunction_line_fills_the_width() {
        let line = conjunction_line(Operator::Or, 20);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text.len(), 20);
        assert!(text.contains(" OR "));
    }

    #[test]
    fn surface_error_prefers_the_root_cause() {
        let err = Err::<(), _>(anyhow!("disk full"))
            .context("failed to import songs")
            .unwrap_err();
        assert_eq!(surface_error(&err), "disk full");
    }

    #[test]
    fn empty_song_shows_placeholder() {
        let span = song_span(None, "Select a song", false);
        assert_eq!(span.content, "<Select a song>");
    }
}
