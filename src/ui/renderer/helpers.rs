//! Shared rendering helpers: value formatting, badges, scrollbar, centered rect.

use std::time::Instant;

use ratatui::{
    layout::{Margin, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

use crate::ui::theme::Theme;

/// Format a channel value with up to two decimals, dropping trailing zeros.
pub fn format_value(value: f64) -> String {
    let s = format!("{:.2}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// "12s ago" style age of a timestamp.
pub fn format_age(when: Instant) -> String {
    let secs = when.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

/// Inverted keybind badge: ` key ` on a colored background.
pub fn key_badge<'a>(key: &str, color: Color, t: &Theme) -> Span<'a> {
    Span::styled(
        format!(" {} ", key),
        Style::default()
            .fg(t.bg_dark)
            .bg(color)
            .add_modifier(Modifier::BOLD),
    )
}

/// Render a vertical scrollbar on the right side of `area`.
///
/// Only renders if `total > visible_height`.
pub fn render_scrollbar(frame: &mut Frame, area: Rect, total: usize, position: usize) {
    let visible_height = area.height as usize;
    if total <= visible_height {
        return;
    }
    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("▲"))
        .end_symbol(Some("▼"));
    let mut scrollbar_state = ScrollbarState::new(total).position(position);
    frame.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
}

/// Render a vertical scrollbar inside a bordered area (1px vertical margin).
pub fn render_scrollbar_bordered(frame: &mut Frame, area: Rect, total: usize, position: usize) {
    let visible_height = area.height.saturating_sub(2) as usize;
    if total <= visible_height {
        return;
    }
    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("▲"))
        .end_symbol(Some("▼"));
    let mut scrollbar_state = ScrollbarState::new(total).position(position);
    frame.render_stateful_widget(
        scrollbar,
        area.inner(Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut scrollbar_state,
    );
}

/// Offset of the first visible line for a bottom-anchored transcript.
/// `scroll_up` counts lines back from the newest; 0 follows the tail.
pub fn tail_offset(total: usize, visible: usize, scroll_up: usize) -> usize {
    let bottom = total.saturating_sub(visible);
    bottom.saturating_sub(scroll_up)
}

/// Return a `Rect` centered within `area` with the given dimensions.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}
