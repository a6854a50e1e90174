//! Popup overlays.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::ui::state::AppState;

use super::helpers::centered_rect;

pub fn render_help_overlay(frame: &mut Frame, area: Rect, state: &AppState) {
    let t = &state.theme;
    let popup_area = centered_rect(60, 30, area);

    frame.render_widget(Clear, popup_area);

    let help_entry = |key: &str, desc: &str, color: ratatui::style::Color| -> Line {
        Line::from(vec![
            Span::styled(
                format!("  {:<18}", key),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(desc.to_string(), Style::default().fg(t.text_primary)),
        ])
    };
    let section = |title: &str| -> Line {
        Line::from(Span::styled(
            format!("  {}", title),
            Style::default().fg(t.accent_secondary).add_modifier(Modifier::BOLD),
        ))
    };

    let help_text = vec![
        Line::from(Span::styled("  ZEROBREAK - Keyboard Shortcuts", t.header_style())),
        Line::raw(""),
        help_entry("Tab / Shift+Tab", "Switch tabs", t.accent),
        help_entry("1 / 2 / 3 / 4", "Jump to tab", t.accent),
        help_entry("Up/Down / j / k", "Move / scroll", t.accent),
        help_entry("PgUp / PgDn", "Page up/down", t.accent),
        help_entry("T", "Cycle theme", t.accent),
        help_entry("q / Ctrl+C", "Quit", t.accent),
        Line::raw(""),
        section("Monitor"),
        help_entry("Enter", "Watch machine under cursor", t.accent),
        help_entry("r", "Refresh now", t.accent),
        help_entry("x", "Stop watching", t.warning),
        help_entry("m", "Reload machine list", t.accent),
        help_entry("l", "Copy reading to Sensor tab", t.accent),
        Line::raw(""),
        section("Sensor"),
        help_entry("e / Enter", "Edit selected value", t.accent),
        help_entry("a", "Analyze snapshot", t.ai_accent),
        help_entry("p", "Predict breakdown risk", t.ai_accent),
        Line::raw(""),
        section("Chat / Manual"),
        help_entry("Enter", "Send", t.ai_accent),
        help_entry("Ctrl+L", "Clear transcript", t.ai_accent),
        help_entry("Esc", "Back to Monitor", t.ai_accent),
        Line::raw(""),
        Line::from(Span::styled(
            "  Press any key to close",
            Style::default().fg(t.text_muted),
        )),
    ];

    let popup = Paragraph::new(help_text).block(
        Block::default()
            .title(Span::styled(" Help ", t.header_style()))
            .borders(Borders::ALL)
            .border_style(t.border_highlight_style())
            .style(Style::default().bg(t.bg_dark)),
    );
    frame.render_widget(popup, popup_area);
}
