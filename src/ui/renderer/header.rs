//! Header bar: logo, tab strip, machine summary.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::monitor::Phase;
use crate::ui::state::{AppState, Tab};
use crate::utils::{spinner_char, truncate_str};

pub fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let t = &state.theme;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(22), // Logo
            Constraint::Min(20),    // Tabs
            Constraint::Length(34), // Machine summary
        ])
        .split(area);

    // Logo
    let pulse = if state.monitor.is_running() && state.tick_count % 10 < 5 {
        "●"
    } else {
        "○"
    };
    let logo = Paragraph::new(Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(pulse, Style::default().fg(t.phase_color(state.monitor.phase()))),
        Span::styled(" ZEROBREAK", t.header_style()),
        Span::styled(
            concat!(" v", env!("CARGO_PKG_VERSION")),
            Style::default().fg(t.text_muted),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(t.border_style()),
    );
    frame.render_widget(logo, chunks[0]);

    // Tabs
    let active = state.active_tab();
    let mut tab_spans = vec![Span::raw(" ")];
    for (i, tab) in Tab::all().iter().enumerate() {
        let style = if *tab == active {
            t.tab_active_style()
        } else if tab.takes_text() {
            Style::default().fg(t.ai_accent)
        } else {
            t.tab_inactive_style()
        };
        tab_spans.push(Span::styled(format!(" {} ", tab.label()), style));
        if i < Tab::all().len() - 1 {
            tab_spans.push(Span::styled(" │ ", Style::default().fg(t.text_muted)));
        }
    }

    // Danger badge
    let danger_count = state.danger_alert_count();
    if danger_count > 0 {
        tab_spans.push(Span::raw("  "));
        tab_spans.push(Span::styled(
            format!(" {} DANGER ", danger_count),
            t.severity_badge_style(crate::models::Severity::Danger),
        ));
    }

    // Assistant loading indicator
    if state.chat.is_pending() || state.manual.is_pending() {
        tab_spans.push(Span::raw(" "));
        tab_spans.push(Span::styled(
            format!(" {} AI ", spinner_char(state.tick_count)),
            Style::default()
                .fg(t.bg_dark)
                .bg(t.ai_accent)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let tab_line = Paragraph::new(Line::from(tab_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(t.border_style()),
    );
    frame.render_widget(tab_line, chunks[1]);

    // Machine summary
    let summary = match state.monitor.entity() {
        Some(entity) => {
            let phase = match state.monitor.phase() {
                Phase::Idle => "idle",
                Phase::Loading => "loading",
                Phase::Ready => "live",
                Phase::Error => "error",
            };
            format!("{} · {}", truncate_str(entity, 20), phase)
        }
        None => "no machine selected".to_string(),
    };
    let summary = Paragraph::new(Line::from(vec![Span::styled(
        summary,
        Style::default().fg(t.phase_color(state.monitor.phase())),
    )]))
    .alignment(Alignment::Right)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(t.border_style()),
    );
    frame.render_widget(summary, chunks[2]);
}
