//! Chat tab: transcript and input box.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::ai::MessageRole;
use crate::ui::input::TextInput;
use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use crate::utils::spinner_char;

use super::helpers::{render_scrollbar, tail_offset};

pub fn render_chat(frame: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),    // Transcript
            Constraint::Length(3), // Input box
        ])
        .split(area);

    render_transcript(frame, chunks[0], state);
    render_input_box(
        frame,
        chunks[1],
        &state.chat_input,
        if state.chat.is_pending() {
            "  Waiting for the assistant..."
        } else {
            "  Ask about machine health, alerts or maintenance..."
        },
        " Message ",
        &state.theme,
    );
}

fn render_transcript(frame: &mut Frame, area: Rect, state: &AppState) {
    let t = &state.theme;
    let pending = state.chat.is_pending();
    let title = if pending {
        format!(" {} Thinking... ", spinner_char(state.tick_count))
    } else {
        " Maintenance Assistant ".to_string()
    };
    let block = Block::default()
        .title(Span::styled(
            title,
            Style::default().fg(t.ai_accent).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(if pending {
            Style::default().fg(t.ai_accent)
        } else {
            t.border_style()
        });

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if state.chat.is_empty() {
        let msg = Paragraph::new(vec![
            Line::raw(""),
            Line::from(Span::styled(
                "  Ask the assistant about your machines.",
                Style::default().fg(t.text_dim),
            )),
            Line::raw(""),
            Line::from(Span::styled("  Try asking:", Style::default().fg(t.text_muted))),
            Line::from(Span::styled(
                "    Which machines had danger alerts today?",
                Style::default().fg(t.accent),
            )),
            Line::from(Span::styled(
                "    Why is the gearbox oil running hot on Feed Mill 2?",
                Style::default().fg(t.accent),
            )),
        ]);
        frame.render_widget(msg, inner);
        return;
    }

    let wrap_width = inner.width.saturating_sub(4).max(1) as usize;
    let mut lines: Vec<Line> = Vec::new();

    for turn in state.chat.turns() {
        let (label, badge_bg, text_fg) = match turn.role {
            MessageRole::User => (" You ", t.accent, t.text_primary),
            MessageRole::Assistant => (" AI ", t.ai_accent, t.ai_response),
        };
        let mut header = vec![Span::styled(
            label,
            Style::default()
                .fg(t.bg_dark)
                .bg(badge_bg)
                .add_modifier(Modifier::BOLD),
        )];
        if let Some(tools) = &turn.tools_used {
            header.push(Span::styled(
                format!("  tools: {}", tools.join(", ")),
                Style::default().fg(t.text_muted),
            ));
        }
        lines.push(Line::from(header));
        for line in textwrap::wrap(&turn.content, wrap_width) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(line.to_string(), Style::default().fg(text_fg)),
            ]));
        }
        lines.push(Line::raw(""));
    }

    let visible = inner.height as usize;
    let total = lines.len();
    let offset = tail_offset(total, visible, state.chat_scroll);
    let visible_lines: Vec<Line> = lines.into_iter().skip(offset).take(visible).collect();
    frame.render_widget(Paragraph::new(visible_lines), inner);
    render_scrollbar(frame, inner, total, offset);
}

/// Single-line input with an inverted block cursor.
pub(super) fn render_input_box(
    frame: &mut Frame,
    area: Rect,
    input: &TextInput,
    placeholder: &str,
    title: &str,
    t: &Theme,
) {
    let line = if input.is_empty() {
        Line::from(vec![
            Span::raw("  "),
            Span::styled(" ", Style::default().bg(t.accent)),
            Span::styled(placeholder.to_string(), Style::default().fg(t.text_muted)),
        ])
    } else {
        let text = input.text();
        let (before, rest) = text.split_at(input.cursor());
        let cursor_len = rest.chars().next().map(char::len_utf8).unwrap_or(0);
        let (at, after) = rest.split_at(cursor_len);
        Line::from(vec![
            Span::raw("  "),
            Span::styled(before.to_string(), Style::default().fg(t.text_primary)),
            Span::styled(
                if at.is_empty() { " ".to_string() } else { at.to_string() },
                Style::default().fg(t.bg_dark).bg(t.accent),
            ),
            Span::styled(after.to_string(), Style::default().fg(t.text_primary)),
        ])
    };

    let widget = Paragraph::new(line).block(
        Block::default()
            .title(Span::styled(title.to_string(), Style::default().fg(t.ai_accent)))
            .borders(Borders::ALL)
            .border_style(t.border_highlight_style()),
    );
    frame.render_widget(widget, area);
}
