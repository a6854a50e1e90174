//! Repair-manual tab: question and answer log.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::ui::state::AppState;
use crate::utils::spinner_char;

use super::chat::render_input_box;
use super::helpers::{render_scrollbar, tail_offset};

pub fn render_manual(frame: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3)])
        .split(area);

    render_log(frame, chunks[0], state);
    render_input_box(
        frame,
        chunks[1],
        &state.manual_input,
        "  Ask the repair manual...",
        " Question ",
        &state.theme,
    );
}

fn render_log(frame: &mut Frame, area: Rect, state: &AppState) {
    let t = &state.theme;
    let block = Block::default()
        .title(Span::styled(
            " Repair Manual ",
            Style::default().fg(t.ai_accent).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(t.border_style());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let wrap_width = inner.width.saturating_sub(4).max(1) as usize;
    let mut lines: Vec<Line> = Vec::new();

    for entry in state.manual.entries() {
        if !entry.question.is_empty() {
            lines.push(Line::from(vec![
                Span::styled(
                    " Q ",
                    Style::default()
                        .fg(t.bg_dark)
                        .bg(t.accent)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::styled(entry.question.clone(), Style::default().fg(t.text_primary)),
            ]));
        }
        match &entry.answer {
            Some(answer) => {
                for line in textwrap::wrap(answer, wrap_width) {
                    lines.push(Line::from(vec![
                        Span::raw("  "),
                        Span::styled(line.to_string(), Style::default().fg(t.ai_response)),
                    ]));
                }
            }
            None => lines.push(Line::from(Span::styled(
                format!("  {} Searching the manual...", spinner_char(state.tick_count)),
                Style::default().fg(t.ai_accent),
            ))),
        }
        lines.push(Line::raw(""));
    }

    let visible = inner.height as usize;
    let total = lines.len();
    let offset = tail_offset(total, visible, state.manual_scroll);
    let visible_lines: Vec<Line> = lines.into_iter().skip(offset).take(visible).collect();
    frame.render_widget(Paragraph::new(visible_lines), inner);
    render_scrollbar(frame, inner, total, offset);
}
