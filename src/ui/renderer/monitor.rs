//! Monitor tab: machine list, live reading table and alert panel.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::models::{CellStatus, ChannelStatus, Severity};
use crate::monitor::Phase;
use crate::ui::input::TextInput;
use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use crate::utils::{spinner_char, truncate_str};

use super::helpers::{format_age, format_value, render_scrollbar_bordered};

pub fn render_monitor(frame: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(40)])
        .split(area);

    render_machine_list(frame, chunks[0], state);

    let alert_height = state
        .monitor
        .report()
        .map(|r| r.alerts.len().max(1) as u16 + 2)
        .unwrap_or(3)
        .min(chunks[1].height / 2);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Status line
            Constraint::Min(5),               // Readings
            Constraint::Length(alert_height), // Alerts
        ])
        .split(chunks[1]);

    render_status_line(frame, right[0], state);
    render_readings(frame, right[1], state);
    render_alerts(frame, right[2], state);
}

fn render_machine_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let t = &state.theme;
    let title = if state.machines_loading {
        format!(" Machines {} ", spinner_char(state.tick_count))
    } else {
        format!(" Machines ({}) ", state.machines.len())
    };
    let block = Block::default()
        .title(Span::styled(title, t.header_style()))
        .borders(Borders::ALL)
        .border_style(t.border_highlight_style());

    if let Some(err) = &state.machines_error {
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let msg = Paragraph::new(vec![
            Line::from(Span::styled(
                "Machine list unavailable",
                Style::default().fg(t.warning),
            )),
            Line::from(Span::styled(
                truncate_str(err, inner.width as usize),
                Style::default().fg(t.text_dim),
            )),
            Line::from(Span::styled(
                truncate_str(&state.backend_url, inner.width as usize),
                Style::default().fg(t.text_muted),
            )),
        ]);
        frame.render_widget(msg, inner);
        return;
    }

    let watched = state.monitor.entity();
    let items: Vec<ListItem> = state
        .machines
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let marker = if Some(m.as_str()) == watched { "● " } else { "  " };
            let style = if i == state.machine_cursor {
                t.table_row_selected()
            } else {
                t.table_row_normal()
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(t.phase_color(state.monitor.phase()))),
                Span::styled(truncate_str(m, 22), style),
            ]))
            .style(style)
        })
        .collect();

    let total = items.len();
    frame.render_widget(List::new(items).block(block), area);
    render_scrollbar_bordered(frame, area, total, state.machine_cursor);
}

fn render_status_line(frame: &mut Frame, area: Rect, state: &AppState) {
    let t = &state.theme;
    let m = &state.monitor;

    let mut spans = vec![Span::raw(" ")];
    match m.phase() {
        Phase::Idle => spans.push(Span::styled(
            "Select a machine and press Enter to start monitoring",
            Style::default().fg(t.text_dim),
        )),
        Phase::Loading => spans.push(Span::styled(
            format!("{} Fetching latest reading...", spinner_char(state.tick_count)),
            Style::default().fg(t.info),
        )),
        Phase::Ready | Phase::Error => {
            if let Some(report) = m.report() {
                spans.push(Span::styled(
                    format!(" {} ", report.overall),
                    t.severity_badge_style(report.overall),
                ));
                spans.push(Span::raw("  "));
            }
            if let Some(reading) = m.reading() {
                spans.push(Span::styled(
                    reading.timestamp.clone(),
                    Style::default().fg(t.text_dim),
                ));
            }
        }
    }
    spans.push(Span::styled(
        format!("  every {}s", state.refresh_secs),
        Style::default().fg(t.text_muted),
    ));
    if let Some(when) = m.last_updated() {
        spans.push(Span::styled(
            format!(" · {}", format_age(when)),
            Style::default().fg(t.text_muted),
        ));
    }

    let title = match m.entity() {
        Some(e) => format!(" {} ", e),
        None => " Monitor ".to_string(),
    };
    let block = Block::default()
        .title(Span::styled(title, t.header_style()))
        .borders(Borders::ALL)
        .border_style(t.border_style());
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_readings(frame: &mut Frame, area: Rect, state: &AppState) {
    let t = &state.theme;
    let m = &state.monitor;
    let block = Block::default()
        .title(Span::styled(" Sensor Readings ", t.header_style()))
        .borders(Borders::ALL)
        .border_style(t.border_style());

    if m.no_data() || m.reading().is_none() {
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let mut lines = vec![Line::raw("")];
        if m.no_data() {
            lines.push(Line::from(Span::styled(
                "  No data for this machine yet.",
                Style::default().fg(t.warning),
            )));
        } else if let Some(err) = m.last_error() {
            lines.push(Line::from(Span::styled(
                format!("  {}", err),
                Style::default().fg(t.danger),
            )));
        } else if m.phase() != Phase::Idle {
            lines.push(Line::from(Span::styled(
                "  Waiting for the first reading...",
                Style::default().fg(t.text_dim),
            )));
        }
        frame.render_widget(Paragraph::new(lines), inner);
        return;
    }

    let rows = state.monitor_rows();
    render_channel_table(frame, area, block, &rows, None, None, t);
}

fn render_alerts(frame: &mut Frame, area: Rect, state: &AppState) {
    let t = &state.theme;
    let m = &state.monitor;

    let mut lines: Vec<Line> = Vec::new();
    let border = match m.report() {
        Some(report) if report.all_normal() => {
            lines.push(Line::from(Span::styled(
                " ✓ All parameters normal",
                Style::default().fg(t.success).add_modifier(Modifier::BOLD),
            )));
            t.border_style()
        }
        Some(report) => {
            for a in &report.alerts {
                let symbol = match a.severity {
                    Severity::Danger => "X",
                    _ => "!",
                };
                lines.push(Line::from(vec![
                    Span::styled(format!(" {} ", symbol), t.alert_style(a.severity)),
                    Span::styled(format!("{:>6} ", a.severity), t.severity_badge_style(a.severity)),
                    Span::raw(" "),
                    Span::styled(a.message.clone(), t.alert_style(a.severity)),
                ]));
            }
            Style::default().fg(t.severity_color(report.overall))
        }
        None if m.no_data() => {
            lines.push(Line::from(Span::styled(
                " No data, nothing to check",
                Style::default().fg(t.warning),
            )));
            t.border_style()
        }
        None => {
            lines.push(Line::from(Span::styled(
                " No alerts yet",
                Style::default().fg(t.text_muted),
            )));
            t.border_style()
        }
    };

    // Keep the last good alerts visible and flag the failure in the title.
    let title = match (m.phase(), m.last_error()) {
        (Phase::Error, Some(err)) if m.reading().is_some() => {
            format!(" Alerts · {} ", truncate_str(err, 50))
        }
        _ => " Alerts ".to_string(),
    };
    let block = Block::default()
        .title(Span::styled(title, t.header_style()))
        .borders(Borders::ALL)
        .border_style(border);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Channel / value / normal band / status table shared by the monitor and
/// sensor tabs. `editing` replaces the selected row's value cell.
pub(super) fn render_channel_table(
    frame: &mut Frame,
    area: Rect,
    block: Block,
    rows: &[ChannelStatus],
    selected: Option<usize>,
    editing: Option<&TextInput>,
    t: &Theme,
) {
    let header = Row::new(vec![
        Cell::from("PARAMETER").style(t.table_header_style()),
        Cell::from("VALUE").style(t.table_header_style()),
        Cell::from("UNIT").style(t.table_header_style()),
        Cell::from("NORMAL").style(t.table_header_style()),
        Cell::from("STATUS").style(t.table_header_style()),
    ])
    .height(1);

    let table_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let is_selected = selected == Some(i);
            let value_cell = match editing {
                Some(input) if is_selected => Cell::from(format!("{}▏", input.text()))
                    .style(Style::default().fg(t.bg_dark).bg(t.accent)),
                _ => Cell::from(format_value(r.value)).style(match r.status.severity() {
                    Some(s) => t.alert_style(s),
                    None => Style::default().fg(t.text_dim),
                }),
            };
            let status_cell = match r.status {
                CellStatus::Classified(s) => {
                    Cell::from(Span::styled(format!(" {} ", s), t.severity_badge_style(s)))
                }
                CellStatus::Invalid => Cell::from(Span::styled(
                    " INVALID ",
                    Style::default().fg(t.danger).add_modifier(Modifier::BOLD),
                )),
                CellStatus::Unmonitored => {
                    Cell::from(Span::styled("—", Style::default().fg(t.text_muted)))
                }
            };
            let style = if is_selected {
                t.table_row_selected()
            } else {
                t.table_row_normal()
            };
            Row::new(vec![
                Cell::from(truncate_str(&r.display_name, 28)),
                value_cell,
                Cell::from(r.unit.clone().unwrap_or_default())
                    .style(Style::default().fg(t.text_dim)),
                Cell::from(r.normal.clone().unwrap_or_else(|| "—".to_string()))
                    .style(Style::default().fg(t.text_muted)),
                status_cell,
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        table_rows,
        [
            Constraint::Min(20),
            Constraint::Length(12),
            Constraint::Length(7),
            Constraint::Length(16),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(t.table_row_selected());

    let mut table_state = TableState::default().with_selected(selected);
    frame.render_stateful_widget(table, area, &mut table_state);
    render_scrollbar_bordered(frame, area, rows.len() + 1, selected.unwrap_or(0));
}
