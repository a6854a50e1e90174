//! Sensor tab: snapshot metadata, editable cell table, backend results.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::ui::state::AppState;
use crate::utils::spinner_char;

use super::helpers::format_value;
use super::monitor::render_channel_table;

pub fn render_sensor(frame: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(8)])
        .split(area);

    render_upload_info(frame, chunks[0], state);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(50), Constraint::Length(46)])
        .split(chunks[1]);

    render_table(frame, body[0], state);

    let results = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(body[1]);
    render_analysis(frame, results[0], state);
    render_prediction(frame, results[1], state);
}

fn render_upload_info(frame: &mut Frame, area: Rect, state: &AppState) {
    let t = &state.theme;
    let line = match state.sensor.upload() {
        Some(info) => Line::from(vec![
            Span::styled(" Source ", Style::default().fg(t.text_muted)),
            Span::styled(info.filename.clone(), Style::default().fg(t.text_primary)),
            Span::styled("  Rows ", Style::default().fg(t.text_muted)),
            Span::styled(info.total_rows.to_string(), Style::default().fg(t.text_primary)),
            Span::styled("  Machines ", Style::default().fg(t.text_muted)),
            Span::styled(info.machines.join(", "), Style::default().fg(t.text_primary)),
            Span::styled("  Range ", Style::default().fg(t.text_muted)),
            Span::styled(info.date_range.clone(), Style::default().fg(t.text_dim)),
        ]),
        None => Line::from(Span::styled(
            " No snapshot loaded. Press l on the Monitor tab to copy the live reading here.",
            Style::default().fg(t.text_dim),
        )),
    };
    let block = Block::default()
        .title(Span::styled(" Snapshot ", t.header_style()))
        .borders(Borders::ALL)
        .border_style(t.border_style());
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_table(frame: &mut Frame, area: Rect, state: &AppState) {
    let t = &state.theme;
    let sensor = &state.sensor;
    let title = if sensor.editing.is_some() {
        " Sensor Data · editing (Enter save, Esc cancel) ".to_string()
    } else {
        match state.sensor_report() {
            Ok(Some(report)) if report.all_normal() => " Sensor Data · all normal ".to_string(),
            Ok(Some(report)) => format!(
                " Sensor Data · {} alert(s), {} ",
                report.alerts.len(),
                report.overall
            ),
            Ok(None) => " Sensor Data ".to_string(),
            Err(e) => format!(" Sensor Data · {} ", e),
        }
    };
    let border = if sensor.editing.is_some() {
        t.border_highlight_style()
    } else {
        t.border_style()
    };
    let block = Block::default()
        .title(Span::styled(title, t.header_style()))
        .borders(Borders::ALL)
        .border_style(border);

    let rows = state.sensor_rows();
    if rows.is_empty() {
        frame.render_widget(block, area);
        return;
    }
    render_channel_table(
        frame,
        area,
        block,
        &rows,
        Some(sensor.selected),
        sensor.editing.as_ref(),
        t,
    );
}

fn render_analysis(frame: &mut Frame, area: Rect, state: &AppState) {
    let t = &state.theme;
    let sensor = &state.sensor;
    let mut lines: Vec<Line> = Vec::new();

    if sensor.analyzing {
        lines.push(Line::from(Span::styled(
            format!(" {} Analyzing...", spinner_char(state.tick_count)),
            Style::default().fg(t.ai_accent),
        )));
    } else if let Some(a) = &sensor.analysis {
        if a.alerts.is_empty() {
            lines.push(Line::from(Span::styled(
                " ✓ No alerts",
                Style::default().fg(t.success),
            )));
        }
        for alert in &a.alerts {
            lines.push(Line::from(Span::styled(
                format!(" ! {}", alert),
                Style::default().fg(t.warning),
            )));
        }
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            " Recommended action",
            Style::default().fg(t.accent_secondary).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!(" {}", a.recommended_action),
            Style::default().fg(t.ai_response),
        )));
    } else if let Some(err) = &sensor.last_error {
        lines.push(Line::from(Span::styled(
            format!(" {}", err),
            Style::default().fg(t.danger),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            " Press a to analyze the snapshot",
            Style::default().fg(t.text_muted),
        )));
    }

    let block = Block::default()
        .title(Span::styled(" Analysis ", Style::default().fg(t.ai_accent)))
        .borders(Borders::ALL)
        .border_style(t.border_style());
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        area,
    );
}

fn render_prediction(frame: &mut Frame, area: Rect, state: &AppState) {
    let t = &state.theme;
    let sensor = &state.sensor;
    let mut lines: Vec<Line> = Vec::new();

    if sensor.predicting {
        lines.push(Line::from(Span::styled(
            format!(" {} Predicting...", spinner_char(state.tick_count)),
            Style::default().fg(t.ai_accent),
        )));
    } else if let Some(p) = &sensor.prediction {
        let risk = t.risk_color(p.risk_score);
        lines.push(Line::from(vec![
            Span::styled(" Risk ", Style::default().fg(t.text_muted)),
            Span::styled(
                format!("{:.1}%", p.risk_score),
                Style::default().fg(risk).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {}", p.risk_level), Style::default().fg(risk)),
        ]));
        if !p.prediction.is_empty() {
            lines.push(Line::from(Span::styled(
                format!(" {}", p.prediction),
                Style::default().fg(t.text_primary),
            )));
        }
        if let Some(base) = &p.base_predictions {
            let fmt = |v: Option<f64>| v.map(format_value).unwrap_or_else(|| "—".to_string());
            lines.push(Line::from(Span::styled(
                format!(
                    " XGB {}  LGB {}  RF {}",
                    fmt(base.xgb),
                    fmt(base.lgb),
                    fmt(base.rf)
                ),
                Style::default().fg(t.text_dim),
            )));
        }
        let (label, color) = if p.anomaly_flag {
            ("Anomaly detected", t.danger)
        } else {
            ("No anomaly", t.success)
        };
        let score = p
            .anomaly_score
            .map(|s| format!(" (score {})", format_value(s)))
            .unwrap_or_default();
        lines.push(Line::from(Span::styled(
            format!(" {}{}", label, score),
            Style::default().fg(color),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            " Press p for a breakdown prediction",
            Style::default().fg(t.text_muted),
        )));
    }

    let block = Block::default()
        .title(Span::styled(" Prediction ", Style::default().fg(t.ai_accent)))
        .borders(Borders::ALL)
        .border_style(t.border_style());
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        area,
    );
}
