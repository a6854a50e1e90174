//! Status bar at the bottom of the screen.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::constants::STATUS_MESSAGE_TIMEOUT_SECS;
use crate::ui::state::{AppState, Tab};

use super::helpers::{format_age, key_badge};

pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState) {
    let t = &state.theme;
    let dim =
        |text: &str| -> Span { Span::styled(text.to_string(), Style::default().fg(t.text_dim)) };

    let mut spans = vec![Span::styled(" ", Style::default())];

    match state.active_tab() {
        Tab::Monitor => {
            spans.push(key_badge("q", t.accent, t));
            spans.push(dim(" Quit "));
            spans.push(key_badge("Enter", t.accent, t));
            spans.push(dim(" Watch "));
            spans.push(key_badge("r", t.accent, t));
            spans.push(dim(" Refresh "));
            spans.push(key_badge("l", t.accent, t));
            spans.push(dim(" To sensor "));
            spans.push(key_badge("x", t.warning, t));
            spans.push(dim(" Stop "));
        }
        Tab::Sensor => {
            spans.push(key_badge("q", t.accent, t));
            spans.push(dim(" Quit "));
            spans.push(key_badge("e", t.accent, t));
            spans.push(dim(" Edit "));
            spans.push(key_badge("a", t.ai_accent, t));
            spans.push(dim(" Analyze "));
            spans.push(key_badge("p", t.ai_accent, t));
            spans.push(dim(" Predict "));
        }
        Tab::Chat | Tab::Manual => {
            spans.push(key_badge("Enter", t.accent, t));
            spans.push(dim(" Send "));
            spans.push(key_badge("Ctrl+L", t.accent, t));
            spans.push(dim(" Clear "));
            spans.push(key_badge("Esc", t.accent, t));
            spans.push(dim(" Back "));
        }
    }
    spans.push(key_badge("Tab", t.accent, t));
    spans.push(dim(" Switch "));
    spans.push(key_badge("T", t.accent, t));
    spans.push(dim(&format!(" Theme: {} ", t.name)));
    spans.push(key_badge("?", t.accent, t));
    spans.push(dim(" Help "));

    // Status message -- auto-expires
    if let Some((msg, when)) = &state.status_message {
        if when.elapsed().as_secs() < STATUS_MESSAGE_TIMEOUT_SECS {
            spans.push(Span::styled(
                format!("  {} ", msg),
                Style::default().fg(t.warning).add_modifier(Modifier::BOLD),
            ));
        }
    }

    if let Some(when) = state.monitor.last_updated() {
        spans.push(Span::styled(
            format!("  updated {}", format_age(when)),
            Style::default().fg(t.text_muted),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
