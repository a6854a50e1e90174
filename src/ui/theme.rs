use ratatui::style::{Color, Modifier, Style};

use crate::models::Severity;
use crate::monitor::Phase;

/// All available built-in theme names.
pub const BUILTIN_THEME_NAMES: &[&str] = &["default", "gruvbox", "nord"];

/// Data-driven theme: every color in one struct.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,

    // ── Brand / Primary ──────────────────────────────────────
    pub accent: Color,
    pub accent_secondary: Color,
    pub bg_dark: Color,

    // ── Text ─────────────────────────────────────────────────
    pub text_primary: Color,
    pub text_dim: Color,
    pub text_muted: Color,

    // ── Semantic ─────────────────────────────────────────────
    pub success: Color,
    pub warning: Color,
    pub danger: Color,
    pub info: Color,

    pub table_row_selected_bg: Color,
    pub border: Color,

    // ── Assistant ────────────────────────────────────────────
    pub ai_accent: Color,
    pub ai_response: Color,
}

impl Theme {
    // ── Constructors ─────────────────────────────────────────

    pub fn default_dark() -> Self {
        Self {
            name: "default".to_string(),
            accent: Color::Rgb(99, 179, 237),
            accent_secondary: Color::Rgb(129, 230, 217),
            bg_dark: Color::Rgb(22, 22, 30),
            text_primary: Color::Rgb(220, 220, 235),
            text_dim: Color::Rgb(120, 120, 145),
            text_muted: Color::Rgb(80, 80, 100),
            success: Color::Rgb(72, 199, 142),
            warning: Color::Rgb(255, 193, 69),
            danger: Color::Rgb(255, 85, 85),
            info: Color::Rgb(99, 179, 237),
            table_row_selected_bg: Color::Rgb(40, 40, 60),
            border: Color::Rgb(55, 55, 75),
            ai_accent: Color::Rgb(217, 143, 255),
            ai_response: Color::Rgb(200, 210, 230),
        }
    }

    /// Gruvbox dark palette.
    pub fn gruvbox() -> Self {
        Self {
            name: "gruvbox".to_string(),
            accent: Color::Rgb(215, 153, 33),            // yellow
            accent_secondary: Color::Rgb(142, 192, 124), // green
            bg_dark: Color::Rgb(40, 40, 40),             // bg0
            text_primary: Color::Rgb(235, 219, 178),     // fg
            text_dim: Color::Rgb(168, 153, 132),         // fg4
            text_muted: Color::Rgb(102, 92, 84),         // bg4
            success: Color::Rgb(142, 192, 124),
            warning: Color::Rgb(250, 189, 47),
            danger: Color::Rgb(251, 73, 52),
            info: Color::Rgb(131, 165, 152),
            table_row_selected_bg: Color::Rgb(60, 56, 54),
            border: Color::Rgb(80, 73, 69),
            ai_accent: Color::Rgb(211, 134, 155), // purple
            ai_response: Color::Rgb(235, 219, 178),
        }
    }

    /// Nord palette.
    pub fn nord() -> Self {
        Self {
            name: "nord".to_string(),
            accent: Color::Rgb(136, 192, 208),           // nord8
            accent_secondary: Color::Rgb(143, 188, 187), // nord7
            bg_dark: Color::Rgb(46, 52, 64),             // nord0
            text_primary: Color::Rgb(229, 233, 240),     // nord5
            text_dim: Color::Rgb(182, 191, 204),
            text_muted: Color::Rgb(107, 112, 127),
            success: Color::Rgb(163, 190, 140), // nord14
            warning: Color::Rgb(235, 203, 139), // nord13
            danger: Color::Rgb(191, 97, 106),   // nord11
            info: Color::Rgb(129, 161, 193),    // nord9
            table_row_selected_bg: Color::Rgb(67, 76, 94),
            border: Color::Rgb(76, 86, 106),
            ai_accent: Color::Rgb(180, 142, 173),
            ai_response: Color::Rgb(216, 222, 233),
        }
    }

    /// Look up a built-in theme by name (case-insensitive).
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" => Some(Self::default_dark()),
            "gruvbox" => Some(Self::gruvbox()),
            "nord" => Some(Self::nord()),
            _ => None,
        }
    }

    /// Cycle to the next built-in theme.
    pub fn next_builtin(&self) -> Self {
        let idx = BUILTIN_THEME_NAMES
            .iter()
            .position(|&n| n == self.name)
            .unwrap_or(0);
        let next = BUILTIN_THEME_NAMES[(idx + 1) % BUILTIN_THEME_NAMES.len()];
        Self::by_name(next).unwrap_or_default()
    }

    // ── Computed Styles ──────────────────────────────────────

    pub fn header_style(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tab_active_style(&self) -> Style {
        Style::default()
            .fg(self.bg_dark)
            .bg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tab_inactive_style(&self) -> Style {
        Style::default().fg(self.text_dim)
    }

    pub fn table_header_style(&self) -> Style {
        Style::default()
            .fg(self.accent_secondary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn table_row_normal(&self) -> Style {
        Style::default().fg(self.text_primary)
    }

    pub fn table_row_selected(&self) -> Style {
        Style::default()
            .fg(self.text_primary)
            .bg(self.table_row_selected_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn severity_color(&self, severity: Severity) -> Color {
        match severity {
            Severity::Normal => self.success,
            Severity::Warning => self.warning,
            Severity::Danger => self.danger,
        }
    }

    pub fn alert_style(&self, severity: Severity) -> Style {
        Style::default().fg(self.severity_color(severity))
    }

    pub fn severity_badge_style(&self, severity: Severity) -> Style {
        let fg = match severity {
            Severity::Danger => Color::White,
            _ => self.bg_dark,
        };
        Style::default()
            .fg(fg)
            .bg(self.severity_color(severity))
            .add_modifier(Modifier::BOLD)
    }

    pub fn phase_color(&self, phase: Phase) -> Color {
        match phase {
            Phase::Idle => self.text_muted,
            Phase::Loading => self.info,
            Phase::Ready => self.success,
            Phase::Error => self.warning,
        }
    }

    /// Color for a backend risk score (0..100).
    pub fn risk_color(&self, score: f64) -> Color {
        if score >= 70.0 {
            self.danger
        } else if score >= 40.0 {
            self.warning
        } else {
            self.success
        }
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn border_highlight_style(&self) -> Style {
        Style::default().fg(self.accent)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_dark()
    }
}
