use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered severity of one channel's value: `Normal < Warning < Danger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Warning,
    Danger,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Normal => write!(f, "NORMAL"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Danger => write!(f, "DANGER"),
        }
    }
}

/// Finer-grained position of a value relative to its band.
///
/// Several zones share a severity; the zone only picks the urgency wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Normal,
    /// First tier outside the normal band.
    Abnormal,
    /// Above the warning ceiling of a tiered band.
    High,
    /// Inside a danger tier.
    Critical,
}

impl Zone {
    pub fn severity(&self) -> Severity {
        match self {
            Zone::Normal => Severity::Normal,
            Zone::Abnormal | Zone::High => Severity::Warning,
            Zone::Critical => Severity::Danger,
        }
    }

    pub fn phrase(&self) -> &'static str {
        match self {
            Zone::Normal => "normal",
            Zone::Abnormal => "abnormal",
            Zone::High => "high",
            Zone::Critical => "critical",
        }
    }
}

/// A rendered message for one non-normal (channel, value) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub channel: String,
    pub display_name: String,
    pub value: f64,
    pub unit: String,
    pub severity: Severity,
    pub message: String,
}

/// Output of one aggregation cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertReport {
    pub alerts: Vec<Alert>,
    /// Highest severity over `alerts`; `Normal` when there are none.
    pub overall: Severity,
}

impl AlertReport {
    pub fn from_alerts(alerts: Vec<Alert>) -> Self {
        let overall = alerts
            .iter()
            .map(|a| a.severity)
            .max()
            .unwrap_or(Severity::Normal);
        Self { alerts, overall }
    }

    pub fn all_normal(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.alerts.iter().filter(|a| a.severity == severity).count()
    }
}

/// Status cell of one table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Classified(Severity),
    /// No band is configured for the channel.
    Unmonitored,
    /// Configured channel with a non-finite value.
    Invalid,
}

impl CellStatus {
    pub fn severity(&self) -> Option<Severity> {
        match self {
            CellStatus::Classified(s) => Some(*s),
            CellStatus::Unmonitored | CellStatus::Invalid => None,
        }
    }
}

/// Per-cell status for the sensor table.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStatus {
    pub channel: String,
    pub display_name: String,
    pub value: f64,
    pub unit: Option<String>,
    /// Normal-band summary, `None` for unconfigured channels.
    pub normal: Option<String>,
    pub status: CellStatus,
}
