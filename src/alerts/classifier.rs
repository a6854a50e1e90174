//! Threshold classifier: channel + value -> severity.
//!
//! Comparisons use the band's thresholds verbatim. Boundaries are inclusive
//! of the normal band (`value == max` is normal). Non-finite input is an
//! error, never silently normal.

use crate::error::{MonitorError, MonitorResult};
use crate::models::{Band, Channel, Severity, Zone};

/// Classify a value against a channel's band.
pub fn classify(channel: &Channel, value: f64) -> MonitorResult<Severity> {
    classify_zone(channel, value).map(|z| z.severity())
}

/// Classify a value and keep the zone used to word the alert.
pub fn classify_zone(channel: &Channel, value: f64) -> MonitorResult<Zone> {
    if !value.is_finite() {
        return Err(MonitorError::invalid_reading(
            &channel.name,
            format!("value {} is not finite", value),
        ));
    }
    Ok(zone_for(&channel.band, value))
}

fn zone_for(band: &Band, value: f64) -> Zone {
    match *band {
        Band::Range { min, max } => {
            if value < min || value > max {
                Zone::Abnormal
            } else {
                Zone::Normal
            }
        }
        Band::Ceiling { max } => {
            if value > max {
                Zone::Abnormal
            } else {
                Zone::Normal
            }
        }
        Band::TieredCeiling {
            max,
            warning,
            danger,
        } => {
            if value > danger {
                Zone::Critical
            } else if value > warning {
                Zone::High
            } else if value > max {
                Zone::Abnormal
            } else {
                Zone::Normal
            }
        }
        Band::DangerRange {
            min,
            max,
            danger_min,
            danger_max,
        } => {
            if value < danger_min || value > danger_max {
                Zone::Critical
            } else if value < min || value > max {
                Zone::Abnormal
            } else {
                Zone::Normal
            }
        }
        Band::StallRange { min, max, stall } => {
            if value <= stall {
                Zone::Critical
            } else if value < min || value > max {
                Zone::Abnormal
            } else {
                Zone::Normal
            }
        }
    }
}
