use std::sync::Arc;

use crate::error::MonitorResult;
use crate::models::{Alert, AlertReport, CellStatus, Channel, ChannelRegistry, ChannelStatus, Reading, Zone};

use super::classifier::{classify, classify_zone};

/// The alert aggregation engine. Walks the channel registry in order and
/// turns every non-normal value of a reading into an alert.
///
/// Stateless: the same reading always produces the same output, and each
/// cycle's alerts fully replace the previous cycle's.
#[derive(Debug, Clone)]
pub struct AlertDetector {
    registry: Arc<ChannelRegistry>,
}

impl AlertDetector {
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }

    /// Ordered alerts for one reading.
    ///
    /// Channels missing from the reading are skipped. A non-finite value on a
    /// configured channel aborts the whole cycle.
    pub fn aggregate(&self, reading: &Reading) -> MonitorResult<Vec<Alert>> {
        let mut alerts = Vec::new();

        for channel in self.registry.all_channels() {
            let Some(value) = reading.get(&channel.name) else {
                continue;
            };
            let zone = classify_zone(channel, value)?;
            if zone != Zone::Normal {
                alerts.push(build_alert(channel, value, zone));
            }
        }

        Ok(alerts)
    }

    /// Alerts plus the overall risk posture.
    pub fn report(&self, reading: &Reading) -> MonitorResult<AlertReport> {
        self.aggregate(reading).map(AlertReport::from_alerts)
    }

    /// Like [`report`](Self::report) but distinguishes "no data" (`None`)
    /// from "all normal" (`Some` with zero alerts).
    pub fn report_for(&self, reading: Option<&Reading>) -> MonitorResult<Option<AlertReport>> {
        reading.map(|r| self.report(r)).transpose()
    }

    /// One row per value in the reading: configured channels first in
    /// registry order, then unconfigured ones by name.
    pub fn status_summary(&self, reading: &Reading) -> Vec<ChannelStatus> {
        let mut rows = Vec::with_capacity(reading.values.len());

        for channel in self.registry.all_channels() {
            if let Some(value) = reading.get(&channel.name) {
                rows.push(ChannelStatus {
                    channel: channel.name.clone(),
                    display_name: channel.display_name.clone(),
                    value,
                    unit: Some(channel.unit.clone()),
                    normal: Some(channel.band.normal_summary()),
                    status: match classify(channel, value) {
                        Ok(severity) => CellStatus::Classified(severity),
                        Err(_) => CellStatus::Invalid,
                    },
                });
            }
        }

        // BTreeMap iteration is already sorted by name
        for (name, value) in &reading.values {
            if self.registry.lookup(name).is_none() {
                rows.push(ChannelStatus {
                    channel: name.clone(),
                    display_name: crate::utils::split_camel_case(name),
                    value: *value,
                    unit: None,
                    normal: None,
                    status: CellStatus::Unmonitored,
                });
            }
        }

        rows
    }
}

fn build_alert(channel: &Channel, value: f64, zone: Zone) -> Alert {
    Alert {
        channel: channel.name.clone(),
        display_name: channel.display_name.clone(),
        value,
        unit: channel.unit.clone(),
        severity: zone.severity(),
        message: format!(
            "{}: {} reading {} {} (normal {})",
            channel.display_name,
            zone.phrase(),
            value,
            channel.unit,
            channel.band.normal_summary(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use crate::models::{Band, Severity};

    fn make_detector() -> AlertDetector {
        AlertDetector::new(Arc::new(ChannelRegistry::feed_mill()))
    }

    fn two_channel_detector() -> AlertDetector {
        let registry = ChannelRegistry::new(vec![
            Channel::new(
                "CurrentMotor",
                "Current Motor",
                "Amp",
                Band::DangerRange {
                    min: 280.0,
                    max: 320.0,
                    danger_min: 240.0,
                    danger_max: 360.0,
                },
            ),
            Channel::new(
                "TempBrassBearingDE",
                "Temp Brass Bearing DE",
                "°C",
                Band::TieredCeiling {
                    max: 75.0,
                    warning: 85.0,
                    danger: 95.0,
                },
            ),
        ])
        .unwrap();
        AlertDetector::new(Arc::new(registry))
    }

    fn reading() -> Reading {
        Reading::new("Feed Mill 1", "2025-10-01T08:00:00")
    }

    // ── Concrete scenarios ────────────────────────────────────────

    #[test]
    fn both_normal_yields_no_alerts() {
        let det = two_channel_detector();
        let r = reading()
            .with("CurrentMotor", 305.0)
            .with("TempBrassBearingDE", 68.0);
        assert!(det.aggregate(&r).unwrap().is_empty());
    }

    #[test]
    fn low_current_is_danger() {
        let det = two_channel_detector();
        let alerts = det.aggregate(&reading().with("CurrentMotor", 230.0)).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Danger);
        assert!(alerts[0].message.contains("230"));
        assert!(alerts[0].message.contains("Current Motor"));
        assert!(alerts[0].message.contains("critical"));
    }

    #[test]
    fn hot_bearing_is_warning() {
        let det = two_channel_detector();
        let alerts = det
            .aggregate(&reading().with("TempBrassBearingDE", 90.0))
            .unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Warning);
        assert!(alerts[0].message.contains("high"));
        assert!(alerts[0].message.contains("°C"));
    }

    // ── Ordering and counting ─────────────────────────────────────

    #[test]
    fn alert_order_follows_registry() {
        let det = make_detector();
        let r = reading()
            .with("Vibration", 5.0)
            .with("PowerMotor", 200.0)
            .with("TempOilGear", 70.0);
        let names: Vec<_> = det
            .aggregate(&r)
            .unwrap()
            .into_iter()
            .map(|a| a.channel)
            .collect();
        assert_eq!(names, vec!["PowerMotor", "TempOilGear", "Vibration"]);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let det = make_detector();
        let a = reading()
            .with("SpeedMotor", 1300.0)
            .with("CurrentMotor", 400.0);
        let b = reading()
            .with("CurrentMotor", 400.0)
            .with("SpeedMotor", 1300.0);
        assert_eq!(det.aggregate(&a).unwrap(), det.aggregate(&b).unwrap());
    }

    #[test]
    fn alert_count_matches_non_normal_channels() {
        let det = make_detector();
        let r = reading()
            .with("PowerMotor", 300.0)
            .with("CurrentMotor", 250.0)
            .with("TempOilGear", 90.0)
            .with("Vibration", 0.5)
            .with("SpeedRoller", 0.0);
        let expected = ChannelRegistry::feed_mill()
            .all_channels()
            .iter()
            .filter_map(|c| r.get(&c.name).map(|v| (c, v)))
            .filter(|(c, v)| classify(c, *v).unwrap() != Severity::Normal)
            .count();
        assert_eq!(det.aggregate(&r).unwrap().len(), expected);
        assert_eq!(expected, 2);
    }

    #[test]
    fn aggregate_is_idempotent() {
        let det = make_detector();
        let r = reading().with("CurrentMotor", 250.0).with("Vibration", 3.0);
        assert_eq!(det.aggregate(&r).unwrap(), det.aggregate(&r).unwrap());
    }

    #[test]
    fn unconfigured_channel_never_alerts() {
        let det = make_detector();
        let r = reading().with("SpeedRoller", -1e6);
        assert!(det.aggregate(&r).unwrap().is_empty());
    }

    // ── Errors and absence ────────────────────────────────────────

    #[test]
    fn non_finite_value_aborts_cycle() {
        let det = make_detector();
        let r = reading().with("CurrentMotor", 230.0).with("Vibration", f64::NAN);
        let err = det.aggregate(&r).unwrap_err();
        assert!(
            matches!(err, MonitorError::InvalidReading { ref channel, .. } if channel == "Vibration")
        );
    }

    #[test]
    fn absent_reading_differs_from_all_normal() {
        let det = make_detector();
        assert!(det.report_for(None).unwrap().is_none());

        let r = reading().with("CurrentMotor", 300.0);
        let report = det.report_for(Some(&r)).unwrap().unwrap();
        assert!(report.all_normal());
        assert_eq!(report.overall, Severity::Normal);
    }

    #[test]
    fn report_overall_tracks_worst_alert() {
        let det = make_detector();
        let r = reading().with("TempOilGear", 70.0).with("CurrentMotor", 500.0);
        assert_eq!(det.report(&r).unwrap().overall, Severity::Danger);
    }

    // ── Status summary ────────────────────────────────────────────

    #[test]
    fn status_summary_lists_unconfigured_last() {
        let det = make_detector();
        let r = reading()
            .with("SpeedRoller", 5.4)
            .with("Vibration", 2.0)
            .with("CurrentMotor", 300.0);
        let rows = det.status_summary(&r);
        let names: Vec<_> = rows.iter().map(|s| s.channel.as_str()).collect();
        assert_eq!(names, vec!["CurrentMotor", "Vibration", "SpeedRoller"]);
        assert_eq!(rows[1].status, CellStatus::Classified(Severity::Warning));
        assert_eq!(rows[2].status, CellStatus::Unmonitored);
        assert_eq!(rows[2].display_name, "Speed Roller");
    }

    #[test]
    fn non_finite_value_is_invalid_not_unmonitored() {
        let det = make_detector();
        let r = reading()
            .with("TempOilGear", f64::INFINITY)
            .with("SpeedRoller", f64::NAN);
        let rows = det.status_summary(&r);
        assert_eq!(rows[0].channel, "TempOilGear");
        assert_eq!(rows[0].status, CellStatus::Invalid);
        assert_eq!(rows[1].status, CellStatus::Unmonitored);
    }
}
