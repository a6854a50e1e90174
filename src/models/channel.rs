use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// Threshold band for one channel.
///
/// The tier shape is explicit in the variant rather than inferred from which
/// optional thresholds happen to be present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Band {
    /// Outside `[min, max]` is abnormal. Two tiers.
    Range { min: f64, max: f64 },
    /// Above `max` is abnormal. Two tiers.
    Ceiling { max: f64 },
    /// `max` < `warning` < `danger` ceiling ladder. Three tiers.
    TieredCeiling { max: f64, warning: f64, danger: f64 },
    /// Normal band `[min, max]` nested inside a danger band
    /// `[danger_min, danger_max]`. Four tiers.
    DangerRange {
        min: f64,
        max: f64,
        danger_min: f64,
        danger_max: f64,
    },
    /// Normal band `[min, max]`; only a stopped machine (at or below
    /// `stall`) is danger.
    StallRange { min: f64, max: f64, stall: f64 },
}

impl Band {
    /// Check that thresholds are finite and ordered.
    pub fn validate(&self) -> MonitorResult<()> {
        let thresholds: Vec<f64> = match *self {
            Band::Range { min, max } => vec![min, max],
            Band::Ceiling { max } => vec![max],
            Band::TieredCeiling {
                max,
                warning,
                danger,
            } => vec![max, warning, danger],
            Band::DangerRange {
                min,
                max,
                danger_min,
                danger_max,
            } => vec![danger_min, min, max, danger_max],
            Band::StallRange { min, max, stall } => vec![stall, min, max],
        };

        if thresholds.iter().any(|t| !t.is_finite()) {
            return Err(MonitorError::Config(format!(
                "non-finite threshold in {}",
                self
            )));
        }

        let ordered = match *self {
            Band::Range { min, max } => min <= max,
            Band::Ceiling { .. } => true,
            // max may equal warning: the ladder then has no separate "abnormal" zone
            Band::TieredCeiling {
                max,
                warning,
                danger,
            } => max <= warning && warning < danger,
            Band::DangerRange {
                min,
                max,
                danger_min,
                danger_max,
            } => danger_min <= min && min <= max && max <= danger_max,
            Band::StallRange { min, max, stall } => stall < min && min <= max,
        };

        if ordered {
            Ok(())
        } else {
            Err(MonitorError::Config(format!(
                "thresholds out of order in {}",
                self
            )))
        }
    }

    /// Short human summary of the normal region, e.g. `280-320` or `<= 75`.
    pub fn normal_summary(&self) -> String {
        match *self {
            Band::Range { min, max }
            | Band::DangerRange { min, max, .. }
            | Band::StallRange { min, max, .. } => {
                format!("{}-{}", min, max)
            }
            Band::Ceiling { max } | Band::TieredCeiling { max, .. } => format!("<= {}", max),
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Range { min, max } => write!(f, "range {}..{}", min, max),
            Band::Ceiling { max } => write!(f, "ceiling {}", max),
            Band::TieredCeiling {
                max,
                warning,
                danger,
            } => write!(f, "tiered ceiling {}/{}/{}", max, warning, danger),
            Band::DangerRange {
                min,
                max,
                danger_min,
                danger_max,
            } => write!(
                f,
                "danger range {}..{} within {}..{}",
                min, max, danger_min, danger_max
            ),
            Band::StallRange { min, max, stall } => {
                write!(f, "stall range {}..{} stopped at {}", min, max, stall)
            }
        }
    }
}

/// One monitored sensor quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Key used in readings, e.g. `CurrentMotor`.
    pub name: String,
    /// Label shown to operators, e.g. `Current Motor`.
    pub display_name: String,
    pub unit: String,
    pub band: Band,
}

impl Channel {
    pub fn new(name: &str, display_name: &str, unit: &str, band: Band) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            unit: unit.to_string(),
            band,
        }
    }
}

/// Static, ordered table of configured channels.
///
/// Built once at startup and never mutated. Iteration order is the order
/// alerts are reported in.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRegistry {
    channels: Vec<Channel>,
}

impl ChannelRegistry {
    /// Build a registry, rejecting duplicate names and invalid bands.
    pub fn new(channels: Vec<Channel>) -> MonitorResult<Self> {
        for (i, ch) in channels.iter().enumerate() {
            if ch.name.trim().is_empty() {
                return Err(MonitorError::Config(format!("channel #{} has no name", i + 1)));
            }
            if channels[..i].iter().any(|prev| prev.name == ch.name) {
                return Err(MonitorError::Config(format!(
                    "channel '{}' is defined twice",
                    ch.name
                )));
            }
            ch.band
                .validate()
                .map_err(|e| MonitorError::Config(format!("channel '{}': {}", ch.name, e)))?;
        }
        Ok(Self { channels })
    }

    /// Band for a configured channel, `None` for anything else.
    /// Unconfigured channels are displayed but never alert.
    pub fn lookup(&self, name: &str) -> Option<&Band> {
        self.channel(name).map(|c| &c.band)
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn all_channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Feed mill motor and gearbox channels.
    pub fn feed_mill() -> Self {
        let tiered = |max, warning, danger| Band::TieredCeiling {
            max,
            warning,
            danger,
        };
        let danger_range = |min, max, danger_min, danger_max| Band::DangerRange {
            min,
            max,
            danger_min,
            danger_max,
        };

        Self {
            channels: vec![
                Channel::new("PowerMotor", "Power Motor", "kW", danger_range(290.0, 315.0, 260.0, 360.0)),
                Channel::new("CurrentMotor", "Current Motor", "Amp", danger_range(280.0, 320.0, 240.0, 360.0)),
                Channel::new("TempBrassBearingDE", "Temp Brass Bearing DE", "°C", tiered(75.0, 85.0, 95.0)),
                Channel::new("TempBearingMotorNDE", "Temp Bearing Motor NDE", "°C", tiered(75.0, 85.0, 95.0)),
                Channel::new("SpeedMotor", "Speed Motor", "rpm", Band::StallRange { min: 1470.0, max: 1500.0, stall: 0.0 }),
                Channel::new("TempOilGear", "Temp Oil Gear", "°C", tiered(65.0, 75.0, 85.0)),
                Channel::new("TempWindingMotorPhase_U", "Temp Winding Motor Phase U", "°C", tiered(105.0, 115.0, 125.0)),
                Channel::new("TempWindingMotorPhase_V", "Temp Winding Motor Phase V", "°C", tiered(105.0, 115.0, 125.0)),
                Channel::new("TempWindingMotorPhase_W", "Temp Winding Motor Phase W", "°C", tiered(105.0, 115.0, 125.0)),
                Channel::new("Vibration", "Vibration", "mm/s", tiered(1.8, 1.8, 4.5)),
            ],
        }
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::feed_mill()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_mill_registry_is_valid() {
        let reg = ChannelRegistry::feed_mill();
        assert!(ChannelRegistry::new(reg.all_channels().to_vec()).is_ok());
        assert_eq!(reg.all_channels().len(), 10);
        assert_eq!(reg.all_channels()[0].name, "PowerMotor");
    }

    #[test]
    fn lookup_unknown_channel_is_none() {
        let reg = ChannelRegistry::feed_mill();
        assert!(reg.lookup("SpeedRoller").is_none());
        assert!(reg.lookup("CurrentMotor").is_some());
    }

    #[test]
    fn duplicate_channel_rejected() {
        let ch = Channel::new("Vibration", "Vibration", "mm/s", Band::Ceiling { max: 1.8 });
        let err = ChannelRegistry::new(vec![ch.clone(), ch]).unwrap_err();
        assert!(err.to_string().contains("defined twice"));
    }

    #[test]
    fn misordered_tiers_rejected() {
        let band = Band::TieredCeiling {
            max: 75.0,
            warning: 95.0,
            danger: 85.0,
        };
        assert!(band.validate().is_err());

        let band = Band::DangerRange {
            min: 280.0,
            max: 320.0,
            danger_min: 300.0,
            danger_max: 360.0,
        };
        assert!(band.validate().is_err());
    }

    #[test]
    fn non_finite_threshold_rejected() {
        assert!(Band::Ceiling { max: f64::NAN }.validate().is_err());
    }

    #[test]
    fn feed_mill_motor_bands() {
        let reg = ChannelRegistry::feed_mill();
        assert_eq!(
            reg.lookup("PowerMotor"),
            Some(&Band::DangerRange {
                min: 290.0,
                max: 315.0,
                danger_min: 260.0,
                danger_max: 360.0
            })
        );
        assert_eq!(
            reg.lookup("SpeedMotor"),
            Some(&Band::StallRange {
                min: 1470.0,
                max: 1500.0,
                stall: 0.0
            })
        );
    }

    #[test]
    fn stall_above_min_rejected() {
        let band = Band::StallRange {
            min: 1470.0,
            max: 1500.0,
            stall: 1480.0,
        };
        assert!(band.validate().is_err());
    }

    #[test]
    fn stall_range_deserializes() {
        let band: Band =
            toml::from_str("kind = \"stall_range\"\nmin = 1470.0\nmax = 1500.0\nstall = 0.0").unwrap();
        assert_eq!(band.normal_summary(), "1470-1500");
    }

    #[test]
    fn band_deserializes_from_tagged_toml() {
        let band: Band = toml::from_str("kind = \"danger_range\"\nmin = 280.0\nmax = 320.0\ndanger_min = 240.0\ndanger_max = 360.0").unwrap();
        assert_eq!(
            band,
            Band::DangerRange {
                min: 280.0,
                max: 320.0,
                danger_min: 240.0,
                danger_max: 360.0
            }
        );
    }

    #[test]
    fn tagged_band_missing_field_fails() {
        let res: Result<Band, _> = toml::from_str("kind = \"tiered_ceiling\"\nmax = 75.0");
        assert!(res.is_err());
    }

    #[test]
    fn normal_summary_formats() {
        assert_eq!(Band::Range { min: 290.0, max: 315.0 }.normal_summary(), "290-315");
        assert_eq!(Band::Ceiling { max: 1.8 }.normal_summary(), "<= 1.8");
    }
}
