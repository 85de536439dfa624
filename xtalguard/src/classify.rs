//! Threshold classification of computed results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::ResultsBundle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    Warning,
    Critical,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
        })
    }
}

/// Whether WARNING findings fail the overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictPolicy {
    /// Only CRITICAL fails.
    #[default]
    Lenient,
    /// Anything other than OK fails.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Gain margin below this is CRITICAL.
    pub gain_margin_critical: f64,
    /// Gain margin at or above this is OK; in between is WARNING.
    pub gain_margin_target: f64,
    /// DL/DL_max above this is WARNING.
    pub drive_level_warning: f64,
    /// DL/DL_max above this is CRITICAL.
    pub drive_level_limit: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            gain_margin_critical: 3.0,
            gain_margin_target: 5.0,
            drive_level_warning: 0.8,
            drive_level_limit: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidThresholds {
    #[error("threshold {name} must be a positive number, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("gain margin target ({target}) is below the critical margin ({critical})")]
    GainMarginOrder { critical: f64, target: f64 },
    #[error("drive level warning ratio ({warning}) is above the limit ({limit})")]
    DriveLevelOrder { warning: f64, limit: f64 },
}

impl Thresholds {
    /// Each band must be non-empty: critical <= target, warning <= limit.
    pub fn validate(&self) -> Result<(), InvalidThresholds> {
        for (name, value) in [
            ("gain_margin_critical", self.gain_margin_critical),
            ("gain_margin_target", self.gain_margin_target),
            ("drive_level_warning", self.drive_level_warning),
            ("drive_level_limit", self.drive_level_limit),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(InvalidThresholds::NotPositive { name, value });
            }
        }
        if self.gain_margin_target < self.gain_margin_critical {
            return Err(InvalidThresholds::GainMarginOrder {
                critical: self.gain_margin_critical,
                target: self.gain_margin_target,
            });
        }
        if self.drive_level_warning > self.drive_level_limit {
            return Err(InvalidThresholds::DriveLevelOrder {
                warning: self.drive_level_warning,
                limit: self.drive_level_limit,
            });
        }
        Ok(())
    }
}

/// Start-up is not guaranteed when the required gm exceeds what the MCU offers.
pub fn classify_startup(gm_crit: f64, gm_mcu: f64) -> Status {
    if gm_crit > gm_mcu {
        Status::Critical
    } else {
        Status::Ok
    }
}

pub fn classify_gain_margin(gain_margin: f64, thresholds: &Thresholds) -> Status {
    if gain_margin < thresholds.gain_margin_critical {
        Status::Critical
    } else if gain_margin < thresholds.gain_margin_target {
        Status::Warning
    } else {
        Status::Ok
    }
}

pub fn classify_drive_level(dl_ratio: f64, thresholds: &Thresholds) -> Status {
    if dl_ratio > thresholds.drive_level_limit {
        Status::Critical
    } else if dl_ratio > thresholds.drive_level_warning {
        Status::Warning
    } else {
        Status::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub startup: Status,
    pub gain_margin: Status,
    pub drive_level: Status,
    pub verdict: Verdict,
}

impl Classification {
    /// Worst of the three individual findings.
    pub fn worst(&self) -> Status {
        self.startup.max(self.gain_margin).max(self.drive_level)
    }
}

pub fn classify(
    results: &ResultsBundle,
    gm_mcu: f64,
    thresholds: &Thresholds,
    policy: VerdictPolicy,
) -> Classification {
    let startup = classify_startup(results.gm_crit, gm_mcu);
    let gain_margin = classify_gain_margin(results.gain_margin, thresholds);
    let drive_level = classify_drive_level(results.dl_ratio, thresholds);

    let worst = startup.max(gain_margin).max(drive_level);
    let failed = match policy {
        VerdictPolicy::Lenient => worst == Status::Critical,
        VerdictPolicy::Strict => worst != Status::Ok,
    };

    Classification {
        startup,
        gain_margin,
        drive_level,
        verdict: if failed { Verdict::Fail } else { Verdict::Pass },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(gm_crit: f64, gain_margin: f64, dl_ratio: f64) -> ResultsBundle {
        ResultsBundle {
            cl_eff: 0.0,
            gm_crit,
            gain_margin,
            x_cl: 0.0,
            c_tot_dl: 0.0,
            drive_level: 0.0,
            dl_ratio,
        }
    }

    #[test]
    fn test_gain_margin_bands() {
        let t = Thresholds::default();
        assert_eq!(classify_gain_margin(2.999, &t), Status::Critical);
        assert_eq!(classify_gain_margin(3.0, &t), Status::Warning);
        assert_eq!(classify_gain_margin(4.999, &t), Status::Warning);
        assert_eq!(classify_gain_margin(5.0, &t), Status::Ok);
        assert_eq!(classify_gain_margin(f64::INFINITY, &t), Status::Ok);
    }

    #[test]
    fn test_drive_level_bands() {
        let t = Thresholds::default();
        assert_eq!(classify_drive_level(0.8, &t), Status::Ok);
        assert_eq!(classify_drive_level(0.8001, &t), Status::Warning);
        assert_eq!(classify_drive_level(1.0, &t), Status::Warning);
        assert_eq!(classify_drive_level(1.0001, &t), Status::Critical);
        assert_eq!(classify_drive_level(f64::INFINITY, &t), Status::Critical);
    }

    #[test]
    fn test_startup() {
        assert_eq!(classify_startup(2e-3, 9.7e-3), Status::Ok);
        assert_eq!(classify_startup(9.7e-3, 9.7e-3), Status::Ok);
        assert_eq!(classify_startup(10e-3, 9.7e-3), Status::Critical);
    }

    #[test]
    fn test_warnings_pass_under_lenient_policy() {
        let c = classify(
            &bundle(2e-3, 4.0, 0.9),
            9.7e-3,
            &Thresholds::default(),
            VerdictPolicy::Lenient,
        );
        assert_eq!(c.gain_margin, Status::Warning);
        assert_eq!(c.drive_level, Status::Warning);
        assert_eq!(c.verdict, Verdict::Pass);
        assert_eq!(c.worst(), Status::Warning);
    }

    #[test]
    fn test_warnings_fail_under_strict_policy() {
        let c = classify(
            &bundle(2e-3, 4.0, 0.1),
            9.7e-3,
            &Thresholds::default(),
            VerdictPolicy::Strict,
        );
        assert_eq!(c.verdict, Verdict::Fail);
    }

    #[test]
    fn test_any_critical_fails() {
        let t = Thresholds::default();
        let c = classify(&bundle(2e-3, 10.0, 1.5), 9.7e-3, &t, VerdictPolicy::Lenient);
        assert_eq!(c.drive_level, Status::Critical);
        assert_eq!(c.verdict, Verdict::Fail);

        let c = classify(&bundle(20e-3, 10.0, 0.1), 9.7e-3, &t, VerdictPolicy::Lenient);
        assert_eq!(c.startup, Status::Critical);
        assert_eq!(c.verdict, Verdict::Fail);
    }

    #[test]
    fn test_custom_target() {
        let t = Thresholds {
            gain_margin_target: 4.0,
            ..Thresholds::default()
        };
        assert_eq!(classify_gain_margin(4.1, &t), Status::Ok);
    }

    #[test]
    fn test_default_thresholds_are_valid() {
        Thresholds::default().validate().unwrap();
    }

    #[test]
    fn test_threshold_bands_must_be_ordered() {
        let t = Thresholds {
            gain_margin_target: 2.0,
            ..Thresholds::default()
        };
        assert_eq!(
            t.validate(),
            Err(InvalidThresholds::GainMarginOrder {
                critical: 3.0,
                target: 2.0
            })
        );

        let t = Thresholds {
            drive_level_warning: 1.2,
            ..Thresholds::default()
        };
        assert!(matches!(
            t.validate(),
            Err(InvalidThresholds::DriveLevelOrder { .. })
        ));

        let t = Thresholds {
            gain_margin_target: 3.0,
            ..Thresholds::default()
        };
        t.validate().unwrap();
    }

    #[test]
    fn test_non_positive_threshold_rejected() {
        let t = Thresholds {
            drive_level_limit: f64::NAN,
            ..Thresholds::default()
        };
        assert!(matches!(
            t.validate(),
            Err(InvalidThresholds::NotPositive {
                name: "drive_level_limit",
                ..
            })
        ));
    }
}
