//! Closed-form oscillator calculations.
//!
//! All inputs and outputs are SI. [`calculate`] is pure: it reads a
//! [`ParameterSet`] copy and either returns a complete [`ResultsBundle`]
//! or a [`CalculationError`], never a partially filled one.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("calculation produced a non-finite {quantity} ({value})")]
pub struct CalculationError {
    pub quantity: &'static str,
    pub value: f64,
}

/// Derived electrical quantities, SI units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultsBundle {
    /// Effective load capacitance seen by the crystal (F)
    pub cl_eff: f64,
    /// Minimum transconductance for oscillation start-up (A/V)
    pub gm_crit: f64,
    /// GM_MCU / gm_crit, `+inf` when gm_crit is zero
    #[serde(with = "unbounded")]
    pub gain_margin: f64,
    /// Reactance of one load capacitor (Ohm), diagnostic only
    pub x_cl: f64,
    /// Capacitance on the probed leg including the probe (F)
    pub c_tot_dl: f64,
    /// Power dissipated in the crystal (W)
    pub drive_level: f64,
    /// drive_level / DL_MAX, `+inf` when DL_MAX is zero
    #[serde(with = "unbounded")]
    pub dl_ratio: f64,
}

/// Ratios that may be `+inf`. JSON has no infinity, so it is written as
/// the string `"inf"`; finite values stay plain numbers.
mod unbounded {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{ser, Deserializer, Serializer};

    const INFINITY: &str = "inf";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if *value == f64::INFINITY {
            serializer.serialize_str(INFINITY)
        } else {
            Err(ser::Error::custom(format!("cannot serialize ratio {}", value)))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(RatioVisitor)
    }

    struct RatioVisitor;

    impl<'de> Visitor<'de> for RatioVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a number or \"{}\"", INFINITY)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            if v == INFINITY {
                Ok(f64::INFINITY)
            } else {
                Err(E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }
    }
}

fn finite(quantity: &'static str, value: f64) -> Result<f64, CalculationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalculationError { quantity, value })
    }
}

/// `numerator / denominator`, or `+inf` when the denominator is not positive.
fn ratio(quantity: &'static str, numerator: f64, denominator: f64) -> Result<f64, CalculationError> {
    if denominator > 0.0 {
        finite(quantity, numerator / denominator)
    } else if denominator.is_nan() || numerator.is_nan() {
        Err(CalculationError {
            quantity,
            value: f64::NAN,
        })
    } else {
        Ok(f64::INFINITY)
    }
}

pub fn calculate(p: &ParameterSet) -> Result<ResultsBundle, CalculationError> {
    let total_esr = finite("total ESR", p.esr_max + p.rext_sel)?;
    let c_stray_leg = finite("stray capacitance", p.cs_pcb + p.cs_pin)?;

    let cl_eff = finite("cl_eff", (p.cl_sel + c_stray_leg) / 2.0)?;

    let omega = 2.0 * PI * p.freq;
    let gm_crit = finite(
        "gm_crit",
        4.0 * total_esr * omega.powi(2) * (p.c0 + cl_eff).powi(2),
    )?;
    let gain_margin = ratio("gain_margin", p.gm_mcu, gm_crit)?;

    let x_cl = if p.cl_sel > 0.0 {
        finite("x_cl", 1.0 / (omega * p.cl_sel))?
    } else {
        0.0
    };

    let c_tot_dl = finite("c_tot_dl", p.cl_sel + c_stray_leg + p.c_probe)?;
    let drive_level = finite(
        "drive_level",
        (total_esr / 2.0) * (PI * p.freq * c_tot_dl * p.vpp_measured).powi(2),
    )?;
    let dl_ratio = ratio("dl_ratio", drive_level, p.dl_max)?;

    tracing::debug!(
        cl_eff,
        gm_crit,
        gain_margin,
        x_cl,
        c_tot_dl,
        drive_level,
        dl_ratio,
        "oscillator quantities computed"
    );

    Ok(ResultsBundle {
        cl_eff,
        gm_crit,
        gain_margin,
        x_cl,
        c_tot_dl,
        drive_level,
        dl_ratio,
    })
}
