//! Display units and conversion to SI base units.
//!
//! Front ends collect values in whatever unit the user picked (MHz, pF,
//! uW, ...). Everything below the [`ParameterStore`](crate::params::ParameterStore)
//! works in SI base units only, so conversion happens here, before `set`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::params::Parameter;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("value is empty")]
    Empty,
    #[error("'{0}' is not a number")]
    InvalidNumber(String),
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
    #[error("unit {unit} is not a {expected} unit")]
    Incompatible { unit: Unit, expected: Dimension },
}

/// Physical dimension of a parameter or unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Frequency,
    Capacitance,
    Resistance,
    Power,
    Transconductance,
    Voltage,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Frequency => "frequency",
            Dimension::Capacitance => "capacitance",
            Dimension::Resistance => "resistance",
            Dimension::Power => "power",
            Dimension::Transconductance => "transconductance",
            Dimension::Voltage => "voltage",
        };
        f.write_str(name)
    }
}

/// A display unit with a fixed multiplier to its SI base unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "Hz")]
    Hertz,
    #[serde(rename = "kHz")]
    Kilohertz,
    #[serde(rename = "MHz")]
    Megahertz,
    #[serde(rename = "F")]
    Farad,
    #[serde(rename = "pF")]
    Picofarad,
    #[serde(rename = "nF")]
    Nanofarad,
    #[serde(rename = "uF", alias = "µF")]
    Microfarad,
    #[serde(rename = "Ohm", alias = "Ω")]
    Ohm,
    #[serde(rename = "kOhm", alias = "kΩ")]
    Kiloohm,
    #[serde(rename = "W")]
    Watt,
    #[serde(rename = "mW")]
    Milliwatt,
    #[serde(rename = "uW", alias = "µW")]
    Microwatt,
    #[serde(rename = "A/V")]
    AmperePerVolt,
    #[serde(rename = "mA/V")]
    MilliamperePerVolt,
    #[serde(rename = "V")]
    Volt,
    #[serde(rename = "mV")]
    Millivolt,
}

impl Unit {
    pub const ALL: [Unit; 16] = [
        Unit::Hertz,
        Unit::Kilohertz,
        Unit::Megahertz,
        Unit::Farad,
        Unit::Picofarad,
        Unit::Nanofarad,
        Unit::Microfarad,
        Unit::Ohm,
        Unit::Kiloohm,
        Unit::Watt,
        Unit::Milliwatt,
        Unit::Microwatt,
        Unit::AmperePerVolt,
        Unit::MilliamperePerVolt,
        Unit::Volt,
        Unit::Millivolt,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Hertz => "Hz",
            Unit::Kilohertz => "kHz",
            Unit::Megahertz => "MHz",
            Unit::Farad => "F",
            Unit::Picofarad => "pF",
            Unit::Nanofarad => "nF",
            Unit::Microfarad => "uF",
            Unit::Ohm => "Ohm",
            Unit::Kiloohm => "kOhm",
            Unit::Watt => "W",
            Unit::Milliwatt => "mW",
            Unit::Microwatt => "uW",
            Unit::AmperePerVolt => "A/V",
            Unit::MilliamperePerVolt => "mA/V",
            Unit::Volt => "V",
            Unit::Millivolt => "mV",
        }
    }

    /// Factor that converts a value in this unit to the SI base unit.
    pub fn multiplier(self) -> f64 {
        match self {
            Unit::Hertz | Unit::Farad | Unit::Ohm | Unit::Watt => 1.0,
            Unit::AmperePerVolt | Unit::Volt => 1.0,
            Unit::Kilohertz | Unit::Kiloohm => 1e3,
            Unit::Megahertz => 1e6,
            Unit::Picofarad => 1e-12,
            Unit::Nanofarad => 1e-9,
            Unit::Microfarad | Unit::Microwatt => 1e-6,
            Unit::Milliwatt | Unit::MilliamperePerVolt | Unit::Millivolt => 1e-3,
        }
    }

    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Hertz | Unit::Kilohertz | Unit::Megahertz => Dimension::Frequency,
            Unit::Farad | Unit::Picofarad | Unit::Nanofarad | Unit::Microfarad => {
                Dimension::Capacitance
            }
            Unit::Ohm | Unit::Kiloohm => Dimension::Resistance,
            Unit::Watt | Unit::Milliwatt | Unit::Microwatt => Dimension::Power,
            Unit::AmperePerVolt | Unit::MilliamperePerVolt => Dimension::Transconductance,
            Unit::Volt | Unit::Millivolt => Dimension::Voltage,
        }
    }

    /// SI base unit for a dimension.
    pub fn base(dimension: Dimension) -> Unit {
        match dimension {
            Dimension::Frequency => Unit::Hertz,
            Dimension::Capacitance => Unit::Farad,
            Dimension::Resistance => Unit::Ohm,
            Dimension::Power => Unit::Watt,
            Dimension::Transconductance => Unit::AmperePerVolt,
            Dimension::Voltage => Unit::Volt,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let normalized = s.replace('µ', "u").replace('Ω', "Ohm");
        Unit::ALL
            .into_iter()
            .find(|u| u.symbol() == normalized)
            .ok_or_else(|| UnitError::UnknownUnit(s.to_string()))
    }
}

/// Parse the numeric part of a user-entered value.
pub fn parse_display_value(text: &str) -> Result<f64, UnitError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(UnitError::Empty);
    }
    text.parse::<f64>()
        .map_err(|_| UnitError::InvalidNumber(text.to_string()))
}

/// Convert `value` expressed in `unit` to the SI base unit of `parameter`.
pub fn to_si(parameter: Parameter, value: f64, unit: Unit) -> Result<f64, UnitError> {
    let expected = parameter.dimension();
    if unit.dimension() != expected {
        return Err(UnitError::Incompatible { unit, expected });
    }
    Ok(value * unit.multiplier())
}

/// Express an SI value in `unit`.
pub fn from_si(value: f64, unit: Unit) -> f64 {
    value / unit.multiplier()
}

/// A value as the user typed it, with the unit they picked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayValue {
    pub value: String,
    pub unit: Unit,
}

impl DisplayValue {
    pub fn new(value: impl Into<String>, unit: Unit) -> Self {
        Self {
            value: value.into(),
            unit,
        }
    }

    /// Render an SI value of `parameter` in its default display unit.
    pub fn from_si(parameter: Parameter, si: f64) -> Self {
        let unit = parameter.default_unit();
        Self::new(from_si(si, unit).to_string(), unit)
    }

    pub fn to_si(&self, parameter: Parameter) -> Result<f64, UnitError> {
        to_si(parameter, parse_display_value(&self.value)?, self.unit)
    }
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value.trim(), self.unit)
    }
}

/// Parse text such as `"25MHz"`, `"4.2 pF"` or `"60"` for `parameter`.
///
/// A bare number is taken to be in the parameter's SI base unit.
pub fn parse_quantity(parameter: Parameter, text: &str) -> Result<f64, UnitError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(UnitError::Empty);
    }
    // The number ends at the last digit or decimal point; whatever follows is the unit.
    let split = text
        .char_indices()
        .filter(|(_, c)| c.is_ascii_digit() || *c == '.')
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    let (number, unit) = text.split_at(split);
    if number.trim().is_empty() {
        return Err(UnitError::InvalidNumber(text.to_string()));
    }
    let value = parse_display_value(number)?;
    let unit = match unit.trim() {
        "" => Unit::base(parameter.dimension()),
        symbol => symbol.parse::<Unit>()?,
    };
    to_si(parameter, value, unit)
}
