//! Oscillator input parameters and the validated parameter store.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::units::{Dimension, Unit};

/// One of the eleven physical inputs, always held in its SI base unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Parameter {
    /// Nominal oscillation frequency (Hz)
    #[serde(rename = "FREQ")]
    Freq,
    /// Crystal shunt capacitance (F)
    #[serde(rename = "C0")]
    C0,
    /// Maximum equivalent series resistance (Ohm)
    #[serde(rename = "ESR_MAX")]
    EsrMax,
    /// Maximum rated drive level (W)
    #[serde(rename = "DL_MAX")]
    DlMax,
    /// Amplifier transconductance (A/V)
    #[serde(rename = "GM_MCU")]
    GmMcu,
    /// External load capacitor, per leg (F)
    #[serde(rename = "CL_SEL")]
    ClSel,
    /// External series limiting resistor (Ohm)
    #[serde(rename = "REXT_SEL")]
    RextSel,
    /// Parasitic pin capacitance, per leg (F)
    #[serde(rename = "CS_PIN")]
    CsPin,
    /// Parasitic PCB trace capacitance, per leg (F)
    #[serde(rename = "CS_PCB")]
    CsPcb,
    /// Measured peak-to-peak voltage on the probed leg (V)
    #[serde(rename = "VPP_MEASURED")]
    VppMeasured,
    /// Oscilloscope probe input capacitance (F)
    #[serde(rename = "C_PROBE")]
    CProbe,
}

impl Parameter {
    pub const ALL: [Parameter; 11] = [
        Parameter::Freq,
        Parameter::C0,
        Parameter::EsrMax,
        Parameter::DlMax,
        Parameter::GmMcu,
        Parameter::ClSel,
        Parameter::RextSel,
        Parameter::CsPin,
        Parameter::CsPcb,
        Parameter::VppMeasured,
        Parameter::CProbe,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Parameter::Freq => "FREQ",
            Parameter::C0 => "C0",
            Parameter::EsrMax => "ESR_MAX",
            Parameter::DlMax => "DL_MAX",
            Parameter::GmMcu => "GM_MCU",
            Parameter::ClSel => "CL_SEL",
            Parameter::RextSel => "REXT_SEL",
            Parameter::CsPin => "CS_PIN",
            Parameter::CsPcb => "CS_PCB",
            Parameter::VppMeasured => "VPP_MEASURED",
            Parameter::CProbe => "C_PROBE",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Parameter::Freq => "Nominal oscillation frequency",
            Parameter::C0 => "Crystal shunt capacitance",
            Parameter::EsrMax => "Maximum equivalent series resistance",
            Parameter::DlMax => "Maximum rated drive level",
            Parameter::GmMcu => "Oscillator amplifier transconductance",
            Parameter::ClSel => "External load capacitor (CL1 = CL2)",
            Parameter::RextSel => "External series limiting resistor",
            Parameter::CsPin => "Parasitic capacitance of one XTAL pin",
            Parameter::CsPcb => "Parasitic capacitance of one PCB trace",
            Parameter::VppMeasured => "Peak-to-peak voltage measured on OSC_IN",
            Parameter::CProbe => "Oscilloscope probe input capacitance",
        }
    }

    pub fn dimension(self) -> Dimension {
        match self {
            Parameter::Freq => Dimension::Frequency,
            Parameter::C0
            | Parameter::ClSel
            | Parameter::CsPin
            | Parameter::CsPcb
            | Parameter::CProbe => Dimension::Capacitance,
            Parameter::EsrMax | Parameter::RextSel => Dimension::Resistance,
            Parameter::DlMax => Dimension::Power,
            Parameter::GmMcu => Dimension::Transconductance,
            Parameter::VppMeasured => Dimension::Voltage,
        }
    }

    /// Unit a front end shows by default for this parameter.
    pub fn default_unit(self) -> Unit {
        match self {
            Parameter::Freq => Unit::Megahertz,
            Parameter::EsrMax | Parameter::RextSel => Unit::Ohm,
            Parameter::DlMax => Unit::Microwatt,
            Parameter::GmMcu => Unit::MilliamperePerVolt,
            Parameter::VppMeasured => Unit::Millivolt,
            _ => Unit::Picofarad,
        }
    }

    /// FREQ, ESR_MAX and DL_MAX are divisors or frequency bases and must be > 0.
    pub fn requires_positive(self) -> bool {
        matches!(self, Parameter::Freq | Parameter::EsrMax | Parameter::DlMax)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown parameter '{0}'")]
pub struct UnknownParameter(pub String);

impl FromStr for Parameter {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Parameter::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownParameter(wanted.to_string()))
    }
}

/// Rejected write to the parameter store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid value {value} for {parameter}: {reason}")]
pub struct InvalidValue {
    pub parameter: Parameter,
    pub value: f64,
    pub reason: &'static str,
}

/// Snapshot of all eleven parameters in SI base units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub freq: f64,
    pub c0: f64,
    pub esr_max: f64,
    pub dl_max: f64,
    pub gm_mcu: f64,
    pub cl_sel: f64,
    pub rext_sel: f64,
    pub cs_pin: f64,
    pub cs_pcb: f64,
    pub vpp_measured: f64,
    pub c_probe: f64,
}

impl ParameterSet {
    pub fn get(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Freq => self.freq,
            Parameter::C0 => self.c0,
            Parameter::EsrMax => self.esr_max,
            Parameter::DlMax => self.dl_max,
            Parameter::GmMcu => self.gm_mcu,
            Parameter::ClSel => self.cl_sel,
            Parameter::RextSel => self.rext_sel,
            Parameter::CsPin => self.cs_pin,
            Parameter::CsPcb => self.cs_pcb,
            Parameter::VppMeasured => self.vpp_measured,
            Parameter::CProbe => self.c_probe,
        }
    }

    fn slot(&mut self, parameter: Parameter) -> &mut f64 {
        match parameter {
            Parameter::Freq => &mut self.freq,
            Parameter::C0 => &mut self.c0,
            Parameter::EsrMax => &mut self.esr_max,
            Parameter::DlMax => &mut self.dl_max,
            Parameter::GmMcu => &mut self.gm_mcu,
            Parameter::ClSel => &mut self.cl_sel,
            Parameter::RextSel => &mut self.rext_sel,
            Parameter::CsPin => &mut self.cs_pin,
            Parameter::CsPcb => &mut self.cs_pcb,
            Parameter::VppMeasured => &mut self.vpp_measured,
            Parameter::CProbe => &mut self.c_probe,
        }
    }

    /// Iterate `(parameter, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Parameter, f64)> + '_ {
        Parameter::ALL.into_iter().map(move |p| (p, self.get(p)))
    }
}

/// Check a single value against the store's invariants.
pub fn validate(parameter: Parameter, value: f64) -> Result<(), InvalidValue> {
    let reason = if !value.is_finite() {
        Some("value must be a finite number")
    } else if value < 0.0 {
        Some("value must not be negative")
    } else if parameter.requires_positive() && value <= 0.0 {
        Some("value must be strictly positive")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(InvalidValue {
            parameter,
            value,
            reason,
        }),
        None => Ok(()),
    }
}

/// Notified after the store accepts a write or is reset.
pub trait StoreObserver: Send + Sync {
    fn parameter_changed(&self, parameter: Parameter, value: f64);
    fn store_reset(&self) {}
}

/// Session-owned parameter values with validation on every write.
///
/// Starts with every value at the zero sentinel. Not internally locked;
/// callers sharing a store across threads must serialize access.
#[derive(Default)]
pub struct ParameterStore {
    values: ParameterSet,
    revision: u64,
    observers: Vec<Arc<dyn StoreObserver>>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: Arc<dyn StoreObserver>) {
        self.observers.push(observer);
    }

    /// Write an SI value. On error the previous value is kept.
    pub fn set(&mut self, parameter: Parameter, value: f64) -> Result<(), InvalidValue> {
        if let Err(e) = validate(parameter, value) {
            tracing::debug!("rejected write: {}", e);
            return Err(e);
        }
        *self.values.slot(parameter) = value;
        self.revision += 1;
        for observer in &self.observers {
            observer.parameter_changed(parameter, value);
        }
        Ok(())
    }

    pub fn get(&self, parameter: Parameter) -> f64 {
        self.values.get(parameter)
    }

    /// Clear every value back to the zero sentinel.
    pub fn reset(&mut self) {
        self.values = ParameterSet::default();
        self.revision += 1;
        for observer in &self.observers {
            observer.store_reset();
        }
    }

    /// Copy of the current values, detached from the store.
    pub fn snapshot(&self) -> ParameterSet {
        self.values
    }

    /// Incremented on every accepted write and on reset.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterStore")
            .field("values", &self.values)
            .field("revision", &self.revision)
            .field("observers", &self.observers.len())
            .finish()
    }
}
