//! Saved work sessions.
//!
//! A session file records what the user typed for each parameter (value
//! text and display unit), optionally which presets were selected, and
//! when it was saved. Loading converts everything to SI and writes it
//! through the validating [`ParameterStore`].

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::XtalGuardError;
use crate::params::{Parameter, ParameterSet, ParameterStore};
use crate::units::{DisplayValue, Unit};

/// Presets that were active when the session was saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivePresets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crystal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionFile {
    pub parameters: BTreeMap<Parameter, DisplayValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets: Option<ActivePresets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl SessionFile {
    /// Session holding the 25 MHz reference design.
    pub fn reference() -> Self {
        let entries = [
            (Parameter::Freq, "25", Unit::Megahertz),
            (Parameter::C0, "5", Unit::Picofarad),
            (Parameter::EsrMax, "60", Unit::Ohm),
            (Parameter::DlMax, "100", Unit::Microwatt),
            (Parameter::GmMcu, "9.7", Unit::MilliamperePerVolt),
            (Parameter::ClSel, "22", Unit::Picofarad),
            (Parameter::RextSel, "0", Unit::Ohm),
            (Parameter::CsPin, "4.2", Unit::Picofarad),
            (Parameter::CsPcb, "3.6", Unit::Picofarad),
            (Parameter::VppMeasured, "125", Unit::Millivolt),
            (Parameter::CProbe, "0.9", Unit::Picofarad),
        ];
        Self {
            parameters: entries
                .into_iter()
                .map(|(p, v, u)| (p, DisplayValue::new(v, u)))
                .collect(),
            presets: Some(ActivePresets {
                crystal: Some("Generic 25 MHz SMD 3225".to_string()),
                probe: Some("Active low-capacitance probe".to_string()),
            }),
            saved_at: None,
        }
    }

    /// Record a snapshot, each value in its parameter's default display unit.
    pub fn from_snapshot(snapshot: &ParameterSet, presets: Option<ActivePresets>) -> Self {
        Self {
            parameters: snapshot
                .iter()
                .map(|(p, si)| (p, DisplayValue::from_si(p, si)))
                .collect(),
            presets,
            saved_at: Some(Utc::now()),
        }
    }

    /// Convert every parameter to SI, failing on the first bad entry.
    pub fn to_si_values(&self) -> Result<Vec<(Parameter, f64)>, XtalGuardError> {
        Parameter::ALL
            .into_iter()
            .map(|parameter| -> Result<(Parameter, f64), XtalGuardError> {
                let display = self
                    .parameters
                    .get(&parameter)
                    .ok_or(XtalGuardError::MissingParameter(parameter))?;
                let si = display
                    .to_si(parameter)
                    .map_err(|source| XtalGuardError::Unit { parameter, source })?;
                Ok((parameter, si))
            })
            .collect()
    }

    /// Write every parameter into `store`. Values written before a failure stay written.
    pub fn apply_to(&self, store: &mut ParameterStore) -> Result<(), XtalGuardError> {
        for (parameter, si) in self.to_si_values()? {
            store.set(parameter, si)?;
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, XtalGuardError> {
        let content = std::fs::read_to_string(path)?;
        let session = serde_json::from_str(&content)?;
        tracing::debug!("loaded session from {}", path.display());
        Ok(session)
    }

    pub fn save(&self, path: &Path) -> Result<(), XtalGuardError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("saved session to {}", path.display());
        Ok(())
    }
}
