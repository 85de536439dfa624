//! Preset library schema and application onto a parameter store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::params::{self, Parameter, ParameterStore};
use crate::presets::PresetError;
use crate::units::DisplayValue;

/// Fields a crystal preset is allowed to set.
pub const CRYSTAL_PARAMETERS: [Parameter; 4] = [
    Parameter::Freq,
    Parameter::C0,
    Parameter::EsrMax,
    Parameter::DlMax,
];

/// Partial datasheet values for one crystal model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrystalPreset {
    pub values: BTreeMap<Parameter, DisplayValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetLibrary {
    #[serde(default)]
    pub crystals: BTreeMap<String, CrystalPreset>,
    #[serde(default)]
    pub probes: BTreeMap<String, DisplayValue>,
}

impl PresetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every entry of `other` that this library does not already have.
    pub fn merge_missing(&mut self, other: PresetLibrary) {
        for (name, preset) in other.crystals {
            self.crystals.entry(name).or_insert(preset);
        }
        for (name, probe) in other.probes {
            self.probes.entry(name).or_insert(probe);
        }
    }

    /// Reject crystal presets that touch non-datasheet fields.
    pub fn validate(&self) -> Result<(), PresetError> {
        for (name, preset) in &self.crystals {
            if let Some(parameter) = preset
                .values
                .keys()
                .find(|p| !CRYSTAL_PARAMETERS.contains(p))
            {
                return Err(PresetError::NotCrystalParameter {
                    preset: name.clone(),
                    parameter: *parameter,
                });
            }
        }
        Ok(())
    }

    /// Exact name match first, then case-insensitive.
    fn lookup<'a, T>(map: &'a BTreeMap<String, T>, name: &str) -> Option<(&'a String, &'a T)> {
        map.get_key_value(name).or_else(|| {
            map.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name.trim()))
        })
    }

    pub fn crystal(&self, name: &str) -> Option<&CrystalPreset> {
        Self::lookup(&self.crystals, name).map(|(_, preset)| preset)
    }

    pub fn probe(&self, name: &str) -> Option<&DisplayValue> {
        Self::lookup(&self.probes, name).map(|(_, probe)| probe)
    }

    /// Convert a crystal preset to SI values without touching any store.
    pub fn crystal_values(&self, name: &str) -> Result<Vec<(Parameter, f64)>, PresetError> {
        self.resolve_crystal(name).map(|(_, values)| values)
    }

    /// Library key of the matched crystal plus its SI values.
    fn resolve_crystal(&self, name: &str) -> Result<(&str, Vec<(Parameter, f64)>), PresetError> {
        let (key, preset) = Self::lookup(&self.crystals, name)
            .ok_or_else(|| PresetError::UnknownCrystal(name.to_string()))?;

        let mut values = Vec::with_capacity(preset.values.len());
        for (parameter, display) in &preset.values {
            if !CRYSTAL_PARAMETERS.contains(parameter) {
                return Err(PresetError::NotCrystalParameter {
                    preset: key.clone(),
                    parameter: *parameter,
                });
            }
            let si = display
                .to_si(*parameter)
                .map_err(|source| PresetError::Unit {
                    preset: key.clone(),
                    parameter: *parameter,
                    source,
                })?;
            params::validate(*parameter, si).map_err(|source| PresetError::Value {
                preset: key.clone(),
                source,
            })?;
            values.push((*parameter, si));
        }
        Ok((key.as_str(), values))
    }

    /// Overwrite the fields the crystal preset names. All-or-nothing.
    /// Returns the library's spelling of the preset name.
    pub fn apply_crystal<'a>(
        &'a self,
        name: &str,
        store: &mut ParameterStore,
    ) -> Result<&'a str, PresetError> {
        let (key, values) = self.resolve_crystal(name)?;
        for (parameter, si) in values {
            store.set(parameter, si).map_err(|source| PresetError::Value {
                preset: key.to_string(),
                source,
            })?;
        }
        tracing::debug!("applied crystal preset '{}'", key);
        Ok(key)
    }

    pub fn probe_capacitance(&self, name: &str) -> Result<f64, PresetError> {
        self.resolve_probe(name).map(|(_, si)| si)
    }

    fn resolve_probe(&self, name: &str) -> Result<(&str, f64), PresetError> {
        let (key, probe) = Self::lookup(&self.probes, name)
            .ok_or_else(|| PresetError::UnknownProbe(name.to_string()))?;
        let si = probe
            .to_si(Parameter::CProbe)
            .map_err(|source| PresetError::Unit {
                preset: key.clone(),
                parameter: Parameter::CProbe,
                source,
            })?;
        params::validate(Parameter::CProbe, si).map_err(|source| PresetError::Value {
            preset: key.clone(),
            source,
        })?;
        Ok((key.as_str(), si))
    }

    /// Overwrite C_PROBE with the probe's input capacitance.
    /// Returns the library's spelling of the preset name.
    pub fn apply_probe<'a>(
        &'a self,
        name: &str,
        store: &mut ParameterStore,
    ) -> Result<&'a str, PresetError> {
        let (key, si) = self.resolve_probe(name)?;
        store
            .set(Parameter::CProbe, si)
            .map_err(|source| PresetError::Value {
                preset: key.to_string(),
                source,
            })?;
        tracing::debug!("applied probe preset '{}'", key);
        Ok(key)
    }
}
