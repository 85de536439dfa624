//! Caller-side session state: the parameter store plus the last results.

use std::path::Path;

use crate::core::XtalGuardError;
use crate::engine::{self, CalculationError, ResultsBundle};
use crate::params::{InvalidValue, Parameter, ParameterSet, ParameterStore};
use crate::presets::{PresetError, PresetLibrary};
use crate::session::{ActivePresets, SessionFile};
use crate::units::{self, Unit};

/// Holds one working session.
///
/// Results are only replaced by a successful [`recalculate`](Self::recalculate);
/// any accepted write or reset marks them stale.
#[derive(Debug, Default)]
pub struct Workbench {
    store: ParameterStore,
    results: Option<ResultsBundle>,
    computed_at: Option<u64>,
    presets: ActivePresets,
}

impl Workbench {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_session(session: &SessionFile) -> Result<Self, XtalGuardError> {
        let mut bench = Self::new();
        session.apply_to(&mut bench.store)?;
        bench.presets = session.presets.clone().unwrap_or_default();
        Ok(bench)
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    /// Mutable access, e.g. to register observers.
    pub fn store_mut(&mut self) -> &mut ParameterStore {
        &mut self.store
    }

    pub fn snapshot(&self) -> ParameterSet {
        self.store.snapshot()
    }

    pub fn set(&mut self, parameter: Parameter, value: f64) -> Result<(), InvalidValue> {
        self.store.set(parameter, value)?;
        self.forget_preset(parameter);
        Ok(())
    }

    /// Parse display text in `unit`, convert to SI and write it.
    pub fn set_display(
        &mut self,
        parameter: Parameter,
        text: &str,
        unit: Unit,
    ) -> Result<(), XtalGuardError> {
        let si = units::parse_display_value(text)
            .and_then(|v| units::to_si(parameter, v, unit))
            .map_err(|source| XtalGuardError::Unit { parameter, source })?;
        self.set(parameter, si)?;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.store.reset();
        self.presets = ActivePresets::default();
    }

    pub fn apply_crystal(&mut self, library: &PresetLibrary, name: &str) -> Result<(), PresetError> {
        let key = library.apply_crystal(name, &mut self.store)?;
        self.presets.crystal = Some(key.to_string());
        Ok(())
    }

    pub fn apply_probe(&mut self, library: &PresetLibrary, name: &str) -> Result<(), PresetError> {
        let key = library.apply_probe(name, &mut self.store)?;
        self.presets.probe = Some(key.to_string());
        Ok(())
    }

    /// Manual edits of preset-owned fields drop the preset selection.
    fn forget_preset(&mut self, parameter: Parameter) {
        if crate::presets::CRYSTAL_PARAMETERS.contains(&parameter) {
            self.presets.crystal = None;
        }
        if parameter == Parameter::CProbe {
            self.presets.probe = None;
        }
    }

    /// Run the engine on the current snapshot. On error the previous
    /// results are kept (and stay stale).
    pub fn recalculate(&mut self) -> Result<&ResultsBundle, CalculationError> {
        let revision = self.store.revision();
        let results = engine::calculate(&self.store.snapshot())?;
        self.computed_at = Some(revision);
        Ok(&*self.results.insert(results))
    }

    /// Last successful results, possibly stale.
    pub fn results(&self) -> Option<&ResultsBundle> {
        self.results.as_ref()
    }

    /// True until the first successful calculation and after any change since.
    pub fn is_stale(&self) -> bool {
        self.computed_at != Some(self.store.revision())
    }

    pub fn active_presets(&self) -> &ActivePresets {
        &self.presets
    }

    pub fn to_session(&self) -> SessionFile {
        let presets = if self.presets == ActivePresets::default() {
            None
        } else {
            Some(self.presets.clone())
        };
        SessionFile::from_snapshot(&self.store.snapshot(), presets)
    }

    pub fn save_session(&self, path: &Path) -> Result<(), XtalGuardError> {
        self.to_session().save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::builtin_library;

    fn loaded() -> Workbench {
        Workbench::from_session(&SessionFile::reference()).unwrap()
    }

    #[test]
    fn test_stale_until_first_calculation() {
        let mut bench = loaded();
        assert!(bench.is_stale());
        assert!(bench.results().is_none());
        bench.recalculate().unwrap();
        assert!(!bench.is_stale());
    }

    #[test]
    fn test_write_marks_results_stale() {
        let mut bench = loaded();
        bench.recalculate().unwrap();
        bench
            .set_display(Parameter::RextSel, "1", Unit::Kiloohm)
            .unwrap();
        assert!(bench.is_stale());
        assert!(bench.results().is_some());
    }

    #[test]
    fn test_rejected_write_keeps_results_fresh() {
        let mut bench = loaded();
        bench.recalculate().unwrap();
        assert!(bench.set(Parameter::Freq, 0.0).is_err());
        assert!(!bench.is_stale());
    }

    #[test]
    fn test_failed_calculation_keeps_previous_results() {
        let mut bench = loaded();
        let first = *bench.recalculate().unwrap();

        bench.set(Parameter::Freq, 1e200).unwrap();
        assert!(bench.recalculate().is_err());
        assert_eq!(bench.results(), Some(&first));
        assert!(bench.is_stale());
    }

    #[test]
    fn test_set_display_errors_name_the_parameter() {
        let mut bench = Workbench::new();
        let err = bench
            .set_display(Parameter::CsPin, "abc", Unit::Picofarad)
            .unwrap_err();
        assert!(matches!(err, XtalGuardError::Unit { parameter: Parameter::CsPin, .. }));

        let err = bench
            .set_display(Parameter::CsPin, "-1", Unit::Picofarad)
            .unwrap_err();
        assert!(matches!(err, XtalGuardError::InvalidValue(_)));
    }

    #[test]
    fn test_manual_edit_clears_preset_selection() {
        let library = builtin_library();
        let mut bench = loaded();
        bench.apply_crystal(&library, "Generic 16 MHz SMD 3225").unwrap();
        bench.apply_probe(&library, "Passive 10x probe").unwrap();
        assert_eq!(bench.snapshot().freq, 16e6);

        bench.set(Parameter::EsrMax, 40.0).unwrap();
        assert_eq!(bench.active_presets().crystal, None);
        assert_eq!(
            bench.active_presets().probe.as_deref(),
            Some("Passive 10x probe")
        );
    }

    #[test]
    fn test_preset_selection_uses_library_spelling() {
        let library = builtin_library();
        let mut bench = loaded();
        bench.apply_crystal(&library, "generic 25 mhz smd 3225").unwrap();
        bench.apply_probe(&library, "PASSIVE 1X PROBE").unwrap();

        let session = bench.to_session();
        let presets = session.presets.unwrap();
        assert_eq!(presets.crystal.as_deref(), Some("Generic 25 MHz SMD 3225"));
        assert_eq!(presets.probe.as_deref(), Some("Passive 1x probe"));
    }

    #[test]
    fn test_reset_returns_to_sentinel() {
        let mut bench = loaded();
        bench.recalculate().unwrap();
        bench.reset();
        assert_eq!(bench.snapshot(), ParameterSet::default());
        assert!(bench.is_stale());
    }
}
