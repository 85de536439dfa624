//! XtalGuard - crystal oscillator design validation library
//!
//! This library checks a Pierce crystal oscillator against the crystal's
//! datasheet limits and bench measurements: start-up transconductance,
//! gain margin, and drive level.
//!
//! # Quick Start
//!
//! ```
//! use xtalguard::prelude::*;
//!
//! let mut store = ParameterStore::new();
//! store.set(Parameter::Freq, 25e6).unwrap();
//! store.set(Parameter::C0, 5e-12).unwrap();
//! store.set(Parameter::EsrMax, 60.0).unwrap();
//! store.set(Parameter::DlMax, 100e-6).unwrap();
//! store.set(Parameter::GmMcu, 9.7e-3).unwrap();
//! store.set(Parameter::ClSel, 22e-12).unwrap();
//! store.set(Parameter::CsPin, 4.2e-12).unwrap();
//! store.set(Parameter::CsPcb, 3.6e-12).unwrap();
//! store.set(Parameter::VppMeasured, 0.125).unwrap();
//! store.set(Parameter::CProbe, 0.9e-12).unwrap();
//!
//! let result = XtalGuardCore::validate_store(&store, ValidationOptions::default()).unwrap();
//! for issue in &result.issues {
//!     println!("{}: {}", issue.status, issue.message);
//! }
//! assert!(result.passed());
//! ```
//!
//! # Features
//!
//! - **Parameter store**: SI values with per-field validation
//! - **Calculation engine**: load capacitance, critical gm, gain margin, drive level
//! - **Classification**: OK / WARNING / CRITICAL per check, PASS / FAIL overall
//! - **Units, sessions, presets**: display-unit conversion, JSON session files,
//!   crystal and probe preset libraries

pub mod classify;
pub mod core;
pub mod engine;
pub mod params;
pub mod presets;
pub mod session;
pub mod units;
pub mod workbench;

// Re-export main types
pub use classify::{
    Classification, InvalidThresholds, Status, Thresholds, Verdict, VerdictPolicy,
};
pub use core::{
    Issue, ValidationOptions, ValidationResult, ValidationStats, XtalGuardCore, XtalGuardError,
};
pub use engine::{calculate, CalculationError, ResultsBundle};
pub use params::{InvalidValue, Parameter, ParameterSet, ParameterStore, StoreObserver};
pub use presets::{PresetError, PresetLibrary};
pub use session::SessionFile;
pub use units::{DisplayValue, Unit, UnitError};
pub use workbench::Workbench;

/// Validate a session file (convenience wrapper).
pub fn validate_session(
    path: &std::path::Path,
    options: ValidationOptions,
) -> Result<ValidationResult, XtalGuardError> {
    XtalGuardCore::validate_session(path, options)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Parameter, ParameterSet, ParameterStore, Status, ValidationOptions, ValidationResult,
        Verdict, Workbench, XtalGuardCore, XtalGuardError,
    };
}
