//! Named crystal and probe presets
//!
//! A crystal preset fills in the datasheet fields (FREQ, C0, ESR_MAX,
//! DL_MAX); a probe preset fills in C_PROBE. Presets come from:
//!
//! 1. A user library (JSON file, or a directory of JSON files)
//! 2. The built-in library compiled into the binary (fallback)
//!
//! User entries take precedence over built-ins with the same name.
//!
//! # Library format
//!
//! ```json
//! {
//!   "crystals": {
//!     "My 24 MHz": {
//!       "FREQ": { "value": "24", "unit": "MHz" },
//!       "ESR_MAX": { "value": "50", "unit": "Ohm" }
//!     }
//!   },
//!   "probes": {
//!     "My probe": { "value": "3.9", "unit": "pF" }
//!   }
//! }
//! ```
//!
//! # Usage
//!
//! ```rust
//! use xtalguard::params::{Parameter, ParameterStore};
//! use xtalguard::presets::builtin_library;
//!
//! let library = builtin_library();
//! let mut store = ParameterStore::new();
//! library.apply_crystal("Generic 25 MHz SMD 3225", &mut store).unwrap();
//! assert_eq!(store.get(Parameter::Freq), 25e6);
//! ```

pub mod builtin;
pub mod schema;

pub use builtin::{builtin_library, load_library, load_library_from_file};
pub use schema::{CrystalPreset, PresetLibrary, CRYSTAL_PARAMETERS};

use crate::params::{InvalidValue, Parameter};
use crate::units::UnitError;

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("unknown crystal preset '{0}'")]
    UnknownCrystal(String),
    #[error("unknown probe preset '{0}'")]
    UnknownProbe(String),
    #[error("crystal preset '{preset}' sets {parameter}, which is not a crystal datasheet field")]
    NotCrystalParameter { preset: String, parameter: Parameter },
    #[error("preset '{preset}', {parameter}: {source}")]
    Unit {
        preset: String,
        parameter: Parameter,
        #[source]
        source: UnitError,
    },
    #[error("preset '{preset}': {source}")]
    Value {
        preset: String,
        #[source]
        source: InvalidValue,
    },
    #[error("failed to read preset library: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse preset library: {0}")]
    Json(#[from] serde_json::Error),
}
