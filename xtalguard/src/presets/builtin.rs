//! Built-in and user preset libraries
//!
//! The built-in library is embedded into the binary. User libraries are
//! plain JSON files; a directory of them can be loaded in one go.

use std::path::Path;

use crate::presets::schema::PresetLibrary;
use crate::presets::PresetError;

const EMBEDDED_CRYSTALS: &str = include_str!("../../presets/crystals.json");
const EMBEDDED_PROBES: &str = include_str!("../../presets/probes.json");

/// Environment variable naming a user preset file or directory.
pub const PRESETS_ENV: &str = "XTALGUARD_PRESETS";

/// Library compiled into the binary.
pub fn builtin_library() -> PresetLibrary {
    let mut library = PresetLibrary::new();
    for json_str in [EMBEDDED_CRYSTALS, EMBEDDED_PROBES] {
        match serde_json::from_str::<PresetLibrary>(json_str) {
            Ok(embedded) => library.merge_missing(embedded),
            Err(e) => {
                tracing::warn!("Failed to parse embedded preset library: {}", e);
            }
        }
    }
    library
}

/// Load and validate a single library file.
pub fn load_library_from_file(path: &Path) -> Result<PresetLibrary, PresetError> {
    let content = std::fs::read_to_string(path)?;
    let library: PresetLibrary = serde_json::from_str(&content)?;
    library.validate()?;
    Ok(library)
}

/// Load every `.json` library in `dir`.
/// Returns the merged library and the errors of files that were skipped.
pub fn load_libraries_from_directory(dir: &Path) -> (PresetLibrary, Vec<String>) {
    let mut library = PresetLibrary::new();
    let mut errors = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            errors.push(format!("Failed to read directory {:?}: {}", dir, e));
            return (library, errors);
        }
    };

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|e| e == "json").unwrap_or(false))
        .collect();
    paths.sort();

    for path in paths {
        match load_library_from_file(&path) {
            Ok(loaded) => {
                tracing::info!(
                    "Loaded {} crystal and {} probe presets from {:?}",
                    loaded.crystals.len(),
                    loaded.probes.len(),
                    path.file_name()
                );
                library.merge_missing(loaded);
            }
            Err(e) => {
                let error_msg = format!("Failed to load {:?}: {}", path.file_name(), e);
                tracing::warn!("{}", error_msg);
                errors.push(error_msg);
            }
        }
    }

    (library, errors)
}

/// User library from `path` (file or directory), backed by the built-ins.
///
/// With no path, `XTALGUARD_PRESETS` is consulted; with neither, only the
/// built-in library is returned. An explicit file that fails to load is an
/// error; unreadable files inside a directory are skipped with a warning.
pub fn load_library(path: Option<&Path>) -> Result<PresetLibrary, PresetError> {
    let from_env = std::env::var_os(PRESETS_ENV).map(std::path::PathBuf::from);
    let path = path.or(from_env.as_deref());

    let mut library = match path {
        Some(p) if p.is_dir() => {
            let (library, errors) = load_libraries_from_directory(p);
            for error in errors {
                tracing::warn!("Preset loading error: {}", error);
            }
            library
        }
        Some(p) => load_library_from_file(p)?,
        None => PresetLibrary::new(),
    };

    library.merge_missing(builtin_library());
    tracing::info!(
        "Preset library: {} crystals, {} probes",
        library.crystals.len(),
        library.probes.len()
    );
    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Parameter;

    #[test]
    fn test_embedded_library_parses() {
        let library = builtin_library();
        assert_eq!(library.crystals.len(), 4);
        assert_eq!(library.probes.len(), 4);
        library.validate().unwrap();
    }

    #[test]
    fn test_embedded_presets_convert() {
        let library = builtin_library();
        for name in library.crystals.keys() {
            let values = library.crystal_values(name).unwrap();
            assert_eq!(values.len(), 4, "{} should set all datasheet fields", name);
        }
        for name in library.probes.keys() {
            library.probe_capacitance(name).unwrap();
        }
    }

    #[test]
    fn test_reference_crystal() {
        let values = builtin_library()
            .crystal_values("Generic 25 MHz SMD 3225")
            .unwrap();
        assert!(values.contains(&(Parameter::Freq, 25e6)));
        assert!(values.contains(&(Parameter::EsrMax, 60.0)));
    }

    #[test]
    fn test_user_library_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mine.json");
        std::fs::write(
            &path,
            r#"{ "probes": { "Passive 10x probe": { "value": "9.5", "unit": "pF" } } }"#,
        )
        .unwrap();

        let library = load_library(Some(&path)).unwrap();
        assert_eq!(library.probes["Passive 10x probe"].value, "9.5");
        assert!(library.crystals.contains_key("Generic 8 MHz HC-49/US"));
    }

    #[test]
    fn test_directory_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(
            dir.path().join("good.json"),
            r#"{ "crystals": { "Lab 20 MHz": { "FREQ": { "value": "20", "unit": "MHz" } } } }"#,
        )
        .unwrap();

        let (library, errors) = load_libraries_from_directory(dir.path());
        assert_eq!(errors.len(), 1);
        assert!(library.crystals.contains_key("Lab 20 MHz"));
    }

    #[test]
    fn test_explicit_bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{ "crystals": { "X": { "VPP_MEASURED": { "value": "1", "unit": "V" } } } }"#,
        )
        .unwrap();
        assert!(matches!(
            load_library(Some(&path)),
            Err(PresetError::NotCrystalParameter { .. })
        ));
    }
}
