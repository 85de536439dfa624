//! Core validation logic shared by every front end.
//! No I/O beyond reading session files.

use std::path::Path;

use serde::Serialize;

use crate::classify::{
    classify, Classification, InvalidThresholds, Status, Thresholds, Verdict, VerdictPolicy,
};
use crate::engine::{self, CalculationError, ResultsBundle};
use crate::params::{InvalidValue, Parameter, ParameterSet, ParameterStore};
use crate::presets::PresetError;
use crate::session::SessionFile;
use crate::units::UnitError;

#[derive(Debug, thiserror::Error)]
pub enum XtalGuardError {
    #[error(transparent)]
    InvalidValue(#[from] InvalidValue),
    #[error(transparent)]
    Calculation(#[from] CalculationError),
    #[error("{parameter}: {source}")]
    Unit {
        parameter: Parameter,
        #[source]
        source: UnitError,
    },
    #[error(transparent)]
    Thresholds(#[from] InvalidThresholds),
    #[error("missing value for {0}")]
    MissingParameter(Parameter),
    #[error(transparent)]
    Preset(#[from] PresetError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Options for validation runs (CLI or GUI).
#[derive(Clone, Debug, Default)]
pub struct ValidationOptions {
    pub thresholds: Thresholds,
    /// Fail the verdict on WARNING findings too.
    pub strict_mode: bool,
}

impl ValidationOptions {
    pub fn policy(&self) -> VerdictPolicy {
        if self.strict_mode {
            VerdictPolicy::Strict
        } else {
            VerdictPolicy::Lenient
        }
    }
}

/// One finding per check, OK findings included.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub rule_id: String,
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationStats {
    pub critical: usize,
    pub warning: usize,
    pub ok: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub parameters: ParameterSet,
    pub results: ResultsBundle,
    pub classification: Classification,
    pub issues: Vec<Issue>,
    pub stats: ValidationStats,
}

impl ValidationResult {
    pub fn verdict(&self) -> Verdict {
        self.classification.verdict
    }

    pub fn passed(&self) -> bool {
        self.classification.verdict == Verdict::Pass
    }

    pub fn has_critical(&self) -> bool {
        self.stats.critical > 0
    }

    /// Findings that are not OK.
    pub fn total_issues(&self) -> usize {
        self.stats.critical + self.stats.warning
    }
}

fn issues_to_stats(issues: &[Issue]) -> ValidationStats {
    let mut critical = 0;
    let mut warning = 0;
    let mut ok = 0;
    for i in issues {
        match i.status {
            Status::Critical => critical += 1,
            Status::Warning => warning += 1,
            Status::Ok => ok += 1,
        }
    }
    ValidationStats {
        critical,
        warning,
        ok,
    }
}

fn startup_issue(status: Status, gm_mcu: f64, gm_crit: f64) -> Issue {
    let (message, suggestion) = match status {
        Status::Critical => (
            format!(
                "Gm ({:.1} mA/V) < Gm_crit ({:.1} mA/V). Oscillator start-up is not guaranteed.",
                gm_mcu * 1e3,
                gm_crit * 1e3
            ),
            Some(
                "Reduce CL_SEL or stray capacitance, choose a crystal with lower ESR, \
                 or select a higher-gain oscillator drive mode."
                    .to_string(),
            ),
        ),
        _ => (
            format!(
                "Gm ({:.1} mA/V) >= Gm_crit ({:.1} mA/V). Start-up condition met.",
                gm_mcu * 1e3,
                gm_crit * 1e3
            ),
            None,
        ),
    };
    Issue {
        rule_id: "startup_margin".to_string(),
        status,
        message,
        suggestion,
    }
}

fn gain_margin_issue(status: Status, gain_margin: f64, thresholds: &Thresholds) -> Issue {
    let (message, suggestion) = match status {
        Status::Critical => (
            format!(
                "Gain margin ({:.2}) below {:.1}. Risk of unstable oscillation.",
                gain_margin, thresholds.gain_margin_critical
            ),
            Some("Lower the load capacitance or pick a crystal with lower ESR.".to_string()),
        ),
        Status::Warning => (
            format!(
                "Gain margin ({:.2}) acceptable but below {:.1}. Optimize.",
                gain_margin, thresholds.gain_margin_target
            ),
            Some(format!(
                "Aim for a gain margin of at least {:.1} to cover temperature and ageing.",
                thresholds.gain_margin_target
            )),
        ),
        Status::Ok => (
            format!(
                "Gain margin ({:.2}) >= {:.1}.",
                gain_margin, thresholds.gain_margin_target
            ),
            None,
        ),
    };
    Issue {
        rule_id: "gain_margin".to_string(),
        status,
        message,
        suggestion,
    }
}

fn drive_level_issue(status: Status, drive_level: f64, dl_max: f64, dl_ratio: f64) -> Issue {
    let (message, suggestion) = match status {
        Status::Critical => (
            format!(
                "Drive level ({:.1} uW) exceeds DL max ({:.1} uW).",
                drive_level * 1e6,
                dl_max * 1e6
            ),
            Some("An external series resistor (REXT_SEL) is mandatory.".to_string()),
        ),
        Status::Warning => (
            format!(
                "Drive level ({:.1} uW) close to the limit (DL/DL_max = {:.2}).",
                drive_level * 1e6,
                dl_ratio
            ),
            Some("Consider adding or increasing the external series resistor.".to_string()),
        ),
        Status::Ok => (
            format!(
                "Drive level ({:.1} uW) within limits (DL/DL_max = {:.2}).",
                drive_level * 1e6,
                dl_ratio
            ),
            None,
        ),
    };
    Issue {
        rule_id: "drive_level".to_string(),
        status,
        message,
        suggestion,
    }
}

/// Core validation API used by every front end.
pub struct XtalGuardCore;

impl XtalGuardCore {
    /// Calculate and classify one snapshot.
    pub fn validate(
        snapshot: &ParameterSet,
        options: ValidationOptions,
    ) -> Result<ValidationResult, XtalGuardError> {
        options.thresholds.validate()?;
        let results = engine::calculate(snapshot)?;
        Ok(Self::classify_results(snapshot, results, &options))
    }

    /// Classify results that were already computed from `snapshot`.
    /// `options.thresholds` is expected to have passed [`Thresholds::validate`].
    pub fn classify_results(
        snapshot: &ParameterSet,
        results: ResultsBundle,
        options: &ValidationOptions,
    ) -> ValidationResult {
        let thresholds = &options.thresholds;
        let classification = classify(&results, snapshot.gm_mcu, thresholds, options.policy());

        let issues = vec![
            startup_issue(classification.startup, snapshot.gm_mcu, results.gm_crit),
            gain_margin_issue(classification.gain_margin, results.gain_margin, thresholds),
            drive_level_issue(
                classification.drive_level,
                results.drive_level,
                snapshot.dl_max,
                results.dl_ratio,
            ),
        ];
        let stats = issues_to_stats(&issues);

        tracing::debug!(
            verdict = %classification.verdict,
            critical = stats.critical,
            warning = stats.warning,
            "validation finished"
        );

        ValidationResult {
            parameters: *snapshot,
            results,
            classification,
            issues,
            stats,
        }
    }

    pub fn validate_store(
        store: &ParameterStore,
        options: ValidationOptions,
    ) -> Result<ValidationResult, XtalGuardError> {
        Self::validate(&store.snapshot(), options)
    }

    /// Load a session file and validate it.
    pub fn validate_session(
        path: &Path,
        options: ValidationOptions,
    ) -> Result<ValidationResult, XtalGuardError> {
        let session = SessionFile::load(path)?;
        let mut store = ParameterStore::new();
        session.apply_to(&mut store)?;
        Self::validate_store(&store, options)
    }
}
