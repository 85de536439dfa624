//! Example: driving a Workbench directly with stricter thresholds.
//! Run with: cargo run --example custom_thresholds

use xtalguard::presets::builtin_library;
use xtalguard::{Thresholds, Unit};
use xtalguard::prelude::*;

fn main() -> Result<(), XtalGuardError> {
    let library = builtin_library();
    let mut bench = Workbench::new();

    bench.apply_crystal(&library, "Generic 16 MHz SMD 3225")?;
    bench.apply_probe(&library, "Active low-capacitance probe")?;
    bench.set_display(Parameter::GmMcu, "9.7", Unit::MilliamperePerVolt)?;
    bench.set_display(Parameter::ClSel, "18", Unit::Picofarad)?;
    bench.set_display(Parameter::RextSel, "0", Unit::Ohm)?;
    bench.set_display(Parameter::CsPin, "4.2", Unit::Picofarad)?;
    bench.set_display(Parameter::CsPcb, "3", Unit::Picofarad)?;
    bench.set_display(Parameter::VppMeasured, "400", Unit::Millivolt)?;

    let results = *bench.recalculate()?;

    let options = ValidationOptions {
        thresholds: Thresholds {
            gain_margin_target: 10.0,
            drive_level_warning: 0.5,
            ..Thresholds::default()
        },
        strict_mode: true,
    };
    let result = XtalGuardCore::classify_results(&bench.snapshot(), results, &options);

    for issue in &result.issues {
        println!("  [{}] {}", issue.status, issue.message);
    }
    println!("Verdict: {}", result.verdict());

    if !result.passed() {
        std::process::exit(1);
    }
    Ok(())
}
