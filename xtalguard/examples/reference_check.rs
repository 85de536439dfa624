//! Validate a saved session file and print the findings.
//! Run with: cargo run --example reference_check [path/to/session.json]

use std::path::Path;

use xtalguard::prelude::*;

fn main() -> Result<(), XtalGuardError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/reference_session.json".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example reference_check [path/to/session.json]");
        std::process::exit(1);
    }

    let result = xtalguard::validate_session(path, ValidationOptions::default())?;

    println!("Validation results for: {}", path.display());
    println!("  CL_eff:      {:.3} pF", result.results.cl_eff * 1e12);
    println!("  Gm_crit:     {:.3} mA/V", result.results.gm_crit * 1e3);
    println!("  Gain margin: {:.3}", result.results.gain_margin);
    println!("  Drive level: {:.3} uW", result.results.drive_level * 1e6);
    println!();

    for issue in &result.issues {
        println!("  [{}] {}", issue.status, issue.message);
        if let Some(ref suggestion) = issue.suggestion {
            println!("      {}", suggestion);
        }
    }

    if !result.passed() {
        println!("\nVerdict: FAIL");
        std::process::exit(1);
    }

    println!("\nVerdict: PASS");
    Ok(())
}
