//! XtalGuard CLI - crystal oscillator design validation from the command line.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use xtalguard::presets::{self, PresetLibrary, CRYSTAL_PARAMETERS};
use xtalguard::units::{self, from_si};
use xtalguard::{
    Parameter, SessionFile, Thresholds, ValidationOptions, ValidationResult, Workbench,
    XtalGuardCore,
};

#[derive(Parser)]
#[command(name = "xtalguard")]
#[command(about = "Crystal oscillator design validation tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Select a crystal preset (overwrites FREQ, C0, ESR_MAX, DL_MAX)
    #[arg(long, value_name = "NAME")]
    crystal: Option<String>,

    /// Select a probe preset (overwrites C_PROBE)
    #[arg(long, value_name = "NAME")]
    probe: Option<String>,

    /// Set a parameter, e.g. --set FREQ=25MHz (repeatable, applied last)
    #[arg(long = "set", value_name = "PARAM=VALUE", value_parser = parse_assignment)]
    sets: Vec<(Parameter, String)>,

    /// Preset library file or directory (defaults to $XTALGUARD_PRESETS)
    #[arg(long, value_name = "PATH")]
    presets: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Fail on WARNING findings too
    #[arg(long)]
    strict: bool,

    /// Gain margin considered robust
    #[arg(long, value_name = "RATIO", default_value_t = Thresholds::default().gain_margin_target)]
    gain_margin_target: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a saved session file
    Check {
        /// Path to a session .json file
        #[arg(value_name = "SESSION")]
        session: PathBuf,

        #[command(flatten)]
        args: CheckArgs,
    },

    /// Validate values given on the command line
    Calc {
        #[command(flatten)]
        args: CheckArgs,
    },

    /// List crystal and probe presets
    Presets {
        /// Show preset values
        #[arg(short, long)]
        verbose: bool,

        /// Preset library file or directory (defaults to $XTALGUARD_PRESETS)
        #[arg(long, value_name = "PATH")]
        presets: Option<PathBuf>,
    },

    /// Print a session file pre-filled with a reference design
    Template {
        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripts and CI
    Json,
}

fn parse_assignment(s: &str) -> Result<(Parameter, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PARAM=VALUE, got '{}'", s))?;
    let parameter = name.parse::<Parameter>().map_err(|e| e.to_string())?;
    Ok((parameter, value.trim().to_string()))
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let exit_code = match cli.command {
        Commands::Check { session, args } => handle_check(Some(&session), &args),
        Commands::Calc { args } => handle_check(None, &args),
        Commands::Presets { verbose, presets } => handle_presets(presets.as_deref(), verbose),
        Commands::Template { output } => handle_template(output.as_deref()),
    };

    process::exit(exit_code);
}

fn handle_check(session: Option<&Path>, args: &CheckArgs) -> i32 {
    match run_check(session, args) {
        Ok(result) => {
            let source = session
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "command line".to_string());
            match args.format {
                OutputFormat::Human => output_human(&source, &result),
                OutputFormat::Json => output_json(&source, &result),
            }
            if result.passed() {
                0
            } else {
                1
            }
        }
        Err(e) => {
            tracing::warn!("check aborted: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn run_check(session: Option<&Path>, args: &CheckArgs) -> anyhow::Result<ValidationResult> {
    let thresholds = Thresholds {
        gain_margin_target: args.gain_margin_target,
        ..Thresholds::default()
    };
    thresholds
        .validate()
        .context("invalid --gain-margin-target")?;

    let library = presets::load_library(args.presets.as_deref())
        .context("failed to load preset library")?;

    // Parameters that have a value; REXT_SEL defaults to 0 Ohm.
    let mut supplied: BTreeSet<Parameter> = BTreeSet::from([Parameter::RextSel]);
    let mut bench = match session {
        Some(path) => {
            let file = SessionFile::load(path)
                .with_context(|| format!("failed to read session {}", path.display()))?;
            tracing::debug!("loaded session {}", path.display());
            supplied.extend(Parameter::ALL);
            Workbench::from_session(&file)
                .with_context(|| format!("invalid session {}", path.display()))?
        }
        None => Workbench::new(),
    };

    if let Some(name) = &args.crystal {
        bench.apply_crystal(&library, name)?;
        if let Some(preset) = library.crystal(name) {
            supplied.extend(preset.values.keys().copied());
        }
        tracing::debug!(crystal = ?bench.active_presets().crystal, "crystal preset applied");
    }
    if let Some(name) = &args.probe {
        bench.apply_probe(&library, name)?;
        supplied.insert(Parameter::CProbe);
        tracing::debug!(probe = ?bench.active_presets().probe, "probe preset applied");
    }
    for (parameter, text) in &args.sets {
        let si = units::parse_quantity(*parameter, text)
            .with_context(|| format!("bad value for {}", parameter))?;
        bench.set(*parameter, si)?;
        supplied.insert(*parameter);
        tracing::debug!(%parameter, si, "override applied");
    }

    let missing: Vec<_> = Parameter::ALL
        .into_iter()
        .filter(|p| !supplied.contains(p))
        .map(|p| p.name())
        .collect();
    if !missing.is_empty() {
        bail!(
            "missing values for {} (use --set PARAM=VALUE, --crystal or --probe)",
            missing.join(", ")
        );
    }

    let results = *bench.recalculate()?;
    let options = ValidationOptions {
        thresholds,
        strict_mode: args.strict,
    };
    Ok(XtalGuardCore::classify_results(
        &bench.snapshot(),
        results,
        &options,
    ))
}

fn output_human(source: &str, result: &ValidationResult) {
    println!("\nSource: {}", source);
    println!("{}", "─".repeat(60));

    println!("\n  Inputs:");
    for (parameter, si) in result.parameters.iter() {
        let unit = parameter.default_unit();
        println!(
            "    {:<14} {:>12} {}",
            parameter.name(),
            format!("{:.4}", from_si(si, unit)),
            unit
        );
    }

    let r = &result.results;
    println!("\n  Results:");
    println!("    {:<14} {:>12.3} pF", "CL_eff", r.cl_eff * 1e12);
    println!("    {:<14} {:>12.3} mA/V", "Gm_crit", r.gm_crit * 1e3);
    println!("    {:<14} {:>12.3}", "Gain margin", r.gain_margin);
    println!("    {:<14} {:>12.3} Ohm", "X_CL", r.x_cl);
    println!("    {:<14} {:>12.3} pF", "C_tot (DL)", r.c_tot_dl * 1e12);
    println!("    {:<14} {:>12.3} uW", "Drive level", r.drive_level * 1e6);
    println!("    {:<14} {:>12.3}", "DL/DL_max", r.dl_ratio);

    println!("\n  Checks:");
    for issue in &result.issues {
        println!("    [{}] {}", issue.status, issue.message);
        if let Some(ref suggestion) = issue.suggestion {
            println!("      {}", suggestion);
        }
    }

    println!("\n  Summary:");
    println!("    Critical: {}", result.stats.critical);
    println!("    Warning:  {}", result.stats.warning);
    println!("    OK:       {}", result.stats.ok);
    println!("\n  Verdict: {}", result.verdict());
}

fn output_json(source: &str, result: &ValidationResult) {
    let output = serde_json::json!({
        "source": source,
        "verdict": result.verdict(),
        "results": result.results,
        "classification": result.classification,
        "issues": result.issues,
        "parameters": result.parameters,
        "summary": result.stats,
    });
    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: {}", e),
    }
}

fn handle_presets(path: Option<&Path>, verbose: bool) -> i32 {
    let library: PresetLibrary = match presets::load_library(path) {
        Ok(library) => library,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    println!("Crystal presets:\n");
    for (name, preset) in &library.crystals {
        println!("  {}", name);
        if verbose {
            for parameter in CRYSTAL_PARAMETERS {
                if let Some(value) = preset.values.get(&parameter) {
                    println!("    {:<8} {}", parameter.name(), value);
                }
            }
        }
    }

    println!("\nProbe presets:\n");
    for (name, probe) in &library.probes {
        if verbose {
            println!("  {:<32} {}", name, probe);
        } else {
            println!("  {}", name);
        }
    }
    0
}

fn handle_template(output: Option<&Path>) -> i32 {
    let session = SessionFile::reference();
    let result = match output {
        Some(path) => session.save(path).map(|_| {
            eprintln!("Wrote {}", path.display());
        }),
        None => serde_json::to_string_pretty(&session)
            .map(|text| println!("{}", text))
            .map_err(Into::into),
    };
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}
