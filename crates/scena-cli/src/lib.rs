//! CLI logic for the Scena composition toolkit.
//!
//! This module contains the core CLI logic: configuration loading, file
//! I/O, and dispatch into the [`scena::Studio`] pipeline. The library
//! core never touches the filesystem; reading inputs and writing outputs
//! happens here.

pub mod error_adapter;

mod args;
mod config;

pub use args::{Args, Command};

use std::fs;

use log::info;

use scena::{ScenaError, Studio, diagnostic::Severity};

/// Run the Scena CLI application
///
/// # Errors
///
/// Returns `ScenaError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Parsing errors
/// - Critical diagnostics under `--strict` (or for `validate`)
/// - Stage-budget timeouts carrying a resumable operation id
pub fn run(args: &Args) -> Result<(), ScenaError> {
    let app_config = config::load_config(args.config.as_ref())?;

    match &args.command {
        Command::Convert {
            input,
            output,
            strict,
        } => {
            info!(input_path = input.as_str(), output_path = output.as_str(); "Converting composition");
            let studio = Studio::new(app_config.with_strict_validation(*strict));
            let source = fs::read_to_string(input)?;

            let conversion = studio.convert(&source)?;
            fs::write(output, &conversion.text)?;

            for change in &conversion.changes {
                info!(change = change.as_str(); "Applied change");
            }
            println!(
                "converted {} -> {} ({} change(s), {} diagnostic(s))",
                input,
                output,
                conversion.changes.len(),
                conversion.report.diagnostics().len()
            );
            Ok(())
        }
        Command::Validate { input } => {
            info!(input_path = input.as_str(); "Validating composition");
            let studio = Studio::new(app_config);
            let source = fs::read_to_string(input)?;

            let report = studio.validate(&source)?;
            if report.is_valid() {
                println!(
                    "{} is valid ({} advisory diagnostic(s))",
                    input,
                    report.diagnostics().len()
                );
                return Ok(());
            }
            // Invalid documents exit nonzero; main renders each
            // diagnostic through miette.
            Err(ScenaError::Validation { report })
        }
        Command::Enhance {
            input,
            output,
            hint,
            strict,
        } => {
            info!(input_path = input.as_str(), output_path = output.as_str(); "Enhancing composition");
            let studio = Studio::new(app_config.with_strict_validation(*strict));
            let source = fs::read_to_string(input)?;

            let enhancement = studio.enhance(&source, hint.as_deref())?;
            fs::write(output, &enhancement.text)?;

            println!(
                "enhanced {} -> {} (richness {} -> {}, {} change(s))",
                input,
                output,
                enhancement.score_before,
                enhancement.score_after,
                enhancement.changes.len()
            );
            if enhancement.needs_rework {
                println!(
                    "note: content still scores below the acceptance threshold; manual rework recommended"
                );
            }
            let criticals = enhancement.report.count(Severity::Critical);
            if criticals > 0 {
                println!("warning: {criticals} critical diagnostic(s) remain");
            }
            Ok(())
        }
    }
}
