//! `build` command: full rebuild of the documentation set.

use std::path::PathBuf;

use clap::Args;

use kbforge_config::{CliSettings, Config};
use kbforge_core::{IdentityProse, run_from_paths};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the `build` command.
#[derive(Args)]
pub struct BuildArgs {
    /// Path to the configuration file (default: discover kbforge.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the XML knowledge-base export.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Path to the structure description.
    #[arg(long)]
    structure: Option<PathBuf>,

    /// Directory containing template definitions.
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Output directory.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl BuildArgs {
    /// Execute the build.
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] on fatal configuration/setup failures, or when
    /// any output target could not be written.
    pub fn execute(self, output: &Output) -> Result<(), CliError> {
        let settings = CliSettings {
            export_file: self.export,
            structure_file: self.structure,
            templates_dir: self.templates,
            output_dir: self.output,
        };
        let config = Config::load(self.config.as_deref(), Some(&settings))?;
        let paths = &config.paths_resolved;

        let outcome = run_from_paths(
            &paths.structure_file,
            &paths.templates_dir,
            &paths.export_file,
            &paths.output_dir,
            &IdentityProse,
        )?;

        let report = &outcome.report;
        output.success(&format!(
            "Built {} pages into {}",
            report.pages_processed,
            paths.output_dir.display()
        ));

        for fallback in &report.template_fallbacks {
            output.warning(&format!(
                "{}: template '{}' not found, used default",
                fallback.page_id, fallback.requested
            ));
        }
        for id in &report.duplicate_content {
            output.warning(&format!("{id}: multiple export blocks matched, used first"));
        }
        for id in &report.content_missing {
            output.warning(&format!("{id}: content missing"));
        }
        for (id, message) in &report.errors {
            output.warning(&format!("{id}: {message}"));
        }

        let emit = &outcome.emit;
        let failed = emit.markdown_errors.len() + usize::from(emit.combined_error.is_some());
        if failed > 0 {
            for err in &emit.markdown_errors {
                output.error(&err.to_string());
            }
            if let Some(err) = &emit.combined_error {
                output.error(&err.to_string());
            }
            return Err(CliError::Emit { failed });
        }

        if !report.is_clean() {
            output.info(&format!("{} degraded pages", report.degraded_pages()));
        }

        Ok(())
    }
}
