//! Run orchestration.
//!
//! [`Pipeline`] sequences the full rebuild: for every page in structure
//! order it resolves the template, extracts content, renders, then emits
//! both output artifacts from the one collected page set.
//!
//! Failure policy follows two tiers. Setup failures (structure,
//! templates, export, or a template miss with no global default) are
//! fatal and abort before any output is written. Per-page failures
//! degrade that page to an all-missing rendering and are recorded in the
//! [`RunReport`]; a declared page is never dropped from the outputs.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{info, warn};

use crate::emit::{EmitReport, emit};
use crate::export::{ExportError, ExportTree};
use crate::extract::extract;
use crate::render::{Origin, ProseRenderer, RenderedPage, render};
use crate::structure::{StructureError, StructureTree};
use crate::templates::{TemplateError, TemplateRegistry};

/// Fatal, run-level pipeline error. No output is written when one occurs.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Structure description failed to load.
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// Template registry failed to load, or a name could not be resolved
    /// even through the global default.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Export failed to load or parse.
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// A template-name degradation: requested name absent, default used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateFallback {
    /// Page that requested the template.
    pub page_id: String,
    /// The template name that was not found.
    pub requested: String,
}

/// Per-run summary of degradations and failures.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    /// Pages processed (equals the number of declared pages).
    pub pages_processed: usize,
    /// Pages whose content was missing: no export match, or a required
    /// section left without content.
    pub content_missing: Vec<String>,
    /// Pages with more than one matching export node (first one used).
    pub duplicate_content: Vec<String>,
    /// Template-name fallbacks to the global default.
    pub template_fallbacks: Vec<TemplateFallback>,
    /// Per-page extraction/render errors, keyed by page id.
    pub errors: BTreeMap<String, String>,
}

impl RunReport {
    /// Whether the run completed without any degradation.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.content_missing.is_empty()
            && self.duplicate_content.is_empty()
            && self.template_fallbacks.is_empty()
            && self.errors.is_empty()
    }

    /// Number of pages with at least one recorded degradation.
    #[must_use]
    pub fn degraded_pages(&self) -> usize {
        let mut ids: Vec<&str> = self
            .content_missing
            .iter()
            .chain(self.duplicate_content.iter())
            .map(String::as_str)
            .chain(self.template_fallbacks.iter().map(|f| f.page_id.as_str()))
            .chain(self.errors.keys().map(String::as_str))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Per-page degradation summary.
    pub report: RunReport,
    /// Output write summary.
    pub emit: EmitReport,
}

/// Sequences structure, templates, extraction, rendering and emission.
pub struct Pipeline<'a> {
    registry: &'a TemplateRegistry,
    prose: &'a dyn ProseRenderer,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline over a loaded registry and a prose collaborator.
    #[must_use]
    pub fn new(registry: &'a TemplateRegistry, prose: &'a dyn ProseRenderer) -> Self {
        Self { registry, prose }
    }

    /// Render every declared page, in structure order.
    ///
    /// Per-page failures are recorded in the report and the page is
    /// substituted with an all-missing rendering.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] when a template cannot be
    /// resolved even through the global default.
    pub fn build_pages(
        &self,
        structure: &StructureTree,
        export: &ExportTree,
    ) -> Result<(Vec<RenderedPage>, RunReport), TemplateError> {
        let mut pages = Vec::with_capacity(structure.pages().len());
        let mut report = RunReport::default();

        for page in structure.pages() {
            let resolved = self.registry.resolve(&page.template)?;
            if resolved.fell_back {
                report.template_fallbacks.push(TemplateFallback {
                    page_id: page.id.clone(),
                    requested: page.template.clone(),
                });
            }

            let record = extract(&page.id, export, resolved.template);
            if record.has_duplicates() {
                report.duplicate_content.push(page.id.clone());
            }

            let rendered = match render(
                &page.id,
                &page.title,
                &record,
                resolved.template,
                self.prose,
            ) {
                Ok(rendered) => rendered,
                Err(err) => {
                    warn!(page_id = %page.id, error = %err, "page degraded to all-missing");
                    report.errors.insert(page.id.clone(), err.to_string());
                    RenderedPage::all_missing(&page.id, &page.title, resolved.template)
                }
            };

            let required_missing = resolved.template.sections.iter().any(|spec| {
                spec.required
                    && rendered
                        .sections
                        .iter()
                        .any(|s| s.key == spec.key && s.origin == Origin::Missing)
            });
            if !record.found() || required_missing {
                report.content_missing.push(page.id.clone());
            }

            pages.push(rendered);
        }

        report.pages_processed = pages.len();
        Ok((pages, report))
    }

    /// Execute a full run: build all pages, then emit both artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] for fatal setup failures; nothing is
    /// written in that case.
    pub fn run(
        &self,
        structure: &StructureTree,
        export: &ExportTree,
        output_root: &Path,
    ) -> Result<RunOutcome, PipelineError> {
        info!(pages = structure.pages().len(), "starting rebuild");
        let (pages, report) = self.build_pages(structure, export)?;
        let emit = emit(&pages, output_root);
        info!(
            processed = report.pages_processed,
            degraded = report.degraded_pages(),
            "rebuild finished"
        );
        Ok(RunOutcome { report, emit })
    }
}

/// Load all inputs from disk and execute a full run.
///
/// Convenience wrapper used by the CLI: structure and templates load
/// first (fatal on failure), then the export, then the run proper.
///
/// # Errors
///
/// Returns [`PipelineError`] for any fatal setup failure.
pub fn run_from_paths(
    structure_file: &Path,
    templates_dir: &Path,
    export_file: &Path,
    output_root: &Path,
    prose: &dyn ProseRenderer,
) -> Result<RunOutcome, PipelineError> {
    let structure = StructureTree::load(structure_file)?;
    let registry = TemplateRegistry::load(templates_dir)?;
    let export = ExportTree::load(export_file)?;

    Pipeline::new(&registry, prose).run(&structure, &export, output_root)
}
