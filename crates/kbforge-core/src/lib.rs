//! Template-driven pipeline turning a flat knowledge-base XML export
//! into a curated, hierarchically organized documentation set.
//!
//! A declarative structure description lists categories and pages; each
//! page names the content block to pull from the export and the template
//! to bind it into. Every run is a full rebuild producing two artifacts
//! from the same resolved page set:
//!
//! - one Markdown document per page, nested by id segments;
//! - one combined XML tree in structure order.
//!
//! # Quick Start
//!
//! ```ignore
//! use kbforge_core::{
//!     ExportTree, IdentityProse, Pipeline, StructureTree, TemplateRegistry,
//! };
//!
//! let structure = StructureTree::load(Path::new("config/structure.yaml"))?;
//! let registry = TemplateRegistry::load(Path::new("templates"))?;
//! let export = ExportTree::load(Path::new("data/export.xml"))?;
//!
//! let pipeline = Pipeline::new(&registry, &IdentityProse);
//! let outcome = pipeline.run(&structure, &export, Path::new("output"))?;
//! println!("degraded pages: {}", outcome.report.degraded_pages());
//! ```
//!
//! # Architecture
//!
//! - [`StructureTree`]: validated category/page hierarchy with resolved
//!   template names
//! - [`TemplateRegistry`]: eagerly loaded named templates with
//!   default-template fallback
//! - [`ExportTree`]: parsed export with document-ordered id lookup
//! - [`extract`]: per-page content location and section mapping
//! - [`render`]: template binding with origin tracking, pluggable
//!   [`ProseRenderer`]
//! - [`emit`]: Markdown + combined XML emission from one collection pass
//! - [`Pipeline`]: run orchestration and the [`RunReport`]

pub mod emit;
pub mod export;
pub mod extract;
pub mod pipeline;
pub mod render;
pub mod structure;
pub mod templates;

pub use emit::{COMBINED_FILENAME, EmitReport, WriteError, combined_xml, emit, page_markdown};
pub use export::{ExportError, ExportNode, ExportTree};
pub use extract::{ContentRecord, extract, normalize_id};
pub use pipeline::{
    Pipeline, PipelineError, RunOutcome, RunReport, TemplateFallback, run_from_paths,
};
pub use render::{
    IdentityProse, MISSING_PLACEHOLDER, Origin, ProseError, ProseRenderer, RenderError,
    RenderedPage, RenderedSection, render,
};
pub use structure::{
    Category, Page, ResolvedPage, StructureError, StructureNode, StructureTree, resolve_template,
};
pub use templates::{
    DEFAULT_TEMPLATE, ResolvedTemplate, SectionSpec, TemplateError, TemplateRegistry,
    TemplateSpec, title_from_key,
};
