//! CLI command implementations.

mod build;

pub use build::BuildArgs;
