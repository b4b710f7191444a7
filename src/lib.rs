//! # contract-forge – bulk contract generation from a `.docx` template
//!
//! This crate turns one document template and a table of rows into one
//! finished document per row, bundled into a single archive. The pipeline
//! stages are:
//!
//! 1. **Bind** – row → ordered placeholder/value list ([`variables`])
//! 2. **Substitute** – paragraph text → styled runs ([`substitute`], [`style`])
//! 3. **Assemble** – template package → filled document ([`assemble`],
//!    built on [`package`] and [`dom`])
//! 4. **Batch** – all rows, with per-row failure isolation ([`batch`])
//! 5. **Pack** – successful documents → zip archive ([`archive`])
//!
//! A C-compatible FFI surface is exposed via the [`ffi`] module.

pub mod archive;
pub mod assemble;
pub mod batch;
pub mod dom;
pub mod error;
pub mod ffi;
pub mod package;
pub mod pipeline;
pub mod style;
pub mod substitute;
pub mod templates;
pub mod variables;

// Re-exports for convenience
pub use batch::{BatchResult, GeneratedDocument};
pub use error::{Error, RowError};
pub use pipeline::{generate_contracts, Generation, PipelineConfig};
pub use variables::{Row, Table};
