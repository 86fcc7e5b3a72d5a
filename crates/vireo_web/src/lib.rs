//! Web-style host for the Vireo runtime
//!
//! This crate provides:
//! - An in-memory document ([`Document`]) implementing [`vireo_core::Host`]
//! - An index-based tree patcher ([`DomPatch`])
//! - A caching template compiler ([`WebCompiler`])
//! - The platform `show` directive and `upper` / `lower` / `json` filters
//!
//! [`web_runtime`] wires all of them into a [`RuntimeBuilder`]:
//!
//! ```ignore
//! let mut runtime = vireo_web::web_runtime(RuntimeConfig::default())
//!     .build()?;
//! ```

pub mod compiler;
pub mod document;
pub mod patch;
pub mod platform;

pub use compiler::{compile_template, WebCompiler};
pub use document::Document;
pub use patch::DomPatch;
pub use platform::platform_options;

use thiserror::Error;
use vireo_core::{CompileError, Runtime, RuntimeBuilder, RuntimeConfig, VireoError};

/// Errors from setting up a web runtime
#[derive(Error, Debug)]
pub enum WebError {
    #[error("invalid document markup: {0}")]
    Markup(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] VireoError),
}

pub type Result<T> = std::result::Result<T, WebError>;

/// Builder for a full runtime over an empty [`Document`]
pub fn web_runtime(config: RuntimeConfig) -> RuntimeBuilder {
    web_runtime_with(Document::new(), config)
}

/// Builder for a full runtime over `document`
pub fn web_runtime_with(document: Document, config: RuntimeConfig) -> RuntimeBuilder {
    let compiler = WebCompiler::new(config.compile_cache_size);
    runtime_only(document, config).compiler(compiler)
}

/// Builder without a template compiler; components need render functions
pub fn runtime_only(document: Document, config: RuntimeConfig) -> RuntimeBuilder {
    Runtime::builder()
        .config(config)
        .host(document)
        .patch(DomPatch)
        .root_options(platform_options())
}

/// Build a full runtime whose document body holds `markup`
pub fn runtime_from_markup(markup: &str, config: RuntimeConfig) -> Result<Runtime> {
    let document = Document::with_body(markup)?;
    Ok(web_runtime_with(document, config).build()?)
}
