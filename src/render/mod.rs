//! Rendering - turns a validated template plus input records into a PDF.
//!
//! - `engine` - Typst-backed [`DocumentRenderer`]
//! - `plugins` - per schema type drawing (text, image, shapes)
//! - `fonts` - logical font name to font file map
//! - `common` - Typst source helpers

pub mod common;
pub mod engine;
pub mod fonts;
pub mod plugins;

pub use engine::TypstRenderEngine;
pub use fonts::{FontAsset, FontMap};
pub use plugins::{PluginRegistry, RenderContext, SchemaPlugin};

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::template::Template;

/// One set of field values; produces one copy of the template's pages.
pub type InputRecord = BTreeMap<String, String>;

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("inputs must contain at least one record")]
    NoInputs,
    #[error("unsupported basePdf: {0}")]
    UnsupportedBasePdf(String),
    #[error("font '{0}' is not registered")]
    UnknownFont(String),
    #[error("no plugin registered for schema type '{0}'")]
    UnknownSchemaType(String),
    #[error("invalid image data for field '{field}': {reason}")]
    InvalidImage { field: String, reason: String },
    #[error("failed to prepare render workspace: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("Typst CLI execution failed: {0}")]
    TypstIo(#[source] std::io::Error),
    #[error("Typst CLI exited with status {code}: {stderr}")]
    TypstExit { code: i32, stderr: String },
    #[error("failed to read generated PDF: {0}")]
    ReadPdf(#[source] std::io::Error),
    #[error("render task failed: {0}")]
    Task(String),
}

/// Fonts, plugins and document metadata handed to the renderer.
#[derive(Clone)]
pub struct RenderResources {
    pub fonts: FontMap,
    pub plugins: PluginRegistry,
    pub title: String,
}

impl RenderResources {
    pub fn new(fonts: FontMap, plugins: PluginRegistry, title: impl Into<String>) -> Self {
        Self {
            fonts,
            plugins,
            title: title.into(),
        }
    }
}

/// Rendering engine contract.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(
        &self,
        template: &Template,
        inputs: &[InputRecord],
        resources: &RenderResources,
    ) -> Result<Vec<u8>, RenderError>;
}
