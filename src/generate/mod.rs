//! Document generation: request parsing, the per-request pipeline and the
//! HTTP handlers in front of it.

pub mod error;
pub mod handlers;
pub mod model;
pub mod pipeline;

pub use error::GenerateError;
pub use model::{GenerateBody, GenerationRequest};
pub use pipeline::{GenerationPipeline, RenderedDocument, Stage};
