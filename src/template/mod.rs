//! Templates: model, validation and cache-aside resolution.
//!
//! - `model` - validated [`Template`] and its typed document view
//! - `validation` - structural checks every template passes before use
//! - `resolver` - inline / remote resolution with the template cache in front

pub mod model;
pub mod resolver;
pub mod validation;

pub use model::{BasePdf, BlankPdf, Position, SchemaField, Template, TemplateDocument, TemplateSource};
pub use resolver::{FetchFailure, ResolveError, TemplateResolver};
pub use validation::{validate, validate_bytes, TemplateInvalid, ValidationError, ValidationErrors};
