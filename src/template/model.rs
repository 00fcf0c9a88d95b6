use serde::Deserialize;
use serde_json::{Map, Value};

/// Where a request's template comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSource {
    /// Template object sent in the request body.
    Inline(Value),
    /// URL to download the template from.
    Remote(String),
}

impl TemplateSource {
    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            TemplateSource::Inline(_) => "inline template".to_string(),
            TemplateSource::Remote(url) => format!("template_url {}", url),
        }
    }
}

/// A template that has passed validation.
///
/// The only way to obtain one is [`super::validate`]. The submitted JSON is
/// kept untouched next to its typed view so cache writes store exactly what
/// was validated.
#[derive(Debug, Clone)]
pub struct Template {
    raw: Value,
    document: TemplateDocument,
}

impl Template {
    pub(super) fn from_validated(raw: Value, document: TemplateDocument) -> Self {
        Self { raw, document }
    }

    pub fn as_json(&self) -> &Value {
        &self.raw
    }

    pub fn into_json(self) -> Value {
        self.raw
    }

    pub fn document(&self) -> &TemplateDocument {
        &self.document
    }

    /// Serialized form written to the template cache.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.raw.to_string().into_bytes()
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

/// Typed view of a pdfme template.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateDocument {
    #[serde(rename = "basePdf")]
    pub base_pdf: BasePdf,
    /// Pages, each a list of fields.
    pub schemas: Vec<Vec<SchemaField>>,
    #[serde(rename = "pdfmeVersion", default)]
    pub pdfme_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BasePdf {
    Blank(BlankPdf),
    /// Base64 or data-URI encoded PDF to draw on.
    Embedded(String),
}

/// Blank page descriptor; all lengths in millimetres.
#[derive(Debug, Clone, Deserialize)]
pub struct BlankPdf {
    pub width: f64,
    pub height: f64,
    /// Top, right, bottom, left.
    pub padding: [f64; 4],
    /// Fields drawn on every page.
    #[serde(rename = "staticSchema", default)]
    pub static_schema: Vec<SchemaField>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// One field on a template page.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Option<String>,
    pub position: Position,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotate: Option<f64>,
    #[serde(default)]
    pub opacity: Option<f64>,
    #[serde(rename = "readOnly", default)]
    pub read_only: bool,
    /// Plugin-specific properties (fontName, fontSize, borderColor, ...).
    #[serde(flatten)]
    pub props: Map<String, Value>,
}

impl SchemaField {
    pub fn prop_str(&self, name: &str) -> Option<&str> {
        self.props.get(name).and_then(Value::as_str)
    }

    pub fn prop_f64(&self, name: &str) -> Option<f64> {
        self.props.get(name).and_then(Value::as_f64)
    }
}
