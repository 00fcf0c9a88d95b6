//! Typst rendering engine.
//!
//! Builds one Typst source document for a template and its input records,
//! writes it to a temporary directory together with any image assets, and
//! invokes the Typst compiler there.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

use super::common::{escape_typst_string, format_number, mm};
use super::plugins::RenderContext;
use super::{DocumentRenderer, InputRecord, RenderError, RenderResources};
use crate::template::{BasePdf, SchemaField, Template};

const SOURCE_FILE: &str = "document.typ";
const OUTPUT_FILE: &str = "document.pdf";

/// Renders templates by shelling out to the Typst CLI.
#[derive(Debug, Clone)]
pub struct TypstRenderEngine {
    typst_bin: String,
}

impl Default for TypstRenderEngine {
    fn default() -> Self {
        Self::new("typst")
    }
}

impl TypstRenderEngine {
    pub fn new(typst_bin: impl Into<String>) -> Self {
        Self {
            typst_bin: typst_bin.into(),
        }
    }

    /// Build the Typst source for `template` filled with `inputs`.
    ///
    /// Each record produces one copy of every template page, in order.
    /// Assets referenced by the source are written into `workspace`.
    pub fn build_source(
        template: &Template,
        inputs: &[InputRecord],
        resources: &RenderResources,
        workspace: &Path,
    ) -> Result<String, RenderError> {
        let document = template.document();
        let page = match &document.base_pdf {
            BasePdf::Blank(page) => page,
            BasePdf::Embedded(_) => {
                return Err(RenderError::UnsupportedBasePdf(
                    "embedded base PDFs cannot be drawn on; use a blank page descriptor".to_string(),
                ))
            }
        };
        if inputs.is_empty() {
            return Err(RenderError::NoInputs);
        }

        let mut source = String::new();
        source.push_str(&format!(
            "#set document(title: \"{}\")\n",
            escape_typst_string(&resources.title)
        ));
        source.push_str(&format!(
            "#set page(width: {}, height: {}, margin: 0mm)\n",
            mm(page.width),
            mm(page.height)
        ));
        if let Some(fallback) = resources.fonts.fallback() {
            source.push_str(&format!(
                "#set text(font: \"{}\")\n",
                escape_typst_string(fallback)
            ));
        }

        // A template without pages still yields one blank page per record.
        let no_fields: Vec<SchemaField> = Vec::new();
        let pages: Vec<&Vec<SchemaField>> = if document.schemas.is_empty() {
            vec![&no_fields]
        } else {
            document.schemas.iter().collect()
        };

        let mut ctx = RenderContext::new(&resources.fonts, workspace);
        let mut first_page = true;

        for input in inputs {
            for fields in &pages {
                if !first_page {
                    source.push_str("#pagebreak()\n");
                }
                first_page = false;

                for field in &page.static_schema {
                    let value = field.content.as_deref().unwrap_or("");
                    source.push_str(&place_field(field, value, resources, &mut ctx)?);
                }
                for field in fields.iter() {
                    let value = field_value(field, input);
                    source.push_str(&place_field(field, value, resources, &mut ctx)?);
                }
            }
        }

        Ok(source)
    }

    fn render_blocking(
        &self,
        template: &Template,
        inputs: &[InputRecord],
        resources: &RenderResources,
    ) -> Result<Vec<u8>, RenderError> {
        let temp_dir = tempdir().map_err(RenderError::Workspace)?;
        let source = Self::build_source(template, inputs, resources, temp_dir.path())?;
        fs::write(temp_dir.path().join(SOURCE_FILE), source).map_err(RenderError::Workspace)?;

        compile_typst_to_pdf(&self.typst_bin, &temp_dir, &resources.fonts.font_dirs())
    }
}

#[async_trait]
impl DocumentRenderer for TypstRenderEngine {
    async fn render(
        &self,
        template: &Template,
        inputs: &[InputRecord],
        resources: &RenderResources,
    ) -> Result<Vec<u8>, RenderError> {
        let engine = self.clone();
        let template = template.clone();
        let inputs = inputs.to_vec();
        let resources = resources.clone();

        tokio::task::spawn_blocking(move || engine.render_blocking(&template, &inputs, &resources))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))?
    }
}

/// Read-only fields always show their designed content; other fields take
/// the record's value and stay empty when the record has none.
fn field_value<'a>(field: &'a SchemaField, input: &'a InputRecord) -> &'a str {
    if field.read_only {
        return field.content.as_deref().unwrap_or("");
    }
    input.get(&field.name).map(String::as_str).unwrap_or("")
}

fn place_field(
    field: &SchemaField,
    value: &str,
    resources: &RenderResources,
    ctx: &mut RenderContext<'_>,
) -> Result<String, RenderError> {
    let plugin = resources
        .plugins
        .get(&field.kind)
        .ok_or_else(|| RenderError::UnknownSchemaType(field.kind.clone()))?;

    let Some(body) = plugin.render(field, value, ctx)? else {
        return Ok(String::new());
    };
    let body = match field.rotate {
        Some(angle) if angle != 0.0 => format!(
            "rotate({}deg, origin: center + horizon, reflow: false, {})",
            format_number(angle),
            body
        ),
        _ => body,
    };

    Ok(format!(
        "#place(top + left, dx: {}, dy: {}, {})\n",
        mm(field.position.x),
        mm(field.position.y),
        body
    ))
}

/// Compile the workspace's source file to PDF.
fn compile_typst_to_pdf(
    typst_bin: &str,
    temp_dir: &TempDir,
    font_dirs: &[PathBuf],
) -> Result<Vec<u8>, RenderError> {
    let output_path = temp_dir.path().join(OUTPUT_FILE);

    let mut command = Command::new(typst_bin);
    command.arg("compile");
    for dir in font_dirs {
        command.arg("--font-path").arg(dir);
    }
    let output = command
        .arg(SOURCE_FILE)
        .arg(OUTPUT_FILE)
        .current_dir(temp_dir.path())
        .output()
        .map_err(RenderError::TypstIo)?;

    if !output.status.success() {
        return Err(RenderError::TypstExit {
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    fs::read(&output_path).map_err(RenderError::ReadPdf)
}
