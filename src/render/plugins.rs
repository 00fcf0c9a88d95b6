//! Schema plugins - one per template field type.
//!
//! A plugin turns a field and its value into a Typst expression sized to the
//! field's box. The engine takes care of placement and rotation.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::common::{color_expr, escape_typst_string, format_number, mm, sanitize_color};
use super::fonts::FontMap;
use super::RenderError;
use crate::template::SchemaField;

const DEFAULT_FONT_SIZE: f64 = 13.0;
const DEFAULT_COLOR: &str = "#000000";
const DEFAULT_BORDER_WIDTH_MM: f64 = 0.2;
/// Typst's default paragraph leading, used for `lineHeight: 1`.
const BASE_LEADING_EM: f64 = 0.65;

/// Per-render state shared by the plugins.
pub struct RenderContext<'a> {
    pub fonts: &'a FontMap,
    workspace: &'a Path,
    asset_count: usize,
}

impl<'a> RenderContext<'a> {
    pub fn new(fonts: &'a FontMap, workspace: &'a Path) -> Self {
        Self {
            fonts,
            workspace,
            asset_count: 0,
        }
    }

    /// Write a binary asset next to the Typst source and return its relative name.
    pub fn write_asset(&mut self, extension: &str, bytes: &[u8]) -> Result<String, RenderError> {
        self.asset_count += 1;
        let name = format!("asset-{}.{}", self.asset_count, extension);
        fs::write(self.workspace.join(&name), bytes).map_err(RenderError::Workspace)?;
        Ok(name)
    }
}

pub trait SchemaPlugin: Send + Sync {
    /// Typst expression for `field` showing `value`; `None` draws nothing.
    fn render(
        &self,
        field: &SchemaField,
        value: &str,
        ctx: &mut RenderContext<'_>,
    ) -> Result<Option<String>, RenderError>;
}

/// Registry of plugins keyed by schema `type`.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Arc<HashMap<String, Arc<dyn SchemaPlugin>>>,
}

impl PluginRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Plugins for the built-in schema types.
    pub fn builtin() -> Self {
        Self::empty()
            .with_plugin("text", TextPlugin)
            .with_plugin("image", ImagePlugin)
            .with_plugin("rectangle", ShapePlugin::Rectangle)
            .with_plugin("ellipse", ShapePlugin::Ellipse)
            .with_plugin("line", ShapePlugin::Line)
    }

    pub fn with_plugin(mut self, kind: impl Into<String>, plugin: impl SchemaPlugin + 'static) -> Self {
        Arc::make_mut(&mut self.plugins).insert(kind.into(), Arc::new(plugin));
        self
    }

    pub fn get(&self, kind: &str) -> Option<&dyn SchemaPlugin> {
        self.plugins.get(kind).map(|plugin| plugin.as_ref())
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

// ============================================================================
// text
// ============================================================================

pub struct TextPlugin;

impl SchemaPlugin for TextPlugin {
    fn render(
        &self,
        field: &SchemaField,
        value: &str,
        ctx: &mut RenderContext<'_>,
    ) -> Result<Option<String>, RenderError> {
        if value.is_empty() {
            return Ok(None);
        }

        let font = match field.prop_str("fontName") {
            Some(name) if !ctx.fonts.contains(name) => {
                return Err(RenderError::UnknownFont(name.to_string()))
            }
            Some(name) => Some(name),
            None => ctx.fonts.fallback(),
        };
        let size = field
            .prop_f64("fontSize")
            .filter(|s| *s > 0.0)
            .unwrap_or(DEFAULT_FONT_SIZE);
        let color = sanitize_color(field.prop_str("fontColor"))
            .unwrap_or_else(|| DEFAULT_COLOR.to_string());
        let fill = sanitize_color(field.prop_str("backgroundColor"))
            .map(|bg| color_expr(&bg, field.opacity))
            .unwrap_or_else(|| "none".to_string());
        let alignment = field.prop_str("alignment");
        let horizontal = match alignment {
            Some("center") => "center",
            Some("right") => "right",
            _ => "left",
        };
        let vertical = match field.prop_str("verticalAlignment") {
            Some("middle") => "horizon",
            Some("bottom") => "bottom",
            _ => "top",
        };
        let line_height = field
            .prop_f64("lineHeight")
            .filter(|v| *v > 0.0)
            .unwrap_or(1.0);
        let leading = BASE_LEADING_EM + (line_height - 1.0);

        let mut text_args = Vec::new();
        if let Some(font) = font {
            text_args.push(format!("font: \"{}\"", escape_typst_string(font)));
        }
        text_args.push(format!("size: {}pt", format_number(size)));
        text_args.push(format!("fill: {}", color_expr(&color, field.opacity)));
        if let Some(spacing) = field.prop_f64("characterSpacing").filter(|s| *s != 0.0) {
            text_args.push(format!("tracking: {}pt", format_number(spacing)));
        }

        Ok(Some(format!(
            "block(width: {}, height: {}, clip: true, fill: {})[#set par(leading: {}em, justify: {})\n#align({} + {}, text({}, \"{}\"))]",
            mm(field.width),
            mm(field.height),
            fill,
            format_number(leading.max(0.0)),
            alignment == Some("justify"),
            horizontal,
            vertical,
            text_args.join(", "),
            escape_typst_string(value),
        )))
    }
}

// ============================================================================
// image
// ============================================================================

pub struct ImagePlugin;

impl SchemaPlugin for ImagePlugin {
    fn render(
        &self,
        field: &SchemaField,
        value: &str,
        ctx: &mut RenderContext<'_>,
    ) -> Result<Option<String>, RenderError> {
        let data = value.trim();
        if data.is_empty() {
            return Ok(None);
        }

        let invalid = |reason: String| RenderError::InvalidImage {
            field: field.name.clone(),
            reason,
        };

        let (declared, payload) = split_data_uri(data).map_err(invalid)?;
        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| invalid(format!("bad base64: {}", e)))?;
        let extension = match declared {
            Some(ext) => ext,
            None => sniff_image_type(&bytes)
                .ok_or_else(|| invalid("unrecognized image format".to_string()))?,
        };

        let file = ctx.write_asset(extension, &bytes)?;
        Ok(Some(format!(
            "block(width: {}, height: {}, image(\"{}\", width: 100%, height: 100%, fit: \"contain\"))",
            mm(field.width),
            mm(field.height),
            file
        )))
    }
}

/// Split a data URI into its file extension and base64 payload.
/// Plain base64 yields no declared type.
fn split_data_uri(value: &str) -> Result<(Option<&'static str>, &str), String> {
    let Some(rest) = value.strip_prefix("data:") else {
        return Ok((None, value));
    };

    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| "malformed data URI".to_string())?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| "data URI must be base64 encoded".to_string())?;

    let extension = match mime.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/svg+xml" => "svg",
        "image/webp" => "webp",
        other => return Err(format!("unsupported image type '{}'", other)),
    };
    Ok((Some(extension), payload))
}

fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if bytes.starts_with(b"GIF8") {
        Some("gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else if bytes.starts_with(b"<svg") || bytes.starts_with(b"<?xml") {
        Some("svg")
    } else {
        None
    }
}

// ============================================================================
// shapes
// ============================================================================

/// Vector shapes; the field value is ignored.
pub enum ShapePlugin {
    Rectangle,
    Ellipse,
    /// Drawn as a filled bar: `width` is the length, `height` the thickness.
    Line,
}

impl SchemaPlugin for ShapePlugin {
    fn render(
        &self,
        field: &SchemaField,
        _value: &str,
        _ctx: &mut RenderContext<'_>,
    ) -> Result<Option<String>, RenderError> {
        let width = mm(field.width);
        let height = mm(field.height);

        if let ShapePlugin::Line = self {
            let color = sanitize_color(field.prop_str("color"))
                .unwrap_or_else(|| DEFAULT_COLOR.to_string());
            return Ok(Some(format!(
                "rect(width: {}, height: {}, stroke: none, fill: {})",
                width,
                height,
                color_expr(&color, field.opacity)
            )));
        }

        let border_width = field
            .prop_f64("borderWidth")
            .unwrap_or(DEFAULT_BORDER_WIDTH_MM);
        let stroke = if border_width > 0.0 {
            let border_color = sanitize_color(field.prop_str("borderColor"))
                .unwrap_or_else(|| DEFAULT_COLOR.to_string());
            format!("{} + {}", mm(border_width), color_expr(&border_color, field.opacity))
        } else {
            "none".to_string()
        };
        let fill = sanitize_color(field.prop_str("color"))
            .map(|c| color_expr(&c, field.opacity))
            .unwrap_or_else(|| "none".to_string());

        let expr = match self {
            ShapePlugin::Rectangle => format!(
                "rect(width: {}, height: {}, stroke: {}, fill: {}, radius: {})",
                width,
                height,
                stroke,
                fill,
                mm(field.prop_f64("radius").unwrap_or(0.0).max(0.0))
            ),
            _ => format!(
                "ellipse(width: {}, height: {}, stroke: {}, fill: {})",
                width, height, stroke, fill
            ),
        };
        Ok(Some(expr))
    }
}
