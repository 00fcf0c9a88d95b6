//! Common helpers for Typst source generation.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HEX_COLOR: Regex =
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("hex color pattern is valid");
}

/// Escape special characters for Typst strings.
pub fn escape_typst_string(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('"', r#"\""#)
        .replace('\r', "")
        .replace('\n', r"\n")
}

/// Format a length for Typst: at most three decimals, no trailing zeros.
pub fn format_number(value: f64) -> String {
    let formatted = format!("{:.3}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

pub fn mm(value: f64) -> String {
    format!("{}mm", format_number(value))
}

/// Colour accepted only as `#rgb` / `#rrggbb`; anything else is ignored.
pub fn sanitize_color(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| HEX_COLOR.is_match(v))
        .map(|v| v.to_ascii_lowercase())
}

/// Typst colour expression, with opacity applied as transparency.
pub fn color_expr(hex: &str, opacity: Option<f64>) -> String {
    let base = format!("rgb(\"{}\")", hex);
    match opacity {
        Some(o) if o < 1.0 => {
            let transparency = ((1.0 - o.clamp(0.0, 1.0)) * 100.0).round();
            format!("{}.transparentize({}%)", base, format_number(transparency))
        }
        _ => base,
    }
}
