//! Template validation.
//!
//! Structural checks that every template passes before it may be cached or
//! rendered. All violations are collected so a template author sees every
//! problem at once, each with the JSON path it was found at.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use super::model::{Template, TemplateDocument};

/// Validation error with a path and a user-friendly message.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// JSON path of the offending value, e.g. `schemas[0][2].position`
    pub field: String,
    pub message: String,
    /// Suggestion for how to fix the error
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Required property is absent or null
    pub fn missing(field: &str) -> Self {
        Self::new(field, "is required")
    }

    pub fn wrong_type(field: &str, expected: &str) -> Self {
        Self::new(field, format!("must be {}", expected))
    }

    pub fn empty_string(field: &str) -> Self {
        Self::new(field, "must not be empty")
    }

    pub fn duplicate_name(field: &str, name: &str) -> Self {
        Self::new(field, format!("duplicate field name '{}' on the same page", name))
            .with_suggestion("Give every field on a page a unique name")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// Ok if no errors were collected.
    pub fn into_result(self) -> Result<(), TemplateInvalid> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(TemplateInvalid(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

/// The template failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid template: {0}")]
pub struct TemplateInvalid(pub ValidationErrors);

impl TemplateInvalid {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::new(field, message));
        Self(errors)
    }

    /// Bytes that are not JSON at all.
    pub fn unparseable(err: &serde_json::Error) -> Self {
        Self::single("$", format!("is not valid JSON: {}", err))
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.0
    }
}

/// Validate a parsed template object and return it as a [`Template`].
pub fn validate(value: Value) -> Result<Template, TemplateInvalid> {
    let mut errors = ValidationErrors::new();
    check_template(&value, &mut errors);
    errors.into_result()?;

    let document: TemplateDocument = serde_json::from_value(value.clone())
        .map_err(|e| TemplateInvalid::single("$", e.to_string()))?;

    Ok(Template::from_validated(value, document))
}

/// Parse raw bytes as JSON and validate them.
pub fn validate_bytes(bytes: &[u8]) -> Result<Template, TemplateInvalid> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| TemplateInvalid::unparseable(&e))?;
    validate(value)
}

// ============================================================================
// Structural checks
// ============================================================================

fn check_template(value: &Value, errors: &mut ValidationErrors) {
    let Some(root) = value.as_object() else {
        errors.add(ValidationError::wrong_type("$", "a JSON object"));
        return;
    };

    match root.get("basePdf") {
        None | Some(Value::Null) => errors.add(ValidationError::missing("basePdf")),
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.add(ValidationError::empty_string("basePdf"))
        }
        Some(Value::String(_)) => {}
        Some(Value::Object(blank)) => check_blank_pdf(blank, errors),
        Some(_) => errors.add(
            ValidationError::wrong_type("basePdf", "a base PDF string or a blank page object")
                .with_suggestion("Use {\"width\": 210, \"height\": 297, \"padding\": [0, 0, 0, 0]} for a blank A4 page"),
        ),
    }

    match root.get("schemas") {
        None | Some(Value::Null) => errors.add(ValidationError::missing("schemas")),
        Some(Value::Array(pages)) => {
            for (i, page) in pages.iter().enumerate() {
                let path = format!("schemas[{}]", i);
                match page {
                    Value::Array(fields) => check_page(&path, fields, errors),
                    _ => errors.add(ValidationError::wrong_type(&path, "an array of fields")),
                }
            }
        }
        Some(_) => errors.add(
            ValidationError::wrong_type("schemas", "an array of pages")
                .with_suggestion("Each page is an array of field objects"),
        ),
    }

    if let Some(version) = root.get("pdfmeVersion") {
        if !version.is_string() && !version.is_null() {
            errors.add(ValidationError::wrong_type("pdfmeVersion", "a string"));
        }
    }
}

fn check_blank_pdf(blank: &Map<String, Value>, errors: &mut ValidationErrors) {
    for dimension in ["width", "height"] {
        let path = format!("basePdf.{}", dimension);
        match blank.get(dimension).and_then(Value::as_f64) {
            None => errors.add(ValidationError::wrong_type(&path, "a number")),
            Some(v) if v <= 0.0 => errors.add(ValidationError::new(&path, "must be greater than 0")),
            Some(_) => {}
        }
    }

    match blank.get("padding") {
        Some(Value::Array(items))
            if items.len() == 4 && items.iter().all(|v| v.as_f64().is_some_and(|n| n >= 0.0)) => {}
        _ => errors.add(
            ValidationError::wrong_type("basePdf.padding", "an array of 4 non-negative numbers")
                .with_suggestion("Order is [top, right, bottom, left] in millimetres"),
        ),
    }

    match blank.get("staticSchema") {
        None | Some(Value::Null) => {}
        Some(Value::Array(fields)) => check_page("basePdf.staticSchema", fields, errors),
        Some(_) => errors.add(ValidationError::wrong_type(
            "basePdf.staticSchema",
            "an array of fields",
        )),
    }
}

fn check_page(path: &str, fields: &[Value], errors: &mut ValidationErrors) {
    let mut seen: HashSet<&str> = HashSet::new();

    for (j, field) in fields.iter().enumerate() {
        let field_path = format!("{}[{}]", path, j);
        if let Some(name) = check_field(&field_path, field, errors) {
            if !seen.insert(name) {
                errors.add(ValidationError::duplicate_name(&format!("{}.name", field_path), name));
            }
        }
    }
}

/// Returns the field name when it is usable for the duplicate check.
fn check_field<'a>(path: &str, field: &'a Value, errors: &mut ValidationErrors) -> Option<&'a str> {
    let Some(obj) = field.as_object() else {
        errors.add(ValidationError::wrong_type(path, "a field object"));
        return None;
    };

    let name = required_string(obj, path, "name", errors);
    required_string(obj, path, "type", errors);

    let position_path = format!("{}.position", path);
    match obj.get("position") {
        Some(Value::Object(position)) => {
            for axis in ["x", "y"] {
                if position.get(axis).and_then(Value::as_f64).is_none() {
                    errors.add(ValidationError::wrong_type(
                        &format!("{}.{}", position_path, axis),
                        "a number",
                    ));
                }
            }
        }
        None | Some(Value::Null) => errors.add(ValidationError::missing(&position_path)),
        Some(_) => errors.add(ValidationError::wrong_type(&position_path, "an object with x and y")),
    }

    for dimension in ["width", "height"] {
        let dim_path = format!("{}.{}", path, dimension);
        match obj.get(dimension).and_then(Value::as_f64) {
            None => errors.add(ValidationError::wrong_type(&dim_path, "a number")),
            Some(v) if v < 0.0 => errors.add(ValidationError::new(&dim_path, "must not be negative")),
            Some(_) => {}
        }
    }

    if let Some(content) = obj.get("content") {
        if !content.is_string() && !content.is_null() {
            errors.add(ValidationError::wrong_type(&format!("{}.content", path), "a string"));
        }
    }

    if let Some(rotate) = obj.get("rotate") {
        if !rotate.is_number() && !rotate.is_null() {
            errors.add(ValidationError::wrong_type(&format!("{}.rotate", path), "a number"));
        }
    }

    if let Some(opacity) = obj.get("opacity") {
        match opacity {
            Value::Null => {}
            Value::Number(n) if n.as_f64().is_some_and(|v| (0.0..=1.0).contains(&v)) => {}
            _ => errors.add(ValidationError::wrong_type(
                &format!("{}.opacity", path),
                "a number between 0 and 1",
            )),
        }
    }

    if let Some(read_only) = obj.get("readOnly") {
        if !read_only.is_boolean() {
            errors.add(ValidationError::wrong_type(&format!("{}.readOnly", path), "a boolean"));
        }
    }

    name
}

fn required_string<'a>(
    obj: &'a Map<String, Value>,
    path: &str,
    key: &str,
    errors: &mut ValidationErrors,
) -> Option<&'a str> {
    let key_path = format!("{}.{}", path, key);
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        Some(Value::String(_)) => {
            errors.add(ValidationError::empty_string(&key_path));
            None
        }
        None | Some(Value::Null) => {
            errors.add(ValidationError::missing(&key_path));
            None
        }
        Some(_) => {
            errors.add(ValidationError::wrong_type(&key_path, "a string"));
            None
        }
    }
}
