use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::GenerateError;
use crate::render::InputRecord;
use crate::template::TemplateSource;

const BODY_REQUIRED: &str = "Request body is required and must be JSON";

/// Body of `POST /generate`. Exactly one of `template` and `template_url` is set.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateBody {
    /// pdfme template object
    #[schema(value_type = Object)]
    pub template: Option<Value>,
    /// Absolute http(s) URL of a pdfme template
    pub template_url: Option<String>,
    /// One record object, or an array of record objects
    #[schema(value_type = Object)]
    pub inputs: Value,
}

/// A request body that passed the shape checks.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub source: TemplateSource,
    pub inputs: Vec<InputRecord>,
}

impl GenerationRequest {
    pub fn from_body(body: &[u8]) -> Result<Self, GenerateError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(GenerateError::bad_request(BODY_REQUIRED));
        }
        let value: Value =
            serde_json::from_slice(body).map_err(|_| GenerateError::bad_request(BODY_REQUIRED))?;
        let Value::Object(mut root) = value else {
            return Err(GenerateError::bad_request(BODY_REQUIRED));
        };

        let template = take_present(&mut root, "template");
        let template_url = take_present(&mut root, "template_url");
        let source = match (template, template_url) {
            (Some(_), Some(_)) => {
                return Err(GenerateError::bad_request(
                    "Provide either template or template_url, not both",
                ))
            }
            (None, None) => {
                return Err(GenerateError::bad_request(
                    "template or template_url is required",
                ))
            }
            (Some(template), None) => TemplateSource::Inline(template),
            (None, Some(url)) => TemplateSource::Remote(parse_template_url(url)?),
        };

        let inputs = take_present(&mut root, "inputs")
            .ok_or_else(|| GenerateError::bad_request("inputs are required"))?;

        Ok(Self {
            source,
            inputs: parse_inputs(inputs)?,
        })
    }
}

/// Remove `key`, treating JSON `null` as absent.
fn take_present(root: &mut Map<String, Value>, key: &str) -> Option<Value> {
    root.remove(key).filter(|v| !v.is_null())
}

fn parse_template_url(value: Value) -> Result<String, GenerateError> {
    let Value::String(raw) = value else {
        return Err(GenerateError::bad_request("template_url must be a string"));
    };
    let url = reqwest::Url::parse(&raw)
        .map_err(|_| GenerateError::bad_request(format!("template_url is not a valid URL: {}", raw)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(GenerateError::bad_request(
            "template_url must use http or https",
        ));
    }
    // The key is derived from the URL exactly as sent.
    Ok(raw)
}

fn parse_inputs(value: Value) -> Result<Vec<InputRecord>, GenerateError> {
    match value {
        Value::Object(record) => Ok(vec![to_record(record)]),
        Value::Array(items) if items.is_empty() => {
            Err(GenerateError::bad_request("inputs must contain at least one record"))
        }
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(record) => Ok(to_record(record)),
                _ => Err(GenerateError::bad_request(format!(
                    "inputs[{}] must be an object",
                    i
                ))),
            })
            .collect(),
        _ => Err(GenerateError::bad_request(
            "inputs must be an object or an array of objects",
        )),
    }
}

fn to_record(record: Map<String, Value>) -> InputRecord {
    record
        .into_iter()
        .map(|(name, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (name, text)
        })
        .collect()
}
