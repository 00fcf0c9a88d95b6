//! Per-request generation state machine.
//!
//! `Received -> AuthChecked -> InputValidated -> TemplateResolved -> Rendered -> Responded`.
//! Authentication and the input shape check happen before any I/O. The first
//! failure ends the request; nothing is retried.

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::{GenerateError, GenerationRequest};
use crate::auth::AuthGate;
use crate::metrics;
use crate::render::{DocumentRenderer, RenderResources};
use crate::template::TemplateResolver;

const DOCUMENT_FILENAME: &str = "generated.pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    AuthChecked,
    InputValidated,
    TemplateResolved,
    Rendered,
    Responded,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::AuthChecked => "auth_checked",
            Stage::InputValidated => "input_validated",
            Stage::TemplateResolved => "template_resolved",
            Stage::Rendered => "rendered",
            Stage::Responded => "responded",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful generation result.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl RenderedDocument {
    pub const CONTENT_TYPE: &'static str = "application/pdf";

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

/// Progress of one request, kept for failure logs.
struct Trace {
    request_id: Uuid,
    stage: Stage,
    source: String,
}

pub struct GenerationPipeline {
    auth: AuthGate,
    resolver: TemplateResolver,
    renderer: Arc<dyn DocumentRenderer>,
    resources: RenderResources,
}

impl GenerationPipeline {
    pub fn new(
        auth: AuthGate,
        resolver: TemplateResolver,
        renderer: Arc<dyn DocumentRenderer>,
        resources: RenderResources,
    ) -> Self {
        Self {
            auth,
            resolver,
            renderer,
            resources,
        }
    }

    /// Run one generation request from its credential and raw body.
    pub async fn run(
        &self,
        credential: Option<&str>,
        body: &[u8],
    ) -> Result<RenderedDocument, GenerateError> {
        let mut trace = Trace {
            request_id: Uuid::new_v4(),
            stage: Stage::Received,
            source: "unknown".to_string(),
        };

        let result = self.execute(credential, body, &mut trace).await;

        match &result {
            Ok(document) => {
                trace.stage = Stage::Responded;
                metrics::record_generation("ok");
                log::info!(
                    "[{}] {}: {} bytes from {}",
                    trace.request_id,
                    trace.stage,
                    document.bytes.len(),
                    trace.source
                );
            }
            Err(err) => {
                metrics::record_generation(err.kind());
                if err.is_client_error() {
                    log::warn!(
                        "[{}] {} at stage {} ({}): {}",
                        trace.request_id,
                        err.kind(),
                        trace.stage,
                        trace.source,
                        err
                    );
                } else {
                    log::error!(
                        "[{}] {} at stage {} ({}): {}",
                        trace.request_id,
                        err.kind(),
                        trace.stage,
                        trace.source,
                        err
                    );
                }
            }
        }

        result
    }

    async fn execute(
        &self,
        credential: Option<&str>,
        body: &[u8],
        trace: &mut Trace,
    ) -> Result<RenderedDocument, GenerateError> {
        self.auth.admit(credential)?;
        trace.stage = Stage::AuthChecked;

        let request = GenerationRequest::from_body(body)?;
        trace.stage = Stage::InputValidated;
        trace.source = request.source.describe();

        let template = self.resolver.resolve(request.source).await?;
        trace.stage = Stage::TemplateResolved;

        let bytes = self
            .renderer
            .render(&template, &request.inputs, &self.resources)
            .await?;
        trace.stage = Stage::Rendered;

        Ok(RenderedDocument {
            bytes,
            filename: DOCUMENT_FILENAME.to_string(),
        })
    }
}
