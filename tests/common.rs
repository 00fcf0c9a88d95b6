#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pdf_template_server::auth::{AuthGate, CredentialSet};
use pdf_template_server::cache::{CacheError, CacheKey, CacheStore};
use pdf_template_server::fetch::{FetchError, FetchResponse, RemoteFetcher};
use pdf_template_server::generate::GenerationPipeline;
use pdf_template_server::render::{
    DocumentRenderer, FontMap, InputRecord, PluginRegistry, RenderError, RenderResources,
};
use pdf_template_server::template::{Template, TemplateResolver};

pub const API_KEY: &str = "test-key";
pub const FAKE_PDF: &[u8] = b"%PDF-1.7\n%fake\n";

pub fn valid_template() -> Value {
    json!({
        "basePdf": { "width": 210, "height": 297, "padding": [0, 0, 0, 0] },
        "schemas": [[{
            "name": "name",
            "type": "text",
            "position": { "x": 10, "y": 10 },
            "width": 100,
            "height": 10
        }]]
    })
}

/// Template that parses as JSON but fails validation.
pub fn invalid_template() -> Value {
    json!({ "schemas": "not-an-array" })
}

// ============================================================================
// Cache
// ============================================================================

#[derive(Clone, Copy, PartialEq)]
pub enum CacheMode {
    Normal,
    Failing,
    Hanging,
}

/// In-memory cache store that records every call.
pub struct FakeCache {
    entries: Mutex<HashMap<String, (Vec<u8>, Duration)>>,
    mode: Mutex<CacheMode>,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
}

impl FakeCache {
    pub fn new() -> Arc<Self> {
        Self::with_mode(CacheMode::Normal)
    }

    pub fn with_mode(mode: CacheMode) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            mode: Mutex::new(mode),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
        })
    }

    pub fn set_mode(&self, mode: CacheMode) {
        *self.mode.lock() = mode;
    }

    pub fn insert_raw(&self, url: &str, bytes: &[u8]) {
        self.entries.lock().insert(
            CacheKey::for_url(url).as_str().to_string(),
            (bytes.to_vec(), Duration::from_secs(3600)),
        );
    }

    pub fn stored(&self, url: &str) -> Option<(Vec<u8>, Duration)> {
        self.entries
            .lock()
            .get(CacheKey::for_url(url).as_str())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    async fn apply_mode(&self) -> Result<(), CacheError> {
        let mode = *self.mode.lock();
        match mode {
            CacheMode::Normal => Ok(()),
            CacheMode::Failing => Err(CacheError::Unavailable("connection refused".to_string())),
            CacheMode::Hanging => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl CacheStore for FakeCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.apply_mode().await?;
        Ok(self
            .entries
            .lock()
            .get(key.as_str())
            .map(|(bytes, _)| bytes.clone()))
    }

    async fn set(&self, key: &CacheKey, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.apply_mode().await?;
        self.entries
            .lock()
            .insert(key.as_str().to_string(), (value.to_vec(), ttl));
        Ok(())
    }
}

// ============================================================================
// Fetcher
// ============================================================================

#[derive(Clone)]
pub enum FetchReply {
    Body(u16, Vec<u8>),
    Transport(String),
}

/// Remote fetcher with a canned reply and a call counter.
pub struct FakeFetcher {
    reply: Mutex<FetchReply>,
    calls: AtomicUsize,
    pub urls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn replying(reply: FetchReply) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(reply),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn json(value: &Value) -> Arc<Self> {
        Self::replying(FetchReply::Body(200, value.to_string().into_bytes()))
    }

    pub fn status(status: u16) -> Arc<Self> {
        Self::replying(FetchReply::Body(status, b"not found".to_vec()))
    }

    pub fn transport(cause: &str) -> Arc<Self> {
        Self::replying(FetchReply::Transport(cause.to_string()))
    }

    pub fn set_reply(&self, reply: FetchReply) {
        *self.reply.lock() = reply;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteFetcher for FakeFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_string());
        let reply = self.reply.lock().clone();
        match reply {
            FetchReply::Body(status, body) => Ok(FetchResponse { status, body }),
            FetchReply::Transport(cause) => Err(FetchError {
                url: url.to_string(),
                cause,
            }),
        }
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Renderer that returns fixed bytes, or fails, and records what it was given.
pub struct FakeRenderer {
    fail: bool,
    calls: AtomicUsize,
    pub last_inputs: Mutex<Vec<InputRecord>>,
}

impl FakeRenderer {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: AtomicUsize::new(0),
            last_inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: AtomicUsize::new(0),
            last_inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentRenderer for FakeRenderer {
    async fn render(
        &self,
        _template: &Template,
        inputs: &[InputRecord],
        _resources: &RenderResources,
    ) -> Result<Vec<u8>, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_inputs.lock() = inputs.to_vec();
        if self.fail {
            return Err(RenderError::TypstExit {
                code: 1,
                stderr: "error: unknown font family".to_string(),
            });
        }
        Ok(FAKE_PDF.to_vec())
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub struct Harness {
    pub cache: Arc<FakeCache>,
    pub fetcher: Arc<FakeFetcher>,
    pub renderer: Arc<FakeRenderer>,
    pub pipeline: GenerationPipeline,
}

pub fn resolver(cache: Arc<FakeCache>, fetcher: Arc<FakeFetcher>) -> TemplateResolver {
    TemplateResolver::new(cache, fetcher).with_cache_timeout(Duration::from_millis(50))
}

/// Pipeline accepting [`API_KEY`], on fakes.
pub fn harness(fetcher: Arc<FakeFetcher>, renderer: Arc<FakeRenderer>) -> Harness {
    let cache = FakeCache::new();
    let pipeline = GenerationPipeline::new(
        AuthGate::new(CredentialSet::new([API_KEY])),
        resolver(cache.clone(), fetcher.clone()),
        renderer.clone(),
        RenderResources::new(FontMap::default(), PluginRegistry::builtin(), "pdfme"),
    );
    Harness {
        cache,
        fetcher,
        renderer,
        pipeline,
    }
}
