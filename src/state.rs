use std::path::Path;
use std::sync::Arc;

use crate::auth::{AuthGate, CredentialSet};
use crate::cache::{CacheStore, MemoryCacheStore, RedisCacheStore};
use crate::config::AppConfig;
use crate::fetch::HttpFetcher;
use crate::generate::GenerationPipeline;
use crate::render::{FontMap, PluginRegistry, RenderResources, TypstRenderEngine};
use crate::template::TemplateResolver;

/// Shared application state handed to every worker.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<GenerationPipeline>,
}

impl AppState {
    pub fn new(pipeline: GenerationPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Wire the production components from configuration.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let auth = AuthGate::new(CredentialSet::new(&config.api_keys));

        let cache: Arc<dyn CacheStore> = match &config.redis_url {
            Some(url) => {
                log::info!("Template cache: Redis");
                Arc::new(RedisCacheStore::from_url(url)?)
            }
            None => {
                log::info!("Template cache: in-memory (REDIS_URL not set)");
                Arc::new(MemoryCacheStore::default())
            }
        };

        let client = HttpFetcher::build_client(config.fetch_timeout)?;
        let resolver = TemplateResolver::new(cache, Arc::new(HttpFetcher::new(client)))
            .with_cache_ttl(config.cache_ttl)
            .with_cache_timeout(config.cache_timeout);

        let fonts = FontMap::load(Path::new(&config.font_dir));
        if fonts.fallback().is_none() {
            log::warn!("Fallback font missing from {}; Typst defaults will be used", config.font_dir);
        }
        let resources = RenderResources::new(
            fonts,
            PluginRegistry::builtin(),
            config.document_title.clone(),
        );
        let renderer = Arc::new(TypstRenderEngine::new(config.typst_bin.clone()));

        Ok(Self::new(GenerationPipeline::new(
            auth, resolver, renderer, resources,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_from_config_with_in_memory_cache() {
        let fonts = tempdir().unwrap();
        let config = AppConfig {
            font_dir: fonts.path().display().to_string(),
            ..AppConfig::default()
        };

        assert!(AppState::from_config(&config).is_ok());
    }

    #[test]
    fn test_from_config_with_redis_does_not_connect_eagerly() {
        let config = AppConfig {
            redis_url: Some("redis://127.0.0.1:1".to_string()),
            ..AppConfig::default()
        };

        assert!(AppState::from_config(&config).is_ok());
    }

    #[test]
    fn test_from_config_rejects_malformed_redis_url() {
        let config = AppConfig {
            redis_url: Some("not a redis url".to_string()),
            ..AppConfig::default()
        };

        assert!(AppState::from_config(&config).is_err());
    }
}
