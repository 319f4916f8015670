use super::error::{LlmError, Result};
use super::{GenerateOptions, LlmGateway, ResponseMetadata, StructuredResponse};
use crate::utils::{sha256_hex, write_atomic};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Map<String, Value>,
    #[serde(default)]
    pub raw_text: String,
}

/// Content-addressed model responses, persisted as one JSON map.
pub struct ResponseCache {
    path: PathBuf,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    /// Loads whatever is on disk. A missing or unreadable file starts an empty cache.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Failed to load LLM cache from {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        debug!("Opened LLM cache {} with {} entries", path.display(), entries.len());
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `sha256("{prompt}:{model}:{temperature}")`, absent values rendered as `None`.
    pub fn cache_key(prompt: &str, model: Option<&str>, temperature: Option<f64>) -> String {
        let model = model.unwrap_or("None");
        let temperature = temperature
            .map(|t| format!("{:?}", t))
            .unwrap_or_else(|| "None".to_string());
        sha256_hex(&format!("{}:{}:{}", prompt, model, temperature))
    }

    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    /// Insert and rewrite the file. The write lock is held through the rename so
    /// concurrent writers never interleave.
    pub async fn put(&self, key: String, entry: CacheEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key, entry);
        let bytes = serde_json::to_vec_pretty(&*entries).map_err(|e| LlmError::Cache(e.to_string()))?;
        write_atomic(&self.path, &bytes).map_err(|e| LlmError::Cache(format!("{}: {}", self.path.display(), e)))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// One shared cache per file path, owned by whoever builds the gateways.
#[derive(Default)]
pub struct CacheRegistry {
    caches: Mutex<HashMap<PathBuf, Arc<ResponseCache>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_open(&self, path: impl AsRef<Path>) -> Arc<ResponseCache> {
        let path = path.as_ref().to_path_buf();
        let mut caches = self.caches.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        caches
            .entry(path.clone())
            .or_insert_with(|| Arc::new(ResponseCache::open(&path)))
            .clone()
    }
}

/// Serves repeated prompts from the cache without touching the inner gateway.
pub struct CachingGateway {
    inner: Arc<dyn LlmGateway>,
    cache: Arc<ResponseCache>,
}

impl CachingGateway {
    pub fn new(inner: Arc<dyn LlmGateway>, cache: Arc<ResponseCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl LlmGateway for CachingGateway {
    fn gateway_name(&self) -> String {
        format!("cached({})", self.inner.gateway_name())
    }

    async fn generate_structured(&self, prompt: &str, options: &GenerateOptions) -> Result<StructuredResponse> {
        let key = ResponseCache::cache_key(prompt, options.model.as_deref(), options.temperature);

        if let Some(entry) = self.cache.get(&key).await {
            info!("Retrieved LLM result from cache");
            return Ok(StructuredResponse {
                data: entry.data,
                raw_text: entry.raw_text,
                metadata: ResponseMetadata {
                    provider: self.inner.gateway_name(),
                    cached: true,
                    ..Default::default()
                },
            });
        }

        debug!("LLM cache miss");
        let mut response = self.inner.generate_structured(prompt, options).await?;
        let entry = CacheEntry {
            data: response.data.clone(),
            raw_text: response.raw_text.clone(),
        };
        if let Err(e) = self.cache.put(key, entry).await {
            warn!("Failed to save LLM cache: {}", e);
        }
        response.metadata.cached = false;
        Ok(response)
    }
}
