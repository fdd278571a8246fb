use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

const PROJECT_CONFIG: &str = "minirag.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub cache: CacheConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub telegram: TelegramConfig,
    pub session: SessionConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("rag_index.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub docs_dir: PathBuf,
    pub extensions: Vec<String>,
    pub chunk_max_len: usize,
    /// Prefix the embedded text (not the stored chunk) with `[DOC: name]`.
    pub doc_header: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("docs"),
            extensions: vec!["txt".to_string(), "md".to_string()],
            chunk_max_len: 500,
            doc_header: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached query embeddings; `0` keeps every entry.
    pub capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Fastembed,
    Hash,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fastembed" | "onnx" => Ok(Self::Fastembed),
            "hash" | "offline" => Ok(Self::Hash),
            _ => Err(format!("Unknown embedding provider: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimension: usize,
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.2,
            max_tokens: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    #[serde(skip_serializing)]
    pub bot_token: Option<String>,
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            poll_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub history_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { history_turns: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub bind: SocketAddr,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 7860)),
        }
    }
}

impl Config {
    /// Global file, then the project file (or `explicit` in its place), then
    /// environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut merged = Self::read_table(&Self::global_path())?.unwrap_or_default();

        let project = match explicit {
            Some(path) => Some(
                Self::read_table(path)?.ok_or_else(|| {
                    RagError::Config(format!("config file not found: {}", path.display()))
                })?,
            ),
            None => Self::read_table(Path::new(PROJECT_CONFIG))?,
        };
        if let Some(project) = project {
            merge_tables(&mut merged, project);
        }

        let config: Self = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| RagError::Config(e.to_string()))?;
        let config = config.with_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| RagError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn global_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "minirag").map_or_else(
            || PathBuf::from("~/.config/minirag/config.toml"),
            |d| d.config_dir().join("config.toml"),
        )
    }

    fn read_table(path: &Path) -> Result<Option<toml::Table>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        content
            .parse::<toml::Table>()
            .map(Some)
            .map_err(|e| RagError::Config(format!("{}: {e}", path.display())))
    }

    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(path) = lookup("MINIRAG_DB_PATH") {
            self.storage.db_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("MINIRAG_DOCS_DIR") {
            self.index.docs_dir = PathBuf::from(dir);
        }
        if let Some(name) = lookup("MINIRAG_EMBEDDING_PROVIDER") {
            match name.parse() {
                Ok(provider) => self.embedding.provider = provider,
                Err(e) => tracing::warn!("ignoring MINIRAG_EMBEDDING_PROVIDER: {e}"),
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(RagError::Config("retrieval.top_k must be at least 1".into()));
        }
        if self.index.chunk_max_len == 0 {
            return Err(RagError::Config("index.chunk_max_len must be at least 1".into()));
        }
        if self.index.extensions.is_empty() {
            return Err(RagError::Config("index.extensions must not be empty".into()));
        }
        if self.embedding.dimension == 0 {
            return Err(RagError::Config("embedding.dimension must be at least 1".into()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(RagError::Config("llm.timeout_secs must be at least 1".into()));
        }
        Ok(())
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                } else {
                    base.insert(key, toml::Value::Table(incoming));
                }
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}
