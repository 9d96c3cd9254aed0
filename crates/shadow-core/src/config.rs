//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge compiled defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_RETRIEVAL__TOP_K`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> { Self::load_from(Path::new(".")) }

    /// Load with config files looked up in `base_dir`.
    pub fn load_from(base_dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(base_dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(base_dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base_dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base_dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        tracing::debug!(env = %env_name, base = %base_dir.display(), "configuration sources merged");

        Ok(Self { figment, base_dir: base_dir.to_path_buf() })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed settings, validated, with data paths resolved against the base directory.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        settings.data.manual_path = resolve_with_base(&self.base_dir, settings.data.manual_path.to_string_lossy());
        settings.data.framework_path = resolve_with_base(&self.base_dir, settings.data.framework_path.to_string_lossy());
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingSettings,
    pub classifier: ClassifierSettings,
    pub retrieval: RetrievalSettings,
    pub response: ResponseSettings,
    pub engine: EngineSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be > 0".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be > 0".into()));
        }
        if self.engine.embed_batch_size == 0 {
            return Err(Error::InvalidConfig("engine.embed_batch_size must be > 0".into()));
        }
        for (key, value) in [
            ("retrieval.threshold", self.retrieval.threshold),
            ("response.assembly_threshold", self.response.assembly_threshold),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!("{key} must be within [-1, 1], got {value}")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub manual_path: PathBuf,
    pub framework_path: PathBuf,
    pub manual_name: String,
    pub framework_name: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            manual_path: PathBuf::from("data/Secret_Info_Manual.txt"),
            framework_path: PathBuf::from("data/Response_Framework.txt"),
            manual_name: "Secret Info Manual".to_string(),
            framework_name: "Response Framework".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Upper bound on chunk text, in characters.
    pub chunk_size: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self { Self { chunk_size: 1000 } }
}

/// Header keyword patterns, checked level 3 first. Entries are regex fragments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub level3_keywords: Vec<String>,
    pub level2_keywords: Vec<String>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect();
        Self {
            level3_keywords: owned(&[
                "classified", "black site", "termination", "omega", "eclipse", "shadow", "void",
                "requiem", "protocol zeta", "level [7-9]", "level-[7-9]",
            ]),
            level2_keywords: owned(&[
                "covert", "safehouse", "counter-surveillance", "protocol", "verification",
                "level [2-6]", "level-[2-6]",
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub threshold: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self { Self { top_k: 5, threshold: 0.2 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseSettings {
    /// Minimum score for a chunk to be quoted in a standard answer.
    pub assembly_threshold: f32,
    /// Report a low-confidence standard answer as `no_results` instead of `success`.
    pub low_confidence_as_no_results: bool,
}

impl Default for ResponseSettings {
    fn default() -> Self { Self { assembly_threshold: 0.35, low_confidence_as_no_results: false } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub init_cooldown_secs: u64,
    pub embed_batch_size: usize,
    pub show_progress: bool,
}

impl Default for EngineSettings {
    fn default() -> Self { Self { init_cooldown_secs: 300, embed_batch_size: 16, show_progress: false } }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
