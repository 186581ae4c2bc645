//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! into a typed [`Settings`]. Only the binary loads configuration; every
//! component receives the values it needs at construction time.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the persisted chunk store and both indexes.
    pub storage_dir: PathBuf,
    /// Default location of source documents for `ingest`.
    pub data_dir: PathBuf,
    /// Candidates returned by hybrid retrieval.
    pub top_k_retrieval: usize,
    /// Passages kept after re-ranking and handed to the generator.
    pub top_k_context: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub generator: Option<GeneratorSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("data/storage"),
            data_dir: PathBuf::from("data/uploads"),
            top_k_retrieval: DEFAULT_TOP_K,
            top_k_context: DEFAULT_TOP_K,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            generator: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiFlavor {
    /// `{endpoint}/openai/deployments/{model}/chat/completions?api-version=...`
    #[default]
    Azure,
    /// `{endpoint}/chat/completions` with a bearer token.
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratorSettings {
    #[serde(default)]
    pub flavor: ApiFlavor,
    pub endpoint: String,
    pub api_key: String,
    /// Model name, or deployment name for Azure.
    pub model: String,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Settings {
    /// Load settings for the environment named by `RUST_ENV` (default `dev`).
    pub fn load() -> Result<Self> {
        Config::load()?.settings()
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k_retrieval == 0 || self.top_k_context == 0 {
            return Err(Error::InvalidConfig("top_k values must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be at least 1".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if let Some(g) = &self.generator {
            if g.endpoint.trim().is_empty() || g.model.trim().is_empty() {
                return Err(Error::InvalidConfig("generator endpoint and model are required".into()));
            }
            if g.flavor == ApiFlavor::Azure && g.api_version.is_none() {
                return Err(Error::InvalidConfig("azure generator requires api_version".into()));
            }
        }
        Ok(())
    }

    /// Expand `~`/`$VAR` in the configured directories and anchor relative
    /// ones at `base`.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        self.storage_dir = resolve_with_base(base, self.storage_dir.to_string_lossy());
        self.data_dir = resolve_with_base(base, self.data_dir.to_string_lossy());
        self
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Ok(Self::for_env(&env_name))
    }

    pub fn for_env(env_name: &str) -> Self {
        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Self { figment }
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        assert_eq!(s.top_k_retrieval, 10);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let s = Settings { chunk_size: 50, chunk_overlap: 50, ..Settings::default() };
        assert!(matches!(s.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn figment_overrides_defaults() {
        let figment = Figment::new()
            .merge(Toml::string("top_k_retrieval = 4\nstorage_dir = \"/var/lib/docqa\""));
        let settings = Config::from_figment(figment).settings().expect("settings");
        assert_eq!(settings.top_k_retrieval, 4);
        assert_eq!(settings.top_k_context, DEFAULT_TOP_K);
        assert_eq!(settings.storage_dir, PathBuf::from("/var/lib/docqa"));
    }

    #[test]
    fn azure_generator_needs_api_version() {
        let figment = Figment::new().merge(Toml::string(
            "[generator]\nendpoint = \"https://x.openai.azure.com\"\napi_key = \"k\"\nmodel = \"gpt\"",
        ));
        assert!(Config::from_figment(figment).settings().is_err());
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let s = Settings::default().resolve_paths(Path::new("/srv/app"));
        assert_eq!(s.storage_dir, PathBuf::from("/srv/app/data/storage"));
    }
}
