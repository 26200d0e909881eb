// reviewer-core/src/config.rs

//! Project configuration: `Reviewer.toml` merged over environment-driven and
//! built-in defaults.
//!
//! Precedence, highest first: the config file, environment variables, then
//! the built-in defaults below. The resolved [`ProjectConfig`] is loaded once
//! at start-up and shared read-only for the life of the process.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const CONFIG_FILENAME: &str = "Reviewer.toml";

const DEFAULT_TEST_COMMAND: &str = "npm test";
const DEFAULT_COVERAGE_COMMAND: &str = "npm run test:coverage";
const DEFAULT_LINT_COMMAND: &str = "npm run lint";
const DEFAULT_OPENAI_MODEL: &str = "o1-preview";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama2";
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;
const DEFAULT_MEMORY_FILE: &str = ".reviewer/memory.json";
const DEFAULT_SAFE_VOLUME: u8 = 70;
const DEFAULT_VOLUME_INCREMENT: u8 = 20;

/// Which hosted or local model backend answers prompt tools.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Ollama,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(anyhow!("Unknown AI provider: {}", other)),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => f.write_str("openai"),
            ProviderKind::Ollama => f.write_str("ollama"),
        }
    }
}

/// A playlist a mood resolves to.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PlaylistEntry {
    /// Spotify URI (`spotify:playlist:...`).
    pub uri: String,
    /// Human-readable playlist name.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicConfig {
    /// Configured playlists; merged over the built-in catalog by mood name.
    pub playlists: HashMap<String, PlaylistEntry>,
    /// Mood played by a bare `play` request.
    pub default_mood: Option<String>,
    /// Volume at or below which no confirmation step is needed.
    pub safe_volume: u8,
    /// Largest single volume increase allowed.
    pub volume_increment: u8,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub test_command: String,
    pub coverage_command: String,
    pub lint_command: String,
    pub ai_provider: ProviderKind,
    pub openai_model: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub command_timeout_secs: u64,
    pub memory_file: PathBuf,
    /// Extra environment for test, coverage and lint commands.
    pub command_env: HashMap<String, String>,
    pub music: MusicConfig,
}

// --- On-disk shape: everything optional ---

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    test_command: Option<String>,
    coverage_command: Option<String>,
    lint_command: Option<String>,
    ai_provider: Option<ProviderKind>,
    openai_model: Option<String>,
    ollama_base_url: Option<String>,
    ollama_model: Option<String>,
    command_timeout_secs: Option<u64>,
    memory_file: Option<PathBuf>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    music: MusicConfigFile,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct MusicConfigFile {
    #[serde(default)]
    playlists: HashMap<String, PlaylistEntry>,
    default_mood: Option<String>,
    safe_volume: Option<u8>,
    volume_increment: Option<u8>,
}

/// Looks up an environment variable; injectable so tests never touch the
/// real process environment.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: FromStr>(env: EnvLookup<'_>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(variable = key, value = %raw, "Ignoring unparsable environment variable");
            None
        }
    }
}

impl ProjectConfig {
    /// Built-in defaults with environment overrides applied.
    pub fn defaults(env: EnvLookup<'_>) -> Self {
        Self::resolve(ConfigFile::default(), env)
    }

    fn resolve(file: ConfigFile, env: EnvLookup<'_>) -> Self {
        let ai_provider = file
            .ai_provider
            .or_else(|| env_parsed::<ProviderKind>(env, "AI_PROVIDER"))
            .unwrap_or(ProviderKind::OpenAi);

        ProjectConfig {
            test_command: file
                .test_command
                .unwrap_or_else(|| DEFAULT_TEST_COMMAND.to_string()),
            coverage_command: file
                .coverage_command
                .unwrap_or_else(|| DEFAULT_COVERAGE_COMMAND.to_string()),
            lint_command: file
                .lint_command
                .unwrap_or_else(|| DEFAULT_LINT_COMMAND.to_string()),
            ai_provider,
            openai_model: file
                .openai_model
                .or_else(|| env("OPENAI_MODEL"))
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            ollama_base_url: file
                .ollama_base_url
                .or_else(|| env("OLLAMA_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
            ollama_model: file
                .ollama_model
                .or_else(|| env("OLLAMA_MODEL"))
                .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            command_timeout_secs: file
                .command_timeout_secs
                .or_else(|| env_parsed(env, "REVIEWER_COMMAND_TIMEOUT_SECS"))
                .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
            memory_file: file
                .memory_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MEMORY_FILE)),
            command_env: file.env,
            music: MusicConfig {
                playlists: file.music.playlists,
                default_mood: file.music.default_mood,
                safe_volume: file
                    .music
                    .safe_volume
                    .or_else(|| env_parsed(env, "MUSIC_SAFE_VOLUME"))
                    .unwrap_or(DEFAULT_SAFE_VOLUME),
                volume_increment: file
                    .music
                    .volume_increment
                    .or_else(|| env_parsed(env, "MUSIC_VOLUME_INCREMENT"))
                    .unwrap_or(DEFAULT_VOLUME_INCREMENT),
            },
        }
    }

    /// Parses TOML content and merges it over the defaults.
    pub fn from_toml_str(content: &str, env: EnvLookup<'_>) -> Result<Self> {
        let file: ConfigFile = match toml::from_str(content) {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse TOML content");
                return Err(anyhow!(e))
                    .context("Failed to parse configuration TOML content. Check TOML syntax.");
            }
        };
        let config = Self::resolve(file, env);
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration for a server rooted at `working_dir`.
    ///
    /// An explicit `path` must exist. Without one, `Reviewer.toml` in
    /// `working_dir` is used when present and defaults otherwise.
    pub fn load(path: Option<&Path>, working_dir: &Path) -> Result<Self> {
        Self::load_with_env(path, working_dir, &process_env)
    }

    pub fn load_with_env(path: Option<&Path>, working_dir: &Path, env: EnvLookup<'_>) -> Result<Self> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Some(working_dir.join(CONFIG_FILENAME)).filter(|p| p.is_file()),
        };

        let config = match candidate {
            Some(config_path) => {
                let content = std::fs::read_to_string(&config_path).with_context(|| {
                    format!("Failed to read project config file: {:?}", config_path)
                })?;
                let config = Self::from_toml_str(&content, env).with_context(|| {
                    format!("Invalid configuration in {:?}", config_path)
                })?;
                info!("Loaded configuration from {:?}", config_path);
                config
            }
            None => {
                debug!("No {} in {:?}; using defaults", CONFIG_FILENAME, working_dir);
                let config = Self::defaults(env);
                config.validate()?;
                config
            }
        };
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("test_command", &self.test_command),
            ("coverage_command", &self.coverage_command),
            ("lint_command", &self.lint_command),
            ("openai_model", &self.openai_model),
            ("ollama_model", &self.ollama_model),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("'{}' in config is empty.", key));
            }
        }
        Url::parse(&self.ollama_base_url).with_context(|| {
            format!("Invalid URL format for ollama_base_url ('{}').", self.ollama_base_url)
        })?;
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("'command_timeout_secs' must be greater than zero."));
        }
        if self.music.safe_volume > 100 {
            return Err(anyhow!(
                "'music.safe_volume' must be between 0 and 100 (got {}).",
                self.music.safe_volume
            ));
        }
        if self.music.volume_increment > 100 {
            return Err(anyhow!(
                "'music.volume_increment' must be between 0 and 100 (got {}).",
                self.music.volume_increment
            ));
        }
        for (mood, entry) in &self.music.playlists {
            if entry.uri.trim().is_empty() {
                return Err(anyhow!("Playlist for mood '{}' has an empty 'uri'.", mood));
            }
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = ProjectConfig::defaults(&no_env);
        assert_eq!(config.test_command, "npm test");
        assert_eq!(config.coverage_command, "npm run test:coverage");
        assert_eq!(config.lint_command, "npm run lint");
        assert_eq!(config.ai_provider, ProviderKind::OpenAi);
        assert_eq!(config.openai_model, "o1-preview");
        assert_eq!(config.ollama_base_url, "http://localhost:11434");
        assert_eq!(config.music.safe_volume, 70);
        assert_eq!(config.music.volume_increment, 20);
        assert!(config.music.playlists.is_empty());
        assert!(config.music.default_mood.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let content = r#"
            test_command = "cargo test"
            lint_command = "cargo clippy"
            ai_provider = "ollama"
            ollama_model = "llama3"

            [music]
            safe_volume = 60
            default_mood = "coding"

            [music.playlists.coding]
            uri = "spotify:playlist:abc"
            name = "Coding Mode"
        "#;
        let config = ProjectConfig::from_toml_str(content, &no_env).unwrap();
        assert_eq!(config.test_command, "cargo test");
        assert_eq!(config.lint_command, "cargo clippy");
        assert_eq!(config.coverage_command, "npm run test:coverage");
        assert_eq!(config.ai_provider, ProviderKind::Ollama);
        assert_eq!(config.ollama_model, "llama3");
        assert_eq!(config.music.safe_volume, 60);
        assert_eq!(config.music.volume_increment, 20);
        assert_eq!(config.music.playlists["coding"].name, "Coding Mode");
        assert_eq!(config.music.default_mood.as_deref(), Some("coding"));
    }

    #[test]
    fn test_env_sits_between_file_and_builtin() {
        let env = |key: &str| match key {
            "OPENAI_MODEL" => Some("o3-mini".to_string()),
            "AI_PROVIDER" => Some("ollama".to_string()),
            "MUSIC_SAFE_VOLUME" => Some("55".to_string()),
            "MUSIC_VOLUME_INCREMENT" => Some("loud".to_string()),
            _ => None,
        };
        let config = ProjectConfig::defaults(&env);
        assert_eq!(config.openai_model, "o3-mini");
        assert_eq!(config.ai_provider, ProviderKind::Ollama);
        assert_eq!(config.music.safe_volume, 55);
        // Unparsable value falls back to the built-in default.
        assert_eq!(config.music.volume_increment, 20);

        let config = ProjectConfig::from_toml_str("openai_model = \"gpt-4\"", &env).unwrap();
        assert_eq!(config.openai_model, "gpt-4");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ProjectConfig::from_toml_str("lint_command = \"  \"", &no_env).unwrap_err();
        assert!(err.to_string().contains("'lint_command' in config is empty"), "{}", err);

        let err = ProjectConfig::from_toml_str("[music]\nsafe_volume = 150", &no_env).unwrap_err();
        assert!(err.to_string().contains("safe_volume"), "{}", err);

        let err = ProjectConfig::from_toml_str("ollama_base_url = \"not a url\"", &no_env).unwrap_err();
        assert!(err.to_string().contains("ollama_base_url"), "{}", err);

        let err = ProjectConfig::from_toml_str("ai_provider = \"gemini\"", &no_env);
        assert!(err.is_err());

        let err = ProjectConfig::from_toml_str("tset_command = \"typo\"", &no_env);
        assert!(err.is_err());

        let err = ProjectConfig::from_toml_str("[music]\nsafe_volum = 50", &no_env).unwrap_err();
        assert!(format!("{:#}", err).contains("safe_volum"), "{:#}", err);

        let playlist_typo = "[music.playlists.coding]\nuri = \"spotify:playlist:x\"\nname = \"Coding\"\ngenre = \"synthwave\"";
        assert!(ProjectConfig::from_toml_str(playlist_typo, &no_env).is_err());
    }

    #[test]
    fn test_env_table_reaches_commands() {
        let config = ProjectConfig::from_toml_str("[env]\nCI = \"true\"\nNODE_ENV = \"test\"", &no_env).unwrap();
        assert_eq!(config.command_env.len(), 2);
        assert_eq!(config.command_env["NODE_ENV"], "test");
        assert!(ProjectConfig::defaults(&no_env).command_env.is_empty());
    }

    #[test]
    fn test_load_from_working_dir() {
        let dir = tempdir().unwrap();
        let config = ProjectConfig::load_with_env(None, dir.path(), &no_env).unwrap();
        assert_eq!(config, ProjectConfig::defaults(&no_env));

        std::fs::write(dir.path().join(CONFIG_FILENAME), "test_command = \"make test\"\n").unwrap();
        let config = ProjectConfig::load_with_env(None, dir.path(), &no_env).unwrap();
        assert_eq!(config.test_command, "make test");
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = ProjectConfig::load_with_env(Some(missing.as_path()), dir.path(), &no_env).unwrap_err();
        assert!(err.to_string().contains("Failed to read project config file"));
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" ollama ".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert!("gemini".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::Ollama.to_string(), "ollama");
    }
}
