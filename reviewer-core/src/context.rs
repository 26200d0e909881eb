// reviewer-core/src/context.rs

//! Process-lifetime state shared by every tool call.

use crate::config::ProjectConfig;
use crate::errors::ToolError;
use crate::exec::{ExecutionOutcome, ProcessRunner, RunOptions, ShellRunner};
use crate::memory::MemoryStore;
use crate::playlists::PlaylistCatalog;
use crate::providers::{create_provider, ChatProvider};
use crate::safety::{MediaTimings, VolumePolicy};
use anyhow::{anyhow, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Operating system the automation scripts target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Other
        }
    }

    pub fn is_macos(&self) -> bool {
        *self == Platform::MacOs
    }
}

pub struct ToolContext {
    pub config: Arc<ProjectConfig>,
    pub runner: Arc<dyn ProcessRunner>,
    pub platform: Platform,
    pub working_dir: PathBuf,
    pub timings: MediaTimings,
    pub catalog: PlaylistCatalog,
    pub memory: MemoryStore,
    api_key: Option<String>,
    provider: OnceCell<Arc<dyn ChatProvider>>,
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("platform", &self.platform)
            .field("working_dir", &self.working_dir)
            .field("provider_ready", &self.provider.initialized())
            .finish_non_exhaustive()
    }
}

impl ToolContext {
    /// Context with an in-memory store, default timings and no API key.
    pub fn new(config: ProjectConfig, working_dir: impl Into<PathBuf>, runner: Arc<dyn ProcessRunner>) -> Self {
        let catalog = PlaylistCatalog::with_overrides(&config.music.playlists);
        Self {
            config: Arc::new(config),
            runner,
            platform: Platform::current(),
            working_dir: working_dir.into(),
            timings: MediaTimings::default(),
            catalog,
            memory: MemoryStore::in_memory(),
            api_key: None,
            provider: OnceCell::new(),
        }
    }

    /// Context for the running server: shell runner, persistent memory file
    /// and the API key from the environment.
    pub fn from_config(config: ProjectConfig, working_dir: &Path) -> Result<Self> {
        if let Some(mood) = &config.music.default_mood {
            let catalog = PlaylistCatalog::with_overrides(&config.music.playlists);
            catalog
                .resolve(mood)
                .map_err(|e| anyhow!("Invalid music.default_mood: {}", e))?;
        }
        let memory_path = resolve_path(working_dir, &config.memory_file);
        let memory = MemoryStore::open(memory_path)?;
        let api_key = std::env::var("OPENAI_API_KEY").ok();

        Ok(Self::new(config, working_dir, Arc::new(ShellRunner::new()))
            .with_memory(memory)
            .with_api_key(api_key))
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_timings(mut self, timings: MediaTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_memory(mut self, memory: MemoryStore) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Uses `provider` instead of building one from the configuration.
    pub fn with_provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.provider = OnceCell::new_with(Some(provider));
        self
    }

    pub fn volume_policy(&self) -> VolumePolicy {
        VolumePolicy::from(&self.config.music)
    }

    pub fn run_options(&self, cancel: CancellationToken) -> RunOptions {
        self.config
            .command_env
            .iter()
            .fold(RunOptions::new(&self.working_dir), |options, (key, value)| {
                options.with_env(key, value)
            })
            .with_timeout(self.config.command_timeout())
            .with_cancel(cancel)
    }

    pub async fn run(&self, command: &str, options: &RunOptions) -> ExecutionOutcome {
        self.runner.run(command, options).await
    }

    /// The configured provider, created on first use and reused afterwards.
    pub async fn provider(&self) -> Result<Arc<dyn ChatProvider>, ToolError> {
        let provider = self
            .provider
            .get_or_try_init(|| async {
                debug!(provider = %self.config.ai_provider, "Initialising language model provider");
                create_provider(&self.config, self.api_key.clone())
            })
            .await?;
        Ok(Arc::clone(provider))
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
