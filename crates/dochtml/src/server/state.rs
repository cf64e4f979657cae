//! Shared application state for the HTTP server

use std::sync::Arc;

use crate::backends::Toolset;
use crate::config::AppConfig;
use crate::conversion::{HtmlConverter, TextExtractor};
use crate::error::Result;
use crate::output::AssetStore;
use crate::processing::JobOrchestrator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: AppConfig,
    /// External tool backends
    tools: Toolset,
    /// Job registry and workers
    orchestrator: Arc<JobOrchestrator>,
}

impl AppState {
    /// Detect the installed tools and prepare the storage roots
    pub fn new(config: AppConfig) -> Result<Self> {
        tracing::info!("Initializing conversion service state...");
        let tools = Toolset::detect(&config.tools);
        Self::with_tools(config, tools)
    }

    /// State over an explicit toolset
    pub fn with_tools(config: AppConfig, tools: Toolset) -> Result<Self> {
        std::fs::create_dir_all(&config.storage.upload_root)?;
        std::fs::create_dir_all(&config.storage.output_root)?;
        tracing::info!(
            "Storage: uploads in {}, outputs in {}",
            config.storage.upload_root.display(),
            config.storage.output_root.display()
        );

        let orchestrator = Arc::new(JobOrchestrator::new(
            HtmlConverter::new(tools.clone()),
            AssetStore::from_config(&config.storage),
        ));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                tools,
                orchestrator,
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn orchestrator(&self) -> &Arc<JobOrchestrator> {
        &self.inner.orchestrator
    }

    pub fn store(&self) -> &AssetStore {
        self.inner.orchestrator.store()
    }

    pub fn text_extractor(&self) -> TextExtractor {
        TextExtractor::new(self.inner.tools.clone())
    }
}
