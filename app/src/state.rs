//! Application state and wiring.

use anyhow::{Context, Result};
use lookout_browser::{BrowserContext, BrowserEngine, HumanTiming};
use lookout_core::{AppConfig, Credentials, Platform};
use lookout_db::Database;
use lookout_intent::IntentAnalyzer;
use lookout_scanner::{
    AggregateResult, DefinitionAdapter, PlatformLoader, PlatformRegistry, ScanOrchestrator,
    SiteAdapter,
};
use lookout_scheduler::RunScheduler;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Everything a command needs, shared between the scheduler and manual scans.
pub struct AppState {
    pub config: AppConfig,
    pub registry: PlatformRegistry,
    pub database: Database,
    pub scheduler: RunScheduler,
    pub timing: Arc<HumanTiming>,

    /// Launched on the first scan, relaunched if the connection drops.
    browser_engine: Mutex<Option<BrowserEngine>>,
}

impl AppState {
    /// Load platform definitions and open the database.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let loader = match &config.scanning.definitions_dir {
            Some(dir) => PlatformLoader::new(dir.clone()),
            None => PlatformLoader::with_default_dir(),
        }
        .context("locating platform definitions")?;
        let registry = PlatformRegistry::load_from(&loader)?;
        info!(
            count = registry.len(),
            dir = %loader.dir().display(),
            "Platform definitions loaded"
        );

        let db_path = config.database_path()?;
        let database = Database::open(&db_path)
            .await
            .with_context(|| format!("opening database at {}", db_path.display()))?;

        Ok(Self {
            timing: Arc::new(HumanTiming::new(config.timing.clone())),
            config,
            registry,
            database,
            scheduler: RunScheduler::new(),
            browser_engine: Mutex::new(None),
        })
    }

    /// Orchestrator over `platforms`, or the configured platform order when empty.
    pub fn orchestrator(&self, platforms: &[Platform]) -> Result<ScanOrchestrator> {
        let selected = if platforms.is_empty() {
            self.config.scanning.platforms.as_slice()
        } else {
            platforms
        };
        let adapters = build_adapters(
            &self.registry,
            &self.config,
            selected,
            &self.timing,
            Credentials::from_env,
        );
        if adapters.is_empty() {
            anyhow::bail!("no platform definitions available for {selected:?}");
        }

        let pipeline = IntentAnalyzer::from_config(&self.config.llm)
            .context("configuring intent analysis")?;

        Ok(ScanOrchestrator::new(
            adapters,
            Arc::new(pipeline),
            Arc::new(self.database.clone()),
            Arc::clone(&self.timing),
        )
        .with_halt_on_rate_limit(self.config.scanning.halt_on_rate_limit)
        .with_max_items_per_platform(self.config.scanning.max_items_per_platform))
    }

    /// Run one scan and record it in the run history.
    pub async fn scan_once(&self, platforms: &[Platform]) -> Result<AggregateResult> {
        let orchestrator = self.orchestrator(platforms)?;

        let mut engine = self.browser_engine.lock().await;
        if engine.as_ref().map_or(true, |e| !e.is_available()) {
            if let Some(stale) = engine.take() {
                warn!("Browser connection lost, relaunching");
                stale.shutdown().await;
            }
            let launched = BrowserEngine::launch(&self.config.browser)
                .await
                .context("launching browser")?;
            *engine = Some(launched);
        }
        let Some(context) = engine.as_ref() else {
            anyhow::bail!("browser engine missing after launch");
        };

        let result = match orchestrator.run(context).await {
            Ok(result) => result,
            Err(e) => {
                if let Some(dead) = engine.take() {
                    dead.shutdown().await;
                }
                return Err(e).context("scan run aborted");
            }
        };
        drop(engine);

        if let Err(e) = self.database.record_run(&result).await {
            warn!(run_id = %result.run_id, error = %e, "Failed to record scan run");
        }

        info!(
            run_id = %result.run_id,
            status = result.status().as_str(),
            total_posts = result.total_posts,
            "Scan run finished"
        );
        Ok(result)
    }

    /// Close the browser, if one was launched, and the database.
    pub async fn shutdown(&self) {
        if let Some(engine) = self.browser_engine.lock().await.take() {
            engine.shutdown().await;
        }
        self.database.pool().close().await;
    }
}

/// One adapter per selected platform that has a loaded definition.
///
/// A platform without credentials still gets an adapter; its login then
/// fails as `credentials_rejected` and shows up in the run result.
pub fn build_adapters<F>(
    registry: &PlatformRegistry,
    config: &AppConfig,
    platforms: &[Platform],
    timing: &Arc<HumanTiming>,
    credentials: F,
) -> Vec<Arc<dyn SiteAdapter>>
where
    F: Fn(Platform) -> Option<Credentials>,
{
    platforms
        .iter()
        .filter_map(|&platform| {
            let definition = match registry.get(platform) {
                Ok(definition) => definition,
                Err(e) => {
                    warn!(%platform, error = %e, "Skipping platform");
                    return None;
                }
            };

            let creds = credentials(platform);
            if creds.is_none() {
                warn!(
                    %platform,
                    "No credentials set ({}_USERNAME / {}_PASSWORD)",
                    platform.env_prefix(),
                    platform.env_prefix()
                );
            }

            let adapter =
                DefinitionAdapter::new(definition, creds, config, Arc::clone(timing));
            Some(Arc::new(adapter) as Arc<dyn SiteAdapter>)
        })
        .collect()
}
