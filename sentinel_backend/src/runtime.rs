use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::SentinelConfig;
use crate::daemon::ReportingLoop;
use crate::llm::{build_backend, ModelBackend};
use crate::report::{ReportGenerator, RetryPolicy};
use crate::schedule::{Sleeper, TokioSleeper};
use crate::sources::{build_source, AlertSource};
use crate::storage::ReportStore;

/// Wires configuration into a ready-to-run [`ReportingLoop`].
///
/// Every configuration problem surfaces from [`build`](Self::build), before any cycle runs.
pub struct ReportingRuntimeBuilder {
    config: SentinelConfig,
    extra_sources: Vec<Box<dyn AlertSource>>,
    backend: Option<Box<dyn ModelBackend>>,
    sleeper: Arc<dyn Sleeper>,
    persist: bool,
}

impl ReportingRuntimeBuilder {
    pub fn new(config: SentinelConfig) -> Self {
        Self {
            config,
            extra_sources: Vec::new(),
            backend: None,
            sleeper: Arc::new(TokioSleeper),
            persist: true,
        }
    }

    pub fn with_source(mut self, source: Box<dyn AlertSource>) -> Self {
        self.extra_sources.push(source);
        self
    }

    /// Use this backend instead of the one described by `[llm]`
    pub fn with_backend(mut self, backend: Box<dyn ModelBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Whether cycles write their report into `reports_dir`
    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn build(self) -> Result<ReportingLoop> {
        let config = self.config;

        let mut sources = build_sources(&config)?;
        sources.extend(self.extra_sources);
        if sources.is_empty() {
            tracing::warn!("No alert sources configured; every cycle will report no alerts");
        }

        let backend = match self.backend {
            Some(backend) => backend,
            None => build_backend(&config.llm).context("Invalid [llm] configuration")?,
        };

        let policy =
            RetryPolicy::from_config(&config.retry).context("Invalid [retry] configuration")?;
        tracing::info!(
            "Retry policy: {} attempt(s), {:?} base delay, {} char minimum",
            policy.max_attempts,
            policy.base_delay,
            policy.min_response_chars
        );

        let generator = ReportGenerator::new(backend)
            .with_policy(policy)
            .with_sleeper(self.sleeper.clone());

        let mut reporting = ReportingLoop::new(sources, generator, config.report_kind)
            .with_interval(config.interval())
            .with_sleeper(self.sleeper)
            .with_custom_prompt(config.llm.custom_prompt.clone())
            .with_trending_limit(config.trending_limit);

        if self.persist {
            reporting = reporting.with_store(ReportStore::new(config.reports_dir.clone()));
        }

        Ok(reporting)
    }
}

pub fn bootstrap(config: SentinelConfig) -> Result<ReportingLoop> {
    ReportingRuntimeBuilder::new(config).build()
}

fn build_sources(config: &SentinelConfig) -> Result<Vec<Box<dyn AlertSource>>> {
    let mut sources = Vec::with_capacity(config.sources.len());
    for (index, source_config) in config.sources.iter().enumerate() {
        let source = build_source(source_config, config.report_kind)
            .with_context(|| format!("Invalid [[sources]] entry #{}", index + 1))?;
        tracing::info!(
            "Alert source enabled: {} (min_points={}, max_results={}, window_hours={:?})",
            source.name(),
            source_config.min_points_for(config.report_kind),
            source_config.max_results_for(config.report_kind),
            source_config.window_hours
        );
        sources.push(source);
    }
    tracing::info!("Loaded {} alert source(s)", sources.len());
    Ok(sources)
}
