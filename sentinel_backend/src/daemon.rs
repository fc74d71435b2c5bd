//! The reporting loop: fetch → aggregate → generate → persist, then sleep.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;

use crate::aggregate;
use crate::config::ReportKind;
use crate::models::{AlertRecord, ReportDocument};
use crate::prompt;
use crate::report::ReportGenerator;
use crate::schedule::{Sleeper, StopSignal, TokioSleeper};
use crate::sources::AlertSource;
use crate::storage::ReportStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Between cycles
    Idle,
    /// A cycle is in progress
    Running,
}

/// What one cycle produced.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub document: ReportDocument,
    pub alert_count: usize,
    /// Sources whose fetch failed this cycle
    pub failed_sources: Vec<String>,
    /// False when the body is the degraded error line
    pub generated: bool,
    pub saved_to: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Success(CycleSummary),
    Failure(String),
}

pub struct ReportingLoop {
    sources: Vec<Box<dyn AlertSource>>,
    generator: ReportGenerator,
    kind: ReportKind,
    trending_limit: usize,
    custom_prompt: Option<String>,
    store: Option<ReportStore>,
    interval: Duration,
    sleeper: Arc<dyn Sleeper>,
    state: LoopState,
}

impl ReportingLoop {
    pub fn new(
        sources: Vec<Box<dyn AlertSource>>,
        generator: ReportGenerator,
        kind: ReportKind,
    ) -> Self {
        Self {
            sources,
            generator,
            kind,
            trending_limit: 10,
            custom_prompt: None,
            store: None,
            interval: Duration::from_secs(3600),
            sleeper: Arc::new(TokioSleeper),
            state: LoopState::Idle,
        }
    }

    pub fn with_store(mut self, store: ReportStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_custom_prompt(mut self, custom_prompt: Option<String>) -> Self {
        self.custom_prompt = custom_prompt;
        self
    }

    pub fn with_trending_limit(mut self, limit: usize) -> Self {
        self.trending_limit = limit;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    /// Run cycles until `stop` fires. Returns the number of cycles run.
    pub async fn run(&mut self, mut stop: StopSignal) -> u64 {
        tracing::info!(
            "Reporting loop starting ({} source(s), interval {:?})",
            self.sources.len(),
            self.interval
        );

        let mut cycles = 0;
        while !stop.is_stopped() {
            let outcome = self.run_once().await;
            cycles += 1;
            match &outcome {
                CycleOutcome::Success(summary) => tracing::info!(
                    "Cycle {} complete: {} alert(s), {} failed source(s), generated={}",
                    cycles,
                    summary.alert_count,
                    summary.failed_sources.len(),
                    summary.generated
                ),
                CycleOutcome::Failure(error) => tracing::error!(
                    "[{}] Reporting cycle {} failed: {}",
                    Utc::now().to_rfc3339(),
                    cycles,
                    error
                ),
            }

            let sleeper = self.sleeper.clone();
            tokio::select! {
                _ = sleeper.sleep(self.interval) => {}
                _ = stop.stopped() => break,
            }
        }

        tracing::info!("Reporting loop stopped after {} cycle(s)", cycles);
        cycles
    }

    /// Run exactly one cycle. Errors are folded into the outcome.
    pub async fn run_once(&mut self) -> CycleOutcome {
        self.state = LoopState::Running;
        let outcome = match self.cycle().await {
            Ok(summary) => CycleOutcome::Success(summary),
            Err(e) => CycleOutcome::Failure(format!("{:#}", e)),
        };
        self.state = LoopState::Idle;
        outcome
    }

    async fn cycle(&self) -> Result<CycleSummary> {
        let (records, failed_sources) = self.collect().await;
        let alert_count = records.len();

        let user_content = match self.kind {
            ReportKind::Alerts => aggregate::render(&aggregate::group_by_severity(records)),
            ReportKind::Trends => aggregate::render_trending(&records, self.trending_limit),
        };

        let instructions =
            prompt::join_instructions([Some(self.kind.role_prompt()), self.custom_prompt.as_deref()]);
        let outcome = self
            .generator
            .generate(&user_content, instructions.as_deref())
            .await;
        let generated = outcome.is_generated();

        let document = ReportDocument::new(self.kind.title(), outcome.into_text());
        let saved_to = match &self.store {
            Some(store) => Some(store.save(self.kind.file_prefix(), &document)?),
            None => None,
        };

        Ok(CycleSummary {
            document,
            alert_count,
            failed_sources,
            generated,
            saved_to,
        })
    }

    /// Poll every source; a failing source is logged and skipped.
    async fn collect(&self) -> (Vec<AlertRecord>, Vec<String>) {
        let mut records = Vec::new();
        let mut failed = Vec::new();
        for source in &self.sources {
            match source.fetch().await {
                Ok(mut batch) => records.append(&mut batch),
                Err(e) => {
                    tracing::warn!("Skipping source {} this cycle: {}", source.name(), e);
                    failed.push(source.name().to_string());
                }
            }
        }
        (records, failed)
    }
}
