//! Drives jobs from submission to a terminal state
//!
//! Each submitted job runs as its own tokio task. The task classifies texts in
//! engine-sized batches, publishes progress after every batch and yields
//! before the next one, so status queries always see fresh progress.

use crate::job::{Job, JobView};
use crate::store::JobStore;
use sentilens_classifiers::{ClassificationEngine, TextNormalizer};
use sentilens_core::{Error, JobId, Result, ResultTable, TextInput};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Text fed to the model for each record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preprocessing {
    /// Classify the submitted text as-is
    #[default]
    Raw,

    /// Run the text normalizer first; records still keep the submitted text
    Normalized,
}

/// Job runner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub preprocessing: Preprocessing,

    /// Upper bound on texts accepted by one submission
    pub max_texts_per_job: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            preprocessing: Preprocessing::Raw,
            max_texts_per_job: 1_000_000,
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_texts_per_job == 0 {
            return Err(Error::config("jobs.max_texts_per_job must be at least 1"));
        }
        Ok(())
    }
}

/// Handle to a submitted job's background task
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    task: Option<JoinHandle<()>>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Wait until the job reaches a terminal state
    pub async fn wait(self) -> Result<()> {
        match self.task {
            Some(task) => task
                .await
                .map_err(|e| Error::internal(format!("job task for {} failed: {e}", self.id))),
            None => Ok(()),
        }
    }
}

/// Submits jobs and executes them against the classification engine
#[derive(Clone)]
pub struct JobRunner {
    store: JobStore,
    engine: Arc<ClassificationEngine>,
    normalizer: Arc<TextNormalizer>,
    config: RunnerConfig,
}

impl JobRunner {
    pub fn new(
        store: JobStore,
        engine: Arc<ClassificationEngine>,
        normalizer: Arc<TextNormalizer>,
        config: RunnerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            engine,
            normalizer,
            config,
        })
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn engine(&self) -> &Arc<ClassificationEngine> {
        &self.engine
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Register a job for `inputs` and start classifying in the background.
    ///
    /// Returns as soon as the job is registered. An empty submission completes
    /// immediately with an empty table. Outside a tokio runtime nothing is
    /// registered and an internal error is returned.
    pub fn submit(&self, inputs: Vec<TextInput>) -> Result<JobHandle> {
        if inputs.len() > self.config.max_texts_per_job {
            return Err(Error::invalid_argument(format!(
                "{} texts submitted, at most {} allowed per job",
                inputs.len(),
                self.config.max_texts_per_job
            )));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::internal(format!("job submitted outside a tokio runtime: {e}")))?;

        let job = self.store.register(inputs.len());
        let id = job.id();
        metrics::counter!("sentilens_jobs_submitted_total").increment(1);
        info!(job_id = %id, total = inputs.len(), "Job submitted");

        if inputs.is_empty() {
            finish(&job, Ok(ResultTable::default()));
            return Ok(JobHandle { id, task: None });
        }

        let engine = Arc::clone(&self.engine);
        let normalizer = Arc::clone(&self.normalizer);
        let preprocessing = self.config.preprocessing;

        let task = runtime.spawn(async move {
            let outcome = execute(&job, inputs, &engine, &normalizer, preprocessing).await;
            finish(&job, outcome);
        });

        Ok(JobHandle {
            id,
            task: Some(task),
        })
    }

    /// Snapshot of a job's current state
    pub fn status(&self, id: &JobId) -> Result<JobView> {
        self.store.status(id)
    }
}

async fn execute(
    job: &Job,
    inputs: Vec<TextInput>,
    engine: &ClassificationEngine,
    normalizer: &TextNormalizer,
    preprocessing: Preprocessing,
) -> Result<ResultTable> {
    let batch_size = engine.batch_size();
    let mut builder = ResultTable::builder(inputs.len());
    let mut remaining = inputs.into_iter();

    loop {
        let batch: Vec<TextInput> = remaining.by_ref().take(batch_size).collect();
        if batch.is_empty() {
            break;
        }

        let texts: Vec<String> = batch
            .iter()
            .map(|input| match preprocessing {
                Preprocessing::Raw => input.text().to_string(),
                Preprocessing::Normalized => normalizer.normalize(input.text()),
            })
            .collect();

        let start = Instant::now();
        let predictions = engine.classify(&texts).await?;
        if predictions.len() != batch.len() {
            return Err(Error::model_unavailable(format!(
                "engine returned {} predictions for {} texts",
                predictions.len(),
                batch.len()
            )));
        }

        for (input, prediction) in batch.into_iter().zip(predictions) {
            builder.push(input, prediction);
        }
        job.advance(builder.len());

        let elapsed_us = start.elapsed().as_micros() as f64;
        metrics::histogram!("sentilens_batch_latency_us").record(elapsed_us);
        metrics::counter!("sentilens_texts_classified_total").increment(texts.len() as u64);
        debug!(
            job_id = %job.id(),
            progress = builder.len(),
            total = job.total(),
            "Batch classified in {}us",
            elapsed_us
        );

        tokio::task::yield_now().await;
    }

    Ok(builder.finish())
}

fn finish(job: &Job, outcome: Result<ResultTable>) {
    match outcome {
        Ok(table) => {
            let records = table.len();
            if job.complete(table) {
                metrics::counter!("sentilens_jobs_completed_total").increment(1);
                info!(job_id = %job.id(), records, "Job completed");
            }
        }
        Err(e) => {
            if job.fail(&e) {
                metrics::counter!("sentilens_jobs_failed_total").increment(1);
                error!(job_id = %job.id(), progress = job.progress(), "Job failed: {}", e);
            }
        }
    }
}
