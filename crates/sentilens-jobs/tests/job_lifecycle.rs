//! End-to-end job lifecycle tests with scripted models
//!
//! A gated model lets tests hold a job between batches to observe the
//! Processing state, progress updates and readiness errors.

use sentilens_classifiers::{
    ClassificationEngine, EngineConfig, ModelLoader, SentimentModel, StaticModelLoader,
    TextNormalizer,
};
use sentilens_core::{Error, JobId, Label, Result, TextInput};
use sentilens_jobs::{
    correct, filter, search, JobRunner, JobStatus, JobStore, JobView, RunnerConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Model that blocks each batch until the test releases it
struct GatedModel {
    released: Mutex<usize>,
    signal: Condvar,
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
}

impl GatedModel {
    fn new() -> Self {
        Self {
            released: Mutex::new(0),
            signal: Condvar::new(),
            calls: AtomicUsize::new(0),
            fail_on_call: None,
        }
    }

    fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::new()
        }
    }

    /// Let `n` more batches through
    fn release(&self, n: usize) {
        *self.released.lock().unwrap() += n;
        self.signal.notify_all();
    }
}

impl SentimentModel for GatedModel {
    fn logits(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        let mut released = self.released.lock().unwrap();
        while *released == 0 {
            released = self.signal.wait(released).unwrap();
        }
        *released -= 1;
        drop(released);

        if self.fail_on_call == Some(call) {
            return Err(Error::model_unavailable("simulated inference failure"));
        }

        Ok(texts
            .iter()
            .map(|t| {
                if t.contains("bad") {
                    vec![2.0, 0.0, 0.0]
                } else if t.contains("good") {
                    vec![0.0, 0.0, 2.0]
                } else {
                    vec![0.0, 2.0, 0.0]
                }
            })
            .collect())
    }

    fn name(&self) -> &str {
        "gated"
    }
}

struct BrokenLoader;

#[async_trait::async_trait]
impl ModelLoader for BrokenLoader {
    async fn load(&self) -> Result<Arc<dyn SentimentModel>> {
        Err(Error::model_unavailable("model weights not found"))
    }

    fn describe(&self) -> String {
        "broken".to_string()
    }
}

fn runner_with(loader: Arc<dyn ModelLoader>, batch_size: usize) -> JobRunner {
    let engine = ClassificationEngine::new(
        loader,
        EngineConfig {
            batch_size,
            ..Default::default()
        },
    )
    .unwrap();

    JobRunner::new(
        JobStore::new(),
        Arc::new(engine),
        Arc::new(TextNormalizer::new().unwrap()),
        RunnerConfig::default(),
    )
    .unwrap()
}

fn inputs(n: usize) -> Vec<TextInput> {
    (0..n)
        .map(|i| match i % 3 {
            0 => TextInput::new(format!("good {i}")).with_source("vk"),
            1 => TextInput::new(format!("bad {i}")),
            _ => TextInput::new(format!("plain {i}")).with_source("tg"),
        })
        .collect()
}

async fn wait_for_progress(runner: &JobRunner, id: &JobId, at_least: usize) -> usize {
    for _ in 0..500 {
        match runner.status(id).unwrap() {
            JobView::Processing { progress, .. } if progress >= at_least => return progress,
            JobView::Processing { .. } => tokio::time::sleep(Duration::from_millis(2)).await,
            other => panic!("job left processing early: {other:?}"),
        }
    }
    panic!("progress never reached {at_least}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_progress_visible_between_batches() {
    let model = Arc::new(GatedModel::new());
    let runner = runner_with(Arc::new(StaticModelLoader::new(model.clone())), 4);

    let handle = runner.submit(inputs(10)).unwrap();
    let id = handle.id();

    match runner.status(&id).unwrap() {
        JobView::Processing { progress, total, .. } => {
            assert_eq!(progress, 0);
            assert_eq!(total, 10);
        }
        other => panic!("unexpected view: {other:?}"),
    }

    model.release(1);
    assert_eq!(wait_for_progress(&runner, &id, 4).await, 4);

    // Analytics refuse to run on an unfinished job
    assert!(matches!(
        search(runner.store(), &id, "good", None),
        Err(Error::NotReady(_))
    ));
    assert!(matches!(
        filter(runner.store(), &id, None, None),
        Err(Error::NotReady(_))
    ));
    assert!(matches!(
        correct(runner.store(), &id, 0, 1),
        Err(Error::NotReady(_))
    ));

    model.release(1);
    assert_eq!(wait_for_progress(&runner, &id, 8).await, 8);

    model.release(1);
    handle.wait().await.unwrap();

    match runner.status(&id).unwrap() {
        JobView::Completed { data, stats, .. } => {
            assert_eq!(data.len(), 10);
            for (position, record) in data.iter().enumerate() {
                assert_eq!(record.index, position);
            }
            assert_eq!(stats.total, 10);
            assert_eq!(stats.positive, 4);
            assert_eq!(stats.negative, 3);
            assert_eq!(stats.neutral, 3);
        }
        other => panic!("unexpected view: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_progress_never_decreases() {
    let model = Arc::new(GatedModel::new());
    model.release(usize::MAX / 2);
    let runner = runner_with(Arc::new(StaticModelLoader::new(model)), 3);

    let handle = runner.submit(inputs(50)).unwrap();
    let id = handle.id();

    let mut last = 0;
    loop {
        let view = runner.status(&id).unwrap();
        match view {
            JobView::Processing { progress, total, .. } => {
                assert!(progress >= last);
                assert!(progress <= total);
                last = progress;
            }
            JobView::Completed {
                progress, total, data, ..
            } => {
                assert!(progress >= last);
                assert_eq!(progress, 50);
                assert_eq!(total, 50);
                assert_eq!(data.len(), 50);
                break;
            }
            other => panic!("unexpected view: {other:?}"),
        }
        tokio::task::yield_now().await;
    }

    handle.wait().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_batch_failure_marks_job_failed() {
    let model = Arc::new(GatedModel::failing_on(1));
    model.release(10);
    let runner = runner_with(Arc::new(StaticModelLoader::new(model)), 2);

    let handle = runner.submit(inputs(6)).unwrap();
    let id = handle.id();
    handle.wait().await.unwrap();

    match runner.status(&id).unwrap() {
        JobView::Failed {
            error,
            progress,
            total,
            ..
        } => {
            assert_eq!(error.kind, "model_unavailable");
            assert!(error.message.contains("simulated inference failure"));
            assert_eq!(progress, 2);
            assert_eq!(total, 6);
        }
        other => panic!("unexpected view: {other:?}"),
    }

    assert!(matches!(
        search(runner.store(), &id, "", None),
        Err(Error::NotReady(_))
    ));
}

#[tokio::test]
async fn test_unloadable_model_fails_every_job() {
    let runner = runner_with(Arc::new(BrokenLoader), 8);

    for _ in 0..2 {
        let handle = runner.submit(inputs(3)).unwrap();
        let id = handle.id();
        handle.wait().await.unwrap();

        let view = runner.status(&id).unwrap();
        assert_eq!(view.status(), JobStatus::Failed);
        match view {
            JobView::Failed { error, .. } => {
                assert_eq!(error.kind, "model_unavailable");
                assert!(error.message.contains("model weights not found"));
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_jobs_are_independent() {
    let model = Arc::new(GatedModel::new());
    model.release(usize::MAX / 2);
    let runner = runner_with(Arc::new(StaticModelLoader::new(model)), 5);

    let handles: Vec<_> = (1..=4)
        .map(|n| runner.submit(inputs(n * 7)).unwrap())
        .collect();
    let ids: Vec<JobId> = handles.iter().map(|h| h.id()).collect();
    for handle in handles {
        handle.wait().await.unwrap();
    }

    for (n, id) in (1..=4).zip(&ids) {
        match runner.status(id).unwrap() {
            JobView::Completed { data, .. } => assert_eq!(data.len(), n * 7),
            other => panic!("unexpected view: {other:?}"),
        }
    }
    assert_eq!(runner.store().len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_correction_visible_to_later_reads() {
    let model = Arc::new(GatedModel::new());
    model.release(usize::MAX / 2);
    let runner = runner_with(Arc::new(StaticModelLoader::new(model)), 4);

    let handle = runner.submit(inputs(6)).unwrap();
    let id = handle.id();
    handle.wait().await.unwrap();

    let record = correct(runner.store(), &id, 1, 2).unwrap();
    assert_eq!(record.label, Some(Label::Positive));

    match runner.status(&id).unwrap() {
        JobView::Completed { data, stats, .. } => {
            assert_eq!(data[1].label, Some(Label::Positive));
            assert!(data[1].manually_corrected);
            assert_eq!(stats.positive, 3);
        }
        other => panic!("unexpected view: {other:?}"),
    }

    let positives = filter(runner.store(), &id, Some(Label::Positive), None).unwrap();
    let indices: Vec<usize> = positives.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 3]);
}

#[tokio::test]
async fn test_unknown_job() {
    let runner = runner_with(Arc::new(BrokenLoader), 8);
    assert!(matches!(
        runner.status(&JobId::new()),
        Err(Error::NotFound(_))
    ));
}
