// tests/integration_tests.rs
use async_trait::async_trait;
use autotune::controller::{JobController, StartRequest, StopOutcome};
use autotune::errors::{AutotuneError, Result};
use autotune::executor::{ExecutionRequest, ExecutionResult, ExecutionStatus, TrialExecutor};
use autotune::models::HistoryEntry;
use autotune::scorer::{FallbackScorer, TextClassifier};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

type Respond = dyn Fn(&ExecutionRequest) -> Result<ExecutionResult> + Send + Sync;

/// Executor that answers from a closure and remembers every submission.
struct ScriptedExecutor {
    latency: Duration,
    calls: Mutex<Vec<ExecutionRequest>>,
    respond: Box<Respond>,
}

impl ScriptedExecutor {
    fn new<F>(latency: Duration, respond: F) -> Arc<Self>
    where
        F: Fn(&ExecutionRequest) -> Result<ExecutionResult> + Send + Sync + 'static,
    {
        Arc::new(Self { latency, calls: Mutex::new(Vec::new()), respond: Box::new(respond) })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TrialExecutor for ScriptedExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        self.calls.lock().unwrap().push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.respond)(request)
    }
}

/// Classifier that labels text containing "good" as positive and logs inputs.
#[derive(Default)]
struct KeywordClassifier {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl TextClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<String> {
        self.seen.lock().unwrap().push(text.to_string());
        if text.contains("good") {
            Ok("positive".to_string())
        } else {
            Ok("neutral".to_string())
        }
    }
}

fn completed(stdout: &str) -> ExecutionResult {
    ExecutionResult {
        id: "test0001".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        description: String::new(),
        status: ExecutionStatus::Completed,
        exit_code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

/// Pretends to be python: `print('<text>')` prints `<text>`.
fn fake_python(request: &ExecutionRequest) -> Result<ExecutionResult> {
    let printed = request
        .code
        .trim()
        .trim_start_matches("print('")
        .trim_end_matches("')");
    Ok(completed(&format!("{}\n", printed)))
}

fn start_request(template: &str, values: Vec<f64>, iterations: u32) -> StartRequest {
    StartRequest {
        code_template: template.to_string(),
        param_name: "param".to_string(),
        param_values: values,
        iterations,
        delay_between_rounds: 0.0,
    }
}

fn controller(executor: Arc<dyn TrialExecutor>) -> (JobController, Arc<KeywordClassifier>) {
    let classifier = Arc::new(KeywordClassifier::default());
    let scorer = FallbackScorer::new(classifier.clone());
    (JobController::new(executor, scorer), classifier)
}

async fn wait_until_idle(controller: &JobController) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while controller.status().await.running {
        assert!(Instant::now() < deadline, "job never returned to idle");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn trials(history: &[HistoryEntry]) -> Vec<(u32, f64, Option<f64>)> {
    history
        .iter()
        .filter_map(HistoryEntry::as_trial)
        .map(|t| (t.iteration, t.param, t.metric))
        .collect()
}

#[tokio::test]
async fn test_grid_search_finds_best_metric() {
    let executor = ScriptedExecutor::new(Duration::ZERO, fake_python);
    let (controller, _) = controller(executor.clone());

    let job_id = controller
        .start(start_request("print('METRIC: {param}')", vec![1.0, 2.0], 1))
        .await
        .unwrap();
    assert_eq!(job_id.len(), 8);
    wait_until_idle(&controller).await;

    let history = controller.history().await;
    assert_eq!(trials(&history), vec![(1, 1.0, Some(1.0)), (1, 2.0, Some(2.0))]);

    let status = controller.status().await;
    assert!(!status.running);
    assert_eq!(status.job_id, None);
    assert_eq!(status.history_length, 2);
    assert_eq!(status.best.param, Some(2.0));
    assert_eq!(status.best.metric, 2.0);
    assert_eq!(status.best.stdout.as_deref(), Some("METRIC: 2\n"));

    let calls = executor.calls.lock().unwrap();
    assert_eq!(calls[0].description, format!("autoimprove_job={} iter=1 try=1", job_id));
}

#[tokio::test]
async fn test_trials_run_iteration_major() {
    let executor = ScriptedExecutor::new(Duration::ZERO, fake_python);
    let (controller, _) = controller(executor.clone());

    controller
        .start(start_request("print('METRIC: {param}')", vec![3.0, 1.0], 3))
        .await
        .unwrap();
    wait_until_idle(&controller).await;

    let order: Vec<(u32, f64)> = trials(&controller.history().await)
        .into_iter()
        .map(|(it, p, _)| (it, p))
        .collect();
    assert_eq!(order, vec![(1, 3.0), (1, 1.0), (2, 3.0), (2, 1.0), (3, 3.0), (3, 1.0)]);

    // Ties never displace the first maximum.
    let status = controller.status().await;
    assert_eq!(status.best.param, Some(3.0));
    assert_eq!(status.best.metric, 3.0);
}

#[tokio::test]
async fn test_second_start_is_rejected_while_running() {
    let executor = ScriptedExecutor::new(Duration::from_millis(50), fake_python);
    let (controller, _) = controller(executor.clone());

    let first = controller
        .start(start_request("print('METRIC: {param}')", vec![1.0, 2.0, 3.0, 4.0], 2))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;
    let before = controller.status().await;

    let second = controller
        .start(start_request("print('METRIC: {param}')", vec![100.0], 1))
        .await;
    assert!(matches!(second, Err(AutotuneError::AlreadyRunning)));

    let after = controller.status().await;
    assert_eq!(after.job_id.as_deref(), Some(first.as_str()));
    assert!(after.history_length >= before.history_length);
    assert!(after.best.metric <= 4.0);

    controller.stop().await;
    wait_until_idle(&controller).await;
    assert!(trials(&controller.history().await).iter().all(|(_, p, _)| *p != 100.0));
}

#[tokio::test]
async fn test_concurrent_starts_admit_one_job() {
    let executor = ScriptedExecutor::new(Duration::from_millis(20), fake_python);
    let (controller, _) = controller(executor.clone());
    let req = start_request("print('METRIC: {param}')", vec![1.0, 2.0], 1);

    let (a, b) = tokio::join!(controller.start(req.clone()), controller.start(req));
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);

    wait_until_idle(&controller).await;
    assert_eq!(controller.status().await.history_length, 2);
}

#[tokio::test]
async fn test_stop_halts_after_in_flight_trial() {
    let executor = ScriptedExecutor::new(Duration::from_millis(100), fake_python);
    let (controller, _) = controller(executor.clone());

    assert_eq!(controller.stop().await, StopOutcome::NotRunning);

    controller
        .start(start_request("print('METRIC: {param}')", vec![1.0, 2.0, 3.0, 4.0, 5.0], 4))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(controller.stop().await, StopOutcome::Stopping);
    assert_eq!(controller.stop().await, StopOutcome::Stopping);
    let submitted_at_stop = executor.call_count();

    wait_until_idle(&controller).await;

    let status = controller.status().await;
    assert!(status.history_length < 20);
    assert!(executor.call_count() <= submitted_at_stop + 1);
    assert_eq!(status.history_length, executor.call_count());
    assert_eq!(controller.stop().await, StopOutcome::NotRunning);
}

#[tokio::test]
async fn test_stop_interrupts_inter_trial_delay() {
    let executor = ScriptedExecutor::new(Duration::ZERO, fake_python);
    let (controller, _) = controller(executor.clone());

    let mut req = start_request("print('METRIC: {param}')", vec![1.0, 2.0], 1);
    req.delay_between_rounds = 30.0;
    controller.start(req).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stopped_at = Instant::now();
    controller.stop().await;
    wait_until_idle(&controller).await;

    assert!(stopped_at.elapsed() < Duration::from_secs(5));
    assert_eq!(executor.call_count(), 1);
}

#[tokio::test]
async fn test_submission_failure_is_recorded_and_loop_continues() {
    let executor = ScriptedExecutor::new(Duration::ZERO, |req: &ExecutionRequest| {
        if req.code.contains("METRIC: 2") {
            Err(AutotuneError::ApiError { status: 503, body: "busy".to_string() })
        } else {
            fake_python(req)
        }
    });
    let (controller, _) = controller(executor.clone());

    controller
        .start(start_request("print('METRIC: {param}')", vec![1.0, 2.0, 3.0], 1))
        .await
        .unwrap();
    wait_until_idle(&controller).await;

    let history = controller.history().await;
    assert_eq!(trials(&history), vec![(1, 1.0, Some(1.0)), (1, 2.0, None), (1, 3.0, Some(3.0))]);

    let failed = history[1].as_trial().unwrap();
    assert!(failed.error.as_deref().unwrap().contains("submission failed"));
    assert_eq!(failed.stdout, None);
    assert_eq!(controller.status().await.best.param, Some(3.0));
}

#[tokio::test]
async fn test_missing_metric_falls_back_to_scoring_model() {
    let executor = ScriptedExecutor::new(Duration::ZERO, |req: &ExecutionRequest| {
        if req.code.contains("quiet") {
            Ok(completed("   \n"))
        } else {
            Ok(completed("  looks good  \n"))
        }
    });
    let (controller, classifier) = controller(executor.clone());

    controller
        .start(start_request("run({param}, 'loud')", vec![1.0], 1))
        .await
        .unwrap();
    wait_until_idle(&controller).await;
    controller
        .start(start_request("run({param}, 'quiet')", vec![2.0], 1))
        .await
        .unwrap();
    wait_until_idle(&controller).await;

    let seen = classifier.seen.lock().unwrap().clone();
    assert_eq!(seen, vec!["looks good".to_string(), "run(2, 'quiet')".to_string()]);

    // Second job reset the history; its code-text fallback scored neutral.
    let history = controller.history().await;
    assert_eq!(trials(&history), vec![(1, 2.0, Some(0.0))]);
    let status = controller.status().await;
    assert_eq!(status.best.param, Some(2.0));
    assert_eq!(status.best.metric, 0.0);
}

#[tokio::test]
async fn test_driver_panic_returns_job_to_idle() {
    let executor = ScriptedExecutor::new(Duration::ZERO, |_req: &ExecutionRequest| {
        panic!("executor bug");
    });
    let (controller, _) = controller(executor.clone());

    controller
        .start(start_request("print('METRIC: {param}')", vec![1.0, 2.0], 1))
        .await
        .unwrap();
    wait_until_idle(&controller).await;

    let status = controller.status().await;
    assert_eq!(status.job_id, None);
    let history = controller.history().await;
    assert_eq!(history.len(), 1);
    match &history[0] {
        HistoryEntry::Fault { error } => assert!(error.contains("driver fault")),
        other => panic!("expected fault entry, got {:?}", other),
    }

    // The controller accepts a new job afterwards.
    assert!(controller.start(start_request("print('METRIC: {param}')", vec![1.0], 1)).await.is_ok());
    wait_until_idle(&controller).await;
}

#[cfg(unix)]
mod sandbox {
    use super::*;
    use autotune::config::SandboxConfig;
    use autotune::executor::SandboxExecutor;

    fn sandbox(root: &std::path::Path, timeout: Duration) -> Arc<SandboxExecutor> {
        Arc::new(SandboxExecutor::new(SandboxConfig {
            root: root.to_path_buf(),
            interpreter: "sh".to_string(),
            extension: "sh".to_string(),
            timeout,
        }))
    }

    #[tokio::test]
    async fn test_sandboxed_job_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        let (controller, _) = controller(sandbox(root.path(), Duration::from_secs(5)));

        controller
            .start(start_request("echo 'METRIC: {param}'", vec![1.0, 2.0], 1))
            .await
            .unwrap();
        wait_until_idle(&controller).await;

        assert_eq!(
            trials(&controller.history().await),
            vec![(1, 1.0, Some(1.0)), (1, 2.0, Some(2.0))]
        );
        assert_eq!(controller.status().await.best.param, Some(2.0));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_timed_out_trial_is_still_recorded() {
        let root = tempfile::tempdir().unwrap();
        let (controller, _) = controller(sandbox(root.path(), Duration::from_millis(300)));

        controller
            .start(start_request("echo 'tick {param}'\nsleep 30", vec![7.0], 1))
            .await
            .unwrap();
        wait_until_idle(&controller).await;

        let history = controller.history().await;
        assert_eq!(history.len(), 1);
        let record = history[0].as_trial().unwrap();
        assert_eq!(record.param, 7.0);
        assert_eq!(record.stdout.as_deref(), Some("tick 7\n"));
        assert_eq!(record.metric, Some(0.0));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
