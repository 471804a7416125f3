use async_trait::async_trait;
use sluice_bridge::engine::RunEventStream;
use sluice_bridge::{
    CancellationToken, ConcurrencyPolicy, Definitions, DefaultTranslator, InMemoryGraph,
    MaterializationEmitter, PipelineEngine, ReplayEngine, ResolvedSecrets, RunCoordinator,
    SecretsError, SecretsResolver, StaticSecretsResolver, TriggerContext,
};
use sluice_core::domain::event::RunEvent;
use sluice_core::domain::outcome::{ResourceStatus, RunError, RunOutcome, RunStatus};
use sluice_core::domain::pipeline::{
    DestinationDescriptor, PipelineDescriptor, ResourceDescriptor,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Counts how often secrets are resolved
struct CountingSecrets {
    inner: StaticSecretsResolver,
    calls: Arc<AtomicUsize>,
}

impl SecretsResolver for CountingSecrets {
    fn resolve(&self, names: &BTreeSet<String>) -> Result<ResolvedSecrets, SecretsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(names)
    }
}

/// Replays events and keeps the secrets each run was handed, along with how
/// many resolutions had happened by then
struct CapturingEngine {
    inner: ReplayEngine,
    resolutions: Arc<AtomicUsize>,
    received: Mutex<Vec<(ResolvedSecrets, usize)>>,
}

impl CapturingEngine {
    fn received(&self) -> Vec<(ResolvedSecrets, usize)> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl PipelineEngine for CapturingEngine {
    async fn run(
        &self,
        pipeline: &PipelineDescriptor,
        secrets: ResolvedSecrets,
    ) -> anyhow::Result<RunEventStream> {
        let resolved = self.resolutions.load(Ordering::SeqCst);
        self.received.lock().unwrap().push((secrets.clone(), resolved));
        self.inner.run(pipeline, secrets).await
    }
}

fn capturing(events: Vec<RunEvent>) -> (RunCoordinator, Arc<CapturingEngine>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = Arc::new(CapturingEngine {
        inner: ReplayEngine::new(events),
        resolutions: Arc::clone(&calls),
        received: Mutex::new(Vec::new()),
    });
    let secrets = CountingSecrets {
        inner: StaticSecretsResolver::new().with_secret("GITHUB_TOKEN", "ghp_test"),
        calls: Arc::clone(&calls),
    };
    let coordinator = RunCoordinator::new(
        Arc::clone(&engine) as Arc<dyn PipelineEngine>,
        Arc::new(secrets),
        Arc::new(DefaultTranslator::new()),
    );
    (coordinator, engine, calls)
}

struct Harness {
    definitions: Definitions,
    graph: InMemoryGraph,
    emitter: MaterializationEmitter,
}

impl Harness {
    fn new(pipeline: &PipelineDescriptor) -> Self {
        let mut definitions = Definitions::new(Arc::new(DefaultTranslator::new()));
        definitions.add_pipeline(pipeline.clone()).unwrap();
        let graph = InMemoryGraph::new();
        let emitter = MaterializationEmitter::new(Arc::new(graph.clone()));
        Self {
            definitions,
            graph,
            emitter,
        }
    }

    async fn emit(&self, outcome: &RunOutcome) -> usize {
        let specs = self.definitions.specs_for(&outcome.pipeline).unwrap();
        self.emitter.emit(outcome, specs).await.unwrap().len()
    }
}

fn pipeline(resources: &[&str]) -> PipelineDescriptor {
    PipelineDescriptor::new(
        "github",
        DestinationDescriptor::new("duckdb"),
        resources.iter().map(|r| ResourceDescriptor::new(*r)).collect(),
    )
}

fn coordinator(engine: &Arc<ReplayEngine>) -> RunCoordinator {
    RunCoordinator::new(
        Arc::<ReplayEngine>::clone(engine),
        Arc::new(StaticSecretsResolver::new().with_secret("GITHUB_TOKEN", "ghp_test")),
        Arc::new(DefaultTranslator::new()),
    )
}

#[tokio::test]
async fn test_all_resources_succeed() {
    let pipeline = pipeline(&["issues", "comments", "reactions"]);
    let harness = Harness::new(&pipeline);
    harness.definitions.register(&harness.graph).await.unwrap();

    let mut events = Vec::new();
    for (rows, name) in [3, 5, 8].into_iter().zip(["issues", "comments", "reactions"]) {
        events.push(RunEvent::started(name));
        events.push(RunEvent::completed(name, rows));
    }
    events.push(RunEvent::RunCompleted);
    let engine = Arc::new(ReplayEngine::new(events));

    let outcome = coordinator(&engine)
        .execute(&pipeline, TriggerContext::new("trigger-1"))
        .await;

    assert_eq!(outcome.status, RunStatus::Success);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.tally(), (3, 0, 0));
    assert_eq!(harness.emit(&outcome).await, 3);

    assert_eq!(harness.graph.assets().len(), 3);
    let record = harness.graph.latest_materialization("comments").unwrap();
    assert_eq!(record.run_id, outcome.run_id);
    assert_eq!(record.correlation_id, "trigger-1");
    assert_eq!(record.metadata["row_count"], 5);
    assert_eq!(record.metadata["write_disposition"], "append");
}

#[tokio::test]
async fn test_partial_failure_emits_only_successes() {
    let pipeline = pipeline(&["a", "b"]);
    let harness = Harness::new(&pipeline);
    let engine = Arc::new(ReplayEngine::new(vec![
        RunEvent::started("a"),
        RunEvent::started("b"),
        RunEvent::completed("a", 10),
        RunEvent::failed("b", "HTTP 500 from source"),
        RunEvent::RunCompleted,
    ]));

    let outcome = coordinator(&engine)
        .execute(&pipeline, TriggerContext::default())
        .await;

    assert_eq!(outcome.status, RunStatus::Failed);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.resource("a").unwrap().status, ResourceStatus::Success);
    let b = outcome.resource("b").unwrap();
    assert_eq!(b.status, ResourceStatus::Failed);
    assert_eq!(b.error.as_deref(), Some("HTTP 500 from source"));

    assert_eq!(harness.emit(&outcome).await, 1);
    assert!(harness.graph.latest_materialization("a").is_some());
    assert!(harness.graph.latest_materialization("b").is_none());
}

#[tokio::test]
async fn test_completed_without_started_is_protocol_violation() {
    let pipeline = pipeline(&["a", "b"]);
    let harness = Harness::new(&pipeline);
    let engine = Arc::new(ReplayEngine::new(vec![
        RunEvent::started("a"),
        RunEvent::completed("a", 1),
        RunEvent::completed("b", 2),
        RunEvent::RunCompleted,
    ]));

    let outcome = coordinator(&engine)
        .execute(&pipeline, TriggerContext::default())
        .await;

    assert!(matches!(
        outcome.error,
        Some(RunError::ProtocolViolation { .. })
    ));
    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.resource("a").unwrap().status, ResourceStatus::Success);
    assert_eq!(
        outcome.resource("b").unwrap().status,
        ResourceStatus::Incomplete
    );

    assert_eq!(harness.emit(&outcome).await, 1);
    assert!(harness.graph.latest_materialization("b").is_none());
}

#[tokio::test]
async fn test_cancellation_marks_pending_incomplete() {
    let pipeline = pipeline(&["a", "c"]);
    let harness = Harness::new(&pipeline);
    let engine = Arc::new(
        ReplayEngine::new(vec![RunEvent::started("a"), RunEvent::completed("a", 4)]).hold_open(),
    );
    let token = CancellationToken::new();

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        })
    };

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        coordinator(&engine).execute(
            &pipeline,
            TriggerContext::new("cancel-me").with_cancellation(token),
        ),
    )
    .await
    .expect("cancelled run should return promptly");
    canceller.await.unwrap();

    assert_eq!(outcome.error, Some(RunError::Cancelled));
    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.resource("a").unwrap().status, ResourceStatus::Success);
    assert_eq!(
        outcome.resource("c").unwrap().status,
        ResourceStatus::Incomplete
    );
    assert_eq!(harness.emit(&outcome).await, 1);
}

#[tokio::test]
async fn test_concurrent_trigger_rejected() {
    let pipeline = pipeline(&["a"]);
    let engine = Arc::new(ReplayEngine::new(vec![RunEvent::started("a")]).hold_open());
    let coordinator = Arc::new(coordinator(&engine));
    let token = CancellationToken::new();

    let first = {
        let coordinator = Arc::clone(&coordinator);
        let pipeline = pipeline.clone();
        let trigger = TriggerContext::new("first").with_cancellation(token.clone());
        tokio::spawn(async move { coordinator.execute(&pipeline, trigger).await })
    };

    while !coordinator.is_in_flight("github") {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let second = coordinator
        .execute(&pipeline, TriggerContext::new("second"))
        .await;
    assert_eq!(
        second.error,
        Some(RunError::ConcurrentRunRejected {
            pipeline: "github".to_string()
        })
    );
    assert!(second.error.as_ref().unwrap().is_retryable());
    assert_eq!(
        second.resource("a").unwrap().status,
        ResourceStatus::Incomplete
    );

    token.cancel();
    let first = first.await.unwrap();
    assert_eq!(first.error, Some(RunError::Cancelled));
    assert_eq!(engine.invocations(), 1);
    assert!(!coordinator.is_in_flight("github"));
}

#[tokio::test]
async fn test_queue_policy_runs_after_in_flight_run() {
    let pipeline = pipeline(&["a"]);
    let engine = Arc::new(
        ReplayEngine::new(vec![
            RunEvent::started("a"),
            RunEvent::completed("a", 1),
            RunEvent::RunCompleted,
        ])
        .with_delay(Duration::from_millis(20)),
    );
    let coordinator = Arc::new(coordinator(&engine).with_policy(ConcurrencyPolicy::Queue));

    let first = {
        let coordinator = Arc::clone(&coordinator);
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            coordinator
                .execute(&pipeline, TriggerContext::new("first"))
                .await
        })
    };

    while !coordinator.is_in_flight("github") {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let second = coordinator
        .execute(&pipeline, TriggerContext::new("second"))
        .await;
    let first = first.await.unwrap();

    assert!(first.is_success());
    assert!(second.is_success());
    assert_eq!(engine.invocations(), 2);
    assert!(second.finished_at >= first.finished_at);
}

#[tokio::test]
async fn test_queued_trigger_can_be_cancelled() {
    let pipeline = pipeline(&["a"]);
    let engine = Arc::new(ReplayEngine::new(vec![RunEvent::started("a")]).hold_open());
    let coordinator = Arc::new(coordinator(&engine).with_policy(ConcurrencyPolicy::Queue));
    let first_token = CancellationToken::new();

    let first = {
        let coordinator = Arc::clone(&coordinator);
        let pipeline = pipeline.clone();
        let trigger = TriggerContext::new("first").with_cancellation(first_token.clone());
        tokio::spawn(async move { coordinator.execute(&pipeline, trigger).await })
    };

    while !coordinator.is_in_flight("github") {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let queued_token = CancellationToken::new();
    queued_token.cancel();
    let queued = coordinator
        .execute(
            &pipeline,
            TriggerContext::new("queued").with_cancellation(queued_token),
        )
        .await;
    assert_eq!(queued.error, Some(RunError::Cancelled));

    first_token.cancel();
    first.await.unwrap();
    assert_eq!(engine.invocations(), 1);
}

#[tokio::test]
async fn test_missing_secret_skips_engine() {
    let pipeline = pipeline(&["a", "b"]).with_secret("STRIPE_KEY");
    let engine = Arc::new(ReplayEngine::new(vec![RunEvent::RunCompleted]));

    let outcome = coordinator(&engine)
        .execute(&pipeline, TriggerContext::default())
        .await;

    assert_eq!(
        outcome.error,
        Some(RunError::MissingSecret {
            name: "STRIPE_KEY".to_string()
        })
    );
    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.tally(), (0, 0, 2));
    assert_eq!(engine.invocations(), 0);
}

#[tokio::test]
async fn test_resolved_secret_reaches_engine() {
    let pipeline = pipeline(&["a"]).with_secret("GITHUB_TOKEN");
    let (coordinator, engine, calls) = capturing(vec![
        RunEvent::started("a"),
        RunEvent::completed("a", 1),
        RunEvent::RunCompleted,
    ]);

    let outcome = coordinator
        .execute(&pipeline, TriggerContext::default())
        .await;

    assert!(outcome.is_success(), "{:?}", outcome.error);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let received = engine.received();
    assert_eq!(received.len(), 1);
    let (secrets, resolved_before_run) = &received[0];
    assert_eq!(secrets.get("GITHUB_TOKEN"), Some("ghp_test"));
    assert_eq!(secrets.len(), 1);
    assert_eq!(*resolved_before_run, 1);
}

#[tokio::test]
async fn test_unresolvable_secret_never_reaches_engine() {
    let pipeline = pipeline(&["a"])
        .with_secret("GITHUB_TOKEN")
        .with_secret("STRIPE_KEY");
    let (coordinator, engine, calls) = capturing(vec![RunEvent::RunCompleted]);

    let outcome = coordinator
        .execute(&pipeline, TriggerContext::default())
        .await;

    assert_eq!(
        outcome.error,
        Some(RunError::MissingSecret {
            name: "STRIPE_KEY".to_string()
        })
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(engine.received().is_empty());
}

#[tokio::test]
async fn test_invalid_pipeline_skips_secrets_and_engine() {
    let broken = PipelineDescriptor::new(
        "github",
        DestinationDescriptor::new("duckdb"),
        vec![
            ResourceDescriptor::new("a"),
            ResourceDescriptor::new("a"),
            ResourceDescriptor::new("b").depends_on("ghost"),
        ],
    )
    .with_secret("GITHUB_TOKEN");
    let (coordinator, engine, calls) = capturing(vec![
        RunEvent::started("a"),
        RunEvent::completed("a", 1),
        RunEvent::RunCompleted,
    ]);

    let outcome = coordinator
        .execute(&broken, TriggerContext::default())
        .await;

    assert!(matches!(
        outcome.error,
        Some(RunError::InvalidPipeline { .. })
    ));
    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(outcome.resources.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(engine.received().is_empty());
}

#[tokio::test]
async fn test_engine_run_failed() {
    let pipeline = pipeline(&["a", "b"]);
    let engine = Arc::new(ReplayEngine::new(vec![
        RunEvent::started("a"),
        RunEvent::RunFailed {
            error: "destination disk full".to_string(),
        },
    ]));

    let outcome = coordinator(&engine)
        .execute(&pipeline, TriggerContext::default())
        .await;

    assert_eq!(
        outcome.error,
        Some(RunError::EngineFailed {
            message: "destination disk full".to_string()
        })
    );
    assert_eq!(outcome.tally(), (0, 0, 2));
}
