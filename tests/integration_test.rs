//! Integration tests for NetPulse
//!
//! These tests drive the crates together through their public APIs:
//! - netpulse-llm: scripted language model
//! - netpulse-tools: catalog, runner and capture collaborator traits
//! - netpulse-core: planning, stepwise execution, evaluation and monitoring

use netpulse_core::{
    CaptureSession, DiagnosisConfig, DiagnosisEvent, DiagnosisState, Diagnostician,
    Error as CoreError, EvaluationSource, EventBus, MonitorConfig, MonitorEvent, NextStep,
    SessionDefaults, SessionMonitor, SessionStatus,
};
use netpulse_llm::MockProvider;
use netpulse_tools::{
    AnalysisResponse, CaptureBackend, CaptureStatus, Result as ToolsResult, StopResponse,
    ToolCatalog, ToolRunner, ToolTransport,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Collaborator doubles
// ============================================================================

#[derive(Default)]
struct ToolService {
    replies: Mutex<HashMap<String, VecDeque<Value>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ToolService {
    fn reply(&self, tool: &str, body: Value) {
        self.replies
            .lock()
            .unwrap()
            .entry(format!("/api/tools/{}", tool))
            .or_default()
            .push_back(body);
    }

    fn endpoints(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(e, _)| e.clone()).collect()
    }

    fn params(&self, index: usize) -> Value {
        self.calls.lock().unwrap()[index].1.clone()
    }
}

#[async_trait::async_trait]
impl ToolTransport for ToolService {
    async fn invoke(&self, endpoint: &str, params: &Value) -> ToolsResult<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), params.clone()));
        Ok(self
            .replies
            .lock()
            .unwrap()
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| json!({"success": true})))
    }
}

struct CaptureService {
    status_delay: Duration,
    status_calls: AtomicUsize,
    analyze_calls: AtomicUsize,
}

impl CaptureService {
    fn new(status_delay: Duration) -> Self {
        Self {
            status_delay,
            status_calls: AtomicUsize::new(0),
            analyze_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for CaptureService {
    async fn status(&self, session_id: &str) -> ToolsResult<CaptureStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.status_delay).await;
        Ok(CaptureStatus {
            session_id: session_id.to_string(),
            is_capturing: false,
            current_packet_count: 1200,
            elapsed_time: 30.0,
            remaining_time: None,
            status: "running".to_string(),
        })
    }

    async fn stop(&self, _session_id: &str) -> ToolsResult<StopResponse> {
        Ok(StopResponse {
            success: true,
            error: None,
        })
    }

    async fn analyze(&self, _session_id: &str) -> ToolsResult<AnalysisResponse> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        Ok(AnalysisResponse {
            success: true,
            data: json!({"top_protocols": ["TCP", "DNS"], "issues": []}),
            error: None,
        })
    }
}

fn diagnostician(provider: &MockProvider, tools: &Arc<ToolService>) -> Diagnostician {
    Diagnostician::new(
        Arc::new(provider.clone()),
        ToolRunner::with_defaults(tools.clone()),
        DiagnosisConfig::default(),
    )
}

async fn next_terminal(rx: &mut tokio::sync::broadcast::Receiver<MonitorEvent>) -> MonitorEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.unwrap();
            if event.is_terminal() {
                return event;
            }
        }
    })
    .await
    .expect("no terminal monitor event")
}

// ============================================================================
// Stepwise diagnosis
// ============================================================================

#[tokio::test]
async fn test_connection_drops_with_model_unavailable() {
    let provider = MockProvider::unavailable();
    let tools = Arc::new(ToolService::default());
    tools.reply(
        "ping",
        json!({"success": true, "data": {"host": "baidu.com", "packet_loss": "0%", "avg_time": 12.5}}),
    );
    tools.reply(
        "connectivity_check",
        json!({"success": true, "data": {"results": [{"name": "baidu", "reachable": true}]}}),
    );

    let bus = Arc::new(EventBus::default());
    let mut events = bus.subscribe();
    let diag = diagnostician(&provider, &tools).with_event_bus(bus.clone());

    let mut session = diag.start("my connection keeps dropping").await.unwrap();
    let plan = session.plan().unwrap();
    assert!(plan.is_fallback);
    assert_eq!(plan.total_steps(), 2);
    assert_eq!(plan.tool_sequence(), ["ping", "connectivity_check"]);
    assert_eq!(plan.urgency.as_str(), "medium");

    let NextStep::Tool(ping) = diag.next_step(&mut session).await.unwrap() else {
        panic!("expected the ping step");
    };
    let outcome = diag
        .execute_tool(&mut session, &ping.id, ping.default_params())
        .await
        .unwrap();
    assert_eq!(tools.params(0)["host"], "baidu.com");
    assert_eq!(outcome.evaluation.source, EvaluationSource::Heuristic);
    assert_eq!(outcome.evaluation.summary, "Network connectivity is normal");
    assert!(outcome.evaluation.needs_next_step);

    let NextStep::Tool(check) = diag.next_step(&mut session).await.unwrap() else {
        panic!("expected the connectivity step");
    };
    let outcome = diag
        .execute_tool(&mut session, &check.id, Value::Null)
        .await
        .unwrap();
    assert!(!outcome.evaluation.needs_next_step);

    // Evaluating the last step completes the diagnosis on the spot
    assert!(session.is_complete());
    let report = outcome.final_report.expect("final report on the last step");
    assert!(report.is_error);
    assert_eq!(report.executed_steps, 2);
    assert_eq!(session.state(), DiagnosisState::Completed);
    assert_eq!(session.context().current_step(), 2);
    assert_eq!(
        tools.endpoints(),
        ["/api/tools/ping", "/api/tools/connectivity_check"]
    );

    // Completed is sticky
    let again = diag.next_step(&mut session).await.unwrap();
    assert!(matches!(again, NextStep::Completed(r) if r == report));
    assert_eq!(session.context().current_step(), 2);

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        assert_eq!(event.diagnosis_id(), session.id());
        kinds.push(match event {
            DiagnosisEvent::PlanReady { .. } => "plan",
            DiagnosisEvent::StepStarted { .. } => "started",
            DiagnosisEvent::StepCompleted { .. } => "completed",
            DiagnosisEvent::StepFailed { .. } => "failed",
            DiagnosisEvent::EvaluationReady { .. } => "evaluated",
            DiagnosisEvent::DiagnosisCompleted { .. } => "done",
        });
    }
    assert_eq!(
        kinds,
        [
            "plan", "started", "completed", "evaluated", "started", "completed", "evaluated",
            "done"
        ]
    );
}

#[tokio::test]
async fn test_model_plan_hands_capture_to_monitor() {
    let provider = MockProvider::new();
    provider.push_text(
        r#"Here is the plan:
{"analysis": "Name resolution looks suspect", "reasoning": "check DNS then capture",
 "urgency": "HIGH", "totalSteps": 5,
 "diagnosticPlan": ["nslookup", "Capture"],
 "stepReasons": ["resolve the failing domain", "capture DNS traffic"]}"#,
    );
    provider.set_default_text("DNS replies are slow; switch resolvers.");

    let tools = Arc::new(ToolService::default());
    tools.reply(
        "packet_capture",
        json!({"success": true, "data": {"session_id": "capture_42", "message": "started"}}),
    );
    let capture = Arc::new(CaptureService::new(Duration::from_millis(50)));
    let monitor = SessionMonitor::new(
        capture.clone(),
        MonitorConfig::default().with_poll_interval(Duration::from_millis(10)),
    );
    let mut rx = monitor.subscribe();
    let diag = diagnostician(&provider, &tools)
        .with_session_monitor(monitor.clone(), SessionDefaults::default());

    let mut session = diag.start("sites fail to load by name").await.unwrap();
    let plan = session.plan().unwrap();
    assert!(!plan.is_fallback);
    assert_eq!(plan.total_steps(), 2);
    assert_eq!(plan.tool_sequence(), ["dns_lookup", "packet_capture"]);

    let report = diag
        .run_to_completion(&mut session, |rec| rec.default_params())
        .await
        .unwrap();
    assert_eq!(report.text, "DNS replies are slow; switch resolvers.");
    assert_eq!(session.capture_sessions(), ["capture_42"]);
    assert_eq!(tools.params(1)["duration"], 30);

    // Already handed over while the step ran; a second start is a no-op
    let again = CaptureSession::new("capture_42", &SessionDefaults::default());
    assert!(!monitor.start_monitoring(again).await);

    match next_terminal(&mut rx).await {
        MonitorEvent::Completed {
            session_id,
            analysis,
        } => {
            assert_eq!(session_id, "capture_42");
            assert_eq!(analysis["top_protocols"][1], "DNS");
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(capture.analyze_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_tool_in_plan_surfaces_integrity_error() {
    let provider = MockProvider::new();
    provider.push_text(r#"{"totalSteps": 2, "diagnosticPlan": ["ping", "teleport"], "stepReasons": ["a", "b"]}"#);
    let tools = Arc::new(ToolService::default());
    let diag = diagnostician(&provider, &tools);

    let mut session = diag.start("everything is slow").await.unwrap();
    let result = diag
        .run_to_completion(&mut session, |rec| rec.default_params())
        .await;

    match result {
        Err(CoreError::PlanIntegrity { step, tool_id }) => {
            assert_eq!(step, 1);
            assert_eq!(tool_id, "teleport");
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(session.context().current_step(), 1);
    assert!(!session.is_complete());
}

#[test]
fn test_catalog_covers_every_fallback_tool() {
    let catalog = ToolCatalog::global();
    assert!(catalog.resolve("ping_test").is_some());
    assert!(catalog.resolve("internet_check").is_some());
    assert_eq!(catalog.len(), 10);
}

// ============================================================================
// Session monitoring
// ============================================================================

#[tokio::test]
async fn test_duplicate_start_polls_once_and_analyzes_once() {
    let capture = Arc::new(CaptureService::new(Duration::from_millis(50)));
    let monitor = SessionMonitor::new(
        capture.clone(),
        MonitorConfig::default().with_poll_interval(Duration::from_millis(10)),
    );
    let mut rx = monitor.subscribe();

    let session = CaptureSession::new("capture_1", &SessionDefaults::default());
    assert!(monitor.start_monitoring(session.clone()).await);
    assert!(!monitor.start_monitoring(session).await);
    assert_eq!(monitor.active_count().await, 1);

    assert!(matches!(
        next_terminal(&mut rx).await,
        MonitorEvent::Completed { .. }
    ));
    let snapshot = monitor.session("capture_1").await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Completed);
    assert!(!snapshot.is_monitoring);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(capture.status_calls.load(Ordering::SeqCst), 1);
    assert_eq!(capture.analyze_calls.load(Ordering::SeqCst), 1);

    // Stopping a finished session is a no-op
    assert!(!monitor.stop_monitoring("capture_1").await);
}
