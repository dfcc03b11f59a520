use super::*;
use crate::error::Error;
use crate::evaluator::EvaluationSource;
use crate::event_bus::{DiagnosisEvent, EventBus};
use crate::monitor::{MonitorConfig, SessionDefaults, SessionMonitor};
use netpulse_llm::MockProvider;
use netpulse_tools::{
    AnalysisResponse, CaptureBackend, CaptureStatus, Result as ToolResultAlias, StopResponse,
    ToolRunner, ToolTransport,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Transport replying per endpoint, `{"success": true}` when nothing is scripted
#[derive(Default)]
struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<ToolResultAlias<Value>>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    fn reply(&self, tool: &str, reply: ToolResultAlias<Value>) {
        self.replies
            .lock()
            .unwrap()
            .entry(format!("/api/tools/{}", tool))
            .or_default()
            .push_back(reply);
    }

    fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ToolTransport for ScriptedTransport {
    async fn invoke(&self, endpoint: &str, params: &Value) -> ToolResultAlias<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), params.clone()));
        self.replies
            .lock()
            .unwrap()
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(json!({"success": true})))
    }
}

fn diagnostician(provider: &MockProvider, transport: &Arc<ScriptedTransport>) -> Diagnostician {
    let runner = ToolRunner::with_defaults(transport.clone());
    Diagnostician::new(Arc::new(provider.clone()), runner, DiagnosisConfig::default())
}

fn healthy_ping() -> Value {
    json!({"success": true, "data": {"host": "baidu.com", "packet_loss": "0%", "avg_time": 15.0}})
}

fn healthy_connectivity() -> Value {
    json!({"success": true, "data": {"results": [
        {"name": "baidu", "reachable": true},
        {"name": "qq", "reachable": true}
    ]}})
}

fn expect_tool(next: NextStep) -> ToolRecommendation {
    match next {
        NextStep::Tool(rec) => rec,
        NextStep::Completed(report) => panic!("unexpected completion: {}", report.text),
    }
}

#[tokio::test]
async fn test_fallback_plan_walkthrough() {
    let provider = MockProvider::new();
    provider.push_text("I think you should ping things.");
    provider.set_default_text("Your connection looks healthy.");

    let transport = Arc::new(ScriptedTransport::default());
    transport.reply("ping", Ok(healthy_ping()));
    transport.reply("connectivity_check", Ok(healthy_connectivity()));
    let diag = diagnostician(&provider, &transport);

    let mut session = diag.start("my connection keeps dropping").await.unwrap();
    let plan = session.plan().unwrap();
    assert!(plan.is_fallback);
    assert_eq!(session.context().total_steps(), 2);
    assert_eq!(session.state(), DiagnosisState::AwaitingStep);

    let first = expect_tool(diag.next_step(&mut session).await.unwrap());
    assert_eq!(first.id, "ping");
    assert_eq!(first.step, 0);
    assert_eq!(first.default_params()["host"], "baidu.com");

    let outcome = diag
        .execute_tool(&mut session, &first.id, first.default_params())
        .await
        .unwrap();
    assert_eq!(outcome.evaluation.summary, "Network connectivity is normal");
    assert_eq!(outcome.evaluation.source, EvaluationSource::Heuristic);
    assert!(outcome.evaluation.needs_next_step);
    assert!(outcome.final_report.is_none());
    assert!(!session.is_complete());
    assert_eq!(session.context().current_step(), 1);
    assert_eq!(transport.calls()[0].1["host"], "baidu.com");

    let second = expect_tool(diag.next_step(&mut session).await.unwrap());
    assert_eq!(second.id, "connectivity_check");
    let outcome = diag
        .execute_tool(&mut session, &second.id, Value::Null)
        .await
        .unwrap();
    assert!(!outcome.evaluation.needs_next_step);
    assert_eq!(session.evaluation().unwrap().tool, "connectivity_check");

    // The last step completes the diagnosis without another next_step call
    assert!(session.is_complete());
    assert!(session.context().is_complete());
    let report = outcome.final_report.expect("last step carries the report");
    assert_eq!(report.text, "Your connection looks healthy.");
    assert!(!report.is_error);
    assert_eq!(report.executed_steps, 2);
    assert_eq!(session.final_report(), Some(&report));

    match diag.next_step(&mut session).await.unwrap() {
        NextStep::Completed(again) => assert_eq!(again, report),
        NextStep::Tool(rec) => panic!("unexpected step {}", rec.id),
    }

    // plan + summary; both evaluations were heuristic
    assert_eq!(provider.call_count(), 2);
    let summary_prompt = provider.requests()[1].prompt.clone();
    assert!(summary_prompt.contains("my connection keeps dropping"));
    assert!(summary_prompt.contains("connectivity_check"));
}

#[tokio::test]
async fn test_tool_failure_is_retryable() {
    let provider = MockProvider::unavailable();
    let transport = Arc::new(ScriptedTransport::default());
    transport.reply(
        "ping",
        Err(netpulse_tools::Error::Network("connection refused".into())),
    );
    transport.reply("ping", Ok(healthy_ping()));
    let diag = diagnostician(&provider, &transport);

    let mut session = diag.start("no internet").await.unwrap();
    let err = diag
        .execute_tool(&mut session, "ping", Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Tool(ref e) if e.is_transient()));
    assert_eq!(session.state(), DiagnosisState::AwaitingStep);
    assert_eq!(session.context().current_step(), 0);
    assert!(session.context().executed_tools().is_empty());

    diag.execute_tool(&mut session, "ping", Value::Null)
        .await
        .unwrap();
    assert_eq!(session.context().current_step(), 1);
}

#[tokio::test]
async fn test_reported_failure_is_tool_execution_error() {
    let provider = MockProvider::unavailable();
    let transport = Arc::new(ScriptedTransport::default());
    transport.reply(
        "ping",
        Ok(json!({"success": false, "error": "ping: unknown host"})),
    );
    let diag = diagnostician(&provider, &transport);

    let mut session = diag.start("no internet").await.unwrap();
    let err = diag
        .execute_tool(&mut session, "ping", Value::Null)
        .await
        .unwrap_err();
    match err {
        Error::ToolExecution { tool, message } => {
            assert_eq!(tool, "ping");
            assert_eq!(message, "ping: unknown host");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(session.context().current_step(), 0);
}

#[tokio::test]
async fn test_completed_is_sticky() {
    let provider = MockProvider::new();
    provider.push_text(r#"{"diagnosticPlan": ["ping"], "stepReasons": ["reach"]}"#);
    let transport = Arc::new(ScriptedTransport::default());
    transport.reply("ping", Ok(healthy_ping()));
    let diag = diagnostician(&provider, &transport);

    let mut session = diag.start("slow").await.unwrap();
    let report = diag.run_to_completion(&mut session, |r| r.default_params()).await.unwrap();
    assert_eq!(session.context().current_step(), 1);

    let err = diag
        .execute_tool(&mut session, "ping", Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert_eq!(session.context().current_step(), 1);

    // asking again returns the same report without another summary call
    let calls = provider.call_count();
    match diag.next_step(&mut session).await.unwrap() {
        NextStep::Completed(again) => assert_eq!(again, report),
        NextStep::Tool(_) => panic!("completed session produced a step"),
    }
    assert_eq!(provider.call_count(), calls);
}

#[tokio::test]
async fn test_unknown_tool_is_plan_integrity_error() {
    let provider = MockProvider::new();
    provider.push_text(r#"{"diagnosticPlan": ["ping", "quantum_probe"]}"#);
    let transport = Arc::new(ScriptedTransport::default());
    let diag = diagnostician(&provider, &transport);

    let mut session = diag.start("weird").await.unwrap();
    let first = expect_tool(diag.next_step(&mut session).await.unwrap());
    diag.execute_tool(&mut session, &first.id, Value::Null)
        .await
        .unwrap();

    let err = diag.next_step(&mut session).await.unwrap_err();
    assert!(matches!(
        err,
        Error::PlanIntegrity { step: 1, ref tool_id } if tool_id == "quantum_probe"
    ));
    assert_eq!(session.state(), DiagnosisState::AwaitingStep);
    assert_eq!(session.context().current_step(), 1);
}

#[tokio::test]
async fn test_summary_prompt_keeps_placeholder_text_from_results() {
    let provider = MockProvider::new();
    provider.push_text(r#"{"diagnosticPlan": ["ping"]}"#);
    let transport = Arc::new(ScriptedTransport::default());
    transport.reply(
        "ping",
        Ok(json!({"success": true, "data": {"host": "{problem}", "packet_loss": "0%", "avg_time": 9.0}})),
    );
    let diag = diagnostician(&provider, &transport);

    let mut session = diag.start("router reboots at night").await.unwrap();
    diag.run_to_completion(&mut session, |r| r.default_params())
        .await
        .unwrap();

    let summary_prompt = provider.requests()[1].prompt.clone();
    assert!(summary_prompt.contains("\"host\":\"{problem}\""));
    assert_eq!(summary_prompt.matches("router reboots at night").count(), 1);
}

#[tokio::test]
async fn test_summary_failure_still_completes() {
    let provider = MockProvider::unavailable();
    let transport = Arc::new(ScriptedTransport::default());
    let diag = diagnostician(&provider, &transport);

    let mut session = diag.start("flaky wifi").await.unwrap();
    let report = diag
        .run_to_completion(&mut session, |_| Value::Null)
        .await
        .unwrap();

    assert!(report.is_error);
    assert!(report.text.contains("could not be generated"));
    assert!(session.is_complete());
    assert_eq!(session.final_report(), Some(&report));
}

#[tokio::test]
async fn test_submit_rules() {
    let provider = MockProvider::unavailable();
    let transport = Arc::new(ScriptedTransport::default());
    let diag = diagnostician(&provider, &transport);

    let mut session = DiagnosisSession::new();
    let err = diag.next_step(&mut session).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    let err = diag.submit_problem(&mut session, "   ").await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(session.state(), DiagnosisState::Idle);

    diag.submit_problem(&mut session, "no internet").await.unwrap();
    let err = diag
        .submit_problem(&mut session, "again")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert_eq!(session.context().original_problem(), "no internet");
}

#[tokio::test]
async fn test_capture_session_is_reported() {
    let provider = MockProvider::unavailable();
    provider.push_text(r#"{"diagnosticPlan": ["capture"]}"#);
    let transport = Arc::new(ScriptedTransport::default());
    transport.reply(
        "packet_capture",
        Ok(json!({"success": true, "data": {"session_id": "capture_20240101_1", "status": "running"}})),
    );
    let diag = diagnostician(&provider, &transport);

    let mut session = diag.start("games lag").await.unwrap();
    let outcome = diag
        .execute_tool(&mut session, "packet_capture_start", Value::Null)
        .await
        .unwrap();

    assert_eq!(outcome.capture_session.as_deref(), Some("capture_20240101_1"));
    assert!(!outcome.capture_monitored);
    assert_eq!(outcome.record.id, "packet_capture");
    assert_eq!(session.capture_sessions(), ["capture_20240101_1"]);
    assert_eq!(outcome.evaluation.source, EvaluationSource::Fallback);
}

/// Capture backend whose sessions never finish on their own
struct EndlessCapture;

#[async_trait::async_trait]
impl CaptureBackend for EndlessCapture {
    async fn status(&self, session_id: &str) -> ToolResultAlias<CaptureStatus> {
        Ok(CaptureStatus {
            session_id: session_id.to_string(),
            is_capturing: true,
            current_packet_count: 10,
            elapsed_time: 1.0,
            remaining_time: Some(59.0),
            status: "running".to_string(),
        })
    }

    async fn stop(&self, _session_id: &str) -> ToolResultAlias<StopResponse> {
        Ok(StopResponse {
            success: true,
            error: None,
        })
    }

    async fn analyze(&self, _session_id: &str) -> ToolResultAlias<AnalysisResponse> {
        Ok(AnalysisResponse {
            success: true,
            data: Value::Null,
            error: None,
        })
    }
}

#[tokio::test]
async fn test_capture_is_monitored_even_when_a_later_step_fails() {
    let provider = MockProvider::unavailable();
    provider.push_text(r#"{"diagnosticPlan": ["packet_capture", "ping"]}"#);
    let transport = Arc::new(ScriptedTransport::default());
    transport.reply(
        "packet_capture",
        Ok(json!({"success": true, "data": {"session_id": "capture_7", "status": "running"}})),
    );
    transport.reply(
        "ping",
        Err(netpulse_tools::Error::Network("connection refused".into())),
    );

    let monitor = SessionMonitor::new(
        Arc::new(EndlessCapture),
        MonitorConfig::default().with_poll_interval(Duration::from_secs(60)),
    );
    let diag = diagnostician(&provider, &transport)
        .with_session_monitor(monitor.clone(), SessionDefaults::default());

    let mut session = diag.start("calls drop during games").await.unwrap();
    let err = diag
        .run_to_completion(&mut session, |rec| {
            let mut params = rec.default_params();
            if rec.id == "packet_capture" {
                params["target"] = json!("192.168.1.20");
                params["duration"] = json!(120);
            }
            params
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Tool(_)));
    assert!(!session.is_complete());

    assert!(monitor.is_monitoring("capture_7").await);
    let watched = monitor.session("capture_7").await.unwrap();
    assert_eq!(watched.target, "192.168.1.20");
    assert_eq!(watched.duration, 120);
    assert_eq!(watched.mode, SessionDefaults::default().mode);

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_run_to_completion_stops_on_failure() {
    let provider = MockProvider::unavailable();
    let transport = Arc::new(ScriptedTransport::default());
    transport.reply("ping", Ok(healthy_ping()));
    transport.reply(
        "connectivity_check",
        Err(netpulse_tools::Error::Timeout(60_000)),
    );
    let diag = diagnostician(&provider, &transport);

    let mut session = diag.start("no internet").await.unwrap();
    let err = diag
        .run_to_completion(&mut session, |r| r.default_params())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Tool(_)));
    assert_eq!(session.context().current_step(), 1);
    assert!(!session.is_complete());
}

#[tokio::test]
async fn test_events_follow_lifecycle() {
    let provider = MockProvider::unavailable();
    let transport = Arc::new(ScriptedTransport::default());
    transport.reply("ping", Ok(healthy_ping()));
    transport.reply("connectivity_check", Ok(healthy_connectivity()));

    let bus = Arc::new(EventBus::new(64));
    let mut rx = bus.subscribe();
    let diag = diagnostician(&provider, &transport).with_event_bus(bus);

    let mut session = diag.start("no internet").await.unwrap();
    diag.run_to_completion(&mut session, |r| r.default_params())
        .await
        .unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
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

#[test]
fn test_effective_total_uses_plan_length() {
    let mut session = DiagnosisSession::new();
    assert_eq!(session.effective_total_steps(), 0);

    session.plan = Some(crate::planner::DiagnosticPlan::fallback());
    session.context = DiagnosticContext::start("x", 5);
    assert_eq!(session.effective_total_steps(), 2);
}
