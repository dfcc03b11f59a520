use super::*;
use netpulse_llm::MockProvider;

fn planner(provider: &MockProvider) -> Planner {
    Planner::new(
        Arc::new(provider.clone()),
        Arc::new(ToolCatalog::builtin()),
        PlannerConfig::default(),
    )
}

#[test]
fn test_planner_config() {
    let config = PlannerConfig::new()
        .with_temperature(0.5)
        .with_max_problem_chars(100)
        .with_model("qwen2.5:7b")
        .with_timeout(Duration::from_secs(5));

    assert_eq!(config.temperature, 0.5);
    assert_eq!(config.max_problem_chars, 100);
    assert_eq!(config.default_model.as_deref(), Some("qwen2.5:7b"));
    assert_eq!(config.timeout, Duration::from_secs(5));
}

#[test]
fn test_fallback_plan_shape() {
    let plan = DiagnosticPlan::fallback();
    assert_eq!(plan.total_steps(), 2);
    assert_eq!(plan.tool_sequence(), ["ping", "connectivity_check"]);
    assert_eq!(plan.step_reasons().len(), 2);
    assert_eq!(plan.urgency, Urgency::Medium);
    assert!(plan.is_fallback);
}

#[tokio::test]
async fn test_invalid_json_yields_fallback() {
    let provider = MockProvider::new();
    provider.push_text("Sure! First you should ping something, then check the router.");

    let plan = planner(&provider)
        .build_plan("my connection keeps dropping")
        .await
        .unwrap();

    assert_eq!(plan, DiagnosticPlan::fallback());
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_model_failure_yields_fallback() {
    let provider = MockProvider::unavailable();
    let plan = planner(&provider)
        .build_plan("my connection keeps dropping")
        .await
        .unwrap();
    assert_eq!(plan, DiagnosticPlan::fallback());
}

#[tokio::test(start_paused = true)]
async fn test_model_timeout_yields_fallback() {
    let provider = MockProvider::new().with_delay(Duration::from_secs(120));
    provider.push_text(r#"{"diagnosticPlan": ["wifi_scan"]}"#);

    let planner = Planner::new(
        Arc::new(provider.clone()),
        Arc::new(ToolCatalog::builtin()),
        PlannerConfig::default().with_timeout(Duration::from_secs(1)),
    );
    let plan = planner.build_plan("slow wifi").await.unwrap();
    assert!(plan.is_fallback);
}

#[tokio::test]
async fn test_valid_reply_is_used_in_order() {
    let provider = MockProvider::new();
    provider.push_text(
        r#"Here is the plan:
```json
{
  "analysis": "Likely a DNS problem",
  "reasoning": "Pages fail but ping works",
  "urgency": "HIGH",
  "totalSteps": 3,
  "diagnosticPlan": ["dns_lookup", "ping_test", "http_check"],
  "stepReasons": ["resolve", "reach", "fetch"]
}
```"#,
    );

    let plan = planner(&provider)
        .build_plan("websites do not load")
        .await
        .unwrap();

    assert!(!plan.is_fallback);
    assert_eq!(plan.urgency, Urgency::High);
    assert_eq!(plan.tool_sequence(), ["dns_lookup", "ping", "http_check"]);
    assert_eq!(plan.step(1), Some(("ping", "reach")));

    let request = &provider.requests()[0];
    assert!(request.json_reply);
    assert_eq!(request.max_tokens, Some(1024));
    assert!(request.prompt.contains("websites do not load"));
}

#[test]
fn test_plan_invariant_clamps_mismatched_lengths() {
    let plan = Planner::parse_plan(
        r#"{"totalSteps": 5, "diagnosticPlan": ["ping", "traceroute", "wifi"], "stepReasons": ["only one"]}"#,
    )
    .unwrap();

    assert_eq!(plan.total_steps(), 3);
    assert_eq!(plan.tool_sequence().len(), 3);
    assert_eq!(plan.step_reasons().len(), 3);
    assert_eq!(plan.step_reasons()[0], "only one");
    assert_eq!(plan.tool_sequence()[2], "wifi_scan");

    let plan = Planner::parse_plan(
        r#"{"totalSteps": 1, "diagnosticPlan": ["ping"], "stepReasons": ["a", "b", "c"]}"#,
    )
    .unwrap();
    assert_eq!(plan.total_steps(), 1);
    assert_eq!(plan.step_reasons(), ["a"]);
}

#[test]
fn test_unknown_tool_ids_are_kept() {
    let plan = Planner::parse_plan(r#"{"diagnosticPlan": ["ping", "quantum_probe"]}"#).unwrap();
    assert_eq!(plan.tool_sequence(), ["ping", "quantum_probe"]);
}

#[test]
fn test_empty_sequence_is_not_a_plan() {
    assert!(Planner::parse_plan(r#"{"diagnosticPlan": []}"#).is_none());
    assert!(Planner::parse_plan("no json here").is_none());
    assert!(DiagnosticPlan::new("a", "r", Urgency::Low, vec!["  ".into()], vec![]).is_fallback);
}

#[test]
fn test_urgency_parse_lenient() {
    assert_eq!(Urgency::parse_lenient("High"), Urgency::High);
    assert_eq!(Urgency::parse_lenient(" low "), Urgency::Low);
    assert_eq!(Urgency::parse_lenient("whenever"), Urgency::Medium);
}

#[tokio::test]
async fn test_empty_problem_rejected() {
    let provider = MockProvider::new();
    let err = planner(&provider).build_plan("   ").await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(provider.call_count(), 0);
}

#[test]
fn test_prompt_groups_tools_by_tier() {
    let provider = MockProvider::new();
    let prompt = planner(&provider).build_prompt("slow downloads");

    let basic = prompt.find("Basic tools").unwrap();
    let advanced = prompt.find("Advanced tools").unwrap();
    let rare = prompt.find("Rarely-used tools").unwrap();
    assert!(basic < advanced && advanced < rare);
    assert!(prompt.contains("- ping:"));
    assert!(prompt.contains("\"slow downloads\""));
}

#[test]
fn test_prompt_caps_problem_length() {
    let provider = MockProvider::new();
    let planner = Planner::new(
        Arc::new(provider),
        Arc::new(ToolCatalog::builtin()),
        PlannerConfig::default().with_max_problem_chars(5),
    );
    let prompt = planner.build_prompt("网络经常断开连接");
    assert!(prompt.contains("\"网络经常断\""));
    assert!(!prompt.contains("网络经常断开"));
}
