//! `netpulse diagnose`: plan and walk a stepwise diagnosis

use super::monitor::follow;
use crate::app::{self, AppConfig};
use anyhow::{anyhow, Result};
use netpulse_core::{
    format_error_for_cli, DiagnosisEvent, DiagnosisFeed, DiagnosisSession, Diagnostician,
    DiagnosticPlan, Error as CoreError, EvaluationResult, EvaluationSource, EventBus, FinalReport,
    NextStep, ToolRecommendation,
};
use serde_json::Value;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub async fn run(config: &AppConfig, problem: &str, auto: bool) -> Result<()> {
    let bus = Arc::new(EventBus::default());
    let monitor = app::build_monitor(config)?;
    let mut monitor_events = monitor.subscribe();
    let diagnostician = app::build_diagnostician(config, Arc::clone(&bus), monitor.clone())?;

    println!("🩺 NetPulse diagnosis\n");
    let mut session = DiagnosisSession::new();
    match diagnostician.submit_problem(&mut session, problem).await {
        Ok(plan) => print_plan(plan),
        Err(e) => return Err(anyhow!(format_error_for_cli(&e))),
    }

    let outcome = if auto {
        run_auto(&diagnostician, &bus, &mut session).await.map(Some)
    } else {
        run_interactive(&diagnostician, &mut session).await
    };
    diagnostician.evaluator().shutdown();

    match &outcome {
        Ok(Some(report)) => print_report(report),
        Ok(None) => println!(
            "\n👋 Diagnosis abandoned after {} step(s)",
            session.context().current_step()
        ),
        Err(_) => println!(
            "\n❌ Diagnosis stopped at step {}",
            session.context().current_step() + 1
        ),
    }

    // Captures went to the monitor as their steps ran; events since then are buffered
    let watched: HashSet<String> = session
        .capture_sessions()
        .into_iter()
        .map(str::to_string)
        .collect();
    if !watched.is_empty() {
        println!("\n📡 Waiting for {} capture session(s) (Ctrl+C to stop)\n", watched.len());
        follow(&monitor, &mut monitor_events, watched).await;
    }
    monitor.shutdown().await;

    outcome
        .map(|_| ())
        .map_err(|e| anyhow!(format_error_for_cli(&e)))
}

/// Every planned step with default parameters; progress is printed from the
/// event bus.
async fn run_auto(
    diagnostician: &Diagnostician,
    bus: &EventBus,
    session: &mut DiagnosisSession,
) -> Result<FinalReport, CoreError> {
    let done = CancellationToken::new();
    let printer = spawn_progress_printer(
        bus.subscribe_to(session.id()),
        done.clone(),
        session.effective_total_steps(),
    );

    let result = diagnostician
        .run_to_completion(session, ToolRecommendation::default_params)
        .await;

    done.cancel();
    if let Err(e) = printer.await {
        debug!(error = %e, "Progress printer ended abnormally");
    }
    result
}

/// Prompt before each step. Returns `None` when the user quits early.
async fn run_interactive(
    diagnostician: &Diagnostician,
    session: &mut DiagnosisSession,
) -> Result<Option<FinalReport>, CoreError> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let recommendation = match diagnostician.next_step(session).await? {
            NextStep::Completed(report) => return Ok(Some(report)),
            NextStep::Tool(recommendation) => recommendation,
        };
        print_recommendation(&recommendation);

        let Some(params) = ask_params(&mut input, &recommendation).await else {
            return Ok(None);
        };

        match diagnostician
            .execute_tool(session, &recommendation.id, params)
            .await
        {
            Ok(outcome) => {
                print_evaluation(&outcome.evaluation);
                if let (Some(session_id), true) = (&outcome.capture_session, outcome.capture_monitored) {
                    println!("   📡 Capture {} is running in the background", session_id);
                }
                if let Some(report) = outcome.final_report {
                    return Ok(Some(report));
                }
            }
            // Retryable: the next prompt offers the same step again
            Err(e @ (CoreError::ToolExecution { .. } | CoreError::Tool(_))) => {
                println!("\n{}", format_error_for_cli(&e));
            }
            Err(e) => return Err(e),
        }
    }
}

async fn ask_params(
    input: &mut Lines<BufReader<Stdin>>,
    recommendation: &ToolRecommendation,
) -> Option<Value> {
    loop {
        print!("   Enter to run, a JSON object to override parameters, q to quit: ");
        let _ = std::io::stdout().flush();

        let line = input.next_line().await.ok().flatten()?;
        let mut params = recommendation.default_params();
        match line.trim() {
            "" => return Some(params),
            "q" | "quit" => return None,
            raw => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(overrides)) => {
                    if let Value::Object(map) = &mut params {
                        map.extend(overrides);
                    }
                    return Some(params);
                }
                _ => println!("   ✏️ Not a JSON object, try again"),
            },
        }
    }
}

fn spawn_progress_printer(
    mut feed: DiagnosisFeed,
    done: CancellationToken,
    total: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                received = feed.next() => match received {
                    Some(event) => print_progress(&event, total),
                    None => break,
                },
                _ = done.cancelled() => {
                    for event in feed.drain() {
                        print_progress(&event, total);
                    }
                    break;
                }
            }
        }
    })
}

fn print_progress(event: &DiagnosisEvent, total: usize) {
    match event {
        DiagnosisEvent::StepStarted { step, tool, .. } => {
            println!("\n▶️  Step {}/{}: {}", step + 1, total, tool);
        }
        DiagnosisEvent::StepCompleted { duration_ms, .. } => {
            println!("   finished in {} ms", duration_ms);
        }
        DiagnosisEvent::StepFailed { step, tool, error, .. } => {
            println!("❌ Step {} ({}) failed: {}", step + 1, tool, error);
        }
        DiagnosisEvent::EvaluationReady { summary, source, .. } => {
            println!("   🔎 {}{}", summary, source_tag(*source));
        }
        DiagnosisEvent::PlanReady { .. } | DiagnosisEvent::DiagnosisCompleted { .. } => {}
    }
}

fn print_plan(plan: &DiagnosticPlan) {
    if plan.is_fallback {
        println!("📋 Plan (default checks; the model gave no usable plan)");
    } else {
        println!("📋 Plan ({} urgency)", plan.urgency.as_str());
    }
    if !plan.analysis.is_empty() {
        println!("   {}", plan.analysis);
    }
    for index in 0..plan.total_steps() {
        if let Some((tool, reason)) = plan.step(index) {
            if reason.is_empty() {
                println!("   {}. {}", index + 1, tool);
            } else {
                println!("   {}. {}: {}", index + 1, tool, reason);
            }
        }
    }
}

fn print_recommendation(recommendation: &ToolRecommendation) {
    println!(
        "\n▶️  Step {}/{}: {} ({}, ~{}s)",
        recommendation.step + 1,
        recommendation.total_steps,
        recommendation.name,
        recommendation.id,
        recommendation.estimated_duration_secs
    );
    if !recommendation.reasoning.is_empty() {
        println!("   {}", recommendation.reasoning);
    }
    println!("   params: {}", recommendation.default_params());
}

fn print_evaluation(evaluation: &EvaluationResult) {
    println!("   🔎 {}{}", evaluation.summary, source_tag(evaluation.source));
    for finding in &evaluation.findings {
        println!("      • {}", finding);
    }
    for recommendation in &evaluation.recommendations {
        println!("      💡 {}", recommendation);
    }
}

fn print_report(report: &FinalReport) {
    if report.is_error {
        println!("\n⚠️  Diagnosis finished after {} step(s)", report.executed_steps);
    } else {
        println!("\n📝 Diagnosis report ({} step(s))", report.executed_steps);
    }
    println!("\n{}", report.text);
}

fn source_tag(source: EvaluationSource) -> &'static str {
    match source {
        EvaluationSource::Heuristic => "",
        EvaluationSource::Model => " (model)",
        EvaluationSource::Fallback => " (no detailed analysis)",
    }
}
