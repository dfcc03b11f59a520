//! State transitions of a diagnosis session

use super::core::Diagnostician;
use super::types::{
    DiagnosisSession, DiagnosisState, DiagnosticContext, ExecutedToolRecord, FinalReport,
    NextStep, StepOutcome, ToolRecommendation,
};
use crate::error::{Error, Result};
use crate::evaluator::{EvaluationContext, EvaluationResult};
use crate::monitor::CaptureSession;
use crate::event_bus::DiagnosisEvent;
use crate::planner::DiagnosticPlan;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

impl Diagnostician {
    /// Create a session and submit a problem in one call
    pub async fn start(&self, problem: &str) -> Result<DiagnosisSession> {
        let mut session = DiagnosisSession::new();
        self.submit_problem(&mut session, problem).await?;
        Ok(session)
    }

    /// `Idle -> Planning -> AwaitingStep`
    ///
    /// Fails only for an empty problem or a session that is not idle; a
    /// failed model call still produces the fallback plan.
    #[instrument(skip(self, session, problem), fields(diagnosis_id = %session.id()))]
    pub async fn submit_problem<'s>(
        &self,
        session: &'s mut DiagnosisSession,
        problem: &str,
    ) -> Result<&'s DiagnosticPlan> {
        if session.state != DiagnosisState::Idle {
            return Err(Error::InvalidState(format!(
                "a problem was already submitted (state: {})",
                session.state.as_str()
            )));
        }
        let problem = problem.trim();
        if problem.is_empty() {
            return Err(Error::InvalidInput(
                "the problem description is empty".to_string(),
            ));
        }

        session.state = DiagnosisState::Planning;
        let plan = match self.planner.build_plan(problem).await {
            Ok(plan) => plan,
            Err(e) => {
                session.state = DiagnosisState::Idle;
                return Err(e);
            }
        };

        session.context = DiagnosticContext::start(problem, plan.total_steps());
        session.state = DiagnosisState::AwaitingStep;

        info!(
            steps = plan.total_steps(),
            fallback = plan.is_fallback,
            "Diagnosis planned"
        );
        self.emit(DiagnosisEvent::PlanReady {
            diagnosis_id: session.id(),
            tool_sequence: plan.tool_sequence().to_vec(),
            is_fallback: plan.is_fallback,
        });

        Ok(session.plan.insert(plan))
    }

    /// `AwaitingStep -> AwaitingStep | Completed`
    ///
    /// Returns the next recommendation, or completes the diagnosis once every
    /// planned step has run. A completed session keeps returning its report.
    #[instrument(skip(self, session), fields(diagnosis_id = %session.id()))]
    pub async fn next_step(&self, session: &mut DiagnosisSession) -> Result<NextStep> {
        match session.state {
            DiagnosisState::Completed => {
                let report = session
                    .final_report
                    .clone()
                    .ok_or_else(|| Error::InvalidState("completed without a report".to_string()))?;
                return Ok(NextStep::Completed(report));
            }
            DiagnosisState::AwaitingStep => {}
            other => {
                return Err(Error::InvalidState(format!(
                    "cannot request the next step while {}",
                    other.as_str()
                )))
            }
        }

        let step = session.context.current_step();
        if step >= session.effective_total_steps() {
            let report = self.complete(session).await;
            return Ok(NextStep::Completed(report));
        }

        let plan = session
            .plan
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no plan for this session".to_string()))?;
        let (tool_id, reason) = plan
            .step(step)
            .ok_or_else(|| Error::InvalidState(format!("plan has no step {}", step)))?;

        let definition = self
            .runner
            .catalog()
            .resolve(tool_id)
            .ok_or_else(|| {
                warn!(step, tool_id, "Plan references an unknown tool");
                Error::PlanIntegrity {
                    step,
                    tool_id: tool_id.to_string(),
                }
            })?;

        Ok(NextStep::Tool(ToolRecommendation::from_definition(
            definition,
            reason,
            step,
            session.effective_total_steps(),
        )))
    }

    /// `AwaitingStep -> Executing -> Evaluating -> AwaitingStep | Completed`
    ///
    /// A capture session started by the tool goes to the session monitor
    /// before evaluation. The last planned step completes the diagnosis and
    /// carries the final report. A failed tool call leaves the session in
    /// `AwaitingStep` with the cursor unchanged so the step can be retried.
    #[instrument(skip(self, session, params), fields(diagnosis_id = %session.id(), tool = %tool_id))]
    pub async fn execute_tool(
        &self,
        session: &mut DiagnosisSession,
        tool_id: &str,
        params: Value,
    ) -> Result<StepOutcome> {
        match session.state {
            DiagnosisState::AwaitingStep => {}
            DiagnosisState::Completed => {
                return Err(Error::InvalidState(
                    "the diagnosis is already complete".to_string(),
                ))
            }
            other => {
                return Err(Error::InvalidState(format!(
                    "cannot execute a tool while {}",
                    other.as_str()
                )))
            }
        }

        let step = session.context.current_step();
        let total = session.effective_total_steps();
        if step >= total {
            return Err(Error::InvalidState(
                "the plan has no remaining steps".to_string(),
            ));
        }
        if let Some((planned, _)) = session.plan.as_ref().and_then(|p| p.step(step)) {
            if planned != tool_id {
                debug!(planned, requested = tool_id, "Executing a tool other than the planned one");
            }
        }

        session.state = DiagnosisState::Executing;
        self.emit(DiagnosisEvent::StepStarted {
            diagnosis_id: session.id(),
            step,
            tool: tool_id.to_string(),
        });

        let result = match self.runner.execute(tool_id, params).await {
            Ok(result) if result.success => result,
            Ok(result) => {
                let message = result
                    .error
                    .unwrap_or_else(|| "the tool reported failure".to_string());
                return Err(self.fail_step(
                    session,
                    step,
                    tool_id,
                    Error::ToolExecution {
                        tool: result.tool.id().to_string(),
                        message,
                    },
                ));
            }
            Err(e) => return Err(self.fail_step(session, step, tool_id, Error::Tool(e))),
        };

        let capture_session = result.session_id().map(str::to_string);
        let capture_monitored = match &capture_session {
            Some(id) => self.monitor_capture(id, &result.params).await,
            None => false,
        };

        let definition = self.runner.catalog().get(result.tool);
        let record = ExecutedToolRecord {
            id: result.tool.id().to_string(),
            name: definition.map_or_else(|| result.tool.id().to_string(), |d| d.name.clone()),
            capture_session: capture_session.clone(),
            result: result.output,
            timestamp: Utc::now(),
            duration_ms: result.duration_ms,
        };

        session.context.record(record.clone());
        session.state = DiagnosisState::Evaluating;
        self.emit(DiagnosisEvent::StepCompleted {
            diagnosis_id: session.id(),
            step,
            tool: record.id.clone(),
            duration_ms: record.duration_ms,
        });

        let evaluation = self.evaluate_step(session, &record, step, total).await;

        session.last_evaluation = Some(evaluation.clone());
        session.state = DiagnosisState::AwaitingStep;
        self.emit(DiagnosisEvent::EvaluationReady {
            diagnosis_id: session.id(),
            step,
            summary: evaluation.summary.clone(),
            source: evaluation.source,
            needs_next_step: evaluation.needs_next_step,
        });

        info!(
            step,
            tool = %record.id,
            source = ?evaluation.source,
            needs_next_step = evaluation.needs_next_step,
            "Step evaluated"
        );

        let final_report = if step + 1 >= total {
            Some(self.complete(session).await)
        } else {
            None
        };

        Ok(StepOutcome {
            step,
            capture_session,
            capture_monitored,
            record,
            evaluation,
            final_report,
        })
    }

    /// Walk the remaining plan with `params_for` choosing each step's parameters.
    ///
    /// Stops at the first tool failure, leaving the session retryable.
    pub async fn run_to_completion<F>(
        &self,
        session: &mut DiagnosisSession,
        mut params_for: F,
    ) -> Result<FinalReport>
    where
        F: FnMut(&ToolRecommendation) -> Value + Send,
    {
        loop {
            match self.next_step(session).await? {
                NextStep::Tool(recommendation) => {
                    let params = params_for(&recommendation);
                    let outcome = self
                        .execute_tool(session, &recommendation.id, params)
                        .await?;
                    if let Some(report) = outcome.final_report {
                        return Ok(report);
                    }
                }
                NextStep::Completed(report) => return Ok(report),
            }
        }
    }

    async fn monitor_capture(&self, session_id: &str, params: &Value) -> bool {
        let Some((monitor, defaults)) = &self.capture_monitor else {
            return false;
        };
        let started = monitor
            .start_monitoring(CaptureSession::from_tool_params(session_id, params, defaults))
            .await;
        if started {
            info!(session_id, "Capture session handed to the monitor");
        }
        started
    }

    async fn evaluate_step(
        &self,
        session: &DiagnosisSession,
        record: &ExecutedToolRecord,
        step: usize,
        total: usize,
    ) -> EvaluationResult {
        let context = EvaluationContext {
            problem: session.context.original_problem(),
            step_index: step,
            total_steps: total,
        };
        self.evaluator
            .evaluate(&record.id, &record.result, &context)
            .await
    }

    fn fail_step(
        &self,
        session: &mut DiagnosisSession,
        step: usize,
        tool_id: &str,
        error: Error,
    ) -> Error {
        warn!(step, tool = tool_id, error = %error, "Step failed");
        session.state = DiagnosisState::AwaitingStep;
        self.emit(DiagnosisEvent::StepFailed {
            diagnosis_id: session.id(),
            step,
            tool: tool_id.to_string(),
            error: error.to_string(),
        });
        error
    }
}
