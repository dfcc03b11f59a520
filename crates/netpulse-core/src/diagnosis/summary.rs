//! Final-summary generation

use super::core::Diagnostician;
use super::types::{DiagnosisSession, DiagnosisState, FinalReport};
use crate::event_bus::DiagnosisEvent;
use netpulse_llm::util::{fill_template, truncate_safe};
use netpulse_llm::CompletionRequest;
use std::fmt::Write as _;
use tracing::{info, instrument, warn};

/// Prompt for the closing report; `{problem}` and `{history}` are substituted
pub const SUMMARY_PROMPT: &str = r#"You are a network diagnosis assistant. A user reported:
"{problem}"

These diagnostic tests were run, in order:
{history}

Write a short final report for a non-expert:
1. What the tests show
2. The most likely cause
3. Concrete next steps, most effective first"#;

impl Diagnostician {
    /// Enter `Completed` and produce the final report.
    ///
    /// The session is complete even when the summary call fails; the report
    /// is then flagged `is_error`.
    #[instrument(skip(self, session), fields(diagnosis_id = %session.id()))]
    pub(super) async fn complete(&self, session: &mut DiagnosisSession) -> FinalReport {
        session.state = DiagnosisState::Completed;
        session.context.mark_complete();

        let executed_steps = session.context.executed_tools().len();
        let prompt = self.summary_prompt(session);
        let request = CompletionRequest::prompt(prompt, self.config.summary_temperature)
            .with_model(self.config.planner.default_model.as_deref());

        let outcome = tokio::time::timeout(self.config.summary_timeout, self.provider.complete(request)).await;
        let report = match outcome {
            Ok(Ok(response)) if !response.text.trim().is_empty() => FinalReport {
                text: response.text.trim().to_string(),
                is_error: false,
                executed_steps,
            },
            Ok(Ok(_)) => Self::error_report("the model returned an empty report", executed_steps),
            Ok(Err(e)) => {
                warn!(error = %e, "Final summary failed");
                Self::error_report(&e.to_string(), executed_steps)
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.config.summary_timeout.as_secs(),
                    "Final summary timed out"
                );
                Self::error_report("the summary request timed out", executed_steps)
            }
        };

        info!(executed_steps, is_error = report.is_error, "Diagnosis completed");
        self.emit(DiagnosisEvent::DiagnosisCompleted {
            diagnosis_id: session.id(),
            executed_steps,
            is_error: report.is_error,
        });

        session.final_report = Some(report.clone());
        report
    }

    fn summary_prompt(&self, session: &DiagnosisSession) -> String {
        let mut history = String::new();
        for (index, record) in session.context.executed_tools().iter().enumerate() {
            let result = serde_json::to_string(&record.result).unwrap_or_else(|_| record.result.to_string());
            let _ = writeln!(
                history,
                "{}. {} ({}): {}",
                index + 1,
                record.name,
                record.id,
                truncate_safe(&result, self.config.max_result_bytes)
            );
        }
        if history.is_empty() {
            history.push_str("(no tests were run)");
        }

        fill_template(
            SUMMARY_PROMPT,
            &[
                ("history", history.trim_end()),
                ("problem", session.context.original_problem()),
            ],
        )
    }

    fn error_report(reason: &str, executed_steps: usize) -> FinalReport {
        FinalReport {
            text: format!(
                "The final summary could not be generated ({}). {} diagnostic step(s) were completed; review the individual results above.",
                reason, executed_steps
            ),
            is_error: true,
            executed_steps,
        }
    }
}
