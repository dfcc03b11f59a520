//! `netpulse monitor`: follow a capture session to a terminal state

use crate::app::{self, AppConfig};
use netpulse_core::{CaptureSession, MonitorEvent, SessionMonitor};
use std::collections::HashSet;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

pub async fn run(
    config: &AppConfig,
    session_id: &str,
    target: Option<String>,
    mode: Option<String>,
) -> anyhow::Result<()> {
    let monitor = app::build_monitor(config)?;
    let mut events = monitor.subscribe();

    let mut session = CaptureSession::new(session_id, &config.monitor.session_defaults());
    if let Some(target) = target {
        session = session.with_target(target);
    }
    if let Some(mode) = mode {
        session = session.with_mode(mode);
    }

    println!("📡 Monitoring capture {} (Ctrl+C to stop)\n", session_id);
    monitor.start_monitoring(session).await;

    let pending = HashSet::from([session_id.to_string()]);
    follow(&monitor, &mut events, pending).await;
    monitor.shutdown().await;
    Ok(())
}

/// Print monitor events until every id in `pending` reaches a terminal event.
///
/// Ctrl+C stops the remaining sessions.
pub async fn follow(
    monitor: &SessionMonitor,
    events: &mut broadcast::Receiver<MonitorEvent>,
    mut pending: HashSet<String>,
) {
    while !pending.is_empty() {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                for id in pending.drain() {
                    monitor.stop_monitoring(&id).await;
                    println!("⏹️  Stopped capture {}", id);
                }
            }
            received = events.recv() => match received {
                Ok(event) => {
                    if !pending.contains(event.session_id()) {
                        continue;
                    }
                    print_event(&event);
                    if event.is_terminal() {
                        pending.remove(event.session_id());
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Monitor events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

fn print_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::Started { session_id } => println!("▶️  {} started", session_id),
        MonitorEvent::StatusUpdated {
            session_id,
            packet_count,
            elapsed_time,
            remaining_time,
        } => match remaining_time {
            Some(remaining) => println!(
                "   {}: {} packets, {:.0}s elapsed, {:.0}s left",
                session_id, packet_count, elapsed_time, remaining
            ),
            None => println!(
                "   {}: {} packets, {:.0}s elapsed",
                session_id, packet_count, elapsed_time
            ),
        },
        MonitorEvent::Completed {
            session_id,
            analysis,
        } => {
            println!("✅ {} completed\n", session_id);
            match serde_json::to_string_pretty(analysis) {
                Ok(text) => println!("{}", text),
                Err(_) => println!("{}", analysis),
            }
        }
        MonitorEvent::AnalysisFailed { session_id, error } => {
            println!("⚠️  {} finished but analysis failed: {}", session_id, error);
        }
        MonitorEvent::Failed {
            session_id,
            error,
            retry_count,
        } => println!(
            "❌ {} monitoring failed after {} retries: {}",
            session_id, retry_count, error
        ),
        MonitorEvent::Stopped { session_id } => println!("⏹️  {} stopped", session_id),
    }
}
