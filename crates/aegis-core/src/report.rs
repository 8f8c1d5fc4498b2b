//! Report rendering for the operational log and the notification channel

use aegis_model::{Plan, PolicyVerdict, Report};
use std::fmt::Write as _;
use tracing::info;

fn result_icon(success: bool) -> char {
    if success {
        '✓'
    } else {
        '✗'
    }
}

/// Notification text for a finished transaction
#[must_use]
pub fn render_report(report: &Report) -> String {
    let status = if report.verified { "✅" } else { "❌" };
    let rollback = if report.rollback_triggered {
        " 🔄 Rollback triggered!"
    } else {
        ""
    };

    let mut out = String::new();
    let _ = writeln!(out, "{status} *Aegis Remediation Report*{rollback}");
    let _ = writeln!(out, "*Root Cause:* {}", report.plan.root_cause);
    let _ = writeln!(out, "*Confidence:* {:.0}%", report.plan.confidence * 100.0);
    let _ = writeln!(out, "*Duration:* {:.1}s", report.total_duration_seconds);
    let _ = writeln!(out, "*Actions:*");
    if report.action_results.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for r in &report.action_results {
        let _ = writeln!(
            out,
            "  {} `{}` → `{}`",
            result_icon(r.success),
            r.action.action_type,
            r.action.target
        );
    }
    let _ = write!(out, "*Summary:* {}", report.plan.summary);
    out
}

/// Notification text for a denied plan
#[must_use]
pub fn render_denial(verdict: &PolicyVerdict, plan: &Plan) -> String {
    let mut out = String::from("⛔ Aegis: policy blocked remediation\n");
    let _ = writeln!(out, "Reason: {}", verdict.reason);
    for denied in &verdict.denied_actions {
        let _ = writeln!(out, "  - {denied}");
    }
    let _ = write!(out, "Root cause: {}", plan.root_cause);
    out
}

/// Summary of a finished transaction in the operational log
pub fn log_report(report: &Report) {
    let status = if report.verified { "SUCCESS" } else { "FAILED" };
    info!(
        incident = %report.incident.id(),
        status,
        rollback = report.rollback_triggered,
        duration_secs = report.total_duration_seconds,
        root_cause = %report.plan.root_cause,
        actions = report.action_results.len(),
        "Remediation finished"
    );
    for r in &report.action_results {
        info!(
            success = r.success,
            action_type = %r.action.action_type,
            resource = %r.action.target,
            "  {} {} → {}",
            result_icon(r.success),
            r.action.action_type,
            r.action.target
        );
    }
}
