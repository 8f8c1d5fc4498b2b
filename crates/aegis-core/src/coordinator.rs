//! Single-flight remediation coordinator
//!
//! One incident becomes one transaction: context, plan, policy, execute,
//! verify, optional rollback, report. At most one transaction is in flight;
//! incidents arriving meanwhile are dropped, never queued.
//!
//! # Critical Invariants
//!
//! - Admission is a single compare-and-swap on the phase flag.
//! - A denied plan never reaches the executor.
//! - No more than [`MAX_ACTIONS`] actions are ever submitted or executed.
//! - The phase returns to [`Phase::Idle`] on every exit path, including
//!   errors and panics inside the transaction.

use crate::collaborator::{ContextProvider, PlanProducer};
use crate::error::AegisError;
use crate::phase::{validate_transition, Phase, PhaseError};
use crate::report::{log_report, render_denial, render_report};
use crate::stats::{SessionStats, StatsCounters};
use aegis_executor::{ActionExecutor, Notifier};
use aegis_model::text::truncate_chars;
use aegis_model::{
    Incident, Plan, PolicyVerdict, Report, DEFAULT_NAMESPACE, DEFAULT_RAW_LOG_BUDGET, MAX_ACTIONS,
};
use aegis_observe::OutcomeVerifier;
use aegis_policy::{PolicyContext, PolicyGate};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Transaction tuning
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorSettings {
    /// Retrieved context is cut to this many characters
    pub context_budget_chars: usize,
    /// Raw logs are cut to this many bytes before retrieval
    pub raw_log_budget_bytes: usize,
    /// Entries requested from the context provider
    pub retrieval_k: usize,
    /// Undo reversible actions when verification fails
    pub rollback_on_failure: bool,
    /// Namespace reported to the policy gate
    pub default_namespace: String,
    /// Deadline for context retrieval
    pub context_timeout: Duration,
    /// Deadline for plan production
    pub plan_timeout: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            context_budget_chars: 4000,
            raw_log_budget_bytes: DEFAULT_RAW_LOG_BUDGET,
            retrieval_k: 3,
            rollback_on_failure: true,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            context_timeout: Duration::from_secs(10),
            plan_timeout: Duration::from_secs(120),
        }
    }
}

/// Everything a coordinator is built from
pub struct CoordinatorParts {
    /// Prior-knowledge lookup
    pub context: Arc<dyn ContextProvider>,
    /// Plan producer
    pub planner: Arc<dyn PlanProducer>,
    /// Policy gate
    pub gate: PolicyGate,
    /// Action executor
    pub executor: ActionExecutor,
    /// Outcome verifier
    pub verifier: OutcomeVerifier,
    /// Report and denial channel
    pub notifier: Arc<dyn Notifier>,
    /// Tuning
    pub settings: CoordinatorSettings,
}

/// How an incident was disposed of
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Another transaction was in flight
    Dropped,
    /// Policy denied the plan; nothing executed
    Denied {
        /// The verdict
        verdict: PolicyVerdict,
        /// The plan that was denied
        plan: Box<Plan>,
    },
    /// Plan executed and verified (or not)
    Completed(Box<Report>),
    /// Transaction aborted by an unexpected error; no report
    Failed(String),
}

impl Disposition {
    /// Report of a completed transaction
    #[must_use]
    pub fn report(&self) -> Option<&Report> {
        match self {
            Self::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// The remediation state machine
pub struct Coordinator {
    context: Arc<dyn ContextProvider>,
    planner: Arc<dyn PlanProducer>,
    gate: PolicyGate,
    executor: ActionExecutor,
    verifier: OutcomeVerifier,
    notifier: Arc<dyn Notifier>,
    settings: CoordinatorSettings,
    phase: AtomicU8,
    idle: Notify,
    stats: StatsCounters,
}

/// Returns the coordinator to idle however the transaction ends
struct IdleGuard<'a> {
    coordinator: &'a Coordinator,
}

impl Drop for IdleGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.phase.store(Phase::Idle as u8, Ordering::Release);
        self.coordinator.idle.notify_waiters();
    }
}

impl Coordinator {
    /// Assemble a coordinator
    #[must_use]
    pub fn new(parts: CoordinatorParts) -> Self {
        Self {
            context: parts.context,
            planner: parts.planner,
            gate: parts.gate,
            executor: parts.executor,
            verifier: parts.verifier,
            notifier: parts.notifier,
            settings: parts.settings,
            phase: AtomicU8::new(Phase::Idle as u8),
            idle: Notify::new(),
            stats: StatsCounters::default(),
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire)).unwrap_or(Phase::Idle)
    }

    /// Whether a transaction is in flight
    #[inline]
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.phase() != Phase::Idle
    }

    /// Outcome counters since startup
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.stats.snapshot()
    }

    /// Tuning in use
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// Policy gate in use
    #[inline]
    #[must_use]
    pub fn gate(&self) -> &PolicyGate {
        &self.gate
    }

    /// Resolve once no transaction is in flight
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_processing() {
                return;
            }
            notified.await;
        }
    }

    /// Run one incident through the full transaction
    ///
    /// Returns [`Disposition::Dropped`] immediately if another transaction
    /// is in flight. Never panics and never returns with the phase left in
    /// [`Phase::Processing`].
    pub async fn handle_incident(&self, incident: Incident) -> Disposition {
        if self
            .phase
            .compare_exchange(
                Phase::Idle as u8,
                Phase::Processing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            warn!(
                incident = %incident.id(),
                error_rate = incident.error_rate(),
                "Remediation in progress; dropping duplicate incident"
            );
            return Disposition::Dropped;
        }
        let _guard = IdleGuard { coordinator: self };
        self.stats.accepted();

        let span = info_span!("remediation", incident = %incident.id());
        let outcome = AssertUnwindSafe(self.transact(incident).instrument(span))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(disposition)) => disposition,
            Ok(Err(e)) => {
                error!(error = %e, "Remediation transaction failed");
                self.stats.failed();
                Disposition::Failed(e.to_string())
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(panic = %message, "Remediation transaction panicked");
                self.stats.failed();
                Disposition::Failed(format!("transaction panicked: {message}"))
            }
        }
    }

    async fn transact(&self, incident: Incident) -> Result<Disposition, AegisError> {
        let started = Instant::now();
        info!(
            error_rate = incident.error_rate(),
            source = incident.source(),
            "Incident accepted"
        );

        let context = self.retrieve_context(&incident).await;
        let plan = self.produce_plan(&incident, &context).await;

        let policy_ctx =
            PolicyContext::new(self.settings.default_namespace.clone(), incident.error_rate());
        let verdict = self.gate.evaluate(&plan, &policy_ctx).await;
        if verdict.is_denied() {
            error!(
                reason = %verdict.reason,
                denied = ?verdict.denied_actions,
                "Policy denied remediation plan"
            );
            self.notifier.send(&render_denial(&verdict, &plan)).await;
            self.stats.denied();
            self.advance(Phase::Done)?;
            return Ok(Disposition::Denied {
                verdict,
                plan: Box::new(plan),
            });
        }
        info!(reason = %verdict.reason, actions = plan.actions.len(), "Policy approved plan");

        let action_results = self.executor.execute_all(&plan.actions).await;
        let verified = self.verifier.verify(&incident).await;

        let rollback_triggered = !verified && self.settings.rollback_on_failure;
        if rollback_triggered {
            warn!("Verification failed; rolling back reversible actions");
            let undone = self.executor.rollback(&plan).await;
            let failed = undone.iter().filter(|r| !r.success).count();
            info!(undone = undone.len(), failed, "Rollback finished");
        }

        let report = Report {
            incident,
            plan,
            verdict,
            action_results,
            verified,
            rollback_triggered,
            total_duration_seconds: started.elapsed().as_secs_f64(),
        };
        log_report(&report);
        self.notifier.send(&render_report(&report)).await;

        if verified {
            self.stats.verified();
        }
        if rollback_triggered {
            self.stats.rolled_back();
            self.advance(Phase::DoneWithRollback)?;
        } else {
            self.advance(Phase::Done)?;
        }
        Ok(Disposition::Completed(Box::new(report)))
    }

    async fn retrieve_context(&self, incident: &Incident) -> String {
        let query = incident.logs_within(self.settings.raw_log_budget_bytes);
        let after = self.settings.context_timeout;
        match timeout(after, self.context.query(query, self.settings.retrieval_k)).await {
            Ok(Ok(text)) => {
                let text = truncate_chars(&text, self.settings.context_budget_chars);
                debug!(chars = text.chars().count(), "Context retrieved");
                text.to_string()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Context retrieval failed; continuing without context");
                String::new()
            }
            Err(_) => {
                warn!(?after, "Context retrieval timed out; continuing without context");
                String::new()
            }
        }
    }

    async fn produce_plan(&self, incident: &Incident, context: &str) -> Plan {
        let after = self.settings.plan_timeout;
        let produced = match timeout(after, self.planner.produce(incident, context)).await {
            Ok(result) => result,
            Err(_) => Err(AegisError::Timeout {
                service: "reasoning",
                after,
            }),
        };
        let checked = produced.and_then(|plan| {
            plan.validate()?;
            Ok(plan)
        });

        let mut plan = match checked {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "Plan production failed; using safe fallback plan");
                Plan::safe_fallback()
            }
        };

        let dropped = plan.enforce_action_cap();
        if dropped > 0 {
            warn!(dropped, max = MAX_ACTIONS, "Plan exceeded action cap; truncated");
        }
        info!(
            root_cause = %plan.root_cause,
            confidence = plan.confidence,
            actions = plan.actions.len(),
            "Plan ready"
        );
        plan
    }

    fn advance(&self, to: Phase) -> Result<(), PhaseError> {
        let from = self.phase();
        validate_transition(from, to)?;
        self.phase.store(to as u8, Ordering::Release);
        debug!(?from, ?to, "Phase transition");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::{MockContextProvider, MockPlanProducer};
    use aegis_executor::{
        BackendError, CommandOutput, ControlPlane, ExecutorSettings, HandlerTable, ResourceLimits,
    };
    use aegis_model::{Action, ActionType, RiskLevel};
    use aegis_observe::{
        DemoSentinel, ErrorRateReader, MetricsSource, SourceError, VerifierSettings,
    };
    use std::sync::Mutex;

    struct Healthy;

    #[async_trait::async_trait]
    impl MetricsSource for Healthy {
        async fn error_rate(&self) -> Result<Option<f64>, SourceError> {
            Ok(Some(0.0))
        }
    }

    struct Inert;

    #[async_trait::async_trait]
    impl ControlPlane for Inert {
        async fn rollout_restart(&self, _: &str, _: &str) -> Result<CommandOutput, BackendError> {
            Ok(CommandOutput::ok(""))
        }
        async fn scale(&self, _: &str, _: &str, _: u64) -> Result<CommandOutput, BackendError> {
            Ok(CommandOutput::ok(""))
        }
        async fn patch_limits(
            &self,
            _: &str,
            _: &str,
            _: &ResourceLimits,
        ) -> Result<CommandOutput, BackendError> {
            Ok(CommandOutput::ok(""))
        }
        async fn exec(&self, _: &str, _: &str, _: &str) -> Result<CommandOutput, BackendError> {
            Ok(CommandOutput::ok(""))
        }
        async fn rollout_undo(&self, _: &str, _: &str) -> Result<CommandOutput, BackendError> {
            Ok(CommandOutput::ok(""))
        }
    }

    struct Exploding;

    #[async_trait::async_trait]
    impl PlanProducer for Exploding {
        async fn produce(&self, _: &Incident, _: &str) -> Result<Plan, AegisError> {
            panic!("reasoning exploded")
        }
    }

    #[derive(Default)]
    struct Inbox(Mutex<Vec<String>>);

    #[async_trait::async_trait]
    impl Notifier for Inbox {
        async fn send(&self, text: &str) -> bool {
            self.0.lock().unwrap().push(text.to_string());
            true
        }
    }

    fn quiet_context() -> MockContextProvider {
        let mut context = MockContextProvider::new();
        context.expect_query().returning(|_, _| Ok(String::new()));
        context
    }

    fn coordinator(planner: impl PlanProducer + 'static, inbox: Arc<Inbox>) -> Coordinator {
        let settings = Arc::new(ExecutorSettings::default());
        let reader = ErrorRateReader::new(
            Arc::new(Healthy),
            DemoSentinel::new("/nonexistent/aegis-sentinel"),
            Duration::from_secs(1),
        );
        Coordinator::new(CoordinatorParts {
            context: Arc::new(quiet_context()),
            planner: Arc::new(planner),
            gate: PolicyGate::local_only(),
            executor: ActionExecutor::new(HandlerTable::new(), Arc::new(Inert), settings),
            verifier: OutcomeVerifier::new(reader, VerifierSettings::default()),
            notifier: inbox,
            settings: CoordinatorSettings::default(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn producer_failure_uses_fallback_plan() {
        let mut planner = MockPlanProducer::new();
        planner
            .expect_produce()
            .returning(|_, _| Err(AegisError::collaborator("reasoning", "connection refused")));
        let inbox = Arc::new(Inbox::default());
        let coordinator = coordinator(planner, inbox.clone());

        let disposition = coordinator.handle_incident(Incident::new(0.15, "", "test")).await;
        let report = disposition.report().unwrap();
        assert_eq!(report.plan, Plan::safe_fallback());
        assert!(report.action_results.is_empty());
        assert!(report.verified);
        assert_eq!(coordinator.phase(), Phase::Idle);
        assert_eq!(inbox.0.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_plan_is_replaced() {
        let mut planner = MockPlanProducer::new();
        planner.expect_produce().returning(|_, _| {
            let mut plan = Plan::safe_fallback();
            plan.confidence = 1.5;
            Ok(plan)
        });
        let coordinator = coordinator(planner, Arc::new(Inbox::default()));

        let disposition = coordinator.handle_incident(Incident::new(0.15, "", "test")).await;
        assert_eq!(disposition.report().unwrap().plan.confidence, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn denial_notifies_and_skips_execution() {
        let mut planner = MockPlanProducer::new();
        planner.expect_produce().returning(|_, _| {
            let mut plan = Plan::safe_fallback();
            plan.actions =
                vec![Action::new(ActionType::RestartWorkload, "api").with_risk(RiskLevel::High)];
            Ok(plan)
        });
        let inbox = Arc::new(Inbox::default());
        let coordinator = coordinator(planner, inbox.clone());

        let disposition = coordinator.handle_incident(Incident::new(0.15, "", "test")).await;
        assert!(matches!(disposition, Disposition::Denied { .. }));
        let messages = inbox.0.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("high-risk blocked"));
        assert_eq!(coordinator.stats().denied, 1);
        assert_eq!(coordinator.stats().verified, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn panic_resets_to_idle() {
        let coordinator = coordinator(Exploding, Arc::new(Inbox::default()));

        let disposition = coordinator.handle_incident(Incident::new(0.15, "", "test")).await;
        match disposition {
            Disposition::Failed(message) => assert!(message.contains("reasoning exploded")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(coordinator.phase(), Phase::Idle);
        assert_eq!(coordinator.stats().failed, 1);
        coordinator.wait_idle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn busy_coordinator_drops_incident() {
        let planner = MockPlanProducer::new();
        let coordinator = coordinator(planner, Arc::new(Inbox::default()));
        coordinator.phase.store(Phase::Processing as u8, Ordering::Release);

        let disposition = coordinator.handle_incident(Incident::new(0.15, "", "test")).await;
        assert_eq!(disposition, Disposition::Dropped);
        assert_eq!(coordinator.stats(), SessionStats::default());
        assert_eq!(coordinator.phase(), Phase::Processing);
    }
}
