//! Testing utilities for the Aegis workspace
//!
//! Scripted collaborators that record what they were asked to do, plus
//! fixtures for assembling a coordinator around them.

#![allow(missing_docs)]

use aegis_core::{
    AegisError, ContextProvider, Coordinator, CoordinatorParts, CoordinatorSettings, PlanProducer,
};
use aegis_executor::{
    ActionExecutor, BackendError, Backends, CommandOutput, ControlPlane, ExecutorSettings,
    HandlerTable, InfraTool, Notifier, RemoteShell, ResourceLimits,
};
use aegis_model::{Action, ActionType, Incident, Plan, PolicyVerdict, RiskLevel};
use aegis_observe::{
    DemoSentinel, ErrorRateReader, LogSource, MetricsSource, OutcomeVerifier, SourceError,
    VerifierSettings,
};
use aegis_policy::{PolicyError, PolicyEvaluator, PolicyGate, PolicyInput};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Metrics source that replays a fixed sequence, repeating the last reading
pub struct ScriptedMetrics {
    readings: Mutex<VecDeque<Option<f64>>>,
    last: Mutex<Option<f64>>,
    calls: AtomicUsize,
}

impl ScriptedMetrics {
    pub fn new(readings: impl IntoIterator<Item = f64>) -> Self {
        Self {
            readings: Mutex::new(readings.into_iter().map(Some).collect()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always reports `rate`
    pub fn constant(rate: f64) -> Self {
        Self::new([rate])
    }

    /// Source with no data at all
    pub fn empty() -> Self {
        Self::new([])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MetricsSource for ScriptedMetrics {
    async fn error_rate(&self) -> Result<Option<f64>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.readings.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(*last)
    }
}

/// Log source returning fixed lines
pub struct StaticLogs(pub Vec<String>);

impl StaticLogs {
    pub fn new(lines: &[&str]) -> Self {
        Self(lines.iter().map(|l| (*l).to_string()).collect())
    }
}

#[async_trait::async_trait]
impl LogSource for StaticLogs {
    async fn recent_lines(
        &self,
        _lookback: Duration,
        limit: usize,
    ) -> Result<Vec<String>, SourceError> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
}

/// Control plane that records every call as `"<verb> <namespace>/<deployment>"`
#[derive(Default)]
pub struct RecordingControlPlane {
    calls: Mutex<Vec<String>>,
}

impl RecordingControlPlane {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Only the `rollout undo` calls
    pub fn undos(&self) -> Vec<String> {
        self.calls().into_iter().filter(|c| c.starts_with("undo ")).collect()
    }

    /// Everything except `rollout undo`
    pub fn forward_calls(&self) -> Vec<String> {
        self.calls().into_iter().filter(|c| !c.starts_with("undo ")).collect()
    }

    fn record(
        &self,
        verb: &str,
        deployment: &str,
        namespace: &str,
    ) -> Result<CommandOutput, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{verb} {namespace}/{deployment}"));
        Ok(CommandOutput::ok(format!("{verb} ok")))
    }
}

#[async_trait::async_trait]
impl ControlPlane for RecordingControlPlane {
    async fn rollout_restart(
        &self,
        deployment: &str,
        namespace: &str,
    ) -> Result<CommandOutput, BackendError> {
        self.record("restart", deployment, namespace)
    }

    async fn scale(
        &self,
        deployment: &str,
        namespace: &str,
        _replicas: u64,
    ) -> Result<CommandOutput, BackendError> {
        self.record("scale", deployment, namespace)
    }

    async fn patch_limits(
        &self,
        deployment: &str,
        namespace: &str,
        _limits: &ResourceLimits,
    ) -> Result<CommandOutput, BackendError> {
        self.record("patch", deployment, namespace)
    }

    async fn exec(
        &self,
        target: &str,
        namespace: &str,
        _command: &str,
    ) -> Result<CommandOutput, BackendError> {
        self.record("exec", target, namespace)
    }

    async fn rollout_undo(
        &self,
        deployment: &str,
        namespace: &str,
    ) -> Result<CommandOutput, BackendError> {
        self.record("undo", deployment, namespace)
    }
}

/// Infrastructure tool that records plan/apply calls
#[derive(Default)]
pub struct RecordingInfra {
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingInfra {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl InfraTool for RecordingInfra {
    async fn plan(&self, _dir: &Path) -> Result<CommandOutput, BackendError> {
        self.calls.lock().unwrap().push("plan");
        Ok(CommandOutput::ok("Plan: 1 to change."))
    }

    async fn apply(&self, _dir: &Path) -> Result<CommandOutput, BackendError> {
        self.calls.lock().unwrap().push("apply");
        Ok(CommandOutput::ok("Apply complete!"))
    }
}

/// Remote shell that records `host: command`
#[derive(Default)]
pub struct RecordingShell {
    calls: Mutex<Vec<String>>,
}

impl RecordingShell {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RemoteShell for RecordingShell {
    async fn exec(
        &self,
        host: &str,
        _user: &str,
        _key_path: &str,
        command: &str,
    ) -> Result<CommandOutput, BackendError> {
        self.calls.lock().unwrap().push(format!("{host}: {command}"));
        Ok(CommandOutput::ok(""))
    }
}

/// Notifier that keeps every message
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> bool {
        self.messages.lock().unwrap().push(text.to_string());
        true
    }
}

/// Context provider returning a fixed block
pub struct StubContext(pub String);

#[async_trait::async_trait]
impl ContextProvider for StubContext {
    async fn query(&self, _text: &str, _k: usize) -> Result<String, AegisError> {
        Ok(self.0.clone())
    }
}

/// Plan producer with a scripted outcome
pub enum StubPlanner {
    Fixed(Plan),
    Unavailable,
    Malformed,
}

#[async_trait::async_trait]
impl PlanProducer for StubPlanner {
    async fn produce(&self, _incident: &Incident, _context: &str) -> Result<Plan, AegisError> {
        match self {
            Self::Fixed(plan) => Ok(plan.clone()),
            Self::Unavailable => Err(AegisError::collaborator("reasoning", "connection refused")),
            Self::Malformed => Plan::from_llm_output("{\"summary\": 42}").map_err(AegisError::from),
        }
    }
}

/// Remote policy service returning a fixed verdict and counting calls
pub struct FixedPolicy {
    verdict: Option<PolicyVerdict>,
    calls: AtomicUsize,
}

impl FixedPolicy {
    pub fn allowing() -> Self {
        Self {
            verdict: Some(PolicyVerdict::allow("approved by remote policy")),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn denying(reason: &str) -> Self {
        Self {
            verdict: Some(PolicyVerdict::deny(vec![reason.to_string()], reason)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Behaves like an unreachable service
    pub fn unreachable() -> Self {
        Self {
            verdict: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PolicyEvaluator for FixedPolicy {
    async fn evaluate(&self, _input: &PolicyInput) -> Result<PolicyVerdict, PolicyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict.clone().ok_or(PolicyError::Status(503))
    }

    async fn health(&self) -> Result<(), PolicyError> {
        if self.verdict.is_some() {
            Ok(())
        } else {
            Err(PolicyError::Status(503))
        }
    }
}

pub fn incident(error_rate: f64) -> Incident {
    Incident::new(
        error_rate,
        "ERROR [mongodb] Too many open files\nERROR [api] connection refused",
        "test",
    )
}

/// Restart then scale, confidence 0.9
pub fn two_action_plan() -> Plan {
    Plan {
        summary: "api pods exhausted their connection pool".to_string(),
        root_cause: "connection leak in api".to_string(),
        affected_components: vec!["api".to_string()],
        confidence: 0.9,
        actions: vec![
            Action::new(ActionType::RestartWorkload, "api")
                .with_justification("clear leaked connections"),
            Action::new(ActionType::ScaleWorkload, "api")
                .with_param("replicas", 4)
                .with_risk(RiskLevel::Medium),
        ],
        rollback_plan: "kubectl rollout undo deployment/api".to_string(),
    }
}

/// Plan with `n` restart actions on distinct targets
pub fn plan_with_actions(n: usize) -> Plan {
    let mut plan = two_action_plan();
    plan.actions = (0..n)
        .map(|i| Action::new(ActionType::RestartWorkload, format!("svc-{i}")))
        .collect();
    plan
}

/// Coordinator wired to recording collaborators
pub struct Harness {
    pub metrics: Arc<ScriptedMetrics>,
    pub control_plane: Arc<RecordingControlPlane>,
    pub infra: Arc<RecordingInfra>,
    pub shell: Arc<RecordingShell>,
    pub notifier: Arc<RecordingNotifier>,
    pub policy: Arc<FixedPolicy>,
    pub verifier: VerifierSettings,
    pub settings: CoordinatorSettings,
}

impl Harness {
    /// Remote policy allows; verification sees `verify_readings`
    pub fn new(verify_readings: impl IntoIterator<Item = f64>) -> Self {
        Self {
            metrics: Arc::new(ScriptedMetrics::new(verify_readings)),
            control_plane: Arc::default(),
            infra: Arc::default(),
            shell: Arc::default(),
            notifier: Arc::default(),
            policy: Arc::new(FixedPolicy::allowing()),
            verifier: VerifierSettings::default(),
            settings: CoordinatorSettings::default(),
        }
    }

    pub fn with_policy(mut self, policy: FixedPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn without_rollback(mut self) -> Self {
        self.settings.rollback_on_failure = false;
        self
    }

    pub fn backends(&self) -> Backends {
        Backends {
            control_plane: self.control_plane.clone(),
            infra: self.infra.clone(),
            shell: self.shell.clone(),
            notifier: self.notifier.clone(),
        }
    }

    pub fn reader(&self) -> ErrorRateReader {
        ErrorRateReader::new(
            self.metrics.clone(),
            DemoSentinel::new("/nonexistent/aegis-test-sentinel"),
            Duration::from_secs(5),
        )
    }

    pub fn coordinator(&self, planner: StubPlanner) -> Coordinator {
        let exec_settings = Arc::new(ExecutorSettings::default());
        let table = HandlerTable::standard(&self.backends(), exec_settings.clone());
        Coordinator::new(CoordinatorParts {
            context: Arc::new(StubContext("runbook: restart leaking pods".to_string())),
            planner: Arc::new(planner),
            gate: PolicyGate::new(self.policy.clone()),
            executor: ActionExecutor::new(table, self.control_plane.clone(), exec_settings),
            verifier: OutcomeVerifier::new(self.reader(), self.verifier.clone()),
            notifier: self.notifier.clone(),
            settings: self.settings.clone(),
        })
    }
}
