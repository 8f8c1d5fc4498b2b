//! Batch execution and rollback
//!
//! # Critical Invariants
//!
//! - Actions run one at a time, in plan order.
//! - A failing, panicking or hung handler yields a failed result for that
//!   action only; the rest of the batch still runs.
//! - Rollback touches only reversible action types and never re-verifies.

use crate::backend::ControlPlane;
use crate::handlers::ActionHandler;
use crate::settings::ExecutorSettings;
use crate::table::HandlerTable;
use aegis_model::{Action, ActionResult, Plan};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{info, warn};

/// Dispatches approved actions to their handlers
pub struct ActionExecutor {
    table: HandlerTable,
    control_plane: Arc<dyn ControlPlane>,
    settings: Arc<ExecutorSettings>,
}

impl ActionExecutor {
    /// Create executor over a handler table; `control_plane` serves rollback
    #[must_use]
    pub fn new(
        table: HandlerTable,
        control_plane: Arc<dyn ControlPlane>,
        settings: Arc<ExecutorSettings>,
    ) -> Self {
        Self {
            table,
            control_plane,
            settings,
        }
    }

    /// Dispatch table in use
    #[inline]
    #[must_use]
    pub fn table(&self) -> &HandlerTable {
        &self.table
    }

    /// Run every action in order, collecting one result per action
    pub async fn execute_all(&self, actions: &[Action]) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            info!(action_type = %action.action_type, resource = %action.target, "Executing action");
            let result = self.execute_one(action).await;
            if !result.success {
                warn!(
                    action_type = %action.action_type,
                    resource = %action.target,
                    error = result.error.as_deref().unwrap_or(&result.output),
                    "Action failed"
                );
            }
            results.push(result);
        }
        results
    }

    /// Run a single action in isolation
    pub async fn execute_one(&self, action: &Action) -> ActionResult {
        let Some(handler) = self.table.get(action.action_type) else {
            return ActionResult::failed(
                action.clone(),
                "",
                format!("Unknown action_type: {}", action.action_type),
            );
        };
        self.run_isolated(handler.as_ref(), action).await
    }

    async fn run_isolated(&self, handler: &dyn ActionHandler, action: &Action) -> ActionResult {
        let deadline = self.settings.action_timeout;
        let guarded = AssertUnwindSafe(handler.handle(action)).catch_unwind();

        match tokio::time::timeout(deadline, guarded).await {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(e))) => ActionResult::failed(action.clone(), "", e.to_string()),
            Ok(Err(panic)) => ActionResult::failed(
                action.clone(),
                "",
                format!("handler panicked: {}", panic_message(panic.as_ref())),
            ),
            Err(_) => ActionResult::failed(
                action.clone(),
                "",
                format!("action timed out after {deadline:?}"),
            ),
        }
    }

    /// Undo reversible actions of a plan, best effort
    ///
    /// Returns one result per undo attempted, for audit.
    pub async fn rollback(&self, plan: &Plan) -> Vec<ActionResult> {
        warn!(rollback_plan = %plan.rollback_plan, "Rolling back");

        let mut results = Vec::new();
        for action in plan.actions.iter().filter(|a| a.action_type.is_reversible()) {
            let ns = action.namespace_or(&self.settings.default_namespace);
            warn!(resource = %action.target, namespace = ns, "Reverting deployment");

            let undo = self.control_plane.rollout_undo(&action.target, ns);
            let undo = AssertUnwindSafe(undo).catch_unwind();
            let result = match tokio::time::timeout(self.settings.action_timeout, undo).await {
                Ok(Ok(Ok(out))) if out.success => {
                    ActionResult::succeeded(action.clone(), out.combined())
                }
                Ok(Ok(Ok(out))) => {
                    ActionResult::failed(action.clone(), out.stdout.clone(), out.combined())
                }
                Ok(Ok(Err(e))) => ActionResult::failed(action.clone(), "", e.to_string()),
                Ok(Err(panic)) => ActionResult::failed(
                    action.clone(),
                    "",
                    format!("rollback panicked: {}", panic_message(panic.as_ref())),
                ),
                Err(_) => ActionResult::failed(action.clone(), "", "rollback timed out"),
            };
            info!(resource = %action.target, success = result.success, "Rollback result");
            results.push(result);
        }
        results
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backends, MockControlPlane, MockInfraTool, MockNotifier, MockRemoteShell};
    use crate::error::BackendError;
    use crate::process::CommandOutput;
    use aegis_model::ActionType;
    use std::time::Duration;

    struct Panicking;

    #[async_trait::async_trait]
    impl ActionHandler for Panicking {
        async fn handle(&self, _action: &Action) -> Result<ActionResult, BackendError> {
            panic!("handler exploded");
        }
    }

    struct Hanging;

    #[async_trait::async_trait]
    impl ActionHandler for Hanging {
        async fn handle(&self, _action: &Action) -> Result<ActionResult, BackendError> {
            std::future::pending().await
        }
    }

    fn executor_with(table: HandlerTable, cp: MockControlPlane) -> ActionExecutor {
        let settings = ExecutorSettings {
            action_timeout: Duration::from_secs(5),
            ..ExecutorSettings::default()
        };
        ActionExecutor::new(table, Arc::new(cp), Arc::new(settings))
    }

    #[tokio::test]
    async fn unregistered_type_fails_with_unknown() {
        let exec = executor_with(HandlerTable::new(), MockControlPlane::new());
        let result = exec.execute_one(&Action::new(ActionType::ScaleWorkload, "api")).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Unknown action_type: kubectl_scale"));
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let mut table = HandlerTable::new();
        table.register(ActionType::RestartWorkload, Arc::new(Panicking));
        table.register(ActionType::NoAction, Arc::new(crate::handlers::NoActionHandler));
        let exec = executor_with(table, MockControlPlane::new());

        let results = exec
            .execute_all(&[
                Action::new(ActionType::RestartWorkload, "api"),
                Action::new(ActionType::NoAction, "none"),
            ])
            .await;
        assert_eq!(results.len(), 2);
        assert!(results[0].error.as_deref().unwrap().contains("handler exploded"));
        assert!(results[1].success);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_handler_times_out() {
        let mut table = HandlerTable::new();
        table.register(ActionType::ExecInWorkload, Arc::new(Hanging));
        let exec = executor_with(table, MockControlPlane::new());

        let result = exec.execute_one(&Action::new(ActionType::ExecInWorkload, "api-0")).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn rollback_only_reversible_types() {
        let mut cp = MockControlPlane::new();
        cp.expect_rollout_undo()
            .withf(|d, _| d == "api" || d == "worker")
            .times(2)
            .returning(|_, _| Ok(CommandOutput::ok("rolled back")));
        let backends = Backends {
            control_plane: Arc::new(MockControlPlane::new()),
            infra: Arc::new(MockInfraTool::new()),
            shell: Arc::new(MockRemoteShell::new()),
            notifier: Arc::new(MockNotifier::new()),
        };
        let table = HandlerTable::standard(&backends, Arc::new(ExecutorSettings::default()));
        let exec = executor_with(table, cp);

        let mut plan = Plan::safe_fallback();
        plan.actions = vec![
            Action::new(ActionType::RestartWorkload, "api"),
            Action::new(ActionType::ServiceRestart, "frontend"),
            Action::new(ActionType::RemoteExec, "node-1"),
            Action::new(ActionType::ScaleWorkload, "worker"),
            Action::new(ActionType::Notify, "oncall"),
        ];
        let results = exec.rollback(&plan).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
    }

    #[tokio::test]
    async fn rollback_continues_past_failures() {
        let mut cp = MockControlPlane::new();
        cp.expect_rollout_undo()
            .times(2)
            .returning(|d, _| {
                if d == "api" {
                    Err(BackendError::ToolMissing("kubectl".into()))
                } else {
                    Ok(CommandOutput::ok("ok"))
                }
            });
        let exec = executor_with(HandlerTable::new(), cp);

        let mut plan = Plan::safe_fallback();
        plan.actions = vec![
            Action::new(ActionType::PatchResourceLimits, "api"),
            Action::new(ActionType::RestartWorkload, "worker"),
        ];
        let results = exec.rollback(&plan).await;
        assert!(!results[0].success);
        assert!(results[1].success);
    }

    #[test]
    fn panic_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }
}
