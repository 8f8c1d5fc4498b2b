//! Dispatch table from action type to handler
//!
//! Aliases are registered by sharing the canonical handler, so the alias
//! list in [`ActionType::ALIASES`] is the only place vocabulary drift is
//! declared.

use crate::backend::Backends;
use crate::handlers::{
    ActionHandler, ExecHandler, InfraApplyHandler, NoActionHandler, NotifyHandler,
    PatchLimitsHandler, RemoteExecHandler, RestartHandler, ScaleHandler,
};
use crate::settings::ExecutorSettings;
use aegis_model::ActionType;
use std::collections::HashMap;
use std::sync::Arc;

/// Closed mapping of action types to handlers
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<ActionType, Arc<dyn ActionHandler>>,
}

impl HandlerTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Table with every canonical handler plus the documented aliases
    #[must_use]
    pub fn standard(backends: &Backends, settings: Arc<ExecutorSettings>) -> Self {
        let mut table = Self::new();
        table.register(
            ActionType::RestartWorkload,
            Arc::new(RestartHandler {
                control_plane: backends.control_plane.clone(),
                settings: settings.clone(),
            }),
        );
        table.register(
            ActionType::ScaleWorkload,
            Arc::new(ScaleHandler {
                control_plane: backends.control_plane.clone(),
                settings: settings.clone(),
            }),
        );
        table.register(
            ActionType::PatchResourceLimits,
            Arc::new(PatchLimitsHandler {
                control_plane: backends.control_plane.clone(),
                settings: settings.clone(),
            }),
        );
        table.register(
            ActionType::ExecInWorkload,
            Arc::new(ExecHandler {
                control_plane: backends.control_plane.clone(),
                settings: settings.clone(),
            }),
        );
        table.register(
            ActionType::InfraApply,
            Arc::new(InfraApplyHandler {
                infra: backends.infra.clone(),
                settings: settings.clone(),
            }),
        );
        table.register(
            ActionType::RemoteExec,
            Arc::new(RemoteExecHandler {
                shell: backends.shell.clone(),
                settings,
            }),
        );
        table.register(
            ActionType::Notify,
            Arc::new(NotifyHandler {
                notifier: backends.notifier.clone(),
            }),
        );
        table.register(ActionType::NoAction, Arc::new(NoActionHandler));
        table.register_aliases();
        table
    }

    /// Register (or replace) a handler
    pub fn register(&mut self, action_type: ActionType, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(action_type, handler);
    }

    /// Point every alias at its canonical handler, when one is registered
    pub fn register_aliases(&mut self) {
        for (alias, target) in ActionType::ALIASES {
            if let Some(handler) = self.handlers.get(&target).cloned() {
                self.handlers.insert(alias, handler);
            }
        }
    }

    /// Handler for a type
    #[inline]
    #[must_use]
    pub fn get(&self, action_type: ActionType) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers.get(&action_type)
    }

    /// Check if a type is handled
    #[inline]
    #[must_use]
    pub fn contains(&self, action_type: ActionType) -> bool {
        self.handlers.contains_key(&action_type)
    }

    /// Number of registered types (aliases included)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if table is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockControlPlane, MockInfraTool, MockNotifier, MockRemoteShell};

    fn backends() -> Backends {
        Backends {
            control_plane: Arc::new(MockControlPlane::new()),
            infra: Arc::new(MockInfraTool::new()),
            shell: Arc::new(MockRemoteShell::new()),
            notifier: Arc::new(MockNotifier::new()),
        }
    }

    #[test]
    fn standard_table_is_exhaustive() {
        let table = HandlerTable::standard(&backends(), Arc::new(ExecutorSettings::default()));
        for t in ActionType::ALL {
            assert!(table.contains(t), "{t} not handled");
        }
        assert_eq!(table.len(), ActionType::ALL.len());
    }

    #[test]
    fn aliases_share_canonical_handler() {
        let table = HandlerTable::standard(&backends(), Arc::new(ExecutorSettings::default()));
        for (alias, target) in ActionType::ALIASES {
            let a = table.get(alias).unwrap();
            let c = table.get(target).unwrap();
            assert!(Arc::ptr_eq(a, c), "{alias} does not route to {target}");
        }
    }

    #[test]
    fn aliases_skip_missing_targets() {
        let mut table = HandlerTable::new();
        table.register(ActionType::NoAction, Arc::new(NoActionHandler));
        table.register_aliases();
        assert_eq!(table.len(), 1);
        assert!(!table.contains(ActionType::ServiceRestart));
    }
}
