//! Behaviour with every collaborator endpoint down

use aegis_backends::{builtin_context, ChatPlanProducer, RunbookRetriever, WebhookNotifier};
use aegis_core::{AegisError, ContextProvider, Notifier, PlanProducer};
use aegis_model::Incident;
use std::time::Duration;

// Nothing listens on the discard port.
const DEAD: &str = "http://127.0.0.1:9";

#[tokio::test]
async fn retriever_falls_back_to_builtin_runbooks() {
    let retriever = RunbookRetriever::new(DEAD, "runbooks", 2000, Duration::from_secs(2)).unwrap();
    let context = retriever.query("Too many open files", 3).await.unwrap();
    assert_eq!(context, builtin_context(3));
}

#[tokio::test]
async fn planner_reports_collaborator_error() {
    let planner = ChatPlanProducer::new(DEAD, "llama3", Duration::from_secs(2)).unwrap();
    let err = planner
        .produce(&Incident::new(0.15, "ERROR", "test"), "")
        .await
        .unwrap_err();
    assert!(matches!(err, AegisError::Collaborator { service: "reasoning", .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn webhook_failure_is_swallowed() {
    let notifier =
        WebhookNotifier::new(Some(format!("{DEAD}/hook")), Duration::from_secs(2)).unwrap();
    assert!(notifier.is_configured());
    assert!(!notifier.send("report").await);
}
