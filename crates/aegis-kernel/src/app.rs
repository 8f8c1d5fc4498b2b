//! Wiring configuration into a running coordinator

use aegis_backends::{ChatPlanProducer, RunbookRetriever, WebhookNotifier};
use aegis_core::{AegisConfig, Coordinator, CoordinatorParts, SessionStats};
use aegis_executor::{ActionExecutor, Backends, HandlerTable, KubectlCli, SshCli, TerraformCli};
use aegis_observe::{
    DemoSentinel, Detector, ErrorRateReader, LokiSource, OutcomeVerifier, PrometheusSource,
};
use aegis_policy::{OpaClient, PolicyGate};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// A coordinator and the detector that feeds it
pub struct App {
    /// Remediation state machine
    pub coordinator: Arc<Coordinator>,
    /// Breach detector
    pub detector: Arc<Detector>,
    /// Shutdown grace period
    pub grace: Duration,
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// Build every collaborator from `config`
pub fn build(config: &AegisConfig) -> anyhow::Result<App> {
    let metrics = PrometheusSource::new(
        &config.metrics.url,
        &config.metrics.query,
        secs(config.metrics.timeout_secs),
    )
    .context("building metrics client")?;
    let logs = LokiSource::new(
        &config.logs.url,
        &config.logs.selector,
        config.logs.keep_lines,
        secs(config.logs.timeout_secs),
    )
    .context("building log client")?;
    let reader = ErrorRateReader::new(
        Arc::new(metrics),
        DemoSentinel::new(&config.demo.sentinel_path),
        secs(config.metrics.timeout_secs),
    );
    let detector = Detector::new(reader.clone(), Arc::new(logs), config.detector_settings());
    let verifier = OutcomeVerifier::new(reader, config.verifier_settings());

    let notifier = Arc::new(
        WebhookNotifier::new(config.notify.webhook_url.clone(), secs(config.notify.timeout_secs))
            .context("building webhook notifier")?,
    );
    let control_plane = Arc::new(KubectlCli::new(
        &config.cluster.kubectl,
        config.cluster.dry_run,
        config.cluster.kubeconfig.clone(),
        secs(config.cluster.timeout_secs),
    ));
    let backends = Backends {
        control_plane: control_plane.clone(),
        infra: Arc::new(TerraformCli::new(
            &config.infra.terraform,
            secs(config.infra.timeout_secs),
        )),
        shell: Arc::new(SshCli::new(
            &config.remote.ssh,
            secs(config.remote.connect_timeout_secs),
            secs(config.remote.timeout_secs),
        )),
        notifier: notifier.clone(),
    };
    let exec_settings = Arc::new(config.executor_settings());
    let table = HandlerTable::standard(&backends, exec_settings.clone());
    let executor = ActionExecutor::new(table, control_plane, exec_settings);

    let opa = OpaClient::new(
        &config.policy.url,
        &config.policy.policy_path,
        secs(config.policy.timeout_secs),
    )
    .context("building policy client")?;
    let gate =
        PolicyGate::new(Arc::new(opa)).with_remote_timeout(secs(config.policy.timeout_secs));

    let planner = ChatPlanProducer::new(
        &config.reasoning.url,
        &config.reasoning.model,
        secs(config.reasoning.timeout_secs),
    )
    .context("building reasoning client")?
    .with_temperature(config.reasoning.temperature)
    .with_max_tokens(config.reasoning.max_tokens)
    .with_raw_log_budget(config.remediation.raw_log_budget_bytes);
    let context = RunbookRetriever::new(
        &config.retrieval.url,
        &config.retrieval.collection,
        config.retrieval.query_budget_chars,
        secs(config.retrieval.timeout_secs),
    )
    .context("building retrieval client")?;

    let coordinator = Coordinator::new(CoordinatorParts {
        context: Arc::new(context),
        planner: Arc::new(planner),
        gate,
        executor,
        verifier,
        notifier,
        settings: config.coordinator_settings(),
    });

    Ok(App {
        coordinator: Arc::new(coordinator),
        detector: Arc::new(detector),
        grace: config.shutdown_grace(),
    })
}

impl App {
    /// Run until `shutdown` resolves, then drain within the grace period
    pub async fn run<S>(&self, shutdown: S) -> anyhow::Result<SessionStats>
    where
        S: std::future::Future<Output = ()>,
    {
        self.coordinator.gate().health_check().await;

        let (stop_tx, stop_rx) = watch::channel(false);
        let detector = self.detector.clone();
        let coordinator = self.coordinator.clone();
        let detection = tokio::spawn(async move {
            detector
                .run(stop_rx, move |incident| {
                    let coordinator = coordinator.clone();
                    tokio::spawn(async move {
                        coordinator.handle_incident(incident).await;
                    });
                })
                .await;
        });

        shutdown.await;
        info!("Shutdown requested, stopping detector");
        // The receiver may already be gone if the detector exited on its own.
        let _ = stop_tx.send(true);
        detection.await.context("detector task failed")?;

        if tokio::time::timeout(self.grace, self.coordinator.wait_idle()).await.is_err() {
            warn!(grace = ?self.grace, "Abandoning in-flight remediation after grace period");
        }
        let stats = self.coordinator.stats();
        info!(
            accepted = stats.accepted,
            verified = stats.verified,
            rolled_back = stats.rolled_back,
            denied = stats.denied,
            failed = stats.failed,
            "Aegis stopped"
        );
        Ok(stats)
    }
}
