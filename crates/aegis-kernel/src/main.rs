//! `aegisd` entry point

use aegis_core::AegisConfig;
use aegis_kernel::{app, telemetry, Cli, CliCommand};
use aegis_observe::DemoSentinel;
use anyhow::Context;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_json)?;

    let config = AegisConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    match cli.command {
        CliCommand::CheckConfig => {
            print!("{}", config.to_toml().context("rendering configuration")?);
        }
        CliCommand::Trigger => {
            let sentinel = DemoSentinel::new(&config.demo.sentinel_path);
            sentinel
                .arm()
                .with_context(|| format!("arming {}", sentinel.path().display()))?;
            println!("Breach simulation armed: {}", sentinel.path().display());
        }
        CliCommand::Clear => {
            let sentinel = DemoSentinel::new(&config.demo.sentinel_path);
            sentinel
                .clear()
                .with_context(|| format!("clearing {}", sentinel.path().display()))?;
            println!("Breach simulation cleared");
        }
        CliCommand::Run => {
            info!(version = aegis_core::VERSION, config = %cli.config.display(), "Aegis starting");
            let app = app::build(&config).context("wiring collaborators")?;
            app.run(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Cannot listen for Ctrl-C, shutting down");
                }
            })
            .await?;
        }
    }
    Ok(())
}
