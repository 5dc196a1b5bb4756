use clap::Parser;
use ridealloc::{Application, Config, approval, config::Args, pipeline, telemetry};

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

/// Allocate a single request file and exit.
async fn run_once(config: &Config, args: &Args) -> anyhow::Result<()> {
    let Some(input) = args.input.as_deref() else {
        anyhow::bail!("--input is required for a one-shot run");
    };

    let provider = approval::create_provider(&config.approval)?;
    let allocations = pipeline::allocate_file(input, &args.output, provider.as_ref()).await?;

    tracing::info!(
        rows = allocations.len(),
        output = %args.output.display(),
        "Allocation file written"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args)?;

    // If --validate flag is set, exit successfully after config validation
    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    // Initialize telemetry (tracing + optional OpenTelemetry)
    telemetry::init_telemetry(config.enable_otel_export)?;

    tracing::debug!("{:?}", args);

    let result = if args.input.is_some() {
        run_once(&config, &args).await
    } else {
        // Run the application with graceful shutdown on SIGTERM/Ctrl+C
        match Application::new(config) {
            Ok(app) => app.serve(shutdown_signal()).await,
            Err(e) => Err(e),
        }
    };

    telemetry::shutdown_telemetry();
    result
}
