use anyhow::{Context, Result};
use sentinel_backend::config::SentinelConfig;
use sentinel_backend::runtime::bootstrap;
use sentinel_backend::schedule::stop_channel;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sentinel_backend=debug")),
        )
        .init();

    let config_path = std::env::var_os("SENTINEL_CONFIG").map(std::path::PathBuf::from);
    let config = SentinelConfig::load(config_path.as_deref())?;
    let mut reporting = bootstrap(config).context("failed to bootstrap reporting loop")?;

    tracing::info!("Starting standalone sentinel daemon (Ctrl-C to stop)");

    let rt = tokio::runtime::Runtime::new().context("failed to start daemon runtime")?;
    rt.block_on(async {
        let (stop, signal) = stop_channel();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl-C received, stopping after the current cycle");
                stop.stop();
            }
        });
        reporting.run(signal).await;
    });
    Ok(())
}
