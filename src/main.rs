use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use jobq_lite::config::ManagerConfig;
use jobq_lite::jobs::JobManager;
use jobq_lite::server::Server;
use jobq_lite::tasks;

#[derive(Parser, Debug)]
#[command(name = "jobq-lite")]
#[command(about = "An asynchronous job execution service behind a minimal GET endpoint")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value = "8080")]
    port: u16,

    /// File the job registry is persisted to
    #[arg(long, default_value = "jobs.json")]
    state_file: PathBuf,

    /// Terminal jobs older than this many seconds are evicted; 0 disables
    /// cleanup
    #[arg(long, default_value = "600")]
    ttl_secs: u64,

    /// Interval between cleanup passes, in seconds
    #[arg(long, default_value = "60")]
    cleanup_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = ManagerConfig::new()
        .with_state_file(args.state_file)
        .with_ttl(Duration::from_secs(args.ttl_secs))
        .with_cleanup_interval(Duration::from_secs(args.cleanup_secs.max(1)));

    let manager = JobManager::new(config);
    tasks::register_builtins(&manager).await;

    if let Err(err) = std::fs::create_dir_all(tasks::io::DATA_DIR) {
        tracing::warn!(error = %err, "could not create data directory");
    }

    let addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    let server = Server::bind(addr, Arc::clone(&manager)).await?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, shutting down");
            signal_token.cancel();
        }
    });

    server.run(shutdown).await?;
    manager.close().await;

    Ok(())
}
