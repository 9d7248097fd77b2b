//! RepoContext tool server - main entry point.
//!
//! Loads the repository's index snapshot into an in-memory engine and serves
//! tool calls over the frame transport until Ctrl-C.

use clap::Parser;
use repocontext::engine::{MemoryIndex, SnapshotIndexBuilder};
use repocontext::ipc::IpcServer;
use repocontext::tools::RepoContextServer;
use repocontext::Config;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "repocontext-server", version, about = "Serve repository context tools")]
struct Args {
    /// Repository root to serve.
    #[arg(long, env = "REPOCONTEXT_REPO")]
    repo: PathBuf,

    /// Listen address (overrides the config file).
    #[arg(long, env = "REPOCONTEXT_LISTEN")]
    listen: Option<String>,

    /// JSON configuration file.
    #[arg(long, env = "REPOCONTEXT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }

    repocontext::observability::init_tracing(&config.observability);

    let repo = std::fs::canonicalize(&args.repo)?;
    let index = Arc::new(MemoryIndex::new());
    let builder = Arc::new(SnapshotIndexBuilder::new(index.clone()));
    match builder.load_existing(&repo)? {
        Some(stats) => tracing::info!(
            "snapshot_loaded: repo={}, files={}, functions={}, types={}",
            repo.display(),
            stats.files_processed,
            stats.functions_indexed,
            stats.types_indexed
        ),
        None => tracing::info!("snapshot_missing: repo={}, run build_index to load one", repo.display()),
    }

    let mut server = RepoContextServer::new(config.clone())
        .with_engine(index)
        .with_builder(builder)
        .with_repo_path(repo);
    server.register_all_tools()?;

    let addr: SocketAddr = config.server.listen_addr.parse()?;
    let transport = IpcServer::new(Arc::new(server), addr, config.server.clone());
    let shutdown = transport.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown_requested");
            shutdown.cancel();
        }
    });

    tracing::info!(
        "server_starting: name={}, version={}, addr={}",
        config.server.name,
        config.server.version,
        addr
    );
    transport.serve().await?;
    Ok(())
}
