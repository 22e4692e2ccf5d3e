//! Blocker daemon: watches the foreground app and enforces the blocklist.

use std::sync::Arc;

use blocker_agent::Config;
use blocker_agent::ipc::{self, IpcServer, Message};
use blocker_agent::lsappinfo::LsAppInfoSource;
use blocker_agent::notice::NoticeSink;
use blocker_engine::{BlocklistStore, Engine};
use blocker_storage::SqliteStorage;
use color_eyre::eyre::WrapErr as _;
use tokio::signal::unix::{SignalKind, signal};

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("blocker-daemon starting");

    let config = Config::load_or_default();

    let storage = SqliteStorage::open(&config.storage.database_path)
        .wrap_err("failed to open blocklist database")?;
    let store = Arc::new(BlocklistStore::new(Arc::new(storage)));

    // lsappinfo offers no UI tree, so only app blocking runs here.
    let engine = Engine::new(
        config.monitoring.clone(),
        store,
        Arc::new(LsAppInfoSource::new()),
        Arc::new(NoticeSink::new(&config.enforcement)),
    );

    engine
        .start_monitoring()
        .wrap_err("failed to start monitoring")?;

    let server =
        IpcServer::bind(&config.control.socket_path).wrap_err("failed to bind control socket")?;
    let mut requests = server.run().wrap_err("failed to start control socket")?;

    let mut sigterm = signal(SignalKind::terminate()).wrap_err("failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).wrap_err("failed to install SIGINT handler")?;

    tracing::info!("blocker-daemon running");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM");
                break;
            }
            _ = sigint.recv() => {
                tracing::info!("received SIGINT");
                break;
            }
            request = requests.recv() => {
                let Some((msg, mut stream)) = request else {
                    tracing::warn!("control socket closed");
                    break;
                };

                match msg {
                    Message::Status => {}
                    Message::Start => {
                        if let Err(e) = engine.start_monitoring() {
                            tracing::error!(error = %e, "failed to start monitoring");
                            ipc::reply(&mut stream, ipc::REPLY_ERROR);
                            continue;
                        }
                    }
                    Message::Stop => engine.stop_monitoring(),
                    Message::Shutdown => {
                        tracing::info!("shutdown requested");
                        ipc::reply(&mut stream, ipc::REPLY_INACTIVE);
                        break;
                    }
                }

                let status = if engine.is_monitoring_active() {
                    ipc::REPLY_ACTIVE
                } else {
                    ipc::REPLY_INACTIVE
                };
                ipc::reply(&mut stream, status);
            }
        }
    }

    tracing::info!("blocker-daemon shutting down");
    server.stop();
    engine.shutdown().await;

    Ok(())
}
