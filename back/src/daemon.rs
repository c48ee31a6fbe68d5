use crate::config::BackConfig;
use crate::handlers;
use crate::handlers::BackServer;
use crate::handlers::BackState;
use crate::log_buffer::LogBuffer;
use crate::log_buffer::LogRecorder;
use crate::metadata::DaemonMetadata;
use crate::playlists::PlaylistStore;
use anyhow::Context;
use anyhow::Result;
use arcade_engine::MemoryEngine;
use arcade_protocol::BackOut;
use arcade_protocol::game::LogEntry;
use arcade_protocol::game::LogLevel;
use arcade_socket::Pipeline;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// A running back: socket server plus the state its handlers share.
pub struct Back {
    server: BackServer,
    addr: SocketAddr,
    secret: String,
    state: Arc<BackState>,
}

impl Back {
    pub async fn start(config: &BackConfig) -> Result<Self> {
        config.validate()?;
        let engine = match &config.games_path {
            Some(path) => MemoryEngine::load(path)?,
            None => {
                warn!("no games_path configured, serving an empty library");
                MemoryEngine::new(Vec::new())
            }
        };
        let playlists = match &config.playlists_path {
            Some(path) => PlaylistStore::open(path)?,
            None => PlaylistStore::default(),
        };
        let logs = Arc::new(LogBuffer::new(config.log_capacity));
        let pipeline = Pipeline::new().with(LogRecorder::new(Arc::clone(&logs)));

        let secret = config.secret_or_random();
        let server = BackServer::new(secret.clone(), pipeline);
        let state = Arc::new(BackState {
            engine: Arc::new(engine),
            preferences: config.preferences(),
            playlists: Arc::new(playlists),
            logs,
        });
        handlers::register(&server, Arc::clone(&state));
        let addr = server
            .listen(&config.host, config.min_port, config.max_port)
            .await
            .context("failed to start socket server")?;
        Ok(Self {
            server,
            addr,
            secret,
            state,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn server(&self) -> &BackServer {
        &self.server
    }

    pub fn state(&self) -> &BackState {
        &self.state
    }

    pub fn metadata(&self) -> DaemonMetadata {
        DaemonMetadata::new(
            self.addr.ip().to_string(),
            self.addr.port(),
            self.secret.clone(),
            std::process::id(),
        )
    }

    /// Records a back-side log entry and pushes it to every client.
    pub async fn log(&self, level: LogLevel, content: impl Into<String>) {
        let entry = LogEntry::now("Back", level, content);
        if let Err(err) = self.server.broadcast(BackOut::LogEntryAdded(entry)).await {
            warn!("failed to broadcast log entry: {err}");
        }
    }

    pub fn shutdown(&self) {
        self.server.shutdown();
    }
}

/// Runs the back until Ctrl-C, publishing its metadata meanwhile.
pub async fn run(config: BackConfig) -> Result<()> {
    let back = Back::start(&config).await?;
    back.metadata()
        .write_atomic(&config.metadata_path)
        .with_context(|| format!("failed to write {}", config.metadata_path.display()))?;
    info!("arcade back listening on {}", back.addr());
    back.log(LogLevel::Info, format!("Back listening on port {}", back.addr().port()))
        .await;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to wait for Ctrl-C")?;
            info!("shutting down");
        }
        _ = back.server().closed() => {}
    }
    back.shutdown();
    if let Err(err) = std::fs::remove_file(&config.metadata_path) {
        debug!("could not remove metadata file: {err}");
    }
    Ok(())
}
