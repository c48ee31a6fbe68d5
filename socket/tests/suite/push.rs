use super::support::connect;
use super::support::connect_with;
use super::support::start_server;
use super::support::wait_for_clients;
use anyhow::Result;
use arcade_protocol::BackOut;
use arcade_protocol::BackOutKind;
use arcade_protocol::game::LogEntry;
use arcade_protocol::game::LogLevel;
use arcade_protocol::game::Playlist;
use arcade_socket::ClientContext;
use arcade_socket::Middleware;
use arcade_socket::Next;
use arcade_socket::Outbound;
use arcade_socket::Pipeline;
use arcade_socket::PipelineError;
use arcade_socket::Router;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// Keeps a copy of every pushed log entry and drops pushes of `muted` text.
struct Tap {
    seen: Arc<Mutex<Vec<String>>>,
    muted: &'static str,
}

#[async_trait]
impl Middleware<Outbound<BackOut>> for Tap {
    async fn handle(
        &self,
        ctx: &mut Outbound<BackOut>,
        next: Next<'_, Outbound<BackOut>>,
    ) -> Result<(), PipelineError> {
        if let BackOut::LogEntryAdded(entry) = &ctx.message {
            if entry.content == self.muted {
                return Ok(());
            }
            self.seen.lock().unwrap().push(entry.content.clone());
        }
        next.run(ctx).await
    }
}

fn log_router(tx: mpsc::UnboundedSender<String>) -> Router<BackOut, ClientContext> {
    let router = Router::new();
    router.register(BackOutKind::LogEntryAdded, move |_, message| {
        let tx = tx.clone();
        async move {
            if let BackOut::LogEntryAdded(entry) = message {
                let _ = tx.send(entry.content);
            }
            Ok(serde_json::Value::Null)
        }
    });
    router
}

#[tokio::test]
async fn broadcast_fans_out_through_pipeline() -> Result<()> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new().with(Tap {
        seen: Arc::clone(&seen),
        muted: "secret",
    });
    let (server, port) = start_server(pipeline).await?;
    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    let client_a = connect_with(port, log_router(tx_a)).await?;
    let client_b = connect_with(port, log_router(tx_b)).await?;
    wait_for_clients(&server, 2).await?;

    let muted = LogEntry::now("back", LogLevel::Info, "secret");
    assert_eq!(server.broadcast(BackOut::LogEntryAdded(muted)).await?, 0);
    let entry = LogEntry::now("back", LogLevel::Info, "visible");
    assert_eq!(server.broadcast(BackOut::LogEntryAdded(entry)).await?, 2);

    let wait = Duration::from_secs(5);
    assert_eq!(
        tokio::time::timeout(wait, rx_a.recv()).await?,
        Some("visible".to_string())
    );
    assert_eq!(
        tokio::time::timeout(wait, rx_b.recv()).await?,
        Some("visible".to_string())
    );
    assert_eq!(*seen.lock().unwrap(), vec!["visible".to_string()]);

    client_a.shutdown().await;
    client_b.shutdown().await;
    server.shutdown();
    Ok(())
}

#[tokio::test]
async fn server_can_call_a_client() -> Result<()> {
    let (server, port) = start_server(Pipeline::new()).await?;
    let router = Router::new();
    router.register(BackOutKind::PlaylistUpdated, |ctx: ClientContext, message| async move {
        let BackOut::PlaylistUpdated(playlist) = message else {
            return Ok(serde_json::Value::Null);
        };
        Ok(json!({ "ack": playlist.id, "connection": ctx.connection }))
    });
    let client = connect_with(port, router).await?;
    wait_for_clients(&server, 1).await?;
    let id = server.clients()[0];

    let playlist = Playlist {
        id: "favs".to_string(),
        title: "Favourites".to_string(),
        ..Default::default()
    };
    let reply = server
        .request(id, BackOut::PlaylistUpdated(playlist))
        .await?;
    assert_eq!(reply, json!({ "ack": "favs", "connection": 0 }));

    client.shutdown().await;
    server.shutdown();
    Ok(())
}

#[tokio::test]
async fn push_to_unknown_client_fails() -> Result<()> {
    let (server, port) = start_server(Pipeline::new()).await?;
    let client = connect(port).await?;
    wait_for_clients(&server, 1).await?;
    let entry = LogEntry::now("back", LogLevel::Warn, "hello");
    assert!(server.send(999, BackOut::LogEntryAdded(entry)).await.is_err());
    client.shutdown().await;
    server.shutdown();
    Ok(())
}
