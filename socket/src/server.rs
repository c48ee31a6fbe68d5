use crate::error::SocketError;
use crate::frame::encode_request;
use crate::frame::encode_response;
use crate::frame::read_envelope;
use crate::pending::PendingCalls;
use crate::pipeline::Flow;
use crate::pipeline::Pipeline;
use crate::router::Router;
use arcade_protocol::AUTH_ACK;
use arcade_protocol::Envelope;
use arcade_protocol::Message;
use axum::extract::State;
use axum::extract::ws::Message as WsMessage;
use axum::extract::ws::WebSocket;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;
use axum::routing::get;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

pub type ClientId = u64;

/// Who an outbound message is addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    All,
    Client(ClientId),
}

/// Context the server's [`Pipeline`] runs over before a push is written.
#[derive(Clone, Debug)]
pub struct Outbound<O> {
    pub target: Target,
    pub message: O,
}

/// Handed to request handlers: the calling client and a server handle.
pub struct Peer<I: Message, O: Message> {
    pub client: ClientId,
    pub server: SocketServer<I, O>,
}

impl<I: Message, O: Message> Clone for Peer<I, O> {
    fn clone(&self) -> Self {
        Self {
            client: self.client,
            server: self.server.clone(),
        }
    }
}

struct ClientSlot {
    frames: mpsc::UnboundedSender<String>,
    pending: Arc<PendingCalls>,
}

/// Accepts authenticated websocket clients, dispatches their `I` requests
/// and pushes `O` messages to them.
pub struct SocketServer<I: Message, O: Message> {
    inner: Arc<ServerInner<I, O>>,
}

impl<I: Message, O: Message> Clone for SocketServer<I, O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ServerInner<I: Message, O: Message> {
    secret: String,
    router: Router<I, Peer<I, O>>,
    pipeline: Pipeline<Outbound<O>>,
    clients: Mutex<HashMap<ClientId, ClientSlot>>,
    next_client: AtomicU64,
    shutdown: CancellationToken,
}

impl<I, O> SocketServer<I, O>
where
    I: Message,
    O: Message,
{
    pub fn new(secret: impl Into<String>, pipeline: Pipeline<Outbound<O>>) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                secret: secret.into(),
                router: Router::new(),
                pipeline,
                clients: Mutex::new(HashMap::new()),
                next_client: AtomicU64::new(1),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn router(&self) -> &Router<I, Peer<I, O>> {
        &self.inner.router
    }

    /// Binds the first free port in `min_port..=max_port` and starts
    /// accepting clients in the background.
    pub async fn listen(
        &self,
        host: &str,
        min_port: u16,
        max_port: u16,
    ) -> Result<SocketAddr, SocketError> {
        let listener = bind_in_range(host, min_port, max_port).await?;
        let addr = listener.local_addr().map_err(SocketError::transport)?;
        let app = axum::Router::new()
            .route("/", get(upgrade_handler::<I, O>))
            .with_state(self.clone());
        let shutdown = self.inner.shutdown.clone();
        tokio::spawn(async move {
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(err) = serve.await {
                error!("socket server stopped: {err}");
            }
        });
        info!(%addr, "socket server listening");
        Ok(addr)
    }

    /// Stops accepting clients and drops every open connection.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    /// Resolves once [`SocketServer::shutdown`] has been called.
    pub async fn closed(&self) {
        self.inner.shutdown.cancelled().await;
    }

    pub fn clients(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.lock_clients().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Drops the connection of one client. Its in-flight calls fail.
    pub fn disconnect(&self, client: ClientId) -> bool {
        let slot = self.lock_clients().remove(&client);
        match slot {
            Some(slot) => {
                slot.pending.fail_all(SocketError::Disconnected);
                true
            }
            None => false,
        }
    }

    /// Sends a request to one client and waits for its response.
    pub async fn request(&self, client: ClientId, message: O) -> Result<Value, SocketError> {
        let (frames, pending) = {
            let clients = self.lock_clients();
            let slot = clients
                .get(&client)
                .ok_or(SocketError::UnknownClient(client))?;
            (slot.frames.clone(), Arc::clone(&slot.pending))
        };
        let (id, rx) = pending.register();
        let frame = match encode_request(message, Some(id)) {
            Ok(frame) => frame,
            Err(err) => {
                pending.reject(id, err.clone());
                return Err(err);
            }
        };
        if frames.send(frame).is_err() {
            pending.reject(id, SocketError::Disconnected);
            return Err(SocketError::Disconnected);
        }
        rx.await.unwrap_or(Err(SocketError::Disconnected))
    }

    /// Pushes a message to one client through the pipeline.
    pub async fn send(&self, client: ClientId, message: O) -> Result<bool, SocketError> {
        Ok(self.push(Target::Client(client), message).await? > 0)
    }

    /// Pushes a message to every client through the pipeline and returns
    /// how many received it.
    pub async fn broadcast(&self, message: O) -> Result<usize, SocketError> {
        self.push(Target::All, message).await
    }

    async fn push(&self, target: Target, message: O) -> Result<usize, SocketError> {
        let mut outbound = Outbound { target, message };
        if self.inner.pipeline.execute(&mut outbound).await? == Flow::Stopped {
            debug!(?target, "push stopped by pipeline");
            return Ok(0);
        }
        let frame = encode_request(outbound.message, None)?;
        let clients = self.lock_clients();
        let delivered = match outbound.target {
            Target::All => clients
                .values()
                .filter(|slot| slot.frames.send(frame.clone()).is_ok())
                .count(),
            Target::Client(id) => match clients.get(&id) {
                Some(slot) => usize::from(slot.frames.send(frame).is_ok()),
                None => return Err(SocketError::UnknownClient(id)),
            },
        };
        Ok(delivered)
    }

    async fn serve_client(self, mut socket: WebSocket) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        if !self.authenticate(&mut socket).await {
            warn!("rejected client with a bad secret");
            let _ = socket.send(WsMessage::Close(None)).await;
            return;
        }
        if socket.send(WsMessage::Text(AUTH_ACK.into())).await.is_err() {
            return;
        }

        let client = self.inner.next_client.fetch_add(1, Ordering::SeqCst);
        let (frames, mut frame_rx) = mpsc::unbounded_channel::<String>();
        let pending = Arc::new(PendingCalls::new());
        self.lock_clients().insert(
            client,
            ClientSlot {
                frames,
                pending: Arc::clone(&pending),
            },
        );
        info!(client, "client connected");

        let shutdown = self.inner.shutdown.clone();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                frame = frame_rx.recv() => match frame {
                    Some(frame) => {
                        if let Err(err) = socket.send(WsMessage::Text(frame.into())).await {
                            debug!(client, "write failed: {err}");
                            break;
                        }
                    }
                    None => break,
                },
                incoming = socket.recv() => match incoming {
                    Some(Ok(WsMessage::Text(text))) => self.on_frame(client, text.as_str().as_bytes(), &pending),
                    Some(Ok(WsMessage::Binary(data))) => self.on_frame(client, &data, &pending),
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(client, "read failed: {err}");
                        break;
                    }
                },
            }
        }

        let _ = socket.send(WsMessage::Close(None)).await;
        self.lock_clients().remove(&client);
        pending.fail_all(SocketError::Disconnected);
        info!(client, "client disconnected");
    }

    async fn authenticate(&self, socket: &mut WebSocket) -> bool {
        match tokio::time::timeout(AUTH_TIMEOUT, socket.recv()).await {
            Ok(Some(Ok(WsMessage::Text(text)))) => text.as_str() == self.inner.secret,
            _ => false,
        }
    }

    fn on_frame(&self, client: ClientId, raw: &[u8], pending: &PendingCalls) {
        match read_envelope(raw, "client") {
            Some(Envelope::Response(response)) => {
                pending.resolve(response);
            }
            Some(Envelope::Request(request)) => {
                let server = self.clone();
                tokio::spawn(async move {
                    let peer = Peer {
                        client,
                        server: server.clone(),
                    };
                    let Some(response) = server.inner.router.dispatch(peer, request).await else {
                        return;
                    };
                    match encode_response(response) {
                        Ok(frame) => server.write(client, frame),
                        Err(err) => warn!(client, "failed to encode response: {err}"),
                    }
                });
            }
            None => {}
        }
    }

    fn write(&self, client: ClientId, frame: String) {
        if let Some(slot) = self.lock_clients().get(&client) {
            let _ = slot.frames.send(frame);
        }
    }

    fn lock_clients(&self) -> MutexGuard<'_, HashMap<ClientId, ClientSlot>> {
        match self.inner.clients.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

async fn upgrade_handler<I, O>(
    State(server): State<SocketServer<I, O>>,
    upgrade: WebSocketUpgrade,
) -> Response
where
    I: Message,
    O: Message,
{
    upgrade.on_upgrade(move |socket| server.serve_client(socket))
}

async fn bind_in_range(
    host: &str,
    min_port: u16,
    max_port: u16,
) -> Result<TcpListener, SocketError> {
    for port in min_port..=max_port {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Ok(listener),
            Err(err) => debug!(port, "port unavailable: {err}"),
        }
    }
    Err(SocketError::NoFreePort {
        host: host.to_string(),
        min_port,
        max_port,
    })
}
