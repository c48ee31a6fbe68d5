use crate::config::ClientConfig;
use crate::error::SocketError;
use crate::frame::encode_request;
use crate::frame::encode_response;
use crate::frame::read_envelope;
use crate::pending::PendingCalls;
use crate::router::Router;
use arcade_protocol::AUTH_ACK;
use arcade_protocol::Envelope;
use arcade_protocol::Message;
use futures::SinkExt;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::Mutex;
use strum_macros::Display;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::debug;
use tracing::info;
use tracing::warn;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Open,
    Reconnecting,
    Closed,
}

/// Handed to handlers of requests pushed by the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClientContext {
    /// Bumped every time the connection is re-established.
    pub connection: u64,
}

enum Command {
    Send { id: Option<u64>, frame: String },
    Shutdown,
}

/// Client half of a connection: sends `O` requests and handles `I` pushes.
///
/// The websocket is owned by a background task; this handle only talks to
/// it over a channel, so it is cheap to clone and share.
pub struct SocketClient<O: Message, I: Message> {
    inner: Arc<ClientInner<I>>,
    _outbound: PhantomData<fn(O)>,
}

impl<O: Message, I: Message> Clone for SocketClient<O, I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _outbound: PhantomData,
        }
    }
}

struct ClientInner<I: Message> {
    pending: Arc<PendingCalls>,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    router: Arc<Router<I, ClientContext>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<O: Message, I: Message> SocketClient<O, I> {
    /// Connects and authenticates. Fails without retrying when the first
    /// handshake does not succeed.
    pub async fn connect(
        config: ClientConfig,
        router: Router<I, ClientContext>,
    ) -> Result<Self, SocketError> {
        let socket = handshake(&config).await?;
        info!(url = %config.url, "connected to back");

        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Open);
        let pending = Arc::new(PendingCalls::new());
        let router = Arc::new(router);
        let connection = Connection {
            config,
            pending: Arc::clone(&pending),
            router: Arc::clone(&router),
            commands: command_rx,
            replies: commands.downgrade(),
            state: state_tx,
            generation: 0,
        };
        let task = tokio::spawn(connection.run(socket));

        Ok(Self {
            inner: Arc::new(ClientInner {
                pending,
                commands,
                state,
                router,
                task: Mutex::new(Some(task)),
            }),
            _outbound: PhantomData,
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.clone()
    }

    /// Handlers for messages the server pushes to this client.
    pub fn router(&self) -> &Router<I, ClientContext> {
        &self.inner.router
    }

    pub fn pending_calls(&self) -> usize {
        self.inner.pending.len()
    }

    /// Sends `message` and waits for the correlated response.
    pub async fn request(&self, message: O) -> Result<Value, SocketError> {
        self.ensure_open()?;
        let (id, rx) = self.inner.pending.register();
        let frame = match encode_request(message, Some(id)) {
            Ok(frame) => frame,
            Err(err) => {
                self.inner.pending.reject(id, err.clone());
                return Err(err);
            }
        };
        if self
            .inner
            .commands
            .send(Command::Send {
                id: Some(id),
                frame,
            })
            .is_err()
        {
            self.inner.pending.reject(id, SocketError::Closed);
            return Err(SocketError::Closed);
        }
        rx.await.unwrap_or(Err(SocketError::Disconnected))
    }

    pub async fn request_as<T: DeserializeOwned>(&self, message: O) -> Result<T, SocketError> {
        let value = self.request(message).await?;
        serde_json::from_value(value).map_err(|err| SocketError::Decode(err.to_string()))
    }

    /// Sends `message` without an id; nothing waits for an answer.
    pub fn notify(&self, message: O) -> Result<(), SocketError> {
        self.ensure_open()?;
        let frame = encode_request(message, None)?;
        self.inner
            .commands
            .send(Command::Send { id: None, frame })
            .map_err(|_| SocketError::Closed)
    }

    /// Closes the connection for good and waits for the background task.
    pub async fn shutdown(&self) {
        let _ = self.inner.commands.send(Command::Shutdown);
        let task = match self.inner.task.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = task
            && let Err(err) = task.await
        {
            warn!("connection task failed: {err}");
        }
    }

    fn ensure_open(&self) -> Result<(), SocketError> {
        match self.state() {
            ConnectionState::Open => Ok(()),
            ConnectionState::Reconnecting => Err(SocketError::Disconnected),
            ConnectionState::Closed => Err(SocketError::Closed),
        }
    }
}

enum Exit {
    Shutdown,
    Lost(String),
}

/// State owned by the background task. It is the only place the socket is
/// touched, so reconnects never overlap.
struct Connection<I: Message> {
    config: ClientConfig,
    pending: Arc<PendingCalls>,
    router: Arc<Router<I, ClientContext>>,
    commands: mpsc::UnboundedReceiver<Command>,
    replies: mpsc::WeakUnboundedSender<Command>,
    state: watch::Sender<ConnectionState>,
    generation: u64,
}

impl<I: Message> Connection<I> {
    async fn run(mut self, mut socket: WsStream) {
        loop {
            match self.serve(&mut socket).await {
                Exit::Shutdown => {
                    let _ = socket.close(None).await;
                    break;
                }
                Exit::Lost(reason) => {
                    warn!(%reason, "connection to back lost");
                    self.state.send_replace(ConnectionState::Reconnecting);
                    let failed = self.pending.fail_all(SocketError::Disconnected);
                    if failed > 0 {
                        debug!(failed, "failed in-flight calls");
                    }
                    match self.reconnect().await {
                        Some(next) => {
                            socket = next;
                            self.generation += 1;
                            self.state.send_replace(ConnectionState::Open);
                            info!(generation = self.generation, "reconnected to back");
                        }
                        None => break,
                    }
                }
            }
        }
        self.close();
    }

    async fn serve(&mut self, socket: &mut WsStream) -> Exit {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Send { id, frame }) => {
                        if let Err(err) = socket.send(WsMessage::text(frame)).await {
                            if let Some(id) = id {
                                self.pending.reject(id, SocketError::Disconnected);
                            }
                            return Exit::Lost(err.to_string());
                        }
                    }
                    Some(Command::Shutdown) | None => return Exit::Shutdown,
                },
                frame = socket.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => self.on_frame(text.as_str().as_bytes()),
                    Some(Ok(WsMessage::Binary(data))) => self.on_frame(&data),
                    Some(Ok(WsMessage::Close(_))) | None => {
                        return Exit::Lost("closed by server".to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Exit::Lost(err.to_string()),
                },
            }
        }
    }

    fn on_frame(&self, raw: &[u8]) {
        match read_envelope(raw, "back") {
            Some(Envelope::Response(response)) => {
                self.pending.resolve(response);
            }
            Some(Envelope::Request(request)) => {
                let router = Arc::clone(&self.router);
                let replies = self.replies.clone();
                let ctx = ClientContext {
                    connection: self.generation,
                };
                tokio::spawn(async move {
                    let Some(response) = router.dispatch(ctx, request).await else {
                        return;
                    };
                    match encode_response(response) {
                        Ok(frame) => {
                            if let Some(replies) = replies.upgrade() {
                                let _ = replies.send(Command::Send { id: None, frame });
                            }
                        }
                        Err(err) => warn!("failed to encode response: {err}"),
                    }
                });
            }
            None => {}
        }
    }

    async fn reconnect(&mut self) -> Option<WsStream> {
        let config = self.config.clone();
        let policy = &config.reconnect;
        for attempt in 0..policy.max_attempts {
            let delay = policy.delay_for(attempt);
            until_shutdown(tokio::time::sleep(delay), &mut self.commands, &self.pending).await?;
            match until_shutdown(handshake(&config), &mut self.commands, &self.pending).await? {
                Ok(socket) => return Some(socket),
                Err(err) => warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    "reconnect failed: {err}"
                ),
            }
        }
        warn!(
            max_attempts = policy.max_attempts,
            "giving up on the back connection"
        );
        None
    }

    fn close(&mut self) {
        self.state.send_replace(ConnectionState::Closed);
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            if let Command::Send { id: Some(id), .. } = command {
                self.pending.reject(id, SocketError::Closed);
            }
        }
        self.pending.fail_all(SocketError::Closed);
        info!("connection to back closed");
    }
}

/// Drives `fut` while rejecting sends issued in the meantime. Returns `None`
/// if a shutdown arrives first.
async fn until_shutdown<F: Future>(
    fut: F,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    pending: &PendingCalls,
) -> Option<F::Output> {
    tokio::pin!(fut);
    loop {
        tokio::select! {
            output = &mut fut => return Some(output),
            command = commands.recv() => match command {
                Some(Command::Send { id, .. }) => {
                    if let Some(id) = id {
                        pending.reject(id, SocketError::Disconnected);
                    }
                }
                Some(Command::Shutdown) | None => return None,
            },
        }
    }
}

/// Opens a websocket, presents the secret and waits for the acknowledgement.
async fn handshake(config: &ClientConfig) -> Result<WsStream, SocketError> {
    let timeout = config.handshake_timeout();
    let (mut socket, _) = tokio::time::timeout(timeout, connect_async(config.url.as_str()))
        .await
        .map_err(|_| SocketError::HandshakeTimeout)?
        .map_err(SocketError::transport)?;
    socket
        .send(WsMessage::text(config.secret.clone()))
        .await
        .map_err(SocketError::transport)?;
    let reply = tokio::time::timeout(timeout, socket.next())
        .await
        .map_err(|_| SocketError::HandshakeTimeout)?;
    match reply {
        Some(Ok(WsMessage::Text(text))) if text.as_str() == AUTH_ACK => Ok(socket),
        Some(Ok(WsMessage::Close(_))) | None => Err(SocketError::Auth(
            "back closed the connection".to_string(),
        )),
        Some(Ok(other)) => Err(SocketError::Auth(format!("unexpected reply: {other}"))),
        Some(Err(err)) => Err(SocketError::Auth(err.to_string())),
    }
}
