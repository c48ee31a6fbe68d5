use anyhow::Result;
use arcade_protocol::BackIn;
use arcade_protocol::BackOut;
use arcade_socket::ClientConfig;
use arcade_socket::ClientContext;
use arcade_socket::ConnectionState;
use arcade_socket::Outbound;
use arcade_socket::Pipeline;
use arcade_socket::ReconnectPolicy;
use arcade_socket::Router;
use arcade_socket::SocketClient;
use arcade_socket::SocketServer;
use std::time::Duration;

pub const SECRET: &str = "test-secret";

pub type TestServer = SocketServer<BackIn, BackOut>;
pub type TestClient = SocketClient<BackIn, BackOut>;

pub async fn start_server(pipeline: Pipeline<Outbound<BackOut>>) -> Result<(TestServer, u16)> {
    let server = SocketServer::new(SECRET, pipeline);
    let addr = server.listen("127.0.0.1", 0, 0).await?;
    Ok((server, addr.port()))
}

pub fn client_config(port: u16) -> ClientConfig {
    let mut config = ClientConfig::for_port(port, SECRET);
    config.handshake_timeout_ms = 1_000;
    config.reconnect = ReconnectPolicy {
        initial_delay_ms: 10,
        multiplier: 2,
        max_delay_ms: 50,
        max_attempts: 3,
    };
    config
}

pub async fn connect(port: u16) -> Result<TestClient> {
    connect_with(port, Router::new()).await
}

pub async fn connect_with(port: u16, router: Router<BackOut, ClientContext>) -> Result<TestClient> {
    Ok(SocketClient::connect(client_config(port), router).await?)
}

/// Waits until the server has registered `count` clients.
pub async fn wait_for_clients(server: &TestServer, count: usize) -> Result<()> {
    tokio::time::timeout(Duration::from_secs(5), async {
        while server.clients().len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}

pub async fn wait_for_state(client: &TestClient, wanted: ConnectionState) -> Result<()> {
    let mut states = client.watch_state();
    tokio::time::timeout(Duration::from_secs(5), states.wait_for(|state| *state == wanted))
        .await??;
    Ok(())
}
