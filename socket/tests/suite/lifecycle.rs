use super::support::connect;
use super::support::start_server;
use super::support::wait_for_clients;
use super::support::wait_for_state;
use anyhow::Result;
use arcade_protocol::BackIn;
use arcade_protocol::BackInKind;
use arcade_socket::ConnectionState;
use arcade_socket::Pipeline;
use arcade_socket::SocketError;
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn dropped_connection_fails_pending_calls_and_recovers() -> Result<()> {
    let (server, port) = start_server(Pipeline::new()).await?;
    server
        .router()
        .register(BackInKind::GetLogs, |_, _| futures::future::pending());
    server
        .router()
        .register(BackInKind::GetPlaylists, |_, _| async { Ok(json!(["p"])) });
    let client = connect(port).await?;
    wait_for_clients(&server, 1).await?;

    let stuck = tokio::spawn({
        let client = client.clone();
        async move { client.request(BackIn::GetLogs).await }
    });
    while client.pending_calls() == 0 {
        tokio::task::yield_now().await;
    }

    let first = server.clients()[0];
    assert!(server.disconnect(first));
    assert_eq!(stuck.await?, Err(SocketError::Disconnected));

    wait_for_state(&client, ConnectionState::Open).await?;
    assert_eq!(client.request(BackIn::GetPlaylists).await?, json!(["p"]));

    client.shutdown().await;
    server.shutdown();
    Ok(())
}

#[tokio::test]
async fn exhausted_reconnects_close_the_connection() -> Result<()> {
    let (server, port) = start_server(Pipeline::new()).await?;
    let client = connect(port).await?;
    wait_for_clients(&server, 1).await?;

    server.shutdown();
    wait_for_state(&client, ConnectionState::Closed).await?;
    assert_eq!(
        client.request(BackIn::GetLogs).await,
        Err(SocketError::Closed)
    );
    assert_matches!(client.notify(BackIn::GetLogs), Err(SocketError::Closed));
    Ok(())
}

#[tokio::test]
async fn shutdown_is_final() -> Result<()> {
    let (server, port) = start_server(Pipeline::new()).await?;
    let client = connect(port).await?;
    client.shutdown().await;
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(
        client.request(BackIn::GetPlaylists).await,
        Err(SocketError::Closed)
    );
    server.shutdown();
    Ok(())
}
