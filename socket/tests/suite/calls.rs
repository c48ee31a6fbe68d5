use super::support::connect;
use super::support::start_server;
use anyhow::Result;
use arcade_protocol::BackIn;
use arcade_protocol::BackInKind;
use arcade_protocol::game::LogEntry;
use arcade_protocol::game::LogLevel;
use arcade_protocol::search::QueryData;
use arcade_protocol::search::SearchQuery;
use arcade_socket::HandlerError;
use arcade_socket::Pipeline;
use arcade_socket::SocketError;
use futures::future::join_all;
use pretty_assertions::assert_eq;
use serde_json::Value;
use serde_json::json;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_are_routed_by_id() -> Result<()> {
    let (server, port) = start_server(Pipeline::new()).await?;
    // Later searches answer sooner, so responses arrive out of send order.
    server
        .router()
        .register(BackInKind::ParseQueryData, |_, message| async move {
            let BackIn::ParseQueryData(data) = message else {
                return Err(HandlerError::failed("unexpected message"));
            };
            tokio::time::sleep(Duration::from_millis(5 * (20 - data.search_id))).await;
            let mut query = SearchQuery::empty(data.view_id);
            query.search_id = data.search_id;
            Ok(serde_json::to_value(query)?)
        });
    let client = connect(port).await?;

    let calls = (1..=16u64).map(|search_id| {
        let client = client.clone();
        async move {
            let data = QueryData {
                view_id: format!("view-{search_id}"),
                search_id,
                ..QueryData::default()
            };
            let query: SearchQuery = client.request_as(BackIn::ParseQueryData(data)).await?;
            Ok::<_, SocketError>((search_id, query))
        }
    });
    for outcome in join_all(calls).await {
        let (search_id, query) = outcome?;
        assert_eq!(query.search_id, search_id);
        assert_eq!(query.view_id, format!("view-{search_id}"));
    }
    assert_eq!(client.pending_calls(), 0);

    client.shutdown().await;
    server.shutdown();
    Ok(())
}

#[tokio::test]
async fn handler_errors_reject_only_that_call() -> Result<()> {
    let (server, port) = start_server(Pipeline::new()).await?;
    server
        .router()
        .register(BackInKind::GetLogs, |_, _| async {
            Err(HandlerError::failed("log store unavailable"))
        });
    server
        .router()
        .register(BackInKind::GetPlaylists, |_, _| async { Ok(json!([])) });
    let client = connect(port).await?;

    assert_eq!(
        client.request(BackIn::GetLogs).await,
        Err(SocketError::Remote("log store unavailable".to_string()))
    );
    assert_eq!(client.request(BackIn::GetPlaylists).await?, json!([]));
    assert_eq!(
        client
            .request(BackIn::SavePlaylist(Default::default()))
            .await,
        Err(SocketError::Remote(
            "no handler registered for save_playlist".to_string()
        ))
    );

    client.shutdown().await;
    server.shutdown();
    Ok(())
}

#[tokio::test]
async fn notify_reaches_handler_and_void_results_are_null() -> Result<()> {
    let (server, port) = start_server(Pipeline::new()).await?;
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    server
        .router()
        .register(BackInKind::AddLog, move |_, message| {
            let sink = Arc::clone(&sink);
            async move {
                if let BackIn::AddLog(entry) = message {
                    sink.lock().unwrap().push(entry.content);
                }
                Ok(Value::Null)
            }
        });
    let client = connect(port).await?;

    client.notify(BackIn::AddLog(LogEntry::now("test", LogLevel::Info, "first")))?;
    let result = client
        .request(BackIn::AddLog(LogEntry::now("test", LogLevel::Info, "second")))
        .await?;
    assert_eq!(result, Value::Null);
    let mut contents = received.lock().unwrap().clone();
    contents.sort();
    assert_eq!(contents, vec!["first".to_string(), "second".to_string()]);

    client.shutdown().await;
    server.shutdown();
    Ok(())
}

#[tokio::test]
async fn wrong_secret_is_refused() -> Result<()> {
    let (server, port) = start_server(Pipeline::new()).await?;
    let mut config = super::support::client_config(port);
    config.secret = "nope".to_string();
    let outcome: Result<super::support::TestClient, SocketError> =
        arcade_socket::SocketClient::connect(config, arcade_socket::Router::new()).await;
    assert!(matches!(outcome, Err(SocketError::Auth(_))));
    assert!(server.clients().is_empty());
    server.shutdown();
    Ok(())
}
