use super::support::connect;
use super::support::start_back;
use anyhow::Result;
use arcade_protocol::BackIn;
use arcade_protocol::BackOut;
use arcade_protocol::BackOutKind;
use arcade_protocol::game::LogEntry;
use arcade_protocol::game::LogLevel;
use arcade_socket::ClientContext;
use arcade_socket::Router;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn added_logs_are_broadcast_and_buffered() -> Result<()> {
    let back = start_back(0).await?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let router: Router<BackOut, ClientContext> = Router::new();
    router.register(BackOutKind::LogEntryAdded, move |_ctx, message| {
        let tx = tx.clone();
        async move {
            if let BackOut::LogEntryAdded(entry) = message {
                let _ = tx.send(entry.content);
            }
            Ok(Value::Null)
        }
    });
    let client = connect(&back, router).await?;

    let entry = LogEntry::now("Launcher", LogLevel::Warn, "disk almost full");
    client.request(BackIn::AddLog(entry)).await?;
    let pushed = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await?;
    assert_eq!(pushed.as_deref(), Some("disk almost full"));

    back.back.log(LogLevel::Info, "from the back").await;
    let logs: Vec<LogEntry> = client.request_as(BackIn::GetLogs).await?;
    let contents: Vec<&str> = logs.iter().map(|log| log.content.as_str()).collect();
    assert_eq!(contents, vec!["disk almost full", "from the back"]);
    assert_eq!(logs[0].level, LogLevel::Warn);

    client.shutdown().await;
    back.back.shutdown();
    Ok(())
}
