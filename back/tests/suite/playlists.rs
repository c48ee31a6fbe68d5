use super::support::connect;
use super::support::start_back;
use anyhow::Result;
use arcade_protocol::BackIn;
use arcade_protocol::BackOut;
use arcade_protocol::BackOutKind;
use arcade_protocol::game::Playlist;
use arcade_protocol::game::PlaylistGame;
use arcade_socket::ClientContext;
use arcade_socket::Router;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn saved_playlists_are_listed_and_announced() -> Result<()> {
    let back = start_back(5).await?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let router: Router<BackOut, ClientContext> = Router::new();
    router.register(BackOutKind::PlaylistUpdated, move |_ctx, message| {
        let tx = tx.clone();
        async move {
            if let BackOut::PlaylistUpdated(playlist) = message {
                let _ = tx.send(playlist.id);
            }
            Ok(Value::Null)
        }
    });
    let client = connect(&back, router).await?;

    let playlist = Playlist {
        id: "favs".to_string(),
        title: "Favourites".to_string(),
        games: vec![PlaylistGame {
            game_id: "g003".to_string(),
            notes: Some("best one".to_string()),
        }],
        ..Playlist::default()
    };
    let saved: Playlist = client
        .request_as(BackIn::SavePlaylist(playlist.clone()))
        .await?;
    assert_eq!(saved, playlist);

    let announced = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await?;
    assert_eq!(announced.as_deref(), Some("favs"));

    let listed: Vec<Playlist> = client.request_as(BackIn::GetPlaylists).await?;
    assert_eq!(listed, vec![playlist]);

    client.shutdown().await;
    back.back.shutdown();
    Ok(())
}
