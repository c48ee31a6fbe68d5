use anyhow::Result;
use arcade_back::Back;
use arcade_back::BackConfig;
use arcade_protocol::BackIn;
use arcade_protocol::BackOut;
use arcade_protocol::game::Game;
use arcade_socket::ClientConfig;
use arcade_socket::ClientContext;
use arcade_socket::Router;
use arcade_socket::SocketClient;
use std::time::Duration;
use tempfile::TempDir;

pub const SECRET: &str = "back-test-secret";

pub type BackClient = SocketClient<BackIn, BackOut>;

/// A back serving `games` generated rows, with its files in a temp dir.
pub struct TestBack {
    pub back: Back,
    _dir: TempDir,
}

pub async fn start_back(games: usize) -> Result<TestBack> {
    let dir = tempfile::tempdir()?;
    let games_path = dir.path().join("games.json");
    let library: Vec<Game> = (0..games)
        .map(|i| {
            let mut game = Game::new(format!("g{i:03}"), format!("Game {i:03}"));
            if i % 2 == 0 {
                game.tags = vec!["Puzzle".to_string()];
            }
            game
        })
        .collect();
    std::fs::write(&games_path, serde_json::to_vec(&library)?)?;

    let config = BackConfig {
        min_port: 0,
        max_port: 0,
        secret: Some(SECRET.to_string()),
        games_path: Some(games_path),
        playlists_path: Some(dir.path().join("playlists.json")),
        metadata_path: dir.path().join("back.json"),
        ..BackConfig::default()
    };
    let back = Back::start(&config).await?;
    Ok(TestBack { back, _dir: dir })
}

pub async fn connect(back: &TestBack, router: Router<BackOut, ClientContext>) -> Result<BackClient> {
    let config = ClientConfig::for_port(back.back.addr().port(), SECRET);
    Ok(SocketClient::connect(config, router).await?)
}

/// Polls `check` until it holds or five seconds pass.
pub async fn wait_until(mut check: impl FnMut() -> bool) -> Result<()> {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    Ok(())
}
