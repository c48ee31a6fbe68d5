use anyhow::Result;
use arcade_back::Back;
use arcade_back::BackConfig;
use arcade_protocol::game::Game;
use assert_cmd::Command;
use predicates::str::contains;
use pretty_assertions::assert_eq;
use std::path::Path;

fn write_library(path: &Path) -> Result<()> {
    let games: Vec<Game> = ["Zork", "Loom", "Myst", "Another World"]
        .iter()
        .enumerate()
        .map(|(i, title)| {
            let mut game = Game::new(format!("g{i}"), *title);
            game.developer = if i % 2 == 0 { "Infocom" } else { "Lucasfilm" }.to_string();
            game
        })
        .collect();
    std::fs::write(path, serde_json::to_vec(&games)?)?;
    Ok(())
}

#[test]
fn browse_without_a_back_reports_missing_metadata() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("absent.json");
    Command::cargo_bin("arcade")?
        .args(["browse", "--metadata"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(contains("no running back found"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn browse_prints_matching_rows_in_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let games_path = dir.path().join("games.json");
    write_library(&games_path)?;
    let config = BackConfig {
        min_port: 0,
        max_port: 0,
        games_path: Some(games_path),
        metadata_path: dir.path().join("back.json"),
        ..BackConfig::default()
    };
    let back = Back::start(&config).await?;
    back.metadata().write_atomic(&config.metadata_path)?;

    let metadata = config.metadata_path.clone();
    let output = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("arcade")?
            .args(["browse", "--json", "--metadata"])
            .arg(&metadata)
            .arg("dev:infocom")
            .output()
            .map_err(anyhow::Error::from)
    })
    .await??;
    back.shutdown();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let rows: Vec<(usize, Game)> = serde_json::from_slice(&output.stdout)?;
    let titles: Vec<(usize, &str)> = rows
        .iter()
        .map(|(index, game)| (*index, game.title.as_str()))
        .collect();
    assert_eq!(titles, vec![(0, "Myst"), (1, "Zork")]);
    Ok(())
}
