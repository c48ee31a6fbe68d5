use super::support::connect;
use super::support::start_back;
use super::support::wait_until;
use anyhow::Result;
use arcade_engine::MemoryEngine;
use arcade_engine::QueryEngine;
use arcade_protocol::BackIn;
use arcade_protocol::game::Game;
use arcade_protocol::game::Playlist;
use arcade_protocol::game::PlaylistGame;
use arcade_protocol::game::TagFilterGroup;
use arcade_protocol::search::AdvancedFilter;
use arcade_protocol::search::GameOrderBy;
use arcade_protocol::search::PageKeyset;
use arcade_protocol::search::QueryData;
use arcade_protocol::search::SearchQuery;
use arcade_protocol::search::SortDirection;
use arcade_search::CompileInput;
use arcade_search::RequestState;
use arcade_search::SearchPreferences;
use arcade_search::SearchController;
use arcade_search::compile;
use arcade_search::route_pages;
use arcade_socket::Router;
use pretty_assertions::assert_eq;

const VIEW: &str = "Browse";

#[tokio::test]
async fn controller_browses_a_library_end_to_end() -> Result<()> {
    let back = start_back(120).await?;
    let client = connect(&back, Router::new()).await?;
    let controller = SearchController::new(client.clone());
    route_pages(client.router(), controller.clone());
    controller.create_views(&[VIEW.to_string()], &[], false);

    controller.force_search(VIEW);
    wait_until(|| controller.view(VIEW, |v| v.data.keyset.len()) == Some(2)).await?;
    let (search_id, keyset, total) = controller
        .view(VIEW, |v| (v.data.search_id, v.data.keyset.clone(), v.data.total))
        .unwrap_or_default();
    assert_eq!(search_id, 1);
    assert_eq!(keyset, vec![50, 100]);
    assert_eq!(total, Some(120));
    assert_eq!(
        controller.game(VIEW, 0).map(|g| g.id),
        Some("g000".to_string())
    );

    controller.request_range(VIEW, search_id, 0, 2);
    assert_eq!(
        controller.view(VIEW, |v| v.data.pages.state(1)),
        Some(Some(RequestState::Requested))
    );
    wait_until(|| controller.game(VIEW, 50).is_some()).await?;
    assert_eq!(
        controller.game(VIEW, 99).map(|g| g.id),
        Some("g099".to_string())
    );
    assert_eq!(controller.game(VIEW, 100), None);

    client.shutdown().await;
    back.back.shutdown();
    Ok(())
}

#[tokio::test]
async fn a_search_without_matches_settles_empty() -> Result<()> {
    let back = start_back(30).await?;
    let client = connect(&back, Router::new()).await?;
    let controller = SearchController::new(client.clone());
    route_pages(client.router(), controller.clone());
    controller.create_views(&[VIEW.to_string()], &[], false);

    controller.set_search_text(VIEW, "no such game");
    wait_until(|| controller.view(VIEW, |v| v.data.meta_state) == Some(RequestState::Received))
        .await?;
    wait_until(|| controller.view(VIEW, |v| v.data.total) == Some(Some(0))).await?;
    assert_eq!(controller.game(VIEW, 0), None);
    assert_eq!(
        controller.view(VIEW, |v| v.data.keyset.clone()),
        Some(Vec::new())
    );

    client.shutdown().await;
    back.back.shutdown();
    Ok(())
}

#[tokio::test]
async fn compiled_queries_filter_on_the_back() -> Result<()> {
    let back = start_back(120).await?;
    let client = connect(&back, Router::new()).await?;

    let data = QueryData {
        view_id: VIEW.to_string(),
        search_id: 7,
        text: "tag=Puzzle".to_string(),
        ..QueryData::default()
    };
    let query: SearchQuery = client.request_as(BackIn::ParseQueryData(data)).await?;
    assert_eq!(query.search_id, 7);
    let keyset: PageKeyset = client.request_as(BackIn::BrowseViewKeyset(query)).await?;
    assert_eq!(keyset.total, 60);
    assert_eq!(keyset.keyset, vec![50]);

    client.shutdown().await;
    back.back.shutdown();
    Ok(())
}

#[tokio::test]
async fn playlist_scope_only_returns_visible_members() -> Result<()> {
    let library: Vec<Game> = (0..10)
        .map(|i| {
            let mut game = Game::new(format!("g{i}"), format!("Game {i}"));
            game.library = "arcade".to_string();
            if i == 3 {
                game.tags = vec!["Spoiler".to_string()];
            }
            game
        })
        .collect();
    let engine = MemoryEngine::new(library);
    let playlist = Playlist {
        id: "picks".to_string(),
        title: "Picks".to_string(),
        games: ["g7", "g3", "g5"]
            .into_iter()
            .map(|id| PlaylistGame {
                game_id: id.to_string(),
                notes: None,
            })
            .collect(),
        ..Playlist::default()
    };
    let spoilers_hidden = SearchPreferences {
        tag_filters: vec![TagFilterGroup {
            name: "Spoilers".to_string(),
            tags: vec!["Spoiler".to_string()],
            enabled: true,
            extreme: false,
        }],
        show_extreme: false,
    };

    let unfiltered = AdvancedFilter::default();
    let scoped = CompileInput {
        text: "",
        advanced_filter: &unfiltered,
        order_by: GameOrderBy::Title,
        order_direction: SortDirection::Asc,
        playlist: Some(&playlist),
    };
    let search = compile(&scoped, &spoilers_hidden);
    let ids: Vec<String> = engine
        .first_page(&search)
        .await?
        .into_iter()
        .map(|game| game.id)
        .collect();
    assert_eq!(ids, vec!["g5".to_string(), "g7".to_string()]);
    assert_eq!(engine.keyset(&search).await?.total, 2);

    let arcade = AdvancedFilter::for_library(Some("arcade"));
    let in_library = CompileInput {
        advanced_filter: &arcade,
        ..scoped
    };
    let search = compile(&in_library, &SearchPreferences::default());
    assert_eq!(engine.keyset(&search).await?.total, 3);
    Ok(())
}
