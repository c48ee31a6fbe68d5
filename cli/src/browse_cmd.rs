use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use arcade_back::DaemonMetadata;
use arcade_back::config::default_metadata_path;
use arcade_protocol::VIEW_PAGE_SIZE;
use arcade_protocol::game::Game;
use arcade_protocol::search::GameOrderBy;
use arcade_protocol::search::SortDirection;
use arcade_search::BackClient;
use arcade_search::RequestState;
use arcade_search::ResultsView;
use arcade_search::SearchController;
use arcade_search::route_pages;
use arcade_socket::ClientConfig;
use arcade_socket::Router;
use arcade_socket::SocketClient;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Parser)]
pub struct BrowseCommand {
    /// Search text, in the same syntax as the search bar.
    #[arg(value_name = "QUERY", num_args = 0.., trailing_var_arg = true)]
    pub query: Vec<String>,

    /// Name of the results view to search in.
    #[arg(long, default_value = "Browse")]
    pub view: String,

    #[arg(long = "order-by", default_value = "title")]
    pub order_by: GameOrderBy,

    /// Sort descending.
    #[arg(long)]
    pub reverse: bool,

    /// First page to show.
    #[arg(long, default_value_t = 0)]
    pub start: usize,

    /// Number of pages to show.
    #[arg(long, default_value_t = 1)]
    pub count: usize,

    /// Metadata file published by the back.
    #[arg(long, value_name = "PATH")]
    pub metadata: Option<PathBuf>,

    /// Print rows as JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Seconds to wait for results.
    #[arg(long = "timeout", default_value_t = 10)]
    pub timeout_secs: u64,
}

pub async fn run_browse(cmd: BrowseCommand) -> Result<()> {
    let path = cmd.metadata.clone().unwrap_or_else(default_metadata_path);
    let meta = DaemonMetadata::load(&path)
        .with_context(|| format!("no running back found at {}", path.display()))?;
    if !meta.is_compatible() {
        bail!(
            "back speaks protocol {}, this client needs {}",
            meta.schema_version,
            arcade_protocol::PROTOCOL_VERSION
        );
    }

    let config = ClientConfig::new(meta.url(), meta.secret.clone());
    let client: BackClient = SocketClient::connect(config, Router::new())
        .await
        .context("failed to connect to the back")?;
    let result = browse(&cmd, &client).await;
    client.shutdown().await;
    let rows = result?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print_table(&rows);
    }
    Ok(())
}

async fn browse(cmd: &BrowseCommand, client: &BackClient) -> Result<Vec<(usize, Game)>> {
    let controller = SearchController::new(client.clone());
    route_pages(client.router(), controller.clone());
    let view = cmd.view.as_str();
    controller.create_views(&[cmd.view.clone()], &[], false);
    controller.set_order_by(view, cmd.order_by);
    let direction = if cmd.reverse {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    };
    controller.set_order_reverse(view, direction);
    controller.set_search_text(view, cmd.query.join(" "));

    let timeout = Duration::from_secs(cmd.timeout_secs);
    let ready = |v: &ResultsView| v.data.meta_state == RequestState::Received && v.data.total.is_some();
    wait_for(timeout, || controller.view(view, ready).unwrap_or(false))
        .await
        .context("timed out waiting for search results")?;

    let (search_id, total) = controller
        .view(view, |v| (v.data.search_id, v.data.total.unwrap_or(0)))
        .unwrap_or_default();
    debug!(search_id, total, "search settled");
    controller.request_range(view, search_id, cmd.start, cmd.count);

    let first = cmd.start * VIEW_PAGE_SIZE;
    let end = (cmd.start + cmd.count)
        .saturating_mul(VIEW_PAGE_SIZE)
        .min(usize::try_from(total).unwrap_or(usize::MAX));
    wait_for(timeout, || {
        (first..end).all(|index| controller.game(view, index).is_some())
    })
    .await
    .context("timed out waiting for pages")?;

    Ok((first..end)
        .filter_map(|index| controller.game(view, index).map(|game| (index, game)))
        .collect())
}

async fn wait_for(timeout: Duration, mut done: impl FnMut() -> bool) -> Result<()> {
    tokio::time::timeout(timeout, async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await?;
    Ok(())
}

fn print_table(rows: &[(usize, Game)]) {
    if rows.is_empty() {
        println!("no games found");
        return;
    }
    for (index, game) in rows {
        println!(
            "{index:>6}  {:<40}  {:<24}  {}",
            game.title, game.developer, game.platform
        );
    }
}
