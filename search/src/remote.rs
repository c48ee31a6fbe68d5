use crate::controller::BrowseBackend;
use crate::controller::SearchController;
use arcade_protocol::BackIn;
use arcade_protocol::BackOut;
use arcade_protocol::BackOutKind;
use arcade_protocol::Message;
use arcade_protocol::game::Playlist;
use arcade_protocol::search::FirstPage;
use arcade_protocol::search::PageKeyset;
use arcade_protocol::search::QueryData;
use arcade_protocol::search::SearchQuery;
use arcade_socket::ClientContext;
use arcade_socket::HandlerError;
use arcade_socket::Router;
use arcade_socket::SocketClient;
use arcade_socket::SocketError;
use async_trait::async_trait;
use serde_json::Value;

/// Client connection to the back.
pub type BackClient = SocketClient<BackIn, BackOut>;

#[async_trait]
impl BrowseBackend for BackClient {
    async fn parse_query_data(&self, data: QueryData) -> Result<SearchQuery, SocketError> {
        self.request_as(BackIn::ParseQueryData(data)).await
    }

    async fn first_page(&self, query: SearchQuery) -> Result<FirstPage, SocketError> {
        self.request_as(BackIn::BrowseViewFirstPage(query)).await
    }

    async fn keyset(&self, query: SearchQuery) -> Result<PageKeyset, SocketError> {
        self.request_as(BackIn::BrowseViewKeyset(query)).await
    }

    fn request_page(&self, query: SearchQuery) -> Result<(), SocketError> {
        self.notify(BackIn::BrowseViewPage(query))
    }

    fn save_playlist(&self, playlist: Playlist) -> Result<(), SocketError> {
        self.notify(BackIn::SavePlaylist(playlist))
    }
}

/// Feeds pages pushed by the back into `controller`.
pub fn route_pages<B: BrowseBackend>(
    router: &Router<BackOut, ClientContext>,
    controller: SearchController<B>,
) {
    router.register(BackOutKind::BrowseViewPage, move |_ctx, message| {
        let controller = controller.clone();
        async move {
            match message {
                BackOut::BrowseViewPage(page) => {
                    let applied = controller.apply_page(page);
                    Ok(Value::Bool(applied))
                }
                other => Err(HandlerError::failed(format!(
                    "unexpected {} message",
                    other.kind()
                ))),
            }
        }
    });
}
