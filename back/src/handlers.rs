//! Responses of the back to every [`BackIn`] message.

use crate::log_buffer::LogBuffer;
use crate::playlists::PlaylistStore;
use arcade_engine::QueryEngine;
use arcade_protocol::BackIn;
use arcade_protocol::BackInKind;
use arcade_protocol::BackOut;
use arcade_protocol::search::FirstPage;
use arcade_protocol::search::ViewPage;
use arcade_search::SearchPreferences;
use arcade_search::create_search_query;
use arcade_socket::HandlerError;
use arcade_socket::Peer;
use arcade_socket::SocketServer;
use serde_json::Value;
use serde_json::json;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::debug;
use tracing::warn;

pub type BackServer = SocketServer<BackIn, BackOut>;
pub type BackPeer = Peer<BackIn, BackOut>;

/// Everything the handlers share.
pub struct BackState {
    pub engine: Arc<dyn QueryEngine>,
    pub preferences: SearchPreferences,
    pub playlists: Arc<PlaylistStore>,
    pub logs: Arc<LogBuffer>,
}

/// Installs one handler per message kind plus a request-logging observer.
pub fn register(server: &BackServer, state: Arc<BackState>) {
    let router = server.router();
    router.register_any(|peer, request| {
        debug!(client = peer.client, kind = %request.kind, id = ?request.id, "request");
        Ok(())
    });
    for kind in BackInKind::iter() {
        let state = Arc::clone(&state);
        router.register(kind, move |peer, message| {
            let state = Arc::clone(&state);
            async move { respond(&state, peer, message).await }
        });
    }
}

async fn respond(state: &BackState, peer: BackPeer, message: BackIn) -> Result<Value, HandlerError> {
    match message {
        BackIn::ParseQueryData(data) => {
            Ok(json!(create_search_query(data, &state.preferences)))
        }
        BackIn::BrowseViewFirstPage(query) => {
            let games = state
                .engine
                .first_page(&query.search)
                .await
                .map_err(HandlerError::failed)?;
            Ok(json!(FirstPage { games }))
        }
        BackIn::BrowseViewKeyset(query) => {
            let keyset = state
                .engine
                .keyset(&query.search)
                .await
                .map_err(HandlerError::failed)?;
            Ok(json!(keyset))
        }
        BackIn::BrowseViewPage(query) => {
            let offset = query.search.offset.unwrap_or(0);
            let games = state
                .engine
                .page(&query.search, offset)
                .await
                .map_err(HandlerError::failed)?;
            let page = ViewPage {
                view_id: query.view_id,
                search_id: query.search_id,
                page: query.page,
                games,
            };
            let delivered = peer
                .server
                .send(peer.client, BackOut::BrowseViewPage(page))
                .await
                .map_err(HandlerError::failed)?;
            if !delivered {
                warn!(client = peer.client, "page was not delivered");
            }
            Ok(Value::Null)
        }
        BackIn::GetPlaylists => Ok(json!(state.playlists.list())),
        BackIn::SavePlaylist(playlist) => {
            let saved = state
                .playlists
                .save(playlist)
                .map_err(|err| HandlerError::failed(format!("{err:#}")))?;
            if let Err(err) = peer
                .server
                .broadcast(BackOut::PlaylistUpdated(saved.clone()))
                .await
            {
                warn!("failed to announce playlist update: {err}");
            }
            Ok(json!(saved))
        }
        BackIn::AddLog(entry) => {
            peer.server
                .broadcast(BackOut::LogEntryAdded(entry))
                .await
                .map_err(HandlerError::failed)?;
            Ok(Value::Null)
        }
        BackIn::GetLogs => Ok(json!(state.logs.entries())),
    }
}
