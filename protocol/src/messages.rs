//! The two closed message sets exchanged by the back and its clients.

use crate::envelope::TypeTag;
use crate::game::LogEntry;
use crate::game::Playlist;
use crate::message::Args;
use crate::message::DecodeError;
use crate::message::Message;
use crate::message::arg;
use crate::search::QueryData;
use crate::search::SearchQuery;
use crate::search::ViewPage;
use serde_json::Value;
use std::str::FromStr;
use strum_macros::Display;
use strum_macros::EnumIter;
use strum_macros::EnumString;
use strum_macros::FromRepr;
use strum_macros::IntoStaticStr;

/// Requests a client sends to the back.
#[derive(Clone, Debug, PartialEq)]
pub enum BackIn {
    ParseQueryData(QueryData),
    BrowseViewFirstPage(SearchQuery),
    BrowseViewKeyset(SearchQuery),
    /// Fire-and-forget; the rows come back as [`BackOut::BrowseViewPage`].
    BrowseViewPage(SearchQuery),
    GetPlaylists,
    SavePlaylist(Playlist),
    AddLog(LogEntry),
    GetLogs,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter, FromRepr, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[repr(u16)]
pub enum BackInKind {
    ParseQueryData = 1,
    BrowseViewFirstPage,
    BrowseViewKeyset,
    BrowseViewPage,
    GetPlaylists,
    SavePlaylist,
    AddLog,
    GetLogs,
}

/// Messages the back pushes to its clients.
#[derive(Clone, Debug, PartialEq)]
pub enum BackOut {
    BrowseViewPage(ViewPage),
    LogEntryAdded(LogEntry),
    PlaylistUpdated(Playlist),
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter, FromRepr, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[repr(u16)]
pub enum BackOutKind {
    BrowseViewPage = 1,
    LogEntryAdded,
    PlaylistUpdated,
}

fn resolve_tag<K>(tag: &TypeTag, from_repr: impl Fn(u16) -> Option<K>) -> Result<K, DecodeError>
where
    K: FromStr,
{
    let kind = match tag {
        TypeTag::Name(name) => K::from_str(name).ok(),
        TypeTag::Number(number) => u16::try_from(*number).ok().and_then(from_repr),
    };
    kind.ok_or_else(|| DecodeError::UnknownType(tag.clone()))
}

impl Message for BackIn {
    type Kind = BackInKind;

    fn kind(&self) -> BackInKind {
        match self {
            BackIn::ParseQueryData(_) => BackInKind::ParseQueryData,
            BackIn::BrowseViewFirstPage(_) => BackInKind::BrowseViewFirstPage,
            BackIn::BrowseViewKeyset(_) => BackInKind::BrowseViewKeyset,
            BackIn::BrowseViewPage(_) => BackInKind::BrowseViewPage,
            BackIn::GetPlaylists => BackInKind::GetPlaylists,
            BackIn::SavePlaylist(_) => BackInKind::SavePlaylist,
            BackIn::AddLog(_) => BackInKind::AddLog,
            BackIn::GetLogs => BackInKind::GetLogs,
        }
    }

    fn kind_from_tag(tag: &TypeTag) -> Result<BackInKind, DecodeError> {
        resolve_tag(tag, BackInKind::from_repr)
    }

    fn tag(kind: BackInKind) -> TypeTag {
        let name: &'static str = kind.into();
        TypeTag::from(name)
    }

    fn decode(kind: BackInKind, args: Vec<Value>) -> Result<Self, DecodeError> {
        let mut args = Args::new(kind, args);
        Ok(match kind {
            BackInKind::ParseQueryData => BackIn::ParseQueryData(args.next()?),
            BackInKind::BrowseViewFirstPage => BackIn::BrowseViewFirstPage(args.next()?),
            BackInKind::BrowseViewKeyset => BackIn::BrowseViewKeyset(args.next()?),
            BackInKind::BrowseViewPage => BackIn::BrowseViewPage(args.next()?),
            BackInKind::GetPlaylists => BackIn::GetPlaylists,
            BackInKind::SavePlaylist => BackIn::SavePlaylist(args.next()?),
            BackInKind::AddLog => BackIn::AddLog(args.next()?),
            BackInKind::GetLogs => BackIn::GetLogs,
        })
    }

    fn into_args(self) -> Result<Vec<Value>, serde_json::Error> {
        Ok(match self {
            BackIn::ParseQueryData(data) => vec![arg(&data)?],
            BackIn::BrowseViewFirstPage(query)
            | BackIn::BrowseViewKeyset(query)
            | BackIn::BrowseViewPage(query) => vec![arg(&query)?],
            BackIn::GetPlaylists | BackIn::GetLogs => Vec::new(),
            BackIn::SavePlaylist(playlist) => vec![arg(&playlist)?],
            BackIn::AddLog(entry) => vec![arg(&entry)?],
        })
    }
}

impl Message for BackOut {
    type Kind = BackOutKind;

    fn kind(&self) -> BackOutKind {
        match self {
            BackOut::BrowseViewPage(_) => BackOutKind::BrowseViewPage,
            BackOut::LogEntryAdded(_) => BackOutKind::LogEntryAdded,
            BackOut::PlaylistUpdated(_) => BackOutKind::PlaylistUpdated,
        }
    }

    fn kind_from_tag(tag: &TypeTag) -> Result<BackOutKind, DecodeError> {
        resolve_tag(tag, BackOutKind::from_repr)
    }

    fn tag(kind: BackOutKind) -> TypeTag {
        let name: &'static str = kind.into();
        TypeTag::from(name)
    }

    fn decode(kind: BackOutKind, args: Vec<Value>) -> Result<Self, DecodeError> {
        let mut args = Args::new(kind, args);
        Ok(match kind {
            BackOutKind::BrowseViewPage => BackOut::BrowseViewPage(args.next()?),
            BackOutKind::LogEntryAdded => BackOut::LogEntryAdded(args.next()?),
            BackOutKind::PlaylistUpdated => BackOut::PlaylistUpdated(args.next()?),
        })
    }

    fn into_args(self) -> Result<Vec<Value>, serde_json::Error> {
        Ok(match self {
            BackOut::BrowseViewPage(page) => vec![arg(&page)?],
            BackOut::LogEntryAdded(entry) => vec![arg(&entry)?],
            BackOut::PlaylistUpdated(playlist) => vec![arg(&playlist)?],
        })
    }
}
