use serde::Deserialize;
use serde::Serialize;
use serde_with::skip_serializing_none;
use strum_macros::Display;
use time::OffsetDateTime;

/// One row of the game library as shown in a results view.
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub alternate_titles: String,
    #[serde(default)]
    pub series: String,
    #[serde(default)]
    pub developer: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub play_mode: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub library: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date_added: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date_modified: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_played: Option<OffsetDateTime>,
    /// Seconds spent in the game.
    #[serde(default)]
    pub playtime: i64,
    #[serde(default)]
    pub play_counter: i64,
    #[serde(default)]
    pub installed: bool,
    #[serde(default)]
    pub extreme: bool,
}

impl Game {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            alternate_titles: String::new(),
            series: String::new(),
            developer: String::new(),
            publisher: String::new(),
            platform: String::new(),
            play_mode: String::new(),
            status: String::new(),
            source: String::new(),
            library: String::new(),
            tags: Vec::new(),
            release_date: None,
            date_added: None,
            date_modified: None,
            last_played: None,
            playtime: 0,
            play_counter: 0,
            installed: false,
            extreme: false,
        }
    }
}

#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistGame {
    pub game_id: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub library: String,
    #[serde(default)]
    pub extreme: bool,
    #[serde(default)]
    pub games: Vec<PlaylistGame>,
}

impl Playlist {
    pub fn game_ids(&self) -> Vec<String> {
        self.games.iter().map(|entry| entry.game_id.clone()).collect()
    }

    pub fn position(&self, game_id: &str) -> Option<usize> {
        self.games.iter().position(|entry| entry.game_id == game_id)
    }
}

/// A named set of tags hidden from search results while enabled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagFilterGroup {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
    /// Extreme groups also apply whenever extreme content is hidden.
    #[serde(default)]
    pub extreme: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub source: String,
    pub content: String,
    pub level: LogLevel,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl LogEntry {
    pub fn now(source: impl Into<String>, level: LogLevel, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
            level,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}
