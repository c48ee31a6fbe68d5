use crate::metadata::write_json_atomic;
use anyhow::Context;
use anyhow::Result;
use arcade_protocol::game::Playlist;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;
use tracing::info;

/// Playlists known to the back, optionally backed by a JSON file.
#[derive(Debug, Default)]
pub struct PlaylistStore {
    playlists: Mutex<BTreeMap<String, Playlist>>,
    path: Option<PathBuf>,
}

impl PlaylistStore {
    pub fn in_memory(playlists: Vec<Playlist>) -> Self {
        Self {
            playlists: Mutex::new(
                playlists
                    .into_iter()
                    .map(|playlist| (playlist.id.clone(), playlist))
                    .collect(),
            ),
            path: None,
        }
    }

    /// Loads `path` if it exists; saves go back to the same file.
    pub fn open(path: &Path) -> Result<Self> {
        let playlists: Vec<Playlist> = if path.exists() {
            let data = fs::read(path)
                .with_context(|| format!("failed to read playlists {}", path.display()))?;
            serde_json::from_slice(&data)
                .with_context(|| format!("invalid playlists in {}", path.display()))?
        } else {
            Vec::new()
        };
        info!(path = %path.display(), playlists = playlists.len(), "loaded playlists");
        let mut store = Self::in_memory(playlists);
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    pub fn list(&self) -> Vec<Playlist> {
        self.lock().values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<Playlist> {
        self.lock().get(id).cloned()
    }

    /// Inserts or replaces `playlist` and persists the whole set.
    pub fn save(&self, playlist: Playlist) -> Result<Playlist> {
        let snapshot = {
            let mut playlists = self.lock();
            playlists.insert(playlist.id.clone(), playlist.clone());
            playlists.values().cloned().collect::<Vec<_>>()
        };
        if let Some(path) = &self.path {
            write_json_atomic(path, &snapshot)?;
        }
        Ok(playlist)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Playlist>> {
        match self.playlists.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
