mod browse;
mod logs;
mod playlists;
mod support;
