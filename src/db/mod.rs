//! SQLite song catalog split across logical submodules.

mod connection;
mod songs;

pub use connection::{default_db_path, ensure_schema, open_in_memory};
pub(crate) use connection::data_dirs;
pub use songs::{create_song, fetch_song, import_songs, search_songs, song_count};
