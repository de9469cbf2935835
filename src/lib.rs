//! Core library surface for the setlist search builder.
//!
//! The `search` module holds the row list and its command handlers and does
//! not depend on the terminal; the `ui` module renders it, and `db` supplies
//! the song vocabulary the pickers search.
pub mod config;
pub mod db;
pub mod models;
pub mod search;
pub mod ui;

pub use config::Config;
pub use models::{Choice, Operator, Position, Song};
pub use search::{FormSubmission, RowList, SearchEditor, SelectionWidget};
pub use ui::{run_app, App};
