//! Ratatui front-end for the setlist search builder. The row list is the only
//! source of truth; every frame is drawn from it.

mod app;
mod helpers;
mod picker;
mod terminal;

pub use app::App;
pub use terminal::run_app;
