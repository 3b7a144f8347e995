mod app;
mod board_view;
mod dialogs;
mod pending;
mod theme;

pub use app::DispatchApp;
pub use theme::{setup_fonts, setup_theme};
