//! Interaction components
//!
//! One component per UI region. A component owns the queries for its region
//! and the semantic actions on them. Components may hold other components
//! (the color picker is shared by three panels) but never a page facade.

mod color_picker;
mod confirm_dialog;
mod context_menu;
mod design_panel;
mod file_grid;
mod fonts;
mod header;
mod history_panel;
mod layers;
mod team_menu;
mod tokens_panel;
mod toolbar;
mod viewport;

pub use color_picker::{normalize_hex, ColorPicker};
pub use confirm_dialog::ConfirmDialog;
pub use context_menu::ContextMenu;
pub use design_panel::{DesignPanel, Measure};
pub use file_grid::FileGrid;
pub use fonts::FontsPanel;
pub use header::Header;
pub use history_panel::HistoryPanel;
pub use layers::LayersPanel;
pub use team_menu::TeamMenu;
pub use tokens_panel::{TokenKind, TokensPanel};
pub use toolbar::{Tool, Toolbar};
pub use viewport::Viewport;
