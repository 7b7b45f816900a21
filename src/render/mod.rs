//! Podium and table rendering.

pub mod board;
pub mod text;

pub use board::{layout, BoardRow, BoardView, PodiumSlot, Point, Viewport, PLACEHOLDER_NAME};
pub use text::TextRenderer;
