//! `ratatui-gallery` draws [`gallery_core`] layouts in the terminal.
//!
//! - [`masonry_view::MasonryView`]: infinite-scroll masonry gallery. Tiles are created and
//!   destroyed as they enter and leave the viewport buffer; pages are fetched as you approach the
//!   bottom.
//! - [`fixed_list_view::FixedListView`]: huge fixed-height lists drawn from a small recycled pool
//!   of rows.
//!
//! Both views are event-loop agnostic: feed them [`input::InputEvent`]s, render them every frame
//! and, for the gallery, run the executor you gave it between frames.
pub use gallery_core;

pub mod theme;

#[cfg(feature = "crossterm")]
pub mod crossterm_input;

pub mod render;
pub mod scroll;
pub mod viewport;

pub mod input;

pub mod fixed_list_view;
pub mod masonry_view;
