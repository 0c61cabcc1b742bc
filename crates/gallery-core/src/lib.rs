//! `gallery-core` is the UI-agnostic engine behind virtualized masonry galleries and fixed-row
//! lists.
//!
//! It does not draw anything. A host (a terminal widget, a DOM binding, a test harness) implements
//! [`window::RenderHost`] and [`observer::ViewportObserver`]; the engine decides which items exist,
//! where they go and which of them should currently be materialized.
//!
//! ## Design goals
//!
//! - Deterministic layout: the same items, shapes and width always pack the same way.
//! - Bounded work: only items inside the viewport plus a buffer are rendered, and scroll/resize
//!   bursts are coalesced by [`schedule::FrameThrottle`] and [`schedule::Debounce`].
//! - No runtime lock-in: fetches and asset loads are plain futures spawned on a
//!   [`futures::task::LocalSpawn`] you provide, and every one of them can be abandoned.
//!
//! ## Getting started
//!
//! - [`gallery::Gallery`]: masonry gallery with infinite scroll.
//! - [`packer::pack`]: the packing algorithm on its own.
//! - [`fixed_list::RowPool`]: fixed-height list virtualization with element recycling.
//! - [`config::GalleryConfig`]: options, loadable from JSON or element-style attributes.
pub mod config;
pub mod error;
pub mod event;
pub mod item;
pub mod pattern;

pub mod observer;
pub mod schedule;

pub mod packer;
pub mod paginator;
pub mod window;

pub mod fixed_list;
pub mod gallery;

pub use config::GalleryConfig;
pub use error::ConfigError;
pub use error::FetchError;
pub use event::GalleryEvent;
pub use gallery::DataSource;
pub use gallery::Gallery;
pub use item::Item;
pub use item::ItemId;
pub use pattern::Shape;
pub use window::RenderHost;
