use crate::error::FetchError;
use crate::item::ItemId;

/// Notifications queued by the gallery; drain them with `Gallery::drain_events`.
#[derive(Clone, Debug, PartialEq)]
pub enum GalleryEvent {
    PageLoaded {
        page: usize,
        new_item_count: usize,
        total_items: usize,
    },
    LoadError {
        error: FetchError,
        page: usize,
    },
    ItemEnteredViewport {
        id: ItemId,
    },
    ItemLeftViewport {
        id: ItemId,
    },
}
