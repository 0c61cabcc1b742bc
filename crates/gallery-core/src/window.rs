//! Viewport windowing: which packed items are materialized as render elements.

use crate::error::AssetError;
use crate::item::Catalog;
use crate::item::Item;
use crate::item::ItemId;
use crate::packer::Layout;
use crate::packer::Position;
use futures::future::AbortHandle;
use futures::future::Abortable;
use futures::future::LocalBoxFuture;
use std::collections::BTreeSet;
use std::collections::HashMap;

/// Asynchronous content load for one element (an image, a preview, ...).
pub type AssetLoad = LocalBoxFuture<'static, Result<(), AssetError>>;

/// Element lifecycle supplied by the host UI.
///
/// The window manager never builds UI itself; it asks the host to create, move and destroy
/// elements. Elements start in a placeholder state and are swapped once their asset settles.
pub trait RenderHost<T> {
    type Element;

    fn create(&mut self, item: &Item<T>, position: Position) -> Self::Element;

    fn reposition(&mut self, element: &mut Self::Element, position: Position);

    fn destroy(&mut self, element: Self::Element);

    fn load_asset(&mut self, _item: &Item<T>) -> Option<AssetLoad> {
        None
    }

    fn asset_loaded(&mut self, _element: &mut Self::Element) {}

    fn asset_failed(&mut self, _element: &mut Self::Element, _error: &AssetError) {}
}

/// The visible viewport plus a buffer margin on each side: `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtendedViewport {
    pub start: f64,
    pub end: f64,
}

impl ExtendedViewport {
    pub fn new(scroll_offset: f64, viewport_extent: f64, buffer_extent: f64) -> Self {
        Self {
            start: scroll_offset - buffer_extent,
            end: scroll_offset + viewport_extent + buffer_extent,
        }
    }

    pub fn contains(&self, position: &Position) -> bool {
        position.top < self.end && position.bottom() > self.start
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowDiff {
    pub to_render: BTreeSet<ItemId>,
    pub to_evict: BTreeSet<ItemId>,
}

impl WindowDiff {
    pub fn is_empty(&self) -> bool {
        self.to_render.is_empty() && self.to_evict.is_empty()
    }
}

/// Computes what has to change so that the rendered set matches `viewport`.
pub fn diff_window<'a>(
    viewport: ExtendedViewport,
    layout: &Layout,
    rendered: impl IntoIterator<Item = &'a ItemId>,
) -> WindowDiff {
    let wanted: BTreeSet<&ItemId> = layout
        .iter()
        .filter(|(_, p)| viewport.contains(&p.position))
        .map(|(id, _)| id)
        .collect();
    let rendered: BTreeSet<&ItemId> = rendered.into_iter().collect();

    WindowDiff {
        to_render: wanted.difference(&rendered).map(|&id| id.clone()).collect(),
        to_evict: rendered.difference(&wanted).map(|&id| id.clone()).collect(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetState {
    /// The host has no asynchronous content for this item.
    None,
    Pending,
    Loaded,
    Failed,
}

/// An asset load wrapped for cancellation; the caller spawns `future` and reports the result back
/// through [`WindowManager::settle_asset`].
pub struct AssetTask {
    pub id: ItemId,
    pub generation: u64,
    pub future: Abortable<AssetLoad>,
}

impl std::fmt::Debug for AssetTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetTask")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct WindowPass {
    pub diff: WindowDiff,
    pub repositioned: usize,
    pub asset_tasks: Vec<AssetTask>,
}

struct Rendered<E> {
    element: E,
    position: Position,
    asset: AssetState,
    generation: u64,
    load: Option<AbortHandle>,
}

/// Owns the rendered elements and keeps them in sync with the extended viewport.
pub struct WindowManager<E> {
    rendered: HashMap<ItemId, Rendered<E>>,
    next_generation: u64,
}

impl<E> Default for WindowManager<E> {
    fn default() -> Self {
        Self {
            rendered: HashMap::new(),
            next_generation: 0,
        }
    }
}

impl<E> WindowManager<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }

    pub fn is_rendered(&self, id: &ItemId) -> bool {
        self.rendered.contains_key(id)
    }

    pub fn rendered_ids(&self) -> BTreeSet<ItemId> {
        self.rendered.keys().cloned().collect()
    }

    pub fn element(&self, id: &ItemId) -> Option<&E> {
        self.rendered.get(id).map(|r| &r.element)
    }

    pub fn asset_state(&self, id: &ItemId) -> Option<AssetState> {
        self.rendered.get(id).map(|r| r.asset)
    }

    pub fn elements(&self) -> impl Iterator<Item = (&ItemId, &E)> {
        self.rendered.iter().map(|(id, r)| (id, &r.element))
    }

    /// Runs one window pass: creates elements entering the viewport, destroys the ones leaving it
    /// and moves retained ones whose position changed.
    pub fn update<T, H>(
        &mut self,
        viewport: ExtendedViewport,
        layout: &Layout,
        catalog: &Catalog<T>,
        host: &mut H,
    ) -> WindowPass
    where
        H: RenderHost<T, Element = E>,
    {
        let diff = diff_window(viewport, layout, self.rendered.keys());
        let mut pass = WindowPass::default();

        for id in &diff.to_evict {
            if let Some(rendered) = self.rendered.remove(id) {
                dispose(rendered, host);
            }
        }

        for (id, rendered) in self.rendered.iter_mut() {
            let Some(position) = layout.position(id) else {
                continue;
            };
            if position != rendered.position {
                host.reposition(&mut rendered.element, position);
                rendered.position = position;
                pass.repositioned += 1;
            }
        }

        for id in &diff.to_render {
            let (Some(item), Some(position)) = (catalog.get(id), layout.position(id)) else {
                continue;
            };
            let element = host.create(item, position);
            let generation = self.next_generation;
            self.next_generation += 1;

            let (asset, load) = match host.load_asset(item) {
                Some(future) => {
                    let (handle, registration) = AbortHandle::new_pair();
                    pass.asset_tasks.push(AssetTask {
                        id: id.clone(),
                        generation,
                        future: Abortable::new(future, registration),
                    });
                    (AssetState::Pending, Some(handle))
                }
                None => (AssetState::None, None),
            };

            self.rendered.insert(
                id.clone(),
                Rendered {
                    element,
                    position,
                    asset,
                    generation,
                    load,
                },
            );
        }

        pass.diff = diff;
        pass
    }

    /// Applies a finished asset load. Results for elements that were evicted or re-created since
    /// the load started are dropped.
    pub fn settle_asset<T, H>(
        &mut self,
        id: &ItemId,
        generation: u64,
        result: Result<(), AssetError>,
        host: &mut H,
    ) -> bool
    where
        H: RenderHost<T, Element = E>,
    {
        let Some(rendered) = self.rendered.get_mut(id) else {
            return false;
        };
        if rendered.generation != generation || rendered.asset != AssetState::Pending {
            return false;
        }
        rendered.load = None;
        match result {
            Ok(()) => {
                rendered.asset = AssetState::Loaded;
                host.asset_loaded(&mut rendered.element);
            }
            Err(err) => {
                tracing::debug!(%id, error = %err, "asset failed, showing failure placeholder");
                rendered.asset = AssetState::Failed;
                host.asset_failed(&mut rendered.element, &err);
            }
        }
        true
    }

    /// Destroys every element and abandons their pending loads.
    pub fn clear<T, H>(&mut self, host: &mut H)
    where
        H: RenderHost<T, Element = E>,
    {
        for (_, rendered) in self.rendered.drain() {
            dispose(rendered, host);
        }
    }
}

fn dispose<T, E, H>(rendered: Rendered<E>, host: &mut H)
where
    H: RenderHost<T, Element = E>,
{
    if let Some(load) = rendered.load {
        load.abort();
    }
    host.destroy(rendered.element);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packer::GridMetrics;
    use crate::packer::pack;
    use crate::pattern::Shape;
    use futures::FutureExt;

    #[derive(Default)]
    struct Recorder {
        created: Vec<ItemId>,
        destroyed: Vec<ItemId>,
        moved: usize,
        failed: Vec<ItemId>,
        with_assets: bool,
    }

    impl RenderHost<()> for Recorder {
        type Element = ItemId;

        fn create(&mut self, item: &Item<()>, _position: Position) -> ItemId {
            self.created.push(item.id.clone());
            item.id.clone()
        }

        fn reposition(&mut self, _element: &mut ItemId, _position: Position) {
            self.moved += 1;
        }

        fn destroy(&mut self, element: ItemId) {
            self.destroyed.push(element);
        }

        fn load_asset(&mut self, _item: &Item<()>) -> Option<AssetLoad> {
            self.with_assets
                .then(|| futures::future::pending::<Result<(), AssetError>>().boxed_local())
        }

        fn asset_failed(&mut self, element: &mut ItemId, _error: &AssetError) {
            self.failed.push(element.clone());
        }
    }

    /// One column of 100px-tall items with no gap: item `i` spans `[i*100, i*100+100)`.
    fn column(n: usize) -> (Catalog<()>, Layout) {
        let mut catalog = Catalog::new();
        catalog.append((0..n).map(|i| Item::new(format!("{i}"), ())));
        let layout = pack(
            catalog.iter().map(|i| (&i.id, Shape::UNIT)),
            100.0,
            GridMetrics {
                base_unit: 100.0,
                gap: 0.0,
            },
        );
        (catalog, layout)
    }

    fn expected(layout: &Layout, viewport: ExtendedViewport) -> BTreeSet<ItemId> {
        layout
            .iter()
            .filter(|(_, p)| viewport.contains(&p.position))
            .map(|(id, _)| id.clone())
            .collect()
    }

    #[test]
    fn extended_viewport_is_half_open() {
        let v = ExtendedViewport::new(200.0, 100.0, 50.0);
        let at = |top: f64| Position {
            left: 0.0,
            top,
            width: 10.0,
            height: 100.0,
        };
        assert!(!v.contains(&at(50.0)));
        assert!(v.contains(&at(51.0)));
        assert!(v.contains(&at(349.0)));
        assert!(!v.contains(&at(350.0)));
    }

    #[test]
    fn rendered_set_tracks_the_extended_viewport() {
        let (catalog, layout) = column(50);
        let mut host = Recorder::default();
        let mut window = WindowManager::new();

        for scroll in [0.0, 120.0, 950.0, 2400.0, 4900.0, 300.0] {
            let viewport = ExtendedViewport::new(scroll, 300.0, 150.0);
            window.update(viewport, &layout, &catalog, &mut host);
            assert_eq!(window.rendered_ids(), expected(&layout, viewport));
        }
        assert_eq!(
            host.created.len() - host.destroyed.len(),
            window.len(),
            "every eviction destroys exactly one element"
        );
    }

    #[test]
    fn small_scroll_only_touches_the_edges() {
        let (catalog, layout) = column(20);
        let mut host = Recorder::default();
        let mut window = WindowManager::new();
        window.update(
            ExtendedViewport::new(0.0, 300.0, 0.0),
            &layout,
            &catalog,
            &mut host,
        );
        let pass = window.update(
            ExtendedViewport::new(100.0, 300.0, 0.0),
            &layout,
            &catalog,
            &mut host,
        );
        assert_eq!(pass.diff.to_render, BTreeSet::from([ItemId::from("3")]));
        assert_eq!(pass.diff.to_evict, BTreeSet::from([ItemId::from("0")]));
        assert_eq!(host.moved, 0);
    }

    #[test]
    fn eviction_abandons_pending_loads_and_ignores_late_results() {
        let (catalog, layout) = column(10);
        let mut host = Recorder {
            with_assets: true,
            ..Recorder::default()
        };
        let mut window = WindowManager::new();
        let pass = window.update(
            ExtendedViewport::new(0.0, 100.0, 0.0),
            &layout,
            &catalog,
            &mut host,
        );
        assert_eq!(pass.asset_tasks.len(), 1);
        let task = pass.asset_tasks.into_iter().next().unwrap();
        assert_eq!(window.asset_state(&task.id), Some(AssetState::Pending));

        window.update(
            ExtendedViewport::new(500.0, 100.0, 0.0),
            &layout,
            &catalog,
            &mut host,
        );
        assert_eq!(host.destroyed, vec![task.id.clone()]);
        assert!(!window.settle_asset(
            &task.id,
            task.generation,
            Err(AssetError("late".into())),
            &mut host
        ));
        assert!(host.failed.is_empty());
        assert!(matches!(task.future.now_or_never(), Some(Err(_))));
    }

    #[test]
    fn asset_failure_is_contained_to_its_element() {
        let (catalog, layout) = column(10);
        let mut host = Recorder {
            with_assets: true,
            ..Recorder::default()
        };
        let mut window = WindowManager::new();
        let pass = window.update(
            ExtendedViewport::new(0.0, 200.0, 0.0),
            &layout,
            &catalog,
            &mut host,
        );
        assert_eq!(pass.asset_tasks.len(), 2);
        let (a, b) = (&pass.asset_tasks[0], &pass.asset_tasks[1]);

        assert!(window.settle_asset(
            &a.id,
            a.generation,
            Err(AssetError("404".into())),
            &mut host
        ));
        assert!(window.settle_asset(&b.id, b.generation, Ok(()), &mut host));
        assert_eq!(window.asset_state(&a.id), Some(AssetState::Failed));
        assert_eq!(window.asset_state(&b.id), Some(AssetState::Loaded));
        assert_eq!(host.failed, vec![a.id.clone()]);
        assert_eq!(window.len(), 2);
    }
}
