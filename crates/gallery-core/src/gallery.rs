//! The gallery orchestrator.
//!
//! [`Gallery`] wires the pieces together: it listens to a [`ViewportObserver`], pulls pages from a
//! [`DataSource`], assigns shapes, repacks, and keeps the rendered window in sync through a
//! [`RenderHost`]. Everything runs on one thread; fetches and asset loads are spawned on the
//! injected [`LocalSpawn`] executor and report back into the shared state when they finish.
//!
//! Scroll and resize notifications only set flags. The host calls [`Gallery::tick`] once per
//! frame, which applies the throttled window pass and the debounced repack.

use crate::config::GalleryConfig;
use crate::config::ResolvedConfig;
use crate::error::AssetError;
use crate::error::ConfigError;
use crate::error::FetchError;
use crate::event::GalleryEvent;
use crate::item::Catalog;
use crate::item::Item;
use crate::item::ItemId;
use crate::observer::Subscription;
use crate::observer::ViewportObserver;
use crate::packer::Layout;
use crate::packer::pack;
use crate::paginator::PageRequest;
use crate::paginator::PageState;
use crate::paginator::Paginator;
use crate::pattern::PatternSet;
use crate::pattern::Shape;
use crate::pattern::assign_patterns;
use crate::schedule::Debounce;
use crate::schedule::FrameThrottle;
use crate::window::AssetTask;
use crate::window::ExtendedViewport;
use crate::window::RenderHost;
use crate::window::WindowManager;
use futures::FutureExt;
use futures::future::AbortHandle;
use futures::future::Abortable;
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawn;
use futures::task::LocalSpawnExt;
use std::cell::Cell;
use std::cell::Ref;
use std::cell::RefCell;
use std::cell::RefMut;
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::rc::Rc;
use std::rc::Weak;
use std::time::Instant;

pub type PageFuture<T> = LocalBoxFuture<'static, Result<Vec<Item<T>>, FetchError>>;

/// Supplies pages of items. `page` is 0-based.
pub trait DataSource<T> {
    fn fetch_page(&self, page: usize, page_size: usize) -> PageFuture<T>;
}

impl<T, F> DataSource<T> for F
where
    F: Fn(usize, usize) -> PageFuture<T>,
{
    fn fetch_page(&self, page: usize, page_size: usize) -> PageFuture<T> {
        self(page, page_size)
    }
}

/// Counters for how much work the gallery has done.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GalleryStats {
    pub pack_passes: usize,
    pub window_passes: usize,
    pub fetches: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct ViewportSample {
    offset: f64,
    extent: f64,
    width: f64,
}

/// Flags raised by observer listeners, consumed by `tick`.
#[derive(Default)]
struct Signals {
    scrolled: Cell<bool>,
    resized_at: Cell<Option<Instant>>,
}

struct Inner<T, H: RenderHost<T>> {
    this: Weak<RefCell<Inner<T, H>>>,
    config: ResolvedConfig,
    catalog: Catalog<T>,
    layout: Layout,
    window: WindowManager<H::Element>,
    host: H,
    paginator: Paginator,
    source: Option<Rc<dyn DataSource<T>>>,
    spawner: Rc<dyn LocalSpawn>,
    observer: Option<Rc<dyn ViewportObserver>>,
    viewport: ViewportSample,
    scroll: FrameThrottle,
    resize: Debounce,
    in_flight: Option<AbortHandle>,
    next_ordinal: usize,
    events: VecDeque<GalleryEvent>,
    viewport_events: bool,
    stats: GalleryStats,
    mounted: bool,
    torn_down: bool,
}

/// A virtualized masonry gallery with infinite scroll.
pub struct Gallery<T: 'static, H: RenderHost<T> + 'static> {
    inner: Rc<RefCell<Inner<T, H>>>,
    signals: Rc<Signals>,
    subscriptions: Vec<Subscription>,
}

impl<T: 'static, H: RenderHost<T> + 'static> Gallery<T, H> {
    /// Creates an unmounted gallery. Invalid configuration values fall back to their defaults and
    /// are reported by [`Gallery::config_warnings`].
    pub fn new(config: &GalleryConfig, host: H, spawner: impl LocalSpawn + 'static) -> Self {
        let config = config.resolve();
        let spawner: Rc<dyn LocalSpawn> = Rc::new(spawner);
        let inner = Rc::new_cyclic(|this| {
            RefCell::new(Inner {
                this: this.clone(),
                paginator: Paginator::new(config.page_size),
                scroll: FrameThrottle::new(config.scroll_throttle),
                resize: Debounce::new(config.resize_debounce),
                config,
                catalog: Catalog::new(),
                layout: Layout::default(),
                window: WindowManager::new(),
                host,
                source: None,
                spawner,
                observer: None,
                viewport: ViewportSample::default(),
                in_flight: None,
                next_ordinal: 0,
                events: VecDeque::new(),
                viewport_events: false,
                stats: GalleryStats::default(),
                mounted: false,
                torn_down: false,
            })
        });
        Self {
            inner,
            signals: Rc::new(Signals::default()),
            subscriptions: Vec::new(),
        }
    }

    pub fn with_data_source(self, source: impl DataSource<T> + 'static) -> Self {
        self.set_data_source(source);
        self
    }

    /// Queue `ItemEnteredViewport`/`ItemLeftViewport` events. Off by default.
    pub fn with_viewport_events(self, enabled: bool) -> Self {
        self.inner.borrow_mut().viewport_events = enabled;
        self
    }

    pub fn set_data_source(&self, source: impl DataSource<T> + 'static) {
        let mut inner = self.inner.borrow_mut();
        inner.source = Some(Rc::new(source));
        inner
            .config
            .warnings
            .retain(|w| *w != ConfigError::MissingDataSource);
    }

    /// Attaches the gallery to its scroll container, renders the initial window and requests the
    /// first page.
    pub fn mount(&mut self, observer: Rc<dyn ViewportObserver>) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.torn_down || inner.mounted {
                tracing::warn!("gallery mounted twice or after teardown; ignoring");
                return;
            }
            inner.mounted = true;
            inner.observer = Some(observer.clone());
            inner.sample_viewport();
            inner.repack();
            inner.window_pass();
        }

        let signals = self.signals.clone();
        self.subscriptions
            .push(observer.on_scroll(Box::new(move |_| signals.scrolled.set(true))));
        let signals = self.signals.clone();
        self.subscriptions
            .push(observer.on_resize(Box::new(move |now| signals.resized_at.set(Some(now)))));

        {
            let inner = self.inner.borrow();
            tracing::debug!(
                columns = inner.layout.columns(),
                extent = inner.viewport.extent,
                "gallery mounted"
            );
        }
        load_next_page(&self.inner);
    }

    /// Records a scroll notification; the window pass runs on the next due [`Gallery::tick`].
    pub fn handle_scroll(&self) {
        self.signals.scrolled.set(true);
    }

    /// Records a resize notification at `now`; the repack waits for the debounce window.
    pub fn handle_resize(&self, now: Instant) {
        self.signals.resized_at.set(Some(now));
    }

    /// Runs due work: the debounced repack, the throttled window pass and the near-bottom check.
    pub fn tick(&self, now: Instant) {
        let mut inner = self.inner.borrow_mut();
        if !inner.mounted || inner.torn_down {
            return;
        }
        if self.signals.scrolled.take() {
            inner.scroll.request();
        }
        if let Some(at) = self.signals.resized_at.take() {
            inner.resize.touch(at);
        }

        let mut passed = false;
        if inner.resize.poll(now) {
            inner.sample_viewport();
            inner.repack();
            inner.window_pass();
            passed = true;
        }
        if inner.scroll.poll(now) {
            inner.sample_viewport();
            inner.window_pass();
            passed = true;
        }
        let load = passed && inner.near_bottom();
        drop(inner);
        if load {
            load_next_page(&self.inner);
        }
    }

    /// Requests the next page unless a fetch is in flight or the source is exhausted. Returns
    /// whether a fetch was started.
    pub fn trigger_load(&self) -> bool {
        load_next_page(&self.inner)
    }

    /// Drops every item and rendered element, resets pagination and loads page 0 again.
    pub fn refresh(&self) {
        self.inner.borrow_mut().refresh();
        load_next_page(&self.inner);
    }

    /// Adds one item outside the paging flow. Returns `false` for duplicate ids.
    pub fn register_item(&self, item: Item<T>) -> bool {
        self.inner.borrow_mut().register(item)
    }

    pub fn unregister_item(&self, id: &ItemId) -> Option<Item<T>> {
        self.inner.borrow_mut().unregister(id)
    }

    /// Replaces the shape cycle and reassigns every item from the start of it.
    pub fn set_patterns(&self, shapes: Vec<Shape>) {
        self.inner.borrow_mut().set_patterns(shapes);
    }

    /// Unsubscribes from the observer, abandons the in-flight fetch and pending asset loads, and
    /// destroys every element. Late results are ignored.
    pub fn teardown(&mut self) {
        self.subscriptions.clear();
        let mut inner = self.inner.borrow_mut();
        if inner.torn_down {
            return;
        }
        inner.torn_down = true;
        inner.scroll.cancel();
        inner.resize.cancel();
        if let Some(handle) = inner.in_flight.take() {
            handle.abort();
        }
        inner.paginator.cancel();
        let inner = &mut *inner;
        inner.window.clear(&mut inner.host);
        inner.observer = None;
        tracing::debug!("gallery torn down");
    }

    pub fn is_mounted(&self) -> bool {
        let inner = self.inner.borrow();
        inner.mounted && !inner.torn_down
    }

    pub fn page_state(&self) -> PageState {
        self.inner.borrow().paginator.state()
    }

    pub fn layout(&self) -> Ref<'_, Layout> {
        Ref::map(self.inner.borrow(), |inner| &inner.layout)
    }

    pub fn canvas_height(&self) -> f64 {
        self.inner.borrow().layout.canvas_height()
    }

    pub fn items(&self) -> Ref<'_, Catalog<T>> {
        Ref::map(self.inner.borrow(), |inner| &inner.catalog)
    }

    pub fn item_count(&self) -> usize {
        self.inner.borrow().catalog.len()
    }

    pub fn window(&self) -> Ref<'_, WindowManager<H::Element>> {
        Ref::map(self.inner.borrow(), |inner| &inner.window)
    }

    pub fn rendered_ids(&self) -> BTreeSet<ItemId> {
        self.inner.borrow().window.rendered_ids()
    }

    pub fn host(&self) -> Ref<'_, H> {
        Ref::map(self.inner.borrow(), |inner| &inner.host)
    }

    pub fn host_mut(&self) -> RefMut<'_, H> {
        RefMut::map(self.inner.borrow_mut(), |inner| &mut inner.host)
    }

    pub fn drain_events(&self) -> Vec<GalleryEvent> {
        self.inner.borrow_mut().events.drain(..).collect()
    }

    pub fn config_warnings(&self) -> Vec<ConfigError> {
        self.inner.borrow().config.warnings.clone()
    }

    pub fn stats(&self) -> GalleryStats {
        self.inner.borrow().stats
    }
}

impl<T: 'static, H: RenderHost<T> + 'static> Drop for Gallery<T, H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<T: 'static, H: RenderHost<T> + 'static> Inner<T, H> {
    fn sample_viewport(&mut self) {
        if let Some(observer) = &self.observer {
            self.viewport = ViewportSample {
                offset: observer.current_offset(),
                extent: observer.viewport_extent(),
                width: observer.container_width(),
            };
        }
    }

    fn near_bottom(&self) -> bool {
        let bottom = self.viewport.offset + self.viewport.extent;
        bottom >= self.layout.canvas_height() - self.config.near_bottom_threshold
    }

    fn repack(&mut self) {
        self.layout = pack(
            self.catalog.iter().map(|item| (&item.id, item.shape)),
            self.viewport.width,
            self.config.metrics,
        );
        let base_unit = self.config.metrics.base_unit;
        for item in self.catalog.as_mut_slice() {
            if let Some(placement) = self.layout.placement(&item.id) {
                let placed = Shape::new(placement.cell.width, placement.cell.height);
                item.pixel_size = placed.pixel_size(base_unit);
            }
        }
        self.stats.pack_passes += 1;
    }

    fn window_pass(&mut self) {
        let viewport = ExtendedViewport::new(
            self.viewport.offset,
            self.viewport.extent,
            self.config.buffer_extent,
        );
        let pass = self
            .window
            .update(viewport, &self.layout, &self.catalog, &mut self.host);
        self.stats.window_passes += 1;

        if !pass.diff.is_empty() {
            tracing::trace!(
                entered = pass.diff.to_render.len(),
                left = pass.diff.to_evict.len(),
                rendered = self.window.len(),
                "window pass"
            );
        }
        if self.viewport_events {
            for id in pass.diff.to_evict {
                self.events.push_back(GalleryEvent::ItemLeftViewport { id });
            }
            for id in pass.diff.to_render {
                if self.window.is_rendered(&id) {
                    self.events.push_back(GalleryEvent::ItemEnteredViewport { id });
                }
            }
        }
        for task in pass.asset_tasks {
            self.spawn_asset(task);
        }
    }

    fn spawn_asset(&mut self, task: AssetTask) {
        let AssetTask {
            id,
            generation,
            future,
        } = task;
        let weak = self.this.clone();
        let settle_id = id.clone();
        let settle = future.map(move |result| {
            // Aborted loads belong to evicted elements.
            let Ok(result) = result else {
                return;
            };
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut inner = shared.borrow_mut();
            let inner = &mut *inner;
            inner
                .window
                .settle_asset(&settle_id, generation, result, &mut inner.host);
        });
        if let Err(err) = self.spawner.spawn_local(settle) {
            let error = AssetError(format!("could not spawn asset load: {err}"));
            self.window
                .settle_asset(&id, generation, Err(error), &mut self.host);
        }
    }

    /// Opens the pagination gate for the next page and hands back what is needed to fetch it.
    fn begin_fetch(&mut self) -> Option<(PageRequest, Rc<dyn DataSource<T>>)> {
        if !self.mounted || self.torn_down {
            tracing::trace!("load trigger ignored while unmounted");
            return None;
        }
        let Some(source) = self.source.clone() else {
            if !self
                .config
                .warnings
                .contains(&ConfigError::MissingDataSource)
            {
                tracing::warn!("gallery has no data source; nothing to load");
                self.config.warnings.push(ConfigError::MissingDataSource);
            }
            return None;
        };
        let Some(request) = self.paginator.begin() else {
            tracing::trace!(
                loading = self.paginator.is_loading(),
                has_more = self.paginator.has_more(),
                "load trigger suppressed"
            );
            return None;
        };

        self.stats.fetches += 1;
        tracing::debug!(
            page = request.page,
            page_size = request.page_size,
            "fetching page"
        );
        Some((request, source))
    }

    fn spawn_fetch(&mut self, request: PageRequest, page: PageFuture<T>) -> bool {
        if self.torn_down || !self.paginator.is_current(&request) {
            tracing::trace!(page = request.page, "request superseded while fetching; dropping it");
            return false;
        }
        let (handle, registration) = AbortHandle::new_pair();
        let weak = self.this.clone();
        let fetch = Abortable::new(page, registration).map(move |result| {
            let Ok(result) = result else {
                tracing::trace!(page = request.page, "page fetch aborted");
                return;
            };
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut inner = shared.borrow_mut();
            match result {
                Ok(items) => inner.apply_page(request, items),
                Err(error) => inner.apply_failure(request, error),
            }
        });

        self.in_flight = Some(handle);
        if let Err(err) = self.spawner.spawn_local(fetch) {
            self.in_flight = None;
            self.apply_failure(
                request,
                FetchError::new(format!("could not spawn page fetch: {err}")),
            );
            return false;
        }
        true
    }

    fn apply_page(&mut self, request: PageRequest, items: Vec<Item<T>>) {
        let Some(outcome) = self.paginator.finish(request, items.len()) else {
            tracing::trace!(page = request.page, "dropping stale page");
            return;
        };
        self.in_flight = None;

        let start = self.catalog.len();
        let added = self.catalog.append(items);
        assign_patterns(
            &mut self.catalog.as_mut_slice()[start..],
            self.next_ordinal,
            &self.config.patterns,
            self.config.metrics.base_unit,
        );
        self.next_ordinal += added;

        self.repack();
        self.window_pass();
        tracing::debug!(
            page = outcome.page,
            fetched = outcome.fetched,
            added,
            has_more = outcome.has_more,
            total = self.catalog.len(),
            "page loaded"
        );
        self.events.push_back(GalleryEvent::PageLoaded {
            page: outcome.page,
            new_item_count: added,
            total_items: self.catalog.len(),
        });
    }

    fn apply_failure(&mut self, request: PageRequest, error: FetchError) {
        if !self.paginator.fail(request) {
            return;
        }
        self.in_flight = None;
        tracing::warn!(page = request.page, error = %error, "page fetch failed");
        self.events.push_back(GalleryEvent::LoadError {
            error,
            page: request.page,
        });
    }

    fn refresh(&mut self) {
        if self.torn_down {
            return;
        }
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        self.window.clear(&mut self.host);
        self.catalog.clear();
        self.paginator.reset();
        self.next_ordinal = 0;
        self.repack();
        tracing::debug!("gallery refreshed");
    }

    fn register(&mut self, mut item: Item<T>) -> bool {
        if self.catalog.contains(&item.id) {
            tracing::warn!(id = %item.id, "item already registered");
            return false;
        }
        let shape = self.config.patterns.assign(self.next_ordinal);
        item.shape = shape;
        item.pixel_size = shape.pixel_size(self.config.metrics.base_unit);
        self.next_ordinal += 1;
        self.catalog.append(std::iter::once(item));
        self.repack();
        self.window_pass();
        true
    }

    fn unregister(&mut self, id: &ItemId) -> Option<Item<T>> {
        let item = self.catalog.remove(id)?;
        self.repack();
        self.window_pass();
        Some(item)
    }

    fn set_patterns(&mut self, shapes: Vec<Shape>) {
        let (patterns, error) = PatternSet::or_default(shapes);
        if let Some(error) = error {
            if !self.config.warnings.contains(&error) {
                self.config.warnings.push(error);
            }
        }
        self.config.patterns = patterns;
        assign_patterns(
            self.catalog.as_mut_slice(),
            0,
            &self.config.patterns,
            self.config.metrics.base_unit,
        );
        self.next_ordinal = self.catalog.len();
        self.repack();
        self.window_pass();
    }
}

/// Requests the next page. The data source runs with the shared state unborrowed, so it may call
/// back into the gallery.
fn load_next_page<T: 'static, H: RenderHost<T> + 'static>(
    shared: &Rc<RefCell<Inner<T, H>>>,
) -> bool {
    let Some((request, source)) = shared.borrow_mut().begin_fetch() else {
        return false;
    };
    let page = source.fetch_page(request.page, request.page_size);
    shared.borrow_mut().spawn_fetch(request, page)
}
