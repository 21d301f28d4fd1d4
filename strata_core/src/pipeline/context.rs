// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pipeline context: frame requests, vsync entry, surface readiness,
//! listeners, and lifecycle.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use kurbo::{Point, Rect, Size};

use super::focus::FocusManager;
use crate::animation::{ScheduleHandle, ScheduleRegistry, ScheduleTask};
use crate::config::PipelineConfig;
use crate::dirty;
use crate::error::RestoreError;
use crate::event::EventManager;
use crate::frontend::{ActionHandler, Lifecycle, ScriptFrontend};
use crate::lane::{LaneHandle, ScriptLane, TaskExecutor, UiLane};
use crate::node::{NodeId, NodeKind, NodeStore};
use crate::restore::RestorationRegistry;
use crate::surface::{RenderSurface, VsyncTick};
use crate::time::{HostTime, MonotonicClock, TimeSource};
use crate::trace::{FrameSummaryBuilder, TraceSink, Tracer, VsyncEvent};

/// A one-shot callback run at a fixed point of a flush.
pub type Listener = Box<dyn FnOnce(&mut PipelineContext)>;

/// Callback posted to the script lane after every frame.
pub type AnimationCallback = Arc<dyn Fn() + Send + Sync>;

/// Whether the surface has reported a usable size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceState {
    /// No nonzero size reported yet; vsync is ignored.
    NotReady,
    /// Frames run.
    Ready,
}

/// Modifier keys currently held.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyModifiers {
    /// Either shift key.
    pub shift: bool,
    /// Either control key.
    pub ctrl: bool,
}

/// Orchestrates frames for one surface.
///
/// Owns the node tree, its dirty sets, the event manager, the schedule of
/// running timelines, and the restoration registry. Not `Send`: it is built
/// from a [`LaneHandle<UiLane>`] and stays on the UI lane.
///
/// ```text
/// vsync ─▶ AnimationAdvance ─▶ Build ─▶ PostAnimationHooks ─▶ Layout
///       ─▶ Paint ─▶ SendMessages ─▶ PaintFinish ─▶ WindowBlurRecompute
///       ─▶ FocusFlush ─▶ VisibilityChangeFire ─▶ PostFlushListeners
///       ─▶ ClearDeactivatedSubtrees ─▶ (script lane) animation callback
/// ```
pub struct PipelineContext {
    pub(super) ui: LaneHandle<UiLane>,
    pub(super) executor: Option<Arc<dyn TaskExecutor>>,
    pub(super) surface: Box<dyn RenderSurface>,
    pub(super) config: PipelineConfig,
    pub(super) clock: Box<dyn TimeSource>,
    pub(super) tracer: Tracer,
    pub(super) summary: Option<FrameSummaryBuilder>,

    pub(super) store: NodeStore,
    pub(super) root: Option<NodeId>,
    pub(super) events: EventManager,
    pub(super) focus: FocusManager,
    pub(super) schedule: ScheduleRegistry,
    pub(super) restoration: RestorationRegistry,

    pub(super) frontend: Option<Box<dyn ScriptFrontend>>,
    pub(super) action_handler: Option<ActionHandler>,
    pub(super) animation_callback: Option<AnimationCallback>,

    pub(super) pre_flush: Vec<Listener>,
    pub(super) post_animation: Vec<Listener>,
    pub(super) post_flush: Vec<Listener>,
    pub(super) build_after: Vec<Listener>,
    pub(super) deactivated: BTreeMap<i32, NodeId>,
    pub(super) blur_regions: Vec<Rect>,

    pub(super) surface_state: SurfaceState,
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) modifiers: KeyModifiers,
    pub(super) frame_index: u64,
    pub(super) last_vsync: Option<HostTime>,

    pub(super) frame_requested: bool,
    pub(super) in_flight: bool,
    pub(super) flushing: bool,
    pub(super) alive: bool,
    pub(super) forced_refresh: bool,
    pub(super) refresh_after_vsync: bool,
}

impl core::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("surface_state", &self.surface_state)
            .field("size", &(self.width, self.height))
            .field("root", &self.root)
            .field("frame_index", &self.frame_index)
            .field("frame_requested", &self.frame_requested)
            .field("alive", &self.alive)
            .field("nodes", &self.store.live_count())
            .field("tasks", &self.schedule.len())
            .finish_non_exhaustive()
    }
}

impl PipelineContext {
    /// Creates a context drawing to `surface`.
    ///
    /// The surface starts out not ready; nothing is committed until
    /// [`on_surface_changed`](Self::on_surface_changed) reports a nonzero
    /// size.
    #[must_use]
    pub fn new(
        ui: LaneHandle<UiLane>,
        surface: Box<dyn RenderSurface>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            ui,
            executor: None,
            surface,
            config,
            clock: Box::new(MonotonicClock::new()),
            tracer: Tracer::none(),
            summary: None,
            store: NodeStore::new(),
            root: None,
            events: EventManager::new(),
            focus: FocusManager::new(),
            schedule: ScheduleRegistry::new(),
            restoration: RestorationRegistry::new(),
            frontend: None,
            action_handler: None,
            animation_callback: None,
            pre_flush: Vec::new(),
            post_animation: Vec::new(),
            post_flush: Vec::new(),
            build_after: Vec::new(),
            deactivated: BTreeMap::new(),
            blur_regions: Vec::new(),
            surface_state: SurfaceState::NotReady,
            width: 0,
            height: 0,
            modifiers: KeyModifiers::default(),
            frame_index: 0,
            last_vsync: None,
            frame_requested: false,
            in_flight: false,
            flushing: false,
            alive: true,
            forced_refresh: false,
            refresh_after_vsync: false,
        }
    }

    /// Sets the executor used to post work to other lanes.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Replaces the clock used to timestamp phases.
    #[must_use]
    pub fn with_time_source(mut self, clock: Box<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Routes trace events to `sink`. Without the `trace` feature the sink
    /// is dropped.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.tracer = Tracer::new(sink);
    }

    /// Moves the context behind a shared handle and registers its vsync
    /// callback with the surface.
    ///
    /// The callback holds a weak reference, so dropping the last handle
    /// silences it. A tick that arrives while the context is borrowed (a
    /// frame already running further up the stack) is dropped.
    #[must_use]
    pub fn into_shared(self) -> Rc<RefCell<Self>> {
        let shared = Rc::new(RefCell::new(self));
        let weak = Rc::downgrade(&shared);
        shared
            .borrow_mut()
            .surface
            .set_vsync_callback(Box::new(move |tick: VsyncTick| {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let Ok(mut ctx) = shared.try_borrow_mut() else {
                    tracing::debug!(frame_count = tick.frame_count, "overlapping vsync dropped");
                    return;
                };
                ctx.on_vsync_event(tick.timestamp, tick.frame_count);
            }));
        shared
    }

    // -- Accessors --

    /// The node tree.
    #[must_use]
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// The root node, if one was created.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    /// Surface readiness.
    #[must_use]
    pub fn surface_state(&self) -> SurfaceState {
        self.surface_state
    }

    /// Last reported surface size, in device pixels.
    #[must_use]
    pub fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether [`destroy`](Self::destroy) has not been called.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Number of frames run since creation.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Timestamp of the last vsync that ran a frame.
    #[must_use]
    pub fn last_vsync(&self) -> Option<HostTime> {
        self.last_vsync
    }

    /// Whether a frame is requested and has not run yet.
    #[must_use]
    pub fn is_frame_requested(&self) -> bool {
        self.frame_requested
    }

    /// The event manager and its cached chains.
    #[must_use]
    pub fn events(&self) -> &EventManager {
        &self.events
    }

    /// The focused node, as of the last FocusFlush.
    #[must_use]
    pub fn focused(&self) -> Option<NodeId> {
        self.focus.focused()
    }

    /// Modifier keys held, as tracked from key events.
    #[must_use]
    pub fn modifiers(&self) -> KeyModifiers {
        self.modifiers
    }

    /// Blur regions last pushed to the surface.
    #[must_use]
    pub fn blur_regions(&self) -> &[Rect] {
        &self.blur_regions
    }

    /// Replaces the configuration. A new view scale resizes the root.
    pub fn set_config(&mut self, config: PipelineConfig) {
        let rescale = config.view_scale != self.config.view_scale;
        self.config = config;
        if rescale && self.surface_state == SurfaceState::Ready {
            self.apply_root_rect();
            self.forced_refresh = true;
            self.request_frame();
        }
    }

    // -- Tree setup --

    /// Creates the root node, or returns the existing one.
    pub fn create_root(&mut self) -> NodeId {
        if let Some(root) = self.root
            && self.store.is_alive(root)
        {
            return root;
        }
        let root = self.store.create_node(NodeKind::Root);
        self.root = Some(root);
        if self.surface_state == SurfaceState::Ready {
            self.apply_root_rect();
        }
        self.store.mark_needs_layout(root);
        self.store.mark_needs_render(root);
        if self.frontend.is_some() {
            self.store.mark_needs_build(root);
        }
        self.request_frame_if_needed();
        root
    }

    /// Installs the script frontend that builds the root's children.
    pub fn set_frontend(&mut self, mut frontend: Box<dyn ScriptFrontend>) {
        tracing::info!(kind = ?frontend.kind(), "frontend attached");
        frontend.on_lifecycle(Lifecycle::Create);
        self.action_handler = frontend.action_handler();
        if self.surface_state == SurfaceState::Ready {
            frontend.on_surface_changed(self.width, self.height);
        }
        self.frontend = Some(frontend);
        if let Some(root) = self.root
            && self.store.is_alive(root)
        {
            self.store.mark_needs_build(root);
            self.request_frame_if_needed();
        }
    }

    /// Sets the callback posted to the script lane after every frame.
    pub fn set_animation_callback(&mut self, callback: AnimationCallback) {
        self.animation_callback = Some(callback);
    }

    /// Runs `f` against the node tree and requests a frame if it marked
    /// anything.
    pub fn mutate<R>(&mut self, f: impl FnOnce(&mut NodeStore) -> R) -> R {
        let out = f(&mut self.store);
        self.request_frame_if_needed();
        out
    }

    // -- Frames --

    /// Asks the surface for a frame. Calls before the next vsync coalesce
    /// into one request.
    ///
    /// While the surface is not ready the request is remembered and issued
    /// on the ready transition.
    pub fn request_frame(&mut self) {
        if !self.alive {
            tracing::debug!("frame request after destroy ignored");
            return;
        }
        if self.frame_requested {
            return;
        }
        self.frame_requested = true;
        if self.surface_state == SurfaceState::NotReady {
            tracing::debug!("surface not ready, frame request deferred");
            return;
        }
        self.surface.request_frame();
    }

    /// Requests a frame if the tree was mutated or a timeline was scheduled
    /// since the last check.
    pub fn request_frame_if_needed(&mut self) {
        let mutated = self.store.take_needs_frame();
        let scheduled = self.schedule.take_wants_frame();
        if mutated || scheduled {
            self.request_frame();
        }
    }

    /// Repaints the whole root on the next frame.
    pub fn mark_forced_refresh(&mut self) {
        self.forced_refresh = true;
        self.request_frame();
    }

    /// Runs one frame. The single entry point from the surface's vsync.
    ///
    /// Ignored after destroy, without a live root, before the surface is
    /// ready, and while a frame is already in flight.
    pub fn on_vsync_event(&mut self, timestamp: HostTime, frame_count: u32) {
        if !self.alive {
            tracing::debug!("vsync after destroy ignored");
            return;
        }
        if !self.has_live_root() {
            tracing::debug!("vsync without a root ignored");
            return;
        }
        if self.surface_state == SurfaceState::NotReady {
            tracing::debug!("vsync before surface ready ignored");
            return;
        }
        if self.in_flight {
            tracing::warn!("vsync while a frame is in flight ignored");
            return;
        }
        self.in_flight = true;
        self.frame_requested = false;
        self.frame_index += 1;
        self.last_vsync = Some(timestamp);
        if core::mem::take(&mut self.refresh_after_vsync) {
            self.forced_refresh = true;
        }

        let vsync = VsyncEvent {
            frame_index: self.frame_index,
            timestamp,
            frame_count,
        };
        self.tracer.vsync(&vsync);
        self.summary = self
            .tracer
            .is_enabled()
            .then(|| FrameSummaryBuilder::new(&vsync));
        tracing::debug!(frame = self.frame_index, frame_count, "vsync");

        for listener in core::mem::take(&mut self.pre_flush) {
            listener(self);
        }

        self.flushing = true;
        self.run_phases(Some(timestamp));
        self.flushing = false;

        if let Some(summary) = self.summary.take() {
            self.tracer.frame_summary(&summary.finish());
        }
        self.post_animation_callback();
        self.in_flight = false;
        self.schedule_follow_up();
    }

    /// Runs every phase except AnimationAdvance right now.
    ///
    /// A logged no-op without a live root, while the surface is not ready,
    /// or while a flush is already running.
    pub fn flush_pipeline_immediately(&mut self) {
        if !self.alive {
            return;
        }
        if !self.has_live_root() {
            tracing::debug!("immediate flush without a root skipped");
            return;
        }
        if self.surface_state == SurfaceState::NotReady {
            tracing::debug!("surface not ready, immediate flush skipped");
            return;
        }
        if self.flushing {
            tracing::debug!("immediate flush while flushing ignored");
            return;
        }
        self.flushing = true;
        self.run_phases(None);
        self.flushing = false;
        self.schedule_follow_up();
    }

    /// Handles a surface size report, in device pixels.
    ///
    /// The first nonzero size makes the surface ready and paints the whole
    /// root immediately. Zero sizes and repeats of the current size are
    /// ignored.
    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        if !self.alive {
            return;
        }
        if width == 0 || height == 0 {
            tracing::debug!(width, height, "zero surface size ignored");
            return;
        }
        if self.surface_state == SurfaceState::Ready && (width, height) == (self.width, self.height)
        {
            return;
        }
        self.width = width;
        self.height = height;
        self.apply_root_rect();
        if let Some(frontend) = self.frontend.as_mut() {
            frontend.on_surface_changed(width, height);
        }
        self.forced_refresh = true;

        if self.surface_state == SurfaceState::NotReady {
            self.surface_state = SurfaceState::Ready;
            tracing::info!(width, height, "surface ready");
            let deferred = self.frame_requested;
            self.flush_pipeline_immediately();
            if deferred {
                self.surface.request_frame();
            }
        } else {
            tracing::debug!(width, height, "surface resized");
            self.request_frame();
        }
    }

    /// Flushes now if work was queued since the last frame and there is
    /// time left before `deadline`.
    pub fn on_idle(&mut self, deadline: HostTime) {
        if !self.config.flush_on_idle || !self.alive {
            return;
        }
        if self.clock.now() >= deadline {
            tracing::debug!("idle period already over");
            return;
        }
        if self.store.has_pending_work() {
            tracing::debug!("flushing on idle");
            self.flush_pipeline_immediately();
        }
    }

    // -- Frontend lifecycle --

    /// Forwards a named action to the frontend's action handler.
    ///
    /// Returns `false` (and logs) when no handler is registered.
    pub fn on_action_event(&mut self, action: &str) -> bool {
        match self.action_handler.as_mut() {
            Some(handler) => {
                handler(action);
                true
            }
            None => {
                tracing::warn!(action, "no action handler registered");
                false
            }
        }
    }

    /// The surface became visible.
    pub fn on_show(&mut self) {
        tracing::info!("pipeline shown");
        if let Some(frontend) = self.frontend.as_mut() {
            frontend.on_lifecycle(Lifecycle::Show);
        }
        self.mark_forced_refresh();
    }

    /// The surface was hidden. Hover state is cleared.
    pub fn on_hide(&mut self) {
        tracing::info!("pipeline hidden");
        if let Some(frontend) = self.frontend.as_mut() {
            frontend.on_lifecycle(Lifecycle::Hide);
        }
        self.events.clear_hover(&mut self.store);
        self.request_frame_if_needed();
    }

    // -- Listeners and tasks --

    /// Runs `listener` once at the start of the next frame.
    pub fn add_pre_flush_listener(&mut self, listener: impl FnOnce(&mut Self) + 'static) {
        self.pre_flush.push(Box::new(listener));
        self.request_frame();
    }

    /// Runs `listener` once, right after the next Build phase.
    pub fn add_post_animation_listener(&mut self, listener: impl FnOnce(&mut Self) + 'static) {
        self.post_animation.push(Box::new(listener));
    }

    /// Runs `listener` once, near the end of the next flush.
    pub fn add_post_flush_listener(&mut self, listener: impl FnOnce(&mut Self) + 'static) {
        self.post_flush.push(Box::new(listener));
        self.request_frame();
    }

    /// Runs `callback` once at the end of the next Build phase.
    pub fn add_build_after_callback(&mut self, callback: impl FnOnce(&mut Self) + 'static) {
        self.build_after.push(Box::new(callback));
        self.request_frame();
    }

    /// Ticks `task` once per frame until it asks to stop. Returns its id.
    pub fn add_schedule_task(&mut self, task: &Rc<RefCell<dyn ScheduleTask>>) -> u32 {
        let id = self.schedule.add(task);
        self.request_frame();
        id
    }

    /// Unregisters a schedule task.
    pub fn remove_schedule_task(&mut self, id: u32) {
        self.schedule.remove(id);
    }

    /// A handle animators use to schedule themselves.
    #[must_use]
    pub fn schedule_handle(&self) -> ScheduleHandle {
        self.schedule.handle()
    }

    /// Keeps `node` alive while it plays a disappearing transition.
    ///
    /// The entry is dropped once the node stops disappearing; if it is
    /// detached by then, its subtree is destroyed.
    pub fn add_deactivate_node(&mut self, id: i32, node: NodeId) {
        if self.deactivated.insert(id, node).is_some() {
            tracing::debug!(id, "deactivated node replaced");
        }
    }

    /// Asks for `node` to take focus at the next FocusFlush.
    pub fn request_focus(&mut self, node: NodeId) {
        self.focus.request(node);
        self.request_frame();
    }

    // -- Restoration --

    /// Registers `node` for state restoration under `id`.
    pub fn store_node(&mut self, id: i32, node: NodeId) {
        self.restoration.store_node(&mut self.store, id, node);
    }

    /// Drops the restoration registration for `id`.
    pub fn remove_stored_node(&mut self, id: i32) {
        self.restoration.remove_node(id);
    }

    /// Saves every registered node's state as a JSON object.
    #[must_use]
    pub fn stored_node_info(&self) -> String {
        self.restoration.stored_node_info(&self.store)
    }

    /// Loads saved state produced by [`stored_node_info`](Self::stored_node_info).
    pub fn restore_node_info(&mut self, json: &str) -> Result<(), RestoreError> {
        self.restoration.restore_node_info(json)
    }

    /// The restored payload for `id`, or `""`.
    #[must_use]
    pub fn restore_info(&self, id: i32) -> &str {
        self.restoration.restore_info(id)
    }

    // -- Teardown --

    /// Tears the pipeline down.
    ///
    /// Every dirty set, listener, schedule task, cached event chain, and
    /// restoration entry is dropped, the surface is destroyed, and later
    /// vsync ticks are ignored.
    pub fn destroy(&mut self) {
        if !self.alive {
            return;
        }
        tracing::info!(frames = self.frame_index, "pipeline destroyed");
        if let Some(frontend) = self.frontend.as_mut() {
            frontend.on_lifecycle(Lifecycle::Destroy);
        }
        self.frontend = None;
        self.action_handler = None;
        self.animation_callback = None;
        self.pre_flush.clear();
        self.post_animation.clear();
        self.post_flush.clear();
        self.build_after.clear();
        self.deactivated.clear();
        self.schedule.clear();
        self.events.clear_results();
        self.restoration.clear();
        self.focus.clear();
        for set in dirty::ALL {
            self.store.drain_channel(set);
        }
        self.store.take_needs_frame();
        self.surface.destroy();
        self.alive = false;
        self.frame_requested = false;
    }

    // -- Internals --

    pub(super) fn has_live_root(&self) -> bool {
        self.root.is_some_and(|root| self.store.is_alive(root))
    }

    /// Sizes the root to the surface, in logical pixels.
    fn apply_root_rect(&mut self) {
        let Some(root) = self.root else {
            return;
        };
        if !self.store.is_alive(root) {
            return;
        }
        let scale = if self.config.view_scale.is_finite() && self.config.view_scale > 0.0 {
            self.config.view_scale
        } else {
            1.0
        };
        let size = Size::new(
            f64::from(self.width) / scale,
            f64::from(self.height) / scale,
        );
        self.store
            .set_paint_rect(root, Rect::from_origin_size(Point::ZERO, size));
        self.store.mark_needs_layout(root);
    }

    /// Requests the next frame if anything is left to do.
    fn schedule_follow_up(&mut self) {
        self.store.take_needs_frame();
        let scheduled = self.schedule.take_wants_frame();
        if scheduled
            || self.store.has_pending_work()
            || !self.schedule.is_empty()
            || !self.pre_flush.is_empty()
            || !self.post_flush.is_empty()
            || self.focus.has_pending_request()
            || self.forced_refresh
        {
            self.request_frame();
        }
    }

    fn post_animation_callback(&self) {
        let Some(callback) = self.animation_callback.as_ref() else {
            return;
        };
        let Some(executor) = self.executor.as_ref() else {
            tracing::debug!("animation callback set without an executor");
            return;
        };
        let callback = Arc::clone(callback);
        if let Err(err) = self
            .ui
            .post::<ScriptLane>(executor.as_ref(), move || callback())
        {
            tracing::warn!(%err, "animation callback not posted");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use kurbo::Rect;

    use super::super::harness::{pipeline, ready};
    use super::*;
    use crate::animation::{Animator, AnimatorConfig, AnimatorStatus, Curve, CurveAnimation, FillMode};
    use crate::node::{BuildCx, Buildable, NodeFlags};

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        log: Log,
    }

    impl ScriptFrontend for Recorder {
        fn build(&mut self, cx: &mut BuildCx<'_>) {
            self.log.borrow_mut().push("build".to_owned());
            cx.clear_children();
            let child = cx.add_child(NodeKind::Container);
            cx.store_mut().set_label(child, "page");
        }

        fn action_handler(&mut self) -> Option<ActionHandler> {
            let log = self.log.clone();
            Some(Box::new(move |action| {
                log.borrow_mut().push(format!("action:{action}"));
            }))
        }

        fn on_lifecycle(&mut self, event: Lifecycle) {
            self.log.borrow_mut().push(format!("{event:?}"));
        }

        fn on_surface_changed(&mut self, width: u32, height: u32) {
            self.log.borrow_mut().push(format!("size:{width}x{height}"));
        }
    }

    #[test]
    fn frame_requests_coalesce_into_one_vsync() {
        let h = ready(PipelineConfig::standard());
        let surface = h.surface.clone();
        let ctx = h.ctx.into_shared();
        assert!(surface.fire_vsync(HostTime(16_000_000)), "callback registered");
        assert_eq!(surface.frame_requests(), 0, "settled after the first frame");

        {
            let mut c = ctx.borrow_mut();
            c.request_frame();
            c.request_frame();
            c.request_frame();
        }
        assert_eq!(surface.frame_requests(), 1, "one surface request");

        let before = ctx.borrow().frame_index();
        surface.fire_vsync(HostTime(32_000_000));
        assert_eq!(ctx.borrow().frame_index(), before + 1, "one flush");
        assert!(!ctx.borrow().is_frame_requested(), "nothing left to do");
    }

    #[test]
    fn vsync_without_root_is_ignored() {
        let mut h = pipeline(PipelineConfig::standard());
        h.ctx.on_surface_changed(400, 300);
        assert_eq!(h.ctx.surface_state(), SurfaceState::Ready, "surface sized");
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        h.ctx.add_pre_flush_listener(move |_| r.set(true));

        h.frame();
        h.ctx.flush_pipeline_immediately();
        assert_eq!(h.ctx.frame_index(), 0, "no frame without a root");
        assert!(!ran.get(), "pre-flush listener held back");
        assert!(h.surface.last_commit().is_none(), "nothing committed");

        h.ctx.create_root();
        h.frame();
        assert_eq!(h.ctx.frame_index(), 1, "root enables frames");
        assert!(ran.get(), "listener runs with the first real frame");
    }

    #[test]
    fn not_ready_surface_defers_frames_until_sized() {
        let mut h = pipeline(PipelineConfig::standard());
        let root = h.ctx.create_root();
        assert!(h.ctx.is_frame_requested(), "root creation requests a frame");
        assert_eq!(h.surface.frame_requests(), 0, "request held back");

        h.frame();
        assert_eq!(h.ctx.frame_index(), 0, "vsync ignored while not ready");
        h.ctx.on_surface_changed(0, 300);
        assert_eq!(h.ctx.surface_state(), SurfaceState::NotReady, "zero size ignored");

        h.ctx.on_surface_changed(200, 100);
        assert_eq!(h.ctx.surface_state(), SurfaceState::Ready, "first real size");
        let commit = h.surface.last_commit().expect("ready transition paints");
        assert!(commit.full_repaint, "forced full repaint");
        assert_eq!(
            commit.dirty_rect,
            Some(Rect::new(0.0, 0.0, 200.0, 100.0)),
            "whole root"
        );
        assert_eq!(h.ctx.store().paint_rect(root).size().width, 200.0, "root sized");
        assert_eq!(h.surface.frame_requests(), 1, "deferred request re-armed");

        let commits = h.surface.commits().len();
        h.ctx.on_surface_changed(200, 100);
        assert_eq!(h.surface.commits().len(), commits, "same size is a no-op");
    }

    #[test]
    fn view_scale_sizes_root_in_logical_pixels() {
        let h = ready(PipelineConfig::standard().with_view_scale(2.0));
        let root = h.ctx.root().expect("root");
        assert_eq!(
            h.ctx.store().paint_rect(root),
            Rect::new(0.0, 0.0, 200.0, 150.0),
            "device size divided by scale"
        );
    }

    #[test]
    fn resize_forces_a_full_repaint_next_frame() {
        let mut h = ready(PipelineConfig::standard());
        h.frame();
        h.ctx.on_surface_changed(800, 600);
        assert!(h.ctx.is_frame_requested(), "resize requests a frame");
        h.frame();
        let commit = h.surface.last_commit().expect("commit");
        assert!(commit.full_repaint, "resize repaints everything");
        assert_eq!(
            commit.dirty_rect,
            Some(Rect::new(0.0, 0.0, 800.0, 600.0)),
            "new root rect"
        );
    }

    #[test]
    fn listeners_run_once_in_phase_order() {
        let mut h = ready(PipelineConfig::standard());
        let log: Log = Rc::default();
        let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
        h.ctx.add_post_flush_listener(move |_| a.borrow_mut().push("post_flush".into()));
        h.ctx.add_post_animation_listener(move |_| b.borrow_mut().push("post_animation".into()));
        h.ctx.add_build_after_callback(move |_| c.borrow_mut().push("build_after".into()));
        h.ctx.add_pre_flush_listener(move |_| d.borrow_mut().push("pre_flush".into()));

        h.frame();
        assert_eq!(
            *log.borrow(),
            ["pre_flush", "build_after", "post_animation", "post_flush"],
            "fixed order"
        );
        h.frame();
        assert_eq!(log.borrow().len(), 4, "one-shot");
    }

    #[test]
    fn frontend_builds_root_and_receives_lifecycle() {
        let mut h = ready(PipelineConfig::standard());
        let log: Log = Rc::default();
        h.ctx.set_frontend(Box::new(Recorder { log: log.clone() }));
        assert!(h.ctx.is_frame_requested(), "root marked for build");
        h.frame();

        let root = h.ctx.root().expect("root");
        let kids: Vec<_> = h.ctx.store().children(root).collect();
        assert_eq!(kids.len(), 1, "frontend built one page");
        assert_eq!(h.ctx.store().label(kids[0]), Some("page"), "label set in build");

        assert!(h.ctx.on_action_event("back"), "handler registered");
        h.ctx.on_hide();
        h.ctx.on_show();
        h.ctx.destroy();
        assert_eq!(
            *log.borrow(),
            ["Create", "size:400x300", "build", "action:back", "Hide", "Show", "Destroy"],
            "lifecycle forwarded in order"
        );
    }

    #[test]
    fn action_without_handler_is_reported() {
        let mut h = ready(PipelineConfig::standard());
        assert!(!h.ctx.on_action_event("back"), "nobody to handle it");
    }

    #[test]
    fn running_animator_drives_frames_until_done() {
        let mut h = ready(PipelineConfig::standard());
        h.frame_at(0);
        let anim = Animator::new_shared(h.ctx.schedule_handle());
        let value = Rc::new(RefCell::new(CurveAnimation::new(0.0, 1.0, Curve::Linear)));
        {
            let mut a = anim.borrow_mut();
            a.set_config(AnimatorConfig::new(100).with_fill_mode(FillMode::Forwards))
                .unwrap();
            a.add_interpolator(value.clone());
            a.play();
        }
        h.ctx.request_frame_if_needed();
        assert!(h.ctx.is_frame_requested(), "scheduled animator wants a frame");

        h.frame_at(1000);
        h.frame_at(1050);
        assert_eq!(*value.borrow().value(), 0.5, "halfway after 50ms");
        assert!(h.ctx.is_frame_requested(), "still running");

        h.frame_at(1100);
        assert_eq!(anim.borrow().status(), AnimatorStatus::Stopped, "finished");
        assert_eq!(*value.borrow().value(), 1.0, "forwards fill holds the end");
        assert!(!h.ctx.is_frame_requested(), "no more frames once idle");
    }

    #[test]
    fn animation_callback_is_posted_to_script_lane() {
        let mut h = ready(PipelineConfig::standard());
        let hits = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = hits.clone();
        h.ctx.set_animation_callback(Arc::new(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }));
        h.frame();
        assert_eq!(h.queues.pending(crate::lane::Lane::Script), 1, "posted, not run");
        h.queues.run_pending(crate::lane::Lane::Script);
        assert_eq!(hits.load(std::sync::atomic::Ordering::Relaxed), 1, "ran on the lane");
    }

    #[test]
    fn destroy_silences_everything() {
        let mut h = ready(PipelineConfig::standard());
        let leaf = h.leaf(Rect::new(0.0, 0.0, 10.0, 10.0), NodeFlags::default());
        h.ctx.add_post_flush_listener(|_| panic!("dropped listener must not run"));
        h.ctx.destroy();
        assert!(!h.ctx.is_alive(), "liveness flag flipped");
        assert!(h.surface.is_destroyed(), "surface torn down");

        let frames = h.ctx.frame_index();
        h.frame();
        assert_eq!(h.ctx.frame_index(), frames, "vsync after destroy ignored");
        h.ctx.request_frame();
        assert!(!h.ctx.is_frame_requested(), "requests ignored");
        assert!(!h.ctx.store().has_pending_work(), "dirty sets cleared");
        assert!(h.ctx.store().is_alive(leaf), "tree itself is left alone");
    }

    #[test]
    fn idle_flushes_pending_work_before_deadline() {
        let mut h = ready(PipelineConfig::standard());
        h.frame();
        let before = h.surface.commits().len();
        h.leaf(Rect::new(0.0, 0.0, 10.0, 10.0), NodeFlags::default());

        h.ctx.on_idle(HostTime(0));
        assert_eq!(h.surface.commits().len(), before, "deadline already passed");

        h.ctx.on_idle(HostTime(u64::MAX));
        assert_eq!(h.surface.commits().len(), before + 1, "flushed without vsync");
        assert!(!h.ctx.store().has_pending_work(), "nothing left");
    }

    #[test]
    fn restoration_round_trips_through_the_context() {
        struct Offset(Rc<Cell<i32>>);

        impl Buildable for Offset {
            fn build(&mut self, _cx: &mut BuildCx<'_>) {}

            fn restore_info(&self) -> String {
                self.0.get().to_string()
            }

            fn restore(&mut self, info: &str) {
                self.0.set(info.parse().unwrap_or_default());
            }
        }

        let mut h = ready(PipelineConfig::standard());
        let offset = Rc::new(Cell::new(0));
        let node = h.ctx.mutate(|store| {
            let n = store.create_node(NodeKind::Container);
            store.set_builder(n, Offset(offset.clone()));
            n
        });
        h.ctx.restore_node_info(r#"{"3":"240"}"#).unwrap();
        assert_eq!(h.ctx.restore_info(3), "240", "payload loaded");
        h.ctx.store_node(3, node);
        assert_eq!(offset.get(), 240, "delivered on registration");

        offset.set(480);
        assert_eq!(h.ctx.stored_node_info(), r#"{"3":"480"}"#, "saved by polling");
        h.ctx.remove_stored_node(3);
        assert_eq!(h.ctx.stored_node_info(), "{}", "registration dropped");
        assert!(h.ctx.restore_node_info("nope").is_err(), "corrupt payload");
    }
}
