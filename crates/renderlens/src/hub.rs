//! Instrumentation hub: one subscription to the commit hook, any number of
//! registered listeners.
//!
//! Each commit is walked once. Snapshots, the change tally and aggregation
//! are updated under the engine lock; listeners are called afterwards, one
//! node at a time, with panics contained per listener.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::slice;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use renderlens_types::{InstanceId, Options, OptionsPatch, RenderPhase, RendererId, Report};
use tracing::{debug, error, info, warn};

use crate::changes::{
    ChangeTally, ProviderFrame, ProviderStack, SlotNames, SourceSlotNames, context_changes,
    props_changes, state_changes,
};
use crate::error::{ExtractionError, HubError, InstrumentationError};
use crate::fiber::{ComponentRef, FiberNode, FiberRoot, NodeKind};
use crate::filter::{ForComponent, RenderFn, ScanFilter};
use crate::hook::{CommitHandler, DevtoolsHook};
use crate::necessity::{Sampler, classify};
use crate::record::RenderRecord;
use crate::score::{FixedFrameRate, FrameRate, TARGET_FPS, score};
use crate::snapshot::{Snapshot, SnapshotTable};
use crate::store::{AggregatedStats, AggregationStore};

/// Name the hub instruments the commit hook under.
pub const HOOK_NAME: &str = "renderlens";

// ── Listener surface ─────────────────────────────────────

/// What a listener sees for one rendered node.
#[derive(Debug)]
pub struct RenderEvent<'a> {
    pub node: &'a FiberNode,
    pub record: &'a RenderRecord,
    /// Renders of this instance seen so far, this one included.
    pub render_count: u64,
    /// The listener's own pause flag. Acting on it is up to the listener.
    pub paused: bool,
    pub options: &'a Options,
}

/// Callbacks for one registered consumer. All have no-op defaults.
pub trait RenderListener: Send + Sync {
    /// Whether this listener wants records for `node` at all.
    fn is_valid_fiber(&self, _node: &FiberNode) -> bool {
        true
    }

    fn on_commit_start(&self) {}

    fn on_render(&self, _event: &RenderEvent<'_>) {}

    fn on_commit_finish(&self) {}

    fn on_error(&self, _error: &InstrumentationError) {}
}

struct InstanceEntry {
    key: String,
    listener: Arc<dyn RenderListener>,
    paused: Arc<AtomicBool>,
}

/// Handle returned to a consumer on registration.
#[derive(Clone)]
pub struct Instrumentation {
    key: String,
    paused: Arc<AtomicBool>,
}

impl Instrumentation {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for Instrumentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrumentation")
            .field("key", &self.key)
            .field("paused", &self.is_paused())
            .finish()
    }
}

// ── Engine state ─────────────────────────────────────────

struct Engine {
    snapshots: SnapshotTable,
    tally: ChangeTally,
    store: AggregationStore,
    sampler: Sampler,
    names: Box<dyn SlotNames>,
}

enum NodeOutcome<'r> {
    Rendered {
        node: &'r FiberNode,
        ancestors: Vec<&'r FiberNode>,
        record: RenderRecord,
        render_count: u64,
    },
    Failed {
        node: &'r FiberNode,
        ancestors: Vec<&'r FiberNode>,
        error: InstrumentationError,
    },
}

impl<'r> NodeOutcome<'r> {
    fn node(&self) -> &'r FiberNode {
        match self {
            Self::Rendered { node, .. } | Self::Failed { node, .. } => *node,
        }
    }

    fn ancestors(&self) -> &[&'r FiberNode] {
        match self {
            Self::Rendered { ancestors, .. } | Self::Failed { ancestors, .. } => ancestors,
        }
    }
}

impl Engine {
    fn process<'r>(
        &mut self,
        root: &'r FiberRoot,
        options: &Options,
        fps: f64,
    ) -> Vec<NodeOutcome<'r>> {
        let mut outcomes = Vec::new();
        let mut providers = ProviderStack::default();
        let mut path = Vec::new();
        self.visit(
            &root.current,
            &mut path,
            &mut providers,
            options,
            fps,
            &mut outcomes,
        );

        for instance in &root.unmounted {
            self.snapshots.remove(*instance);
            self.store.release(*instance);
        }
        outcomes
    }

    fn visit<'r>(
        &mut self,
        node: &'r FiberNode,
        path: &mut Vec<&'r FiberNode>,
        providers: &mut ProviderStack,
        options: &Options,
        fps: f64,
        outcomes: &mut Vec<NodeOutcome<'r>>,
    ) {
        let depth = providers.depth();
        let rendered = node.is_composite() && node.did_render;

        match Snapshot::capture(node) {
            Ok(next) => {
                let previous = self.snapshots.remove(node.id);
                if let NodeKind::Provider { context, name } = &node.kind {
                    providers.push(ProviderFrame {
                        context: context.clone(),
                        name: name.clone(),
                        previous: previous.as_ref().and_then(|s| s.provided.clone()),
                        next: next.provided.clone().unwrap_or_default(),
                    });
                }
                let outcome = if rendered {
                    Some(self.render(node, previous.as_ref(), &next, providers, options, fps))
                } else {
                    None
                };
                match outcome {
                    Some(Err(source)) => {
                        if let Some(previous) = previous {
                            self.snapshots.replace(node.id, previous);
                        }
                        outcomes.push(failed(node, path, source));
                    }
                    Some(Ok((record, render_count))) => {
                        self.snapshots.replace(node.id, next);
                        outcomes.push(NodeOutcome::Rendered {
                            node,
                            ancestors: path.clone(),
                            record,
                            render_count,
                        });
                    }
                    None => {
                        self.snapshots.replace(node.id, next);
                    }
                }
            }
            Err(source) => {
                // Consumers below keep resolving to this provider, holding
                // its last known value.
                if let NodeKind::Provider { context, name } = &node.kind {
                    let held = self
                        .snapshots
                        .get(node.id)
                        .and_then(|snapshot| snapshot.provided.clone());
                    providers.push(ProviderFrame {
                        context: context.clone(),
                        name: name.clone(),
                        previous: held.clone(),
                        next: held.unwrap_or_default(),
                    });
                }
                if rendered {
                    outcomes.push(failed(node, path, source));
                } else {
                    warn!(instance = %node.id, error = %source, "node snapshot skipped");
                }
            }
        }

        path.push(node);
        for child in &node.children {
            self.visit(child, path, providers, options, fps, outcomes);
        }
        path.pop();
        providers.unwind(depth);
    }

    fn render(
        &mut self,
        node: &FiberNode,
        previous: Option<&Snapshot>,
        next: &Snapshot,
        providers: &ProviderStack,
        options: &Options,
        fps: f64,
    ) -> Result<(RenderRecord, u64), ExtractionError> {
        let changes = match (previous, node.component()) {
            (Some(previous), Some(component)) => {
                let names = &*self.names;
                let (declared, state_names) = panic::catch_unwind(AssertUnwindSafe(|| {
                    (names.props_order(component), names.state_names(component))
                }))
                .map_err(|payload| ExtractionError::SlotNamesPanicked {
                    message: panic_message(payload.as_ref()),
                })?;
                let mut changes = props_changes(&declared, &previous.props, &next.props);
                changes.extend(state_changes(&state_names, &previous.state, &next.state)?);
                changes.extend(context_changes(&node.dependencies, providers));
                changes
            }
            _ => Vec::new(),
        };
        for change in &changes {
            self.tally.record(change);
        }

        let timings = node.timings();
        let record = RenderRecord {
            component_name: node.display_name().map(str::to_owned),
            phase: if previous.is_some() {
                RenderPhase::Update
            } else {
                RenderPhase::Mount
            },
            self_time_ms: timings.self_time_ms,
            changes,
            is_forget_compiled: node.memo_cache,
            is_unnecessary: classify(node, &self.snapshots, &mut self.sampler),
            did_commit_host_mutation: node.did_commit,
            frame_rate: fps,
            severity_score: score(
                node.actual_duration.map(|_| timings.self_time_ms),
                node.did_commit,
                fps,
            ),
        };

        let handle = self.store.record_render(
            node.id,
            record.component_name.as_deref(),
            slice::from_ref(&record),
            record.self_time_ms,
            options.report,
        );
        let render_count = self
            .store
            .get(handle)
            .map_or(0, |stats| stats.render_count);
        Ok((record, render_count))
    }
}

fn failed<'r>(
    node: &'r FiberNode,
    path: &[&'r FiberNode],
    source: ExtractionError,
) -> NodeOutcome<'r> {
    warn!(instance = %node.id, error = %source, "change extraction failed");
    NodeOutcome::Failed {
        node,
        ancestors: path.to_vec(),
        error: InstrumentationError::Extraction {
            instance: node.id,
            component: node.display_name().map(str::to_owned),
            source,
        },
    }
}

// ── Hub ──────────────────────────────────────────────────

struct HubInner {
    options: RwLock<Options>,
    /// Latched on the first successful start; the hook is never
    /// instrumented twice.
    subscribed: AtomicBool,
    running: AtomicBool,
    instances: Mutex<Vec<Arc<InstanceEntry>>>,
    next_callback: AtomicU64,
    engine: Mutex<Engine>,
    frame_rate: Arc<dyn FrameRate>,
    filter: Arc<ScanFilter>,
}

#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

pub struct HubBuilder {
    options: Options,
    frame_rate: Option<Arc<dyn FrameRate>>,
    names: Option<Box<dyn SlotNames>>,
    sampler: Option<Sampler>,
    filter: Option<Arc<ScanFilter>>,
}

impl HubBuilder {
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn frame_rate(mut self, frame_rate: Arc<dyn FrameRate>) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    pub fn slot_names(mut self, names: Box<dyn SlotNames>) -> Self {
        self.names = Some(names);
        self
    }

    /// Replace the sampler derived from `Options::sample_rate`.
    pub fn sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Share an ignore/allow filter with other hubs or with the host.
    pub fn filter(mut self, filter: Arc<ScanFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn build(self) -> Hub {
        let sampler = self
            .sampler
            .unwrap_or_else(|| Sampler::new(self.options.sample_rate));
        Hub {
            inner: Arc::new(HubInner {
                options: RwLock::new(self.options),
                subscribed: AtomicBool::new(false),
                running: AtomicBool::new(false),
                instances: Mutex::new(Vec::new()),
                next_callback: AtomicU64::new(1),
                engine: Mutex::new(Engine {
                    snapshots: SnapshotTable::default(),
                    tally: ChangeTally::default(),
                    store: AggregationStore::new(),
                    sampler,
                    names: self.names.unwrap_or_else(|| Box::new(SourceSlotNames)),
                }),
                frame_rate: self
                    .frame_rate
                    .unwrap_or_else(|| Arc::new(FixedFrameRate::default())),
                filter: self.filter.unwrap_or_default(),
            }),
        }
    }
}

impl Hub {
    pub fn new(options: Options) -> Self {
        Self::builder().options(options).build()
    }

    pub fn builder() -> HubBuilder {
        HubBuilder {
            options: Options::default(),
            frame_rate: None,
            names: None,
            sampler: None,
            filter: None,
        }
    }

    // ── Lifecycle ────────────────────────────────────────

    /// Subscribe to `hook` (once per hub) and start processing commits.
    pub fn start(&self, hook: &DevtoolsHook) -> Result<(), HubError> {
        let force = self.inner.options.read().dangerously_force_run_in_production;
        if hook.has_production_renderer() && !force {
            warn!("production renderer detected, not starting");
            return Err(HubError::ProductionBuild);
        }
        if !self.inner.subscribed.swap(true, Ordering::AcqRel) {
            hook.instrument(HOOK_NAME, self.inner.clone());
        }
        self.inner.running.store(true, Ordering::Release);
        info!(instances = self.inner.instances.lock().len(), "hub started");
        Ok(())
    }

    /// Ignore commits until the next [`start`](Self::start). The hook
    /// subscription stays in place.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::Release);
        info!("hub stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Forget all snapshots, tallies and aggregated stats.
    pub fn reset(&self) {
        let mut engine = self.inner.engine.lock();
        engine.snapshots.clear();
        engine.tally.reset();
        engine.store.clear_all();
        debug!("hub state reset");
    }

    // ── Options ──────────────────────────────────────────

    pub fn options(&self) -> Options {
        self.inner.options.read().clone()
    }

    /// Overlay `patch`. Setting `enabled` pauses or resumes every registered
    /// instrumentation.
    pub fn set_options(&self, patch: &OptionsPatch) {
        if let Some(enabled) = patch.enabled {
            for entry in self.inner.instances.lock().iter() {
                entry.paused.store(!enabled, Ordering::Release);
            }
        }
        let sample_rate = {
            let mut options = self.inner.options.write();
            let before = options.sample_rate;
            options.apply(patch);
            (options.sample_rate != before).then_some(options.sample_rate)
        };
        if let Some(rate) = sample_rate {
            self.inner.engine.lock().sampler = Sampler::new(rate);
        }
    }

    // ── Registration ─────────────────────────────────────

    /// Register a consumer under `key`, replacing any earlier one with the
    /// same key. Starts paused when rendering feedback is disabled.
    pub fn create_instrumentation(
        &self,
        key: &str,
        listener: Arc<dyn RenderListener>,
    ) -> Instrumentation {
        let paused = Arc::new(AtomicBool::new(!self.inner.options.read().enabled));
        let entry = Arc::new(InstanceEntry {
            key: key.to_owned(),
            listener,
            paused: paused.clone(),
        });
        let mut instances = self.inner.instances.lock();
        instances.retain(|existing| existing.key != key);
        instances.push(entry);
        debug!(key, "instrumentation registered");
        Instrumentation {
            key: key.to_owned(),
            paused,
        }
    }

    pub fn remove_instrumentation(&self, key: &str) -> bool {
        let mut instances = self.inner.instances.lock();
        let before = instances.len();
        instances.retain(|existing| existing.key != key);
        instances.len() != before
    }

    /// Call `callback` for renders of `component` only.
    pub fn on_render<F>(&self, component: &ComponentRef, callback: F) -> Instrumentation
    where
        F: Fn(&RenderEvent<'_>) + Send + Sync + 'static,
    {
        let key = format!(
            "on_render:{}",
            self.inner.next_callback.fetch_add(1, Ordering::Relaxed)
        );
        let listener = ForComponent::new(component.clone(), RenderFn(callback));
        self.create_instrumentation(&key, Arc::new(listener))
    }

    // ── Filtering ────────────────────────────────────────

    /// Nodes rejected here reach no listener.
    pub fn filter(&self) -> &ScanFilter {
        &self.inner.filter
    }

    /// Restrict listeners to `component`, plus its subtree when
    /// `Options::include_children` is on.
    pub fn with_scan(&self, component: &ComponentRef) {
        let include_children = self.inner.options.read().include_children;
        self.inner.filter.allow(component, include_children);
    }

    // ── Queries ──────────────────────────────────────────

    pub fn report(&self) -> Report {
        self.inner.engine.lock().store.get_report(None)
    }

    pub fn report_for(&self, component_name: &str) -> Report {
        self.inner.engine.lock().store.get_report(Some(component_name))
    }

    /// Empty the per-name report table.
    pub fn clear_report(&self) {
        self.inner.engine.lock().store.clear();
    }

    pub fn stats_for(&self, instance: InstanceId) -> Option<AggregatedStats> {
        self.inner.engine.lock().store.stats_for(instance).cloned()
    }

    pub fn tally(&self) -> ChangeTally {
        self.inner.engine.lock().tally.clone()
    }

    /// Begin inspecting `component`; change counts restart when it differs
    /// from the previously inspected component.
    pub fn focus(&self, component: &ComponentRef) {
        self.inner.engine.lock().tally.focus(component);
    }

    pub fn reset_tally(&self) {
        self.inner.engine.lock().tally.reset();
    }

    /// Process one commit directly, bypassing the hook.
    pub fn process_commit(&self, renderer: RendererId, root: &FiberRoot) {
        self.inner.handle_commit(renderer, root);
    }
}

impl HubInner {
    fn handle_commit(&self, renderer: RendererId, root: &FiberRoot) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        let instances: Vec<Arc<InstanceEntry>> = self.instances.lock().clone();
        for entry in &instances {
            guarded(entry, || entry.listener.on_commit_start());
        }

        let options = self.options.read().clone();
        let fps = panic::catch_unwind(AssertUnwindSafe(|| self.frame_rate.current()))
            .unwrap_or_else(|payload| {
                error!(
                    payload = %panic_message(payload.as_ref()),
                    fallback = TARGET_FPS,
                    "frame rate source panicked"
                );
                TARGET_FPS
            });
        let outcomes = self.engine.lock().process(root, &options, fps);

        let mut dispatched = 0usize;
        for outcome in &outcomes {
            let node = outcome.node();
            if !self.filter.accepts(node, outcome.ancestors()) {
                continue;
            }
            for entry in &instances {
                let accepted = panic::catch_unwind(AssertUnwindSafe(|| {
                    entry.listener.is_valid_fiber(node)
                }));
                match accepted {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(payload) => {
                        report_panic(entry, payload);
                        continue;
                    }
                }
                match outcome {
                    NodeOutcome::Rendered {
                        record,
                        render_count,
                        ..
                    } => {
                        let event = RenderEvent {
                            node,
                            record,
                            render_count: *render_count,
                            paused: entry.paused.load(Ordering::Acquire),
                            options: &options,
                        };
                        guarded(entry, || entry.listener.on_render(&event));
                        dispatched += 1;
                    }
                    NodeOutcome::Failed { error, .. } => deliver_error(entry, error),
                }
            }
        }

        for entry in &instances {
            guarded(entry, || entry.listener.on_commit_finish());
        }
        debug!(%renderer, nodes = outcomes.len(), dispatched, "commit processed");
    }
}

impl CommitHandler for HubInner {
    fn on_commit_fiber_root(&self, renderer: RendererId, root: &FiberRoot) {
        self.handle_commit(renderer, root);
    }
}

// ── Panic containment ────────────────────────────────────

fn guarded(entry: &InstanceEntry, call: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(call)) {
        report_panic(entry, payload);
    }
}

fn report_panic(entry: &InstanceEntry, payload: Box<dyn Any + Send>) {
    let error = InstrumentationError::ListenerPanicked {
        listener: entry.key.clone(),
        message: panic_message(payload.as_ref()),
    };
    error!(listener = %entry.key, %error, "listener panicked");
    deliver_error(entry, &error);
}

fn deliver_error(entry: &InstanceEntry, error: &InstrumentationError) {
    let delivered = panic::catch_unwind(AssertUnwindSafe(|| entry.listener.on_error(error)));
    if let Err(payload) = delivered {
        error!(
            listener = %entry.key,
            payload = %panic_message(payload.as_ref()),
            "error handler panicked"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
