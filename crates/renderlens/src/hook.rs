//! The host runtime's global commit hook.
//!
//! Renderers register here as they load; the host calls
//! [`DevtoolsHook::on_commit_fiber_root`] after every commit, and the hook
//! fans the notification out to whoever instrumented it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use renderlens_types::{InvariantError, RendererId};
use tracing::{debug, error};

use crate::fiber::FiberRoot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleType {
    Development,
    Production,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererInfo {
    pub id: RendererId,
    pub name: String,
    pub bundle: BundleType,
}

pub trait CommitHandler: Send + Sync {
    fn on_commit_fiber_root(&self, renderer: RendererId, root: &FiberRoot);
}

static GLOBAL_HOOK: OnceLock<DevtoolsHook> = OnceLock::new();

#[derive(Default)]
pub struct DevtoolsHook {
    next_renderer: AtomicU64,
    renderers: RwLock<Vec<RendererInfo>>,
    handlers: RwLock<Vec<(String, Arc<dyn CommitHandler>)>>,
}

impl DevtoolsHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide hook the host runtime reports to.
    pub fn global() -> &'static DevtoolsHook {
        GLOBAL_HOOK.get_or_init(DevtoolsHook::new)
    }

    pub fn register_renderer(
        &self,
        name: &str,
        bundle: BundleType,
    ) -> Result<RendererId, InvariantError> {
        let id = RendererId::new(self.next_renderer.fetch_add(1, Ordering::Relaxed) + 1)?;
        debug!(%id, name, ?bundle, "renderer registered");
        self.renderers.write().push(RendererInfo {
            id,
            name: name.to_owned(),
            bundle,
        });
        Ok(id)
    }

    pub fn renderers(&self) -> Vec<RendererInfo> {
        self.renderers.read().clone()
    }

    pub fn has_production_renderer(&self) -> bool {
        self.renderers
            .read()
            .iter()
            .any(|renderer| renderer.bundle == BundleType::Production)
    }

    /// Attach `handler` under `name`, replacing an earlier handler with the
    /// same name.
    pub fn instrument(&self, name: &str, handler: Arc<dyn CommitHandler>) {
        let mut handlers = self.handlers.write();
        handlers.retain(|(existing, _)| existing != name);
        handlers.push((name.to_owned(), handler));
    }

    pub fn uninstrument(&self, name: &str) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(existing, _)| existing != name);
        handlers.len() != before
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Called by the host after each commit. Never unwinds into the host.
    pub fn on_commit_fiber_root(&self, renderer: RendererId, root: &FiberRoot) {
        let handlers: Vec<_> = self.handlers.read().clone();
        for (name, handler) in handlers {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
                handler.on_commit_fiber_root(renderer, root)
            }));
            if delivered.is_err() {
                error!(handler = %name, %renderer, "commit handler panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiber::{FiberNode, NodeKind};
    use crate::value::Value;
    use renderlens_types::InstanceId;
    use std::sync::atomic::AtomicUsize;

    struct Counting(AtomicUsize);

    struct Exploding;

    impl CommitHandler for Exploding {
        fn on_commit_fiber_root(&self, _renderer: RendererId, _root: &FiberRoot) {
            panic!("handler failed");
        }
    }

    impl CommitHandler for Counting {
        fn on_commit_fiber_root(&self, _renderer: RendererId, _root: &FiberRoot) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn root() -> FiberRoot {
        FiberRoot {
            current: FiberNode::new(
                InstanceId::new(1).expect("valid id"),
                NodeKind::Other,
                Value::Null,
            ),
            unmounted: Vec::new(),
        }
    }

    #[test]
    fn instrumenting_twice_under_one_name_keeps_one_handler() {
        let hook = DevtoolsHook::new();
        let first = Arc::new(Counting(AtomicUsize::new(0)));
        let second = Arc::new(Counting(AtomicUsize::new(0)));
        hook.instrument("renderlens", first.clone());
        hook.instrument("renderlens", second.clone());
        assert_eq!(hook.handler_count(), 1);

        let renderer = hook
            .register_renderer("dom", BundleType::Development)
            .expect("renderer id");
        hook.on_commit_fiber_root(renderer, &root());
        assert_eq!(first.0.load(Ordering::SeqCst), 0);
        assert_eq!(second.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn uninstrumented_handlers_stop_receiving_commits() {
        let hook = DevtoolsHook::new();
        let handler = Arc::new(Counting(AtomicUsize::new(0)));
        hook.instrument("renderlens", handler.clone());
        let renderer = hook
            .register_renderer("dom", BundleType::Development)
            .expect("renderer id");
        hook.on_commit_fiber_root(renderer, &root());

        assert!(hook.uninstrument("renderlens"));
        assert!(!hook.uninstrument("renderlens"));
        hook.on_commit_fiber_root(renderer, &root());
        assert_eq!(handler.0.load(Ordering::SeqCst), 1);
        assert_eq!(hook.handler_count(), 0);
    }

    #[test]
    fn panicking_handler_neither_reaches_the_host_nor_starves_others() {
        let hook = DevtoolsHook::new();
        let counting = Arc::new(Counting(AtomicUsize::new(0)));
        hook.instrument("exploding", Arc::new(Exploding));
        hook.instrument("counting", counting.clone());
        let renderer = hook
            .register_renderer("dom", BundleType::Development)
            .expect("renderer id");
        hook.on_commit_fiber_root(renderer, &root());
        assert_eq!(counting.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tracks_production_renderers() {
        let hook = DevtoolsHook::new();
        let dev = hook
            .register_renderer("dom", BundleType::Development)
            .expect("renderer id");
        assert_eq!(dev.get(), 1);
        assert!(!hook.has_production_renderer());
        hook.register_renderer("native", BundleType::Production)
            .expect("renderer id");
        assert!(hook.has_production_renderer());
        assert_eq!(hook.renderers().len(), 2);
    }
}
