//! Which nodes reach listeners at all.
//!
//! [`ScanFilter`] holds two hub-wide rules: props objects marked as ignored,
//! and an allow-list of components. [`ForComponent`] narrows a single
//! listener to one component type.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::error::InstrumentationError;
use crate::fiber::{ComponentRef, FiberNode};
use crate::hub::{RenderEvent, RenderListener};
use crate::value::{Object, Value};

#[derive(Debug, Clone)]
struct Allowed {
    component: ComponentRef,
    include_children: bool,
}

/// Ignore markers and component allow-list shared by every listener of a
/// hub.
///
/// Markers are held weakly: once the host drops a marked props object the
/// marker goes with it.
#[derive(Default)]
pub struct ScanFilter {
    ignored: RwLock<Vec<Weak<Object>>>,
    allowed: RwLock<Vec<Allowed>>,
}

impl ScanFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a props object so nodes carrying it are never reported.
    /// Returns `false` for values that are not objects.
    pub fn ignore(&self, props: &Value) -> bool {
        let Value::Object(object) = props else {
            return false;
        };
        let mut ignored = self.ignored.write();
        ignored.retain(|marker| marker.strong_count() > 0);
        if !ignored.iter().any(|marker| same_object(marker, object)) {
            ignored.push(Arc::downgrade(object));
        }
        true
    }

    pub fn is_ignored(&self, props: &Value) -> bool {
        let Value::Object(object) = props else {
            return false;
        };
        self.ignored
            .read()
            .iter()
            .any(|marker| same_object(marker, object))
    }

    /// Add `component` to the allow-list. With `include_children`, every
    /// node below it is allowed too.
    pub fn allow(&self, component: &ComponentRef, include_children: bool) {
        let mut allowed = self.allowed.write();
        allowed.retain(|entry| !entry.component.same_type(component));
        allowed.push(Allowed {
            component: component.clone(),
            include_children,
        });
    }

    pub fn clear_allow_list(&self) {
        self.allowed.write().clear();
    }

    /// `ancestors` runs from the root down to the node's parent. An empty
    /// allow-list allows everything not ignored.
    pub fn accepts(&self, node: &FiberNode, ancestors: &[&FiberNode]) -> bool {
        if self.is_ignored(&node.props) {
            return false;
        }
        let allowed = self.allowed.read();
        if allowed.is_empty() {
            return true;
        }
        let listed = |candidate: &FiberNode, via_parent: bool| {
            candidate.component().is_some_and(|component| {
                allowed.iter().any(|entry| {
                    entry.component.same_type(component) && (!via_parent || entry.include_children)
                })
            })
        };
        listed(node, false) || ancestors.iter().any(|&ancestor| listed(ancestor, true))
    }
}

fn same_object(marker: &Weak<Object>, object: &Arc<Object>) -> bool {
    std::ptr::eq(marker.as_ptr(), Arc::as_ptr(object))
}

// ── Listener adapters ────────────────────────────────────

/// Forwards to `inner` only for nodes of one component type.
pub struct ForComponent<L> {
    component: ComponentRef,
    inner: L,
}

impl<L> ForComponent<L> {
    pub fn new(component: ComponentRef, inner: L) -> Self {
        Self { component, inner }
    }
}

impl<L: RenderListener> RenderListener for ForComponent<L> {
    fn is_valid_fiber(&self, node: &FiberNode) -> bool {
        node.component()
            .is_some_and(|component| component.same_type(&self.component))
            && self.inner.is_valid_fiber(node)
    }

    fn on_commit_start(&self) {
        self.inner.on_commit_start();
    }

    fn on_render(&self, event: &RenderEvent<'_>) {
        self.inner.on_render(event);
    }

    fn on_commit_finish(&self) {
        self.inner.on_commit_finish();
    }

    fn on_error(&self, error: &InstrumentationError) {
        self.inner.on_error(error);
    }
}

/// A bare render callback.
pub struct RenderFn<F>(pub F);

impl<F> RenderListener for RenderFn<F>
where
    F: Fn(&RenderEvent<'_>) + Send + Sync,
{
    fn on_render(&self, event: &RenderEvent<'_>) {
        (self.0)(event);
    }
}
