use crate::equal::is_equal;
use crate::fiber::ContextRef;
use crate::record::{Change, ChangeDetail};
use crate::value::Value;

use super::props::is_unstable;

const UNNAMED: &str = "Unnamed";

/// A provider on the path from the root to the node being visited.
#[derive(Debug, Clone)]
pub struct ProviderFrame {
    pub context: ContextRef,
    pub name: Option<String>,
    /// What the provider provided last commit; `None` when it just mounted.
    pub previous: Option<Value>,
    pub next: Value,
}

/// Providers enclosing the current position of a depth-first walk.
#[derive(Debug, Default)]
pub struct ProviderStack {
    frames: Vec<ProviderFrame>,
}

impl ProviderStack {
    pub fn push(&mut self, frame: ProviderFrame) {
        self.frames.push(frame);
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Drop frames pushed below `depth`.
    pub fn unwind(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    pub fn nearest(&self, context: &ContextRef) -> Option<&ProviderFrame> {
        self.frames
            .iter()
            .rev()
            .find(|frame| frame.context.same_context(context))
    }
}

/// Label for a context: its own display name, else the provider component's
/// name without the `Provider` part.
pub fn context_name(context: &ContextRef, provider: Option<&str>) -> String {
    if let Some(name) = context.display_name() {
        return name.to_owned();
    }
    match provider {
        Some(name) if !name.is_empty() => name.replacen("Provider", "", 1),
        _ => UNNAMED.to_owned(),
    }
}

/// Changes in the values provided to `dependencies` by their nearest
/// providers. Detected at the provider, so a consumer reports the change
/// whether or not its own inputs moved.
pub fn context_changes(dependencies: &[ContextRef], providers: &ProviderStack) -> Vec<Change> {
    let mut changes: Vec<Change> = Vec::new();
    for dependency in dependencies {
        let Some(frame) = providers.nearest(dependency) else {
            continue;
        };
        let Some(previous) = &frame.previous else {
            continue;
        };
        if is_equal(previous, &frame.next) {
            continue;
        }
        let name = context_name(&frame.context, frame.name.as_deref());
        if changes.iter().any(|change| change.name() == name) {
            continue;
        }
        changes.push(Change::Context(ChangeDetail {
            name,
            unstable: is_unstable(previous, &frame.next),
            previous: previous.clone(),
            next: frame.next.clone(),
        }));
    }
    changes
}
