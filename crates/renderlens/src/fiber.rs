//! The host runtime's tree, as delivered on each commit.
//!
//! Each commit hands over the whole current tree. Nodes carry a stable
//! [`InstanceId`] instead of alternate pointers; what the node looked like
//! last commit lives in the [`SnapshotTable`](crate::snapshot::SnapshotTable).

use std::sync::Arc;

use renderlens_types::InstanceId;

use crate::value::Value;

/// A component definition (the fiber's `type`). Identity is the `Arc`.
#[derive(Debug)]
pub struct ComponentType {
    pub display_name: Option<String>,
    /// Stringified component function, when the host can provide it.
    pub source: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ComponentRef(Arc<ComponentType>);

impl ComponentRef {
    pub fn new(display_name: Option<&str>, source: Option<&str>) -> Self {
        Self(Arc::new(ComponentType {
            display_name: display_name.map(str::to_owned),
            source: source.map(str::to_owned),
        }))
    }

    pub fn display_name(&self) -> Option<&str> {
        self.0.display_name.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.0.source.as_deref()
    }

    pub fn same_type(&self, other: &ComponentRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A context object created by the host's `createContext`.
#[derive(Debug)]
pub struct ContextType {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ContextRef(Arc<ContextType>);

impl ContextRef {
    pub fn new(display_name: Option<&str>) -> Self {
        Self(Arc::new(ContextType {
            display_name: display_name.map(str::to_owned),
        }))
    }

    pub fn display_name(&self) -> Option<&str> {
        self.0.display_name.as_deref()
    }

    pub fn same_context(&self, other: &ContextRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// User component: function, class, memo or forward-ref.
    Composite(ComponentRef),
    /// Platform element such as `div`.
    Host { tag: String },
    /// Platform text node; its props value is the text itself.
    Text,
    /// Context provider. The provided value is the `value` prop.
    Provider {
        context: ContextRef,
        /// Name of the provider component, used when the context has no
        /// display name of its own.
        name: Option<String>,
    },
    /// Fragments, roots, suspense boundaries and the like.
    Other,
}

/// One record of the node's state list, in declaration order.
#[derive(Debug, Clone)]
pub struct StateSlot {
    pub value: Value,
    /// Slot belongs to a state hook (has an update queue); effect and memo
    /// slots are skipped by state extraction.
    pub stateful: bool,
}

impl StateSlot {
    pub fn state(value: Value) -> Self {
        Self {
            value,
            stateful: true,
        }
    }

    pub fn internal(value: Value) -> Self {
        Self {
            value,
            stateful: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FiberNode {
    pub id: InstanceId,
    pub kind: NodeKind,
    /// Committed props (`memoizedProps`). An object for components and
    /// elements, a string for text nodes.
    pub props: Value,
    pub state: Vec<StateSlot>,
    /// Contexts read during the node's last render.
    pub dependencies: Vec<ContextRef>,
    /// Render duration including children, when the host profiles.
    pub actual_duration: Option<f64>,
    /// The node re-rendered in this commit (as opposed to bailing out).
    pub did_render: bool,
    /// The commit mutated this node (placement, update or deletion flags).
    pub did_commit: bool,
    /// Compiled by the auto-memoizing compiler.
    pub memo_cache: bool,
    pub children: Vec<FiberNode>,
}

impl FiberNode {
    pub fn new(id: InstanceId, kind: NodeKind, props: Value) -> Self {
        Self {
            id,
            kind,
            props,
            state: Vec::new(),
            dependencies: Vec::new(),
            actual_duration: None,
            did_render: true,
            did_commit: false,
            memo_cache: false,
            children: Vec::new(),
        }
    }

    pub fn component(&self) -> Option<&ComponentRef> {
        match &self.kind {
            NodeKind::Composite(component) => Some(component),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, NodeKind::Composite(_))
    }

    pub fn is_host(&self) -> bool {
        matches!(self.kind, NodeKind::Host { .. } | NodeKind::Text)
    }

    pub fn display_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Composite(component) => component.display_name(),
            NodeKind::Host { tag } => Some(tag),
            NodeKind::Provider { context, name } => {
                context.display_name().or(name.as_deref())
            }
            NodeKind::Text | NodeKind::Other => None,
        }
    }

    pub fn timings(&self) -> Timings {
        let total = self.actual_duration.unwrap_or(0.0);
        let children: f64 = self
            .children
            .iter()
            .filter_map(|child| child.actual_duration)
            .sum();
        Timings {
            self_time_ms: (total - children).max(0.0),
            total_time_ms: total,
        }
    }

    /// Depth-first, pre-order walk over this node and its descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a FiberNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timings {
    pub self_time_ms: f64,
    pub total_time_ms: f64,
}

/// What the host hands over after one completed update cycle.
#[derive(Debug, Clone)]
pub struct FiberRoot {
    pub current: FiberNode,
    /// Instances removed by this commit.
    pub unmounted: Vec<InstanceId>,
}
