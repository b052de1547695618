use std::collections::HashMap;

use renderlens_types::ChangeKind;

use crate::fiber::ComponentRef;
use crate::record::Change;

/// How many times each named input has changed since the last reset.
#[derive(Debug, Default, Clone)]
pub struct ChangeTally {
    props: HashMap<String, u64>,
    state: HashMap<String, u64>,
    context: HashMap<String, u64>,
    focused: Option<ComponentRef>,
}

impl ChangeTally {
    pub fn record(&mut self, change: &Change) {
        *self
            .table_mut(change.kind())
            .entry(change.name().to_owned())
            .or_default() += 1;
    }

    pub fn count(&self, kind: ChangeKind, name: &str) -> u64 {
        self.table(kind).get(name).copied().unwrap_or(0)
    }

    /// Names with a non-zero count for `kind`, sorted.
    pub fn names(&self, kind: ChangeKind) -> Vec<(String, u64)> {
        let mut names: Vec<_> = self
            .table(kind)
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty() && self.state.is_empty() && self.context.is_empty()
    }

    pub fn reset(&mut self) {
        self.props.clear();
        self.state.clear();
        self.context.clear();
    }

    /// Start tracking `component`. Counts are reset when it is a different
    /// component type from the one previously focused.
    pub fn focus(&mut self, component: &ComponentRef) {
        let same = self
            .focused
            .as_ref()
            .is_some_and(|focused| focused.same_type(component));
        if !same {
            self.reset();
            self.focused = Some(component.clone());
        }
    }

    fn table(&self, kind: ChangeKind) -> &HashMap<String, u64> {
        match kind {
            ChangeKind::Props => &self.props,
            ChangeKind::State => &self.state,
            ChangeKind::Context => &self.context,
        }
    }

    fn table_mut(&mut self, kind: ChangeKind) -> &mut HashMap<String, u64> {
        match kind {
            ChangeKind::Props => &mut self.props,
            ChangeKind::State => &mut self.state,
            ChangeKind::Context => &mut self.context,
        }
    }
}
