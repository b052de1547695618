//! Immutable per-commit captures of a node's inputs, and the side table
//! that remembers the previous capture of every live instance.

use std::collections::HashMap;

use renderlens_types::InstanceId;

use crate::error::ExtractionError;
use crate::fiber::{FiberNode, NodeKind, StateSlot};
use crate::value::{ObjectData, Value};

/// Props in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Props(Vec<(String, Value)>);

impl Props {
    pub fn new(entries: Vec<(String, Value)>) -> Self {
        Self(entries)
    }

    /// Read a node's committed props value.
    ///
    /// `null`/`undefined` read as empty, text nodes expose their content as
    /// a single `text` prop, and anything else that is not an object is a
    /// malformed node.
    pub fn capture(node: &FiberNode) -> Result<Self, ExtractionError> {
        if matches!(node.kind, NodeKind::Text) {
            return Ok(Self(vec![("text".to_owned(), node.props.clone())]));
        }
        match &node.props {
            Value::Undefined | Value::Null => Ok(Self::default()),
            Value::Object(object) => {
                let data = object
                    .read()
                    .ok_or(ExtractionError::ValueBusy { what: "props" })?;
                match &*data {
                    ObjectData::Plain(entries) => Ok(Self(entries.clone())),
                    _ => Err(ExtractionError::MalformedProps { found: "object" }),
                }
            }
            other => Err(ExtractionError::MalformedProps {
                found: other.type_name(),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub props: Props,
    pub state: Vec<StateSlot>,
    /// Value a provider node provided, if the node is a provider.
    pub provided: Option<Value>,
}

impl Snapshot {
    pub fn capture(node: &FiberNode) -> Result<Self, ExtractionError> {
        let props = Props::capture(node)?;
        let provided = match &node.kind {
            NodeKind::Provider { .. } => Some(props.get("value").cloned().unwrap_or_default()),
            _ => None,
        };
        Ok(Self {
            props,
            state: node.state.clone(),
            provided,
        })
    }
}

/// Last committed snapshot per live instance.
#[derive(Debug, Default)]
pub struct SnapshotTable {
    entries: HashMap<InstanceId, Snapshot>,
}

impl SnapshotTable {
    pub fn get(&self, instance: InstanceId) -> Option<&Snapshot> {
        self.entries.get(&instance)
    }

    /// Store `snapshot` as the latest for `instance`, returning the one it
    /// replaces.
    pub fn replace(&mut self, instance: InstanceId, snapshot: Snapshot) -> Option<Snapshot> {
        self.entries.insert(instance, snapshot)
    }

    pub fn remove(&mut self, instance: InstanceId) -> Option<Snapshot> {
        self.entries.remove(&instance)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
