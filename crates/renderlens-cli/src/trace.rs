//! Recorded commit traces.
//!
//! A trace is JSON. Each commit lists its nodes flat, parents before
//! children, linked by `parent`. Prop and state values are plain JSON plus
//! a few `$`-prefixed object forms for what JSON cannot express:
//!
//! - `{"$undefined": true}`
//! - `{"$fn": "() => go()", "$name": "go"}`: a function, by source text
//! - `{"$element": "Icon", "props": {...}}`
//! - `{"$date": 1700000000000}`
//! - `{"$symbol": "id"}`
//! - `{"$shared": "name"}`: the entry of that name in the trace's `shared`
//!   table, one reference reused everywhere it appears

use std::collections::HashMap;

use facet::Facet;
use renderlens::{ComponentRef, ContextRef, FiberNode, FiberRoot, NodeKind, StateSlot, Value};
use renderlens_types::InstanceId;

#[derive(Facet, Debug)]
pub struct TraceFile {
    /// Recorded from a production build of the host.
    #[facet(default)]
    pub production: bool,
    #[facet(default)]
    pub components: Vec<ComponentDecl>,
    #[facet(default)]
    pub contexts: Vec<ContextDecl>,
    #[facet(default)]
    pub shared: Vec<SharedDecl>,
    pub commits: Vec<TraceCommit>,
}

#[derive(Facet, Debug)]
pub struct ComponentDecl {
    pub name: String,
    #[facet(default)]
    pub source: Option<String>,
}

#[derive(Facet, Debug)]
pub struct ContextDecl {
    pub name: String,
    /// The context has no display name of its own.
    #[facet(default)]
    pub anonymous: bool,
}

#[derive(Facet, Debug)]
pub struct SharedDecl {
    pub name: String,
    pub value: facet_value::Value,
}

#[derive(Facet, Debug)]
pub struct TraceCommit {
    #[facet(default)]
    pub fps: Option<f64>,
    pub nodes: Vec<TraceNode>,
    #[facet(default)]
    pub unmounted: Vec<u64>,
}

#[derive(Facet, Debug)]
pub struct TraceNode {
    pub id: u64,
    #[facet(default)]
    pub parent: Option<u64>,
    /// Component name; makes this a composite node.
    #[facet(default)]
    pub component: Option<String>,
    /// Host tag; makes this a host node.
    #[facet(default)]
    pub host: Option<String>,
    /// Text content; makes this a text node.
    #[facet(default)]
    pub text: Option<String>,
    /// Context name; makes this a provider node.
    #[facet(default)]
    pub provider: Option<String>,
    #[facet(default)]
    pub provider_name: Option<String>,
    #[facet(default)]
    pub props: Option<facet_value::Value>,
    #[facet(default)]
    pub state: Vec<facet_value::Value>,
    /// Non-state hook slots (effects, memos), listed only to keep positions.
    #[facet(default)]
    pub internal_slots: u32,
    #[facet(default)]
    pub dependencies: Vec<String>,
    #[facet(default)]
    pub duration: Option<f64>,
    #[facet(default)]
    pub bailed_out: bool,
    #[facet(default)]
    pub did_commit: bool,
    #[facet(default)]
    pub memo_cache: bool,
}

/// One commit ready to hand to the hook.
pub struct ReplayCommit {
    pub fps: Option<f64>,
    pub root: FiberRoot,
}

/// Resolves names in a trace to the references they denote. The same name
/// always yields the same reference.
#[derive(Default)]
struct Resolver {
    components: HashMap<String, ComponentRef>,
    contexts: HashMap<String, ContextRef>,
    shared: HashMap<String, Value>,
}

pub fn load(trace: &TraceFile) -> Result<Vec<ReplayCommit>, String> {
    let mut resolver = Resolver::default();
    for decl in &trace.components {
        resolver.components.insert(
            decl.name.clone(),
            ComponentRef::new(Some(&decl.name), decl.source.as_deref()),
        );
    }
    for decl in &trace.shared {
        let value = resolver.value(&decl.value)?;
        resolver.shared.insert(decl.name.clone(), value);
    }
    for decl in &trace.contexts {
        let display_name = (!decl.anonymous).then_some(decl.name.as_str());
        resolver
            .contexts
            .insert(decl.name.clone(), ContextRef::new(display_name));
    }

    trace
        .commits
        .iter()
        .enumerate()
        .map(|(index, commit)| {
            resolver
                .commit(commit)
                .map_err(|e| format!("commit {index}: {e}"))
        })
        .collect()
}

fn instance(raw: u64) -> Result<InstanceId, String> {
    InstanceId::new(raw).map_err(|e| e.to_string())
}

impl Resolver {
    fn commit(&mut self, commit: &TraceCommit) -> Result<ReplayCommit, String> {
        let mut positions: HashMap<u64, usize> = HashMap::new();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); commit.nodes.len()];
        let mut root = None;
        for (index, node) in commit.nodes.iter().enumerate() {
            if positions.insert(node.id, index).is_some() {
                return Err(format!("node {} listed twice", node.id));
            }
            match node.parent {
                Some(parent) => {
                    let parent_index = positions
                        .get(&parent)
                        .ok_or_else(|| format!("node {} precedes its parent {parent}", node.id))?;
                    children[*parent_index].push(index);
                }
                None if root.is_none() => root = Some(index),
                None => return Err(format!("node {} is a second root", node.id)),
            }
        }
        let root = root.ok_or_else(|| "commit has no root node".to_owned())?;

        let current = self.node(&commit.nodes, &children, root)?;
        let unmounted = commit
            .unmounted
            .iter()
            .map(|raw| instance(*raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ReplayCommit {
            fps: commit.fps,
            root: FiberRoot { current, unmounted },
        })
    }

    fn node(
        &mut self,
        nodes: &[TraceNode],
        children: &[Vec<usize>],
        index: usize,
    ) -> Result<FiberNode, String> {
        let raw = &nodes[index];
        let id = instance(raw.id)?;
        let kind = self.kind(raw)?;
        let props = match (&raw.text, &raw.props) {
            (Some(text), _) => Value::string(text),
            (None, Some(props)) => self.value(props)?,
            (None, None) => Value::Null,
        };

        let mut node = FiberNode::new(id, kind, props);
        node.state = (0..raw.internal_slots)
            .map(|_| StateSlot::internal(Value::Undefined))
            .collect();
        for value in &raw.state {
            node.state.push(StateSlot::state(self.value(value)?));
        }
        node.dependencies = raw
            .dependencies
            .iter()
            .map(|name| self.context(name))
            .collect();
        node.actual_duration = raw.duration;
        node.did_render = !raw.bailed_out;
        node.did_commit = raw.did_commit;
        node.memo_cache = raw.memo_cache;
        for child in &children[index] {
            node.children.push(self.node(nodes, children, *child)?);
        }
        Ok(node)
    }

    fn kind(&mut self, raw: &TraceNode) -> Result<NodeKind, String> {
        let kinds = [
            raw.component.is_some(),
            raw.host.is_some(),
            raw.text.is_some(),
            raw.provider.is_some(),
        ];
        if kinds.iter().filter(|set| **set).count() > 1 {
            return Err(format!("node {} has more than one kind", raw.id));
        }
        if let Some(name) = &raw.component {
            let component = self
                .components
                .entry(name.clone())
                .or_insert_with(|| ComponentRef::new(Some(name), None));
            return Ok(NodeKind::Composite(component.clone()));
        }
        if let Some(tag) = &raw.host {
            return Ok(NodeKind::Host { tag: tag.clone() });
        }
        if raw.text.is_some() {
            return Ok(NodeKind::Text);
        }
        if let Some(name) = &raw.provider {
            return Ok(NodeKind::Provider {
                context: self.context(name),
                name: raw.provider_name.clone(),
            });
        }
        Ok(NodeKind::Other)
    }

    fn context(&mut self, name: &str) -> ContextRef {
        self.contexts
            .entry(name.to_owned())
            .or_insert_with(|| ContextRef::new(Some(name)))
            .clone()
    }

    fn value(&self, raw: &facet_value::Value) -> Result<Value, String> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        if let Some(flag) = raw.as_bool() {
            return Ok(Value::from(flag));
        }
        if let Some(number) = raw.as_number() {
            let number = number
                .to_f64()
                .ok_or_else(|| "number out of range".to_owned())?;
            return Ok(Value::from(number));
        }
        if let Some(text) = raw.as_string() {
            return Ok(Value::string(text.as_str()));
        }
        if let Some(items) = raw.as_array() {
            let items = items
                .iter()
                .map(|item| self.value(item))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Value::array(items));
        }
        let Some(object) = raw.as_object() else {
            return Err("unsupported value".to_owned());
        };

        let field = |key: &str| object.get(key);
        let text_field = |key: &str| field(key).and_then(|v| v.as_string()).map(|s| s.as_str());
        if field("$undefined").is_some() {
            return Ok(Value::Undefined);
        }
        if let Some(name) = field("$shared") {
            let name = name
                .as_string()
                .ok_or_else(|| "$shared takes a name".to_owned())?;
            return self
                .shared
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| format!("unknown shared value {}", name.as_str()));
        }
        if let Some(source) = text_field("$fn") {
            return Ok(Value::function(text_field("$name"), source));
        }
        if let Some(type_name) = text_field("$element") {
            let props = match field("props") {
                Some(props) => self.entries(props)?,
                None => Vec::new(),
            };
            return Ok(Value::element(Some(type_name), props));
        }
        if let Some(epoch) = field("$date") {
            let epoch = epoch
                .as_number()
                .and_then(|n| n.to_f64())
                .ok_or_else(|| "$date takes a number".to_owned())?;
            return Ok(Value::object(renderlens::ObjectData::Date(epoch)));
        }
        if field("$symbol").is_some() {
            return Ok(Value::symbol(text_field("$symbol")));
        }
        Ok(Value::plain(self.entries(raw)?))
    }

    fn entries(&self, raw: &facet_value::Value) -> Result<Vec<(String, Value)>, String> {
        let object = raw
            .as_object()
            .ok_or_else(|| "expected an object".to_owned())?;
        object
            .iter()
            .map(|(key, value)| Ok((key.as_str().to_owned(), self.value(value)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOGGLE: &str = include_str!("../traces/toggle.json");

    fn parse(json: &str) -> TraceFile {
        facet_json::from_str(json).expect("trace decodes")
    }

    #[test]
    fn builds_trees_from_flat_nodes() {
        let commits = load(&parse(TOGGLE)).expect("trace loads");
        assert_eq!(commits.len(), 3);
        let root = &commits[0].root.current;
        assert!(matches!(root.kind, NodeKind::Provider { .. }));
        let app = &root.children[0];
        assert_eq!(app.display_name(), Some("App"));
        assert_eq!(app.children.len(), 2);
        assert!(app.children[1].children[0].is_host());
    }

    #[test]
    fn shared_values_keep_their_identity() {
        let commits = load(&parse(TOGGLE)).expect("trace loads");
        let style = |commit: &ReplayCommit| {
            commit.root.current.children[0].children[0]
                .props
                .get("style")
                .expect("style prop")
        };
        assert!(style(&commits[0]).same_ref(&style(&commits[1])));
    }

    #[test]
    fn rejects_children_before_parents() {
        let trace = parse(
            r#"{"commits": [{"nodes": [
                {"id": 2, "parent": 1, "host": "div"},
                {"id": 1}
            ]}]}"#,
        );
        let error = load(&trace).err().expect("load fails");
        assert!(error.contains("precedes its parent"), "{error}");
    }

    #[test]
    fn decodes_special_values() {
        let trace = parse(
            r#"{"commits": [{"nodes": [{"id": 1, "component": "A", "props": {
                "onClick": {"$fn": "() => go()"},
                "missing": {"$undefined": true},
                "when": {"$date": 5}
            }}]}]}"#,
        );
        let commits = load(&trace).expect("trace loads");
        let props = &commits[0].root.current.props;
        assert!(matches!(props.get("onClick"), Some(Value::Function(_))));
        assert!(matches!(props.get("missing"), Some(Value::Undefined)));
        assert_eq!(renderlens::fingerprint(&props.get("when").expect("date")), "Date{…}");
    }
}
