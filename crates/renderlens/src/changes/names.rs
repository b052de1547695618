//! Best-effort recovery of human names for state slots and declared props
//! from a component's source text.

use crate::fiber::ComponentRef;

pub trait SlotNames: Send + Sync {
    /// Names for the component's stateful slots, in declaration order. May
    /// be shorter than the slot list; missing names fall back to `{index}`.
    fn state_names(&self, component: &ComponentRef) -> Vec<String>;

    /// Props in the order the component declares them.
    fn props_order(&self, component: &ComponentRef) -> Vec<String>;
}

/// Scans the source for `[value, setValue]` pairs and a leading
/// `({ a, b })` parameter destructuring.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceSlotNames;

impl SlotNames for SourceSlotNames {
    fn state_names(&self, component: &ComponentRef) -> Vec<String> {
        component.source().map(state_pairs).unwrap_or_default()
    }

    fn props_order(&self, component: &ComponentRef) -> Vec<String> {
        component.source().map(destructured_props).unwrap_or_default()
    }
}

/// Recovers nothing; every slot gets its numeric placeholder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NumericSlotNames;

impl SlotNames for NumericSlotNames {
    fn state_names(&self, _component: &ComponentRef) -> Vec<String> {
        Vec::new()
    }

    fn props_order(&self, _component: &ComponentRef) -> Vec<String> {
        Vec::new()
    }
}

pub fn fallback_name(index: usize) -> String {
    format!("{{{index}}}")
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn take_ident(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !is_ident_char(c)).unwrap_or(s.len());
    s.split_at(end)
}

/// Every `[name, setSomething]` in the source, in order.
pub fn state_pairs(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = source;
    while let Some(open) = rest.find('[') {
        rest = &rest[open + 1..];
        let (name, after) = take_ident(rest);
        if name.is_empty() {
            continue;
        }
        let Some(after) = after.strip_prefix(',') else {
            continue;
        };
        let after = after.trim_start();
        let Some(after) = after.strip_prefix("set") else {
            continue;
        };
        let (setter_tail, after) = take_ident(after);
        if setter_tail.is_empty() || !after.starts_with(']') {
            continue;
        }
        names.push(name.to_owned());
        rest = &after[1..];
    }
    names
}

/// Names bound by the first `({ ... })` object-pattern parameter list.
/// Renames (`a: b`) and defaults (`a = 1`) keep the outer prop name.
pub fn destructured_props(source: &str) -> Vec<String> {
    let mut rest = source;
    while let Some(open) = rest.find('(') {
        rest = &rest[open + 1..];
        let Some(body) = rest.trim_start().strip_prefix('{') else {
            continue;
        };
        let Some(close) = body.find('}') else {
            return Vec::new();
        };
        if body[close + 1..].trim_start().starts_with(')') {
            return body[..close]
                .split(',')
                .filter_map(|entry| {
                    let entry = entry.trim();
                    let entry = entry.split(':').next().unwrap_or(entry);
                    let name = entry.split('=').next().unwrap_or(entry).trim();
                    (!name.is_empty()).then(|| name.to_owned())
                })
                .collect();
        }
    }
    Vec::new()
}
