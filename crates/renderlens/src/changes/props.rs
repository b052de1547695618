use crate::equal::is_equal;
use crate::fingerprint::fingerprint;
use crate::record::{Change, ChangeDetail};
use crate::snapshot::Props;
use crate::value::Value;

/// Structural, never reported.
const CHILDREN: &str = "children";

/// Deep-unequal but fingerprint-equal references, i.e. recreated with the
/// same shape.
pub fn is_unstable(previous: &Value, next: &Value) -> bool {
    previous.is_reference()
        && next.is_reference()
        && !previous.same_ref(next)
        && fingerprint(previous) == fingerprint(next)
}

/// Changed props between two snapshots.
///
/// Keys named in `declared` come first, then the remaining keys of `next`
/// in insertion order, then keys only `previous` had.
pub fn props_changes(declared: &[String], previous: &Props, next: &Props) -> Vec<Change> {
    let mut changes = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    let keys = declared
        .iter()
        .map(String::as_str)
        .filter(|key| next.contains(key))
        .chain(next.keys())
        .chain(previous.keys());

    for key in keys {
        if key == CHILDREN || seen.contains(&key) {
            continue;
        }
        seen.push(key);

        let Some(next_value) = next.get(key) else {
            let previous_value = previous.get(key).cloned().unwrap_or_default();
            changes.push(Change::Props(ChangeDetail {
                name: key.to_owned(),
                previous: previous_value,
                next: Value::Undefined,
                unstable: false,
            }));
            continue;
        };
        let previous_value = previous.get(key).cloned().unwrap_or_default();
        if is_equal(&previous_value, next_value)
            || previous_value.is_element()
            || next_value.is_element()
        {
            continue;
        }
        changes.push(Change::Props(ChangeDetail {
            name: key.to_owned(),
            unstable: is_unstable(&previous_value, next_value),
            previous: previous_value,
            next: next_value.clone(),
        }));
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(entries: Vec<(&str, Value)>) -> Props {
        Props::new(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_owned(), value))
                .collect(),
        )
    }

    fn names(changes: &[Change]) -> Vec<&str> {
        changes.iter().map(Change::name).collect()
    }

    #[test]
    fn recreated_inline_function_is_unstable() {
        let previous = props(vec![("onClick", Value::function(None, "() => {}"))]);
        let next = props(vec![("onClick", Value::function(None, "() => {}"))]);
        let changes = props_changes(&[], &previous, &next);
        assert_eq!(names(&changes), vec!["onClick"]);
        assert!(changes[0].is_unstable());
    }

    #[test]
    fn equal_objects_produce_no_change() {
        let previous = props(vec![("style", Value::plain([("a", Value::from(1))]))]);
        let next = props(vec![("style", Value::plain([("a", Value::from(1))]))]);
        assert!(props_changes(&[], &previous, &next).is_empty());
    }

    #[test]
    fn same_shape_different_content_is_unstable() {
        let previous = props(vec![("style", Value::plain([("a", Value::from(1))]))]);
        let next = props(vec![("style", Value::plain([("a", Value::from(2))]))]);
        let changes = props_changes(&[], &previous, &next);
        assert_eq!(changes.len(), 1);
        assert!(changes[0].is_unstable());
    }

    #[test]
    fn primitive_changes_are_stable() {
        let previous = props(vec![("label", Value::from("a"))]);
        let next = props(vec![("label", Value::from("b"))]);
        let changes = props_changes(&[], &previous, &next);
        assert!(!changes[0].is_unstable());
    }

    #[test]
    fn removed_props_are_reported() {
        let previous = props(vec![("a", Value::from(1)), ("b", Value::from(2))]);
        let next = props(vec![("a", Value::from(1))]);
        let changes = props_changes(&[], &previous, &next);
        assert_eq!(names(&changes), vec!["b"]);
        let detail = changes[0].detail();
        assert!(matches!(detail.next, Value::Undefined));
        assert!(!detail.unstable);
    }

    #[test]
    fn children_and_elements_are_skipped() {
        let previous = props(vec![
            ("children", Value::from("old")),
            ("icon", Value::element(Some("Icon"), Vec::<(&str, Value)>::new())),
        ]);
        let next = props(vec![
            ("children", Value::from("new")),
            ("icon", Value::element(Some("Icon"), Vec::<(&str, Value)>::new())),
        ]);
        assert!(props_changes(&[], &previous, &next).is_empty());
    }

    #[test]
    fn declared_order_comes_first() {
        let previous = props(vec![("a", Value::from(1)), ("b", Value::from(1))]);
        let next = props(vec![("a", Value::from(2)), ("b", Value::from(2))]);
        let declared = vec!["b".to_owned(), "missing".to_owned()];
        assert_eq!(names(&props_changes(&declared, &previous, &next)), vec!["b", "a"]);
    }
}
