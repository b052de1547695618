//! Deep structural equality.
//!
//! Identity short-circuits first; containers recurse. The comparator keeps
//! the set of object pairs currently being compared, and meeting a pair
//! again means both sides cycled back in step, which counts as equal for
//! that pair. An object that cannot be read right now (locked for
//! mutation) compares unequal.

use std::collections::HashSet;
use std::sync::Arc;

use crate::value::{Object, ObjectData, Value};

pub fn is_equal(a: &Value, b: &Value) -> bool {
    Comparator::default().values(a, b)
}

#[derive(Default)]
struct Comparator {
    visiting: HashSet<(usize, usize)>,
}

impl Comparator {
    fn values(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => numbers_equal(*x, *y),
            (Value::Object(x), Value::Object(y)) => Arc::ptr_eq(x, y) || self.objects(x, y),
            _ => a.same_ref(b),
        }
    }

    fn objects(&mut self, a: &Arc<Object>, b: &Arc<Object>) -> bool {
        let pair = (Arc::as_ptr(a) as usize, Arc::as_ptr(b) as usize);
        if !self.visiting.insert(pair) {
            return true;
        }
        let equal = match (a.read(), b.read()) {
            (Some(x), Some(y)) => self.data(&x, &y),
            _ => false,
        };
        self.visiting.remove(&pair);
        equal
    }

    fn data(&mut self, a: &ObjectData, b: &ObjectData) -> bool {
        match (a, b) {
            (ObjectData::Plain(x), ObjectData::Plain(y)) => self.entries(x, y),
            (ObjectData::Array(x), ObjectData::Array(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(x, y)| self.values(x, y))
            }
            (ObjectData::Date(x), ObjectData::Date(y)) => numbers_equal(*x, *y),
            (
                ObjectData::RegExp {
                    source: xs,
                    flags: xf,
                },
                ObjectData::RegExp {
                    source: ys,
                    flags: yf,
                },
            ) => xs == ys && xf == yf,
            (ObjectData::Map(x), ObjectData::Map(y)) => {
                x.len() == y.len()
                    && x.iter().all(|(key, value)| {
                        y.iter().any(|(other_key, other_value)| {
                            same_value_zero(key, other_key) && self.values(value, other_value)
                        })
                    })
            }
            (ObjectData::Set(x), ObjectData::Set(y)) => {
                x.len() == y.len()
                    && x
                        .iter()
                        .all(|item| y.iter().any(|other| same_value_zero(item, other)))
            }
            (ObjectData::ArrayBuffer(x), ObjectData::ArrayBuffer(y))
            | (ObjectData::DataView(x), ObjectData::DataView(y)) => x == y,
            (
                ObjectData::TypedArray { kind: xk, bytes: x },
                ObjectData::TypedArray { kind: yk, bytes: y },
            ) => xk == yk && x == y,
            // Elements, class instances and opaque objects only compare
            // equal by reference, which was already ruled out.
            _ => false,
        }
    }

    fn entries(&mut self, a: &[(String, Value)], b: &[(String, Value)]) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.iter().all(|(key, value)| {
            b.iter()
                .find(|(other_key, _)| other_key == key)
                .is_some_and(|(_, other)| self.values(value, other))
        })
    }
}

fn numbers_equal(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Membership test used by maps and sets: `NaN` matches itself, references
/// match by identity only.
fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(*x, *y),
        _ => a.same_ref(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TypedArrayKind;
    use proptest::prelude::*;

    fn set_field(target: &Value, key: &str, value: Value) {
        let Value::Object(object) = target else {
            panic!("expected object");
        };
        let mut data = object.write();
        let ObjectData::Plain(entries) = &mut *data else {
            panic!("expected plain object");
        };
        entries.push((key.to_owned(), value));
    }

    #[test]
    fn nan_equals_nan() {
        assert!(is_equal(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        assert!(!Value::Number(f64::NAN).same_ref(&Value::Number(f64::NAN)));
    }

    #[test]
    fn plain_objects_compare_by_keys_not_order() {
        let a = Value::plain([("a", Value::from(1)), ("b", Value::from("x"))]);
        let b = Value::plain([("b", Value::from("x")), ("a", Value::from(1))]);
        let c = Value::plain([("a", Value::from(2)), ("b", Value::from("x"))]);
        assert!(is_equal(&a, &b));
        assert!(!is_equal(&a, &c));
        assert!(!is_equal(&a, &Value::plain([("a", Value::from(1))])));
    }

    #[test]
    fn arrays_compare_elementwise() {
        let a = Value::array([Value::from(1), Value::plain([("k", Value::Null)])]);
        let b = Value::array([Value::from(1), Value::plain([("k", Value::Null)])]);
        assert!(is_equal(&a, &b));
        assert!(!is_equal(&a, &Value::array([Value::from(1)])));
    }

    #[test]
    fn dates_and_regexps_compare_by_content() {
        let d1 = Value::object(ObjectData::Date(1_000.0));
        let d2 = Value::object(ObjectData::Date(1_000.0));
        assert!(is_equal(&d1, &d2));
        let r1 = Value::object(ObjectData::RegExp {
            source: "a+".into(),
            flags: "g".into(),
        });
        let r2 = Value::object(ObjectData::RegExp {
            source: "a+".into(),
            flags: "i".into(),
        });
        assert!(!is_equal(&r1, &r2));
    }

    #[test]
    fn maps_and_sets_compare_by_membership() {
        let key = Value::plain::<&str>([]);
        let m1 = Value::object(ObjectData::Map(vec![
            (Value::from("a"), Value::array([Value::from(1)])),
            (key.clone(), Value::from(2)),
        ]));
        let m2 = Value::object(ObjectData::Map(vec![
            (key.clone(), Value::from(2)),
            (Value::from("a"), Value::array([Value::from(1)])),
        ]));
        assert!(is_equal(&m1, &m2));

        // Object keys are matched by identity, not shape.
        let m3 = Value::object(ObjectData::Map(vec![
            (Value::from("a"), Value::array([Value::from(1)])),
            (Value::plain::<&str>([]), Value::from(2)),
        ]));
        assert!(!is_equal(&m1, &m3));

        let s1 = Value::object(ObjectData::Set(vec![Value::from(1), Value::Number(f64::NAN)]));
        let s2 = Value::object(ObjectData::Set(vec![Value::Number(f64::NAN), Value::from(1)]));
        assert!(is_equal(&s1, &s2));
    }

    #[test]
    fn binary_data_compares_by_bytes() {
        let a = Value::object(ObjectData::TypedArray {
            kind: TypedArrayKind::Uint8,
            bytes: vec![1, 2, 3],
        });
        let b = Value::object(ObjectData::TypedArray {
            kind: TypedArrayKind::Uint8,
            bytes: vec![1, 2, 3],
        });
        let c = Value::object(ObjectData::TypedArray {
            kind: TypedArrayKind::Int8,
            bytes: vec![1, 2, 3],
        });
        assert!(is_equal(&a, &b));
        assert!(!is_equal(&a, &c));
        assert!(is_equal(
            &Value::object(ObjectData::ArrayBuffer(vec![9])),
            &Value::object(ObjectData::ArrayBuffer(vec![9]))
        ));
    }

    #[test]
    fn functions_and_instances_compare_by_reference() {
        let f = Value::function(None, "() => {}");
        assert!(is_equal(&f, &f.clone()));
        assert!(!is_equal(&f, &Value::function(None, "() => {}")));
        let i1 = Value::object(ObjectData::Instance {
            constructor: Some("Point".into()),
            fields: vec![],
        });
        let i2 = Value::object(ObjectData::Instance {
            constructor: Some("Point".into()),
            fields: vec![],
        });
        assert!(!is_equal(&i1, &i2));
    }

    #[test]
    fn cyclic_structures_terminate() {
        let a = Value::plain([("id", Value::from(1))]);
        let b = Value::plain([("id", Value::from(1))]);
        set_field(&a, "other", b.clone());
        set_field(&b, "other", a.clone());
        set_field(&a, "me", a.clone());
        set_field(&b, "me", b.clone());
        assert!(is_equal(&a, &b));
        assert!(is_equal(&b, &a));
    }

    #[test]
    fn locked_object_compares_unequal() {
        let a = Value::plain([("a", Value::from(1))]);
        let b = Value::plain([("a", Value::from(1))]);
        let Value::Object(object) = &b else {
            unreachable!()
        };
        let _guard = object.write();
        assert!(!is_equal(&a, &b));
        assert!(is_equal(&b, &b));
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Undefined),
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<f64>().prop_map(Value::Number),
            "[a-z]{0,4}".prop_map(|s| Value::string(s)),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::array),
                prop::collection::vec(("[a-c]", inner), 0..4).prop_map(|entries| {
                    let mut seen = HashSet::new();
                    Value::plain(entries.into_iter().filter(|(k, _)| seen.insert(k.clone())))
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn equality_is_reflexive(value in arb_value()) {
            prop_assert!(is_equal(&value, &value));
        }

        #[test]
        fn equality_is_symmetric(a in arb_value(), b in arb_value()) {
            prop_assert_eq!(is_equal(&a, &b), is_equal(&b, &a));
        }
    }
}
