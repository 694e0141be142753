//! Property-based invariant tests for dependent properties and value
//! equality.
//!
//! These tests verify structural invariants that must hold for any valid inputs:
//!
//! 1. Both accessors always read the last value written through either.
//! 2. Plain writes never re-run dependents.
//! 3. Under strict equality a reactive write re-runs dependents exactly when
//!    the new value is not identical to the stored one.
//! 4. Loose equality is symmetric.
//! 5. Strict equality implies loose equality.
//! 6. Namespaced installs with one prefix share a single namespace object.
//! 7. Slot names stay unique whatever the install sequence.

use std::cell::Cell;
use std::rc::Rc;

use depprop::{DepOptions, DepProps, Deps, Object, Value, get_or_create_store};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn primitive_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-50i32..50).prop_map(Value::from),
        prop_oneof![Just("0"), Just("1"), Just("a"), Just(" 7 "), Just(""), Just("0x10")]
            .prop_map(Value::from),
    ]
}

/// Primitives plus awkward numbers. NaN is excluded from identity checks by
/// callers that need them.
fn equality_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        primitive_strategy(),
        Just(Value::from(f64::NAN)),
        Just(Value::from(f64::INFINITY)),
        Just(Value::from(-0.0)),
        Just(Value::from("Infinity")),
        Just(Value::from("true")),
    ]
}

#[derive(Debug, Clone)]
enum Write {
    Plain(Value),
    Reactive(Value),
}

fn write_strategy() -> impl Strategy<Value = Write> {
    prop_oneof![
        primitive_strategy().prop_map(Write::Plain),
        primitive_strategy().prop_map(Write::Reactive),
    ]
}

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

/// One slot `x` on a fresh object, watched by a counting autorun.
struct Watched {
    deps: Deps,
    obj: Object,
    runs: Rc<Cell<u32>>,
    _comp: depprop::Computation,
}

fn watched() -> Watched {
    let deps = Deps::new();
    let props = DepProps::new(deps.clone());
    let obj = Object::new();
    props
        .install(&obj, "x", DepOptions::new())
        .expect("fresh install");
    let runs = Rc::new(Cell::new(0));
    let counter = Rc::clone(&runs);
    let reader = obj.clone();
    let comp = deps.autorun(move |_| {
        counter.set(counter.get() + 1);
        let _ = reader.get("$x");
    });
    Watched {
        deps,
        obj,
        runs,
        _comp: comp,
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Accessors never diverge
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn accessors_read_last_write(writes in proptest::collection::vec(write_strategy(), 1..20)) {
        let w = watched();
        let mut last = Value::Undefined;
        for write in writes {
            match write {
                Write::Plain(v) => { w.obj.set("x", v.clone()); last = v; }
                Write::Reactive(v) => { w.obj.set("$x", v.clone()); last = v; }
            }
            prop_assert_eq!(w.obj.get("x"), last.clone());
            prop_assert_eq!(w.obj.get("$x"), last.clone());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2–3. Invalidation counts
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn plain_writes_never_rerun(values in proptest::collection::vec(primitive_strategy(), 0..20)) {
        let w = watched();
        for v in values {
            w.obj.set("x", v);
            w.deps.flush();
        }
        prop_assert_eq!(w.runs.get(), 1);
    }

    #[test]
    fn strict_reruns_exactly_on_change(writes in proptest::collection::vec(write_strategy(), 0..20)) {
        let w = watched();
        let mut stored = Value::Undefined;
        let mut expected = 1;
        for write in writes {
            match write {
                Write::Plain(v) => {
                    w.obj.set("x", v.clone());
                    stored = v;
                }
                Write::Reactive(v) => {
                    if !stored.strict_equals(&v) {
                        expected += 1;
                    }
                    w.obj.set("$x", v.clone());
                    stored = v;
                }
            }
            w.deps.flush();
            prop_assert_eq!(w.runs.get(), expected);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4–5. Equality relations
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn loose_equality_is_symmetric(a in equality_strategy(), b in equality_strategy()) {
        prop_assert_eq!(a.loose_equals(&b), b.loose_equals(&a));
    }

    #[test]
    fn strict_implies_loose(a in equality_strategy(), b in equality_strategy()) {
        if a.strict_equals(&b) {
            prop_assert!(a.loose_equals(&b));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6–7. Installation
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn namespace_is_shared(names in proptest::collection::btree_set(name_strategy(), 1..8)) {
        let props = DepProps::new(Deps::new());
        let obj = Object::new();
        let options = DepOptions::new().prefix("rx_ns").namespaced(true);
        let mut first: Option<Object> = None;
        for name in &names {
            let prop = props.install(&obj, name, options.clone()).expect("install");
            let ns = prop.namespace().expect("namespaced").clone();
            match &first {
                None => first = Some(ns),
                Some(existing) => prop_assert!(existing.ptr_eq(&ns)),
            }
        }
        let ns = first.expect("at least one name");
        prop_assert_eq!(ns.own_keys().len(), names.len());
        for name in &names {
            prop_assert!(ns.has_own(name));
        }
    }

    #[test]
    fn slot_names_stay_unique(names in proptest::collection::vec(name_strategy(), 0..16)) {
        let props = DepProps::new(Deps::new());
        let obj = Object::new();
        let mut accepted = std::collections::BTreeSet::new();
        for name in &names {
            let fresh = accepted.insert(name.clone());
            prop_assert_eq!(props.install(&obj, name, DepOptions::new()).is_ok(), fresh);
        }
        let store = get_or_create_store(&obj);
        prop_assert_eq!(store.len(), accepted.len());
    }
}
